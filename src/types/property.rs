//! Query results
//!
//! Accessors and the iterator report nodes as [`XmpProperty`] snapshots.

use crate::core::namespace::NamespaceMap;
use crate::core::node::{Node, PropKind};
use crate::types::value::XmpValue;

/// Snapshot of one node returned by accessors and iterators
#[derive(Debug, Clone, PartialEq)]
pub struct XmpProperty {
    /// Namespace URI of the top-level property
    pub namespace: String,
    /// Path of the node (or its leaf segment, for leaf-name iteration)
    pub path: String,
    /// Value, including nested items and fields for containers
    pub value: XmpValue,
    /// Kind of the node
    pub kind: PropKind,
    /// Simple value is a URI reference
    pub is_uri: bool,
    /// Node carries qualifiers
    pub has_qualifiers: bool,
    /// `xml:lang` of the node, or of the matched item for localized lookups
    pub locale: Option<String>,
}

impl XmpProperty {
    pub(crate) fn from_node(
        namespace: &str,
        path: impl Into<String>,
        node: &Node,
        namespaces: &NamespaceMap,
    ) -> Self {
        Self {
            namespace: namespace.to_string(),
            path: path.into(),
            value: XmpValue::from_node(node, namespaces),
            kind: node.kind(),
            is_uri: node.as_simple().map(|s| s.is_uri).unwrap_or(false),
            has_qualifiers: !node.qualifiers().is_empty(),
            locale: node.lang().map(str::to_string),
        }
    }

    /// Scalar value as a string slice
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// Whether the node is an array
    pub fn is_array(&self) -> bool {
        matches!(self.kind, PropKind::Array(_))
    }

    /// Whether the node is a structure
    pub fn is_struct(&self) -> bool {
        self.kind == PropKind::Struct
    }
}
