//! XMP node types
//!
//! This module defines the node types used in the XMP data model:
//! - SimpleNode: a scalar value, optionally flagged as a URI
//! - ArrayNode: items of an unordered, ordered, alternative or alt-text array
//! - StructureNode: named fields
//!
//! Struct fields and qualifiers are both [`Field`]s, so qualifiers are full
//! nodes that may carry qualifiers of their own.

use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::ns;

/// Reserved language of the default item in an alt-text array
pub const X_DEFAULT: &str = "x-default";

/// Type of array node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArrayType {
    /// Unordered array (rdf:Bag)
    Unordered,
    /// Ordered array (rdf:Seq)
    Ordered,
    /// Alternative array (rdf:Alt)
    Alternative,
    /// Alternative array whose items are keyed by `xml:lang`
    AltText,
}

impl ArrayType {
    /// Get the RDF container name for this array type
    pub fn rdf_type(&self) -> &'static str {
        match self {
            ArrayType::Unordered => "Bag",
            ArrayType::Ordered => "Seq",
            ArrayType::Alternative | ArrayType::AltText => "Alt",
        }
    }

    /// Parse an RDF container local name
    pub fn from_rdf_type(name: &str) -> Option<Self> {
        match name {
            "Bag" => Some(ArrayType::Unordered),
            "Seq" => Some(ArrayType::Ordered),
            "Alt" => Some(ArrayType::Alternative),
            _ => None,
        }
    }

    /// Item order is meaningful (every kind except `Unordered`)
    pub fn is_ordered(&self) -> bool {
        !matches!(self, ArrayType::Unordered)
    }

    /// Alternative or alt-text array
    pub fn is_alternative(&self) -> bool {
        matches!(self, ArrayType::Alternative | ArrayType::AltText)
    }
}

/// Kind tag of a node, used when creating nodes and when reporting them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropKind {
    /// Simple value
    #[default]
    Simple,
    /// Array of the given type
    Array(ArrayType),
    /// Structure
    Struct,
}

impl PropKind {
    /// Whether an existing node with kind `actual` satisfies this request.
    ///
    /// `Alternative` and `AltText` are interchangeable.
    pub fn accepts(self, actual: PropKind) -> bool {
        match (self, actual) {
            (PropKind::Array(a), PropKind::Array(b)) => {
                a == b || (a.is_alternative() && b.is_alternative())
            }
            (a, b) => a == b,
        }
    }
}

/// A named node: a structure field, a qualifier or a top-level property
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Namespace URI
    pub namespace: String,
    /// Local name
    pub name: String,
    /// Value node
    pub node: Node,
}

impl Field {
    /// Create a new named node
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, node: Node) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            node,
        }
    }

    /// Whether this field has the given namespace and local name
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.namespace == namespace && self.name == name
    }
}

/// A simple value node
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimpleNode {
    /// The value of the node
    pub value: String,
    /// Value is a URI reference (`rdf:resource`)
    pub is_uri: bool,
    /// Qualifiers attached to this node
    pub qualifiers: Vec<Field>,
}

impl SimpleNode {
    /// Create a new simple node
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            is_uri: false,
            qualifiers: Vec::new(),
        }
    }
}

/// An array node containing multiple child nodes
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayNode {
    /// The items in the array
    pub items: Vec<Node>,
    /// The type of array
    pub array_type: ArrayType,
    /// Qualifiers attached to this node
    pub qualifiers: Vec<Field>,
}

impl ArrayNode {
    /// Create a new array node
    pub fn new(array_type: ArrayType) -> Self {
        Self {
            items: Vec::new(),
            array_type,
            qualifiers: Vec::new(),
        }
    }

    /// Get the number of items in the array
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the array is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get an item by 0-based index
    pub fn get(&self, index: usize) -> Option<&Node> {
        self.items.get(index)
    }

    /// Get a mutable reference to an item by 0-based index
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.items.get_mut(index)
    }

    /// Append an item to the array
    pub fn append(&mut self, node: Node) {
        self.items.push(node);
    }

    /// Insert an item at a 0-based index
    pub fn insert(&mut self, index: usize, node: Node) -> XmpResult<()> {
        if index > self.items.len() {
            return Err(XmpError::BadParam(format!(
                "Index {} out of bounds for array of length {}",
                index,
                self.items.len()
            )));
        }
        self.items.insert(index, node);
        Ok(())
    }

    /// Remove an item at a 0-based index
    pub fn remove(&mut self, index: usize) -> XmpResult<Node> {
        if index >= self.items.len() {
            return Err(XmpError::BadParam(format!(
                "Index {} out of bounds for array of length {}",
                index,
                self.items.len()
            )));
        }
        Ok(self.items.remove(index))
    }

    /// Index of the first item whose `xml:lang` equals `lang` (case-insensitive)
    pub fn find_lang(&self, lang: &str) -> Option<usize> {
        self.items.iter().position(|item| {
            item.lang()
                .map(|l| l.eq_ignore_ascii_case(lang))
                .unwrap_or(false)
        })
    }

    /// Index of the first struct item whose simple field equals `value`
    pub fn find_field(&self, namespace: &str, name: &str, value: &str) -> Option<usize> {
        self.items.iter().position(|item| {
            item.as_structure()
                .and_then(|s| s.get_field(namespace, name))
                .and_then(Node::as_simple)
                .map(|f| f.value == value)
                .unwrap_or(false)
        })
    }

    /// Index of the first item whose simple qualifier equals `value`
    pub fn find_qualifier(&self, namespace: &str, name: &str, value: &str) -> Option<usize> {
        if namespace == ns::XML && name == "lang" {
            return self.find_lang(value);
        }
        self.items.iter().position(|item| {
            item.get_qualifier(namespace, name)
                .and_then(Node::as_simple)
                .map(|q| q.value == value)
                .unwrap_or(false)
        })
    }

    /// Whether every item carries an `xml:lang` qualifier
    pub fn all_items_have_lang(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|i| i.lang().is_some())
    }
}

/// A structure node containing named fields
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructureNode {
    /// The fields in the structure, in insertion order
    pub fields: Vec<Field>,
    /// Qualifiers attached to this node
    pub qualifiers: Vec<Field>,
}

impl StructureNode {
    /// Create a new structure node
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field by namespace and name
    pub fn get_field(&self, namespace: &str, name: &str) -> Option<&Node> {
        self.fields
            .iter()
            .find(|f| f.is(namespace, name))
            .map(|f| &f.node)
    }

    /// Get a mutable reference to a field
    pub fn get_field_mut(&mut self, namespace: &str, name: &str) -> Option<&mut Node> {
        self.fields
            .iter_mut()
            .find(|f| f.is(namespace, name))
            .map(|f| &mut f.node)
    }

    /// Set a field, replacing an existing one in place
    pub fn set_field(&mut self, namespace: &str, name: &str, node: Node) {
        match self.get_field_mut(namespace, name) {
            Some(existing) => *existing = node,
            None => self.fields.push(Field::new(namespace, name, node)),
        }
    }

    /// Remove a field
    pub fn remove_field(&mut self, namespace: &str, name: &str) -> Option<Node> {
        let index = self.fields.iter().position(|f| f.is(namespace, name))?;
        Some(self.fields.remove(index).node)
    }

    /// Check if a field exists
    pub fn has_field(&self, namespace: &str, name: &str) -> bool {
        self.fields.iter().any(|f| f.is(namespace, name))
    }

    /// Check if the structure has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A node in the XMP data model
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A simple value node
    Simple(SimpleNode),
    /// An array node
    Array(ArrayNode),
    /// A structure node
    Structure(StructureNode),
}

impl Node {
    /// Create a new simple node
    pub fn simple(value: impl Into<String>) -> Self {
        Node::Simple(SimpleNode::new(value))
    }

    /// Create a new simple node holding a URI reference
    pub fn uri(value: impl Into<String>) -> Self {
        Node::Simple(SimpleNode {
            value: value.into(),
            is_uri: true,
            qualifiers: Vec::new(),
        })
    }

    /// Create a new array node
    pub fn array(array_type: ArrayType) -> Self {
        Node::Array(ArrayNode::new(array_type))
    }

    /// Create a new structure node
    pub fn structure() -> Self {
        Node::Structure(StructureNode::new())
    }

    /// Create an empty node of the given kind; simple nodes get `value`
    pub fn with_kind(kind: PropKind, value: Option<&str>) -> Self {
        match kind {
            PropKind::Simple => Node::simple(value.unwrap_or_default()),
            PropKind::Array(t) => Node::array(t),
            PropKind::Struct => Node::structure(),
        }
    }

    /// Kind tag of this node
    pub fn kind(&self) -> PropKind {
        match self {
            Node::Simple(_) => PropKind::Simple,
            Node::Array(a) => PropKind::Array(a.array_type),
            Node::Structure(_) => PropKind::Struct,
        }
    }

    /// Check if this is a simple node
    pub fn is_simple(&self) -> bool {
        matches!(self, Node::Simple(_))
    }

    /// Check if this is an array node
    pub fn is_array(&self) -> bool {
        matches!(self, Node::Array(_))
    }

    /// Check if this is a structure node
    pub fn is_structure(&self) -> bool {
        matches!(self, Node::Structure(_))
    }

    /// Get the simple node, if this is a simple node
    pub fn as_simple(&self) -> Option<&SimpleNode> {
        match self {
            Node::Simple(node) => Some(node),
            _ => None,
        }
    }

    /// Get the array node, if this is an array node
    pub fn as_array(&self) -> Option<&ArrayNode> {
        match self {
            Node::Array(node) => Some(node),
            _ => None,
        }
    }

    /// Get the structure node, if this is a structure node
    pub fn as_structure(&self) -> Option<&StructureNode> {
        match self {
            Node::Structure(node) => Some(node),
            _ => None,
        }
    }

    /// Get a mutable reference to the simple node, if this is a simple node
    pub fn as_simple_mut(&mut self) -> Option<&mut SimpleNode> {
        match self {
            Node::Simple(node) => Some(node),
            _ => None,
        }
    }

    /// Get a mutable reference to the array node, if this is an array node
    pub fn as_array_mut(&mut self) -> Option<&mut ArrayNode> {
        match self {
            Node::Array(node) => Some(node),
            _ => None,
        }
    }

    /// Get a mutable reference to the structure node, if this is a structure node
    pub fn as_structure_mut(&mut self) -> Option<&mut StructureNode> {
        match self {
            Node::Structure(node) => Some(node),
            _ => None,
        }
    }

    /// Scalar value of a simple node
    pub fn value(&self) -> Option<&str> {
        self.as_simple().map(|s| s.value.as_str())
    }

    /// Qualifiers attached to this node
    pub fn qualifiers(&self) -> &[Field] {
        match self {
            Node::Simple(n) => &n.qualifiers,
            Node::Array(n) => &n.qualifiers,
            Node::Structure(n) => &n.qualifiers,
        }
    }

    /// Mutable qualifier list
    pub fn qualifiers_mut(&mut self) -> &mut Vec<Field> {
        match self {
            Node::Simple(n) => &mut n.qualifiers,
            Node::Array(n) => &mut n.qualifiers,
            Node::Structure(n) => &mut n.qualifiers,
        }
    }

    /// Get a qualifier by namespace and name
    pub fn get_qualifier(&self, namespace: &str, name: &str) -> Option<&Node> {
        self.qualifiers()
            .iter()
            .find(|q| q.is(namespace, name))
            .map(|q| &q.node)
    }

    /// Get a mutable qualifier by namespace and name
    pub fn get_qualifier_mut(&mut self, namespace: &str, name: &str) -> Option<&mut Node> {
        self.qualifiers_mut()
            .iter_mut()
            .find(|q| q.is(namespace, name))
            .map(|q| &mut q.node)
    }

    /// Set a qualifier; `xml:lang` is always kept first
    pub fn set_qualifier(&mut self, namespace: &str, name: &str, node: Node) {
        if let Some(existing) = self.get_qualifier_mut(namespace, name) {
            *existing = node;
            return;
        }
        let field = Field::new(namespace, name, node);
        let qualifiers = self.qualifiers_mut();
        if namespace == ns::XML && name == "lang" {
            qualifiers.insert(0, field);
        } else {
            qualifiers.push(field);
        }
    }

    /// Remove a qualifier, returning whether it existed
    pub fn remove_qualifier(&mut self, namespace: &str, name: &str) -> bool {
        let qualifiers = self.qualifiers_mut();
        let before = qualifiers.len();
        qualifiers.retain(|q| !q.is(namespace, name));
        qualifiers.len() < before
    }

    /// Value of the `xml:lang` qualifier
    pub fn lang(&self) -> Option<&str> {
        self.get_qualifier(ns::XML, "lang").and_then(Node::value)
    }

    /// Number of direct children (array items or struct fields)
    pub fn child_count(&self) -> usize {
        match self {
            Node::Simple(_) => 0,
            Node::Array(a) => a.items.len(),
            Node::Structure(s) => s.fields.len(),
        }
    }

    /// Empty simple value, or a container without children
    pub fn is_empty_value(&self) -> bool {
        match self {
            Node::Simple(s) => s.value.is_empty(),
            _ => self.child_count() == 0,
        }
    }

    /// Recursively sort struct fields and qualifiers.
    ///
    /// Fields sort by (namespace, name). Qualifiers keep `xml:lang` and
    /// `rdf:type` first and sort the rest the same way. Array items keep
    /// their order; only their own contents are sorted.
    pub fn sort(&mut self) {
        sort_qualifiers(self.qualifiers_mut());
        match self {
            Node::Simple(_) => {}
            Node::Array(a) => a.items.iter_mut().for_each(Node::sort),
            Node::Structure(s) => sort_fields(&mut s.fields),
        }
    }
}

/// Sort named nodes by (namespace, name) and recurse into them.
pub(crate) fn sort_fields(fields: &mut [Field]) {
    fields.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
    fields.iter_mut().for_each(|f| f.node.sort());
}

fn sort_qualifiers(qualifiers: &mut [Field]) {
    let rank = |q: &Field| {
        if q.is(ns::XML, "lang") {
            0
        } else if q.is(ns::RDF, "type") {
            1
        } else {
            2
        }
    };
    qualifiers.sort_by(|a, b| {
        (rank(a), &a.namespace, &a.name).cmp(&(rank(b), &b.namespace, &b.name))
    });
    qualifiers.iter_mut().for_each(|q| q.node.sort());
}
