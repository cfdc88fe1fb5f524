//! Alias registry
//!
//! An alias is an alternate (namespace, name) through which an actual
//! top-level property is read and written. Array-form aliases address the
//! first item of the actual array, alt-text aliases its `x-default` item.

use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::{ns, NamespaceMap};
use crate::core::node::ArrayType;
use std::collections::HashMap;
use std::fmt::Write as _;

/// How an alias maps onto its actual property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AliasForm {
    /// Direct mapping to a simple property
    Simple,
    /// Item 1 of an unordered array
    Array,
    /// Item 1 of an ordered array
    OrderedArray,
    /// Item 1 of an alternative array
    AltArray,
    /// The `x-default` item of an alt-text array
    AltText,
}

impl AliasForm {
    /// Array type to create when writing through this alias, if any
    pub fn array_type(self) -> Option<ArrayType> {
        match self {
            AliasForm::Simple => None,
            AliasForm::Array => Some(ArrayType::Unordered),
            AliasForm::OrderedArray => Some(ArrayType::Ordered),
            AliasForm::AltArray => Some(ArrayType::Alternative),
            AliasForm::AltText => Some(ArrayType::AltText),
        }
    }

    fn consistent_with(self, other: AliasForm) -> bool {
        match (self.array_type(), other.array_type()) {
            (Some(a), Some(b)) => a == b || (a.is_alternative() && b.is_alternative()),
            _ => true,
        }
    }

    fn label(self) -> &'static str {
        match self {
            AliasForm::Simple => "simple",
            AliasForm::Array => "array",
            AliasForm::OrderedArray => "ordered array",
            AliasForm::AltArray => "alt array",
            AliasForm::AltText => "alt-text",
        }
    }
}

/// Resolved target of an alias
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AliasInfo {
    /// Namespace URI of the actual property
    pub namespace: String,
    /// Local name of the actual property
    pub name: String,
    /// Mapping form
    pub form: AliasForm,
}

/// Table of registered aliases keyed by (alias namespace, alias name)
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    aliases: HashMap<(String, String), AliasInfo>,
}

impl AliasMap {
    /// Create an alias map preloaded with the standard XMP aliases
    pub fn new() -> Self {
        let mut map = Self::default();
        for (alias_ns, alias, actual_ns, actual, form) in STANDARD_ALIASES {
            map.aliases.insert(
                (alias_ns.to_string(), alias.to_string()),
                AliasInfo {
                    namespace: actual_ns.to_string(),
                    name: actual.to_string(),
                    form: *form,
                },
            );
        }
        map
    }

    /// Register an alias
    ///
    /// Both namespaces must be registered in `namespaces`. Chains are
    /// rejected: the alias must not already be an actual target and the
    /// actual property must not itself be an alias. Re-registering the same
    /// mapping is a no-op; a different mapping for an existing alias fails.
    pub fn register(
        &mut self,
        namespaces: &NamespaceMap,
        alias_ns: &str,
        alias_name: &str,
        actual_ns: &str,
        actual_name: &str,
        form: AliasForm,
    ) -> XmpResult<()> {
        for uri in [alias_ns, actual_ns] {
            if !namespaces.has_uri(uri) {
                return Err(XmpError::BadSchema(format!(
                    "Namespace '{}' is not registered",
                    uri
                )));
            }
        }
        if alias_name.is_empty() || actual_name.is_empty() {
            return Err(XmpError::BadParam("Alias names cannot be empty".to_string()));
        }

        let info = AliasInfo {
            namespace: actual_ns.to_string(),
            name: actual_name.to_string(),
            form,
        };
        let key = (alias_ns.to_string(), alias_name.to_string());
        if let Some(existing) = self.aliases.get(&key) {
            if *existing == info {
                return Ok(());
            }
            return Err(XmpError::BadParam(format!(
                "Alias '{}' is already registered with a different target",
                alias_name
            )));
        }
        if self
            .aliases
            .contains_key(&(actual_ns.to_string(), actual_name.to_string()))
        {
            return Err(XmpError::BadParam(format!(
                "Actual property '{}' is itself an alias",
                actual_name
            )));
        }
        if self.is_actual(alias_ns, alias_name) {
            return Err(XmpError::BadParam(format!(
                "Alias '{}' is already the target of another alias",
                alias_name
            )));
        }
        // All aliases to one actual must agree on its array form.
        if self.aliases.values().any(|a| {
            a.namespace == actual_ns && a.name == actual_name && !a.form.consistent_with(form)
        }) {
            return Err(XmpError::BadParam(format!(
                "Alias form for '{}' conflicts with an existing alias",
                actual_name
            )));
        }

        self.aliases.insert(key, info);
        Ok(())
    }

    /// Resolve an alias; `None` means "not an alias"
    pub fn resolve(&self, alias_ns: &str, alias_name: &str) -> Option<&AliasInfo> {
        self.aliases
            .get(&(alias_ns.to_string(), alias_name.to_string()))
    }

    /// Whether (namespace, name) is the actual target of some alias
    pub fn is_actual(&self, namespace: &str, name: &str) -> bool {
        self.aliases
            .values()
            .any(|a| a.namespace == namespace && a.name == name)
    }

    /// All aliases whose actual target is (namespace, name)
    pub fn aliases_of(&self, namespace: &str, name: &str) -> Vec<(String, String)> {
        let mut found: Vec<_> = self
            .aliases
            .iter()
            .filter(|(_, a)| a.namespace == namespace && a.name == name)
            .map(|(k, _)| k.clone())
            .collect();
        found.sort();
        found
    }

    /// Registered aliases in one namespace, sorted by name
    pub fn aliases_in(&self, alias_ns: &str) -> Vec<(String, AliasInfo)> {
        let mut found: Vec<_> = self
            .aliases
            .iter()
            .filter(|((uri, _), _)| uri == alias_ns)
            .map(|((_, name), info)| (name.clone(), info.clone()))
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        found
    }

    /// Namespaces that contain at least one alias, sorted
    pub fn alias_namespaces(&self) -> Vec<String> {
        let mut found: Vec<String> = self.aliases.keys().map(|(uri, _)| uri.clone()).collect();
        found.sort();
        found.dedup();
        found
    }

    /// Human-readable listing, one `alias => actual` per line
    pub fn dump(&self, namespaces: &NamespaceMap) -> String {
        let qname = |uri: &str, name: &str| match namespaces.get_prefix(uri) {
            Some(prefix) => format!("{}:{}", prefix, name),
            None => format!("{{{}}}{}", uri, name),
        };
        let mut lines: Vec<String> = self
            .aliases
            .iter()
            .map(|((uri, name), info)| {
                format!(
                    "  {:<28} => {} ({})",
                    qname(uri, name),
                    qname(&info.namespace, &info.name),
                    info.form.label()
                )
            })
            .collect();
        lines.sort();

        let mut out = String::from("Dumping alias name to actual path map\n");
        for line in lines {
            let _ = writeln!(out, "{}", line);
        }
        out
    }
}

type AliasRow = (&'static str, &'static str, &'static str, &'static str, AliasForm);

const STANDARD_ALIASES: &[AliasRow] = &[
    // XMP basic
    (ns::XMP, "Author", ns::DC, "creator", AliasForm::OrderedArray),
    (ns::XMP, "Authors", ns::DC, "creator", AliasForm::Simple),
    (ns::XMP, "Description", ns::DC, "description", AliasForm::Simple),
    (ns::XMP, "Format", ns::DC, "format", AliasForm::Simple),
    (ns::XMP, "Keywords", ns::DC, "subject", AliasForm::Simple),
    (ns::XMP, "Locale", ns::DC, "language", AliasForm::Simple),
    (ns::XMP, "Title", ns::DC, "title", AliasForm::Simple),
    (ns::XMP_RIGHTS, "Copyright", ns::DC, "rights", AliasForm::Simple),
    // PDF
    (ns::PDF, "Author", ns::DC, "creator", AliasForm::OrderedArray),
    (ns::PDF, "BaseURL", ns::XMP, "BaseURL", AliasForm::Simple),
    (ns::PDF, "CreationDate", ns::XMP, "CreateDate", AliasForm::Simple),
    (ns::PDF, "Creator", ns::XMP, "CreatorTool", AliasForm::Simple),
    (ns::PDF, "ModDate", ns::XMP, "ModifyDate", AliasForm::Simple),
    (ns::PDF, "Subject", ns::DC, "description", AliasForm::AltText),
    (ns::PDF, "Title", ns::DC, "title", AliasForm::AltText),
    // Photoshop
    (ns::PHOTOSHOP, "Author", ns::DC, "creator", AliasForm::OrderedArray),
    (ns::PHOTOSHOP, "Caption", ns::DC, "description", AliasForm::AltText),
    (ns::PHOTOSHOP, "Copyright", ns::DC, "rights", AliasForm::AltText),
    (ns::PHOTOSHOP, "Keywords", ns::DC, "subject", AliasForm::Simple),
    (ns::PHOTOSHOP, "Marked", ns::XMP_RIGHTS, "Marked", AliasForm::Simple),
    (ns::PHOTOSHOP, "Title", ns::DC, "title", AliasForm::AltText),
    (ns::PHOTOSHOP, "WebStatement", ns::XMP_RIGHTS, "WebStatement", AliasForm::Simple),
    // TIFF and EXIF
    (ns::TIFF, "Artist", ns::DC, "creator", AliasForm::OrderedArray),
    (ns::TIFF, "Copyright", ns::DC, "rights", AliasForm::AltText),
    (ns::TIFF, "DateTime", ns::XMP, "ModifyDate", AliasForm::Simple),
    (ns::EXIF, "DateTimeDigitized", ns::XMP, "CreateDate", AliasForm::Simple),
    (ns::TIFF, "ImageDescription", ns::DC, "description", AliasForm::AltText),
    (ns::TIFF, "Software", ns::XMP, "CreatorTool", AliasForm::Simple),
    // PNG
    (ns::PNG, "Author", ns::DC, "creator", AliasForm::OrderedArray),
    (ns::PNG, "Copyright", ns::DC, "rights", AliasForm::AltText),
    (ns::PNG, "CreationTime", ns::XMP, "CreateDate", AliasForm::Simple),
    (ns::PNG, "Description", ns::DC, "description", AliasForm::AltText),
    (ns::PNG, "ModificationTime", ns::XMP, "ModifyDate", AliasForm::Simple),
    (ns::PNG, "Software", ns::XMP, "CreatorTool", AliasForm::Simple),
    (ns::PNG, "Title", ns::DC, "title", AliasForm::AltText),
];
