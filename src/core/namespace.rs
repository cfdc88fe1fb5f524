//! Namespace management for XMP
//!
//! XMP organizes properties into schemas identified by namespace URIs. Each
//! registered URI has exactly one prefix and each prefix names exactly one
//! URI. Registering a URI whose suggested prefix is already taken yields a
//! generated `prefix_N_` variant instead of an error.

use crate::core::context::XmpContext;
use crate::core::error::{XmpError, XmpResult};
use log::debug;
use std::collections::HashMap;
use std::fmt::Write as _;

/// Built-in XMP namespaces
pub mod ns {
    /// XMP Basic namespace
    pub const XMP: &str = "http://ns.adobe.com/xap/1.0/";
    /// XMP Rights namespace
    pub const XMP_RIGHTS: &str = "http://ns.adobe.com/xap/1.0/rights/";
    /// XMP Media Management namespace
    pub const XMP_MM: &str = "http://ns.adobe.com/xap/1.0/mm/";
    /// XMP Basic Job Ticket namespace
    pub const XMP_BJ: &str = "http://ns.adobe.com/xap/1.0/bj/";
    /// XMP Note namespace
    pub const XMP_NOTE: &str = "http://ns.adobe.com/xmp/note/";
    /// Dublin Core namespace
    pub const DC: &str = "http://purl.org/dc/elements/1.1/";
    /// IPTC Core namespace
    pub const IPTC_CORE: &str = "http://iptc.org/std/Iptc4xmpCore/1.0/xmlns/";
    /// IPTC Extension namespace
    pub const IPTC_EXT: &str = "http://iptc.org/std/Iptc4xmpExt/2008-02-29/";
    /// PDF namespace
    pub const PDF: &str = "http://ns.adobe.com/pdf/1.3/";
    /// PDF/X namespace
    pub const PDFX: &str = "http://ns.adobe.com/pdfx/1.3/";
    /// Photoshop namespace
    pub const PHOTOSHOP: &str = "http://ns.adobe.com/photoshop/1.0/";
    /// Photoshop album namespace
    pub const PS_ALBUM: &str = "http://ns.adobe.com/album/1.0/";
    /// EXIF namespace
    pub const EXIF: &str = "http://ns.adobe.com/exif/1.0/";
    /// EXIF 2.3 extension namespace
    pub const EXIF_EX: &str = "http://cipa.jp/exif/1.0/";
    /// EXIF auxiliary namespace
    pub const EXIF_AUX: &str = "http://ns.adobe.com/exif/1.0/aux/";
    /// TIFF namespace
    pub const TIFF: &str = "http://ns.adobe.com/tiff/1.0/";
    /// PNG namespace
    pub const PNG: &str = "http://ns.adobe.com/png/1.0/";
    /// JPEG namespace
    pub const JPEG: &str = "http://ns.adobe.com/jpeg/1.0/";
    /// SWF namespace
    pub const SWF: &str = "http://ns.adobe.com/swf/1.0/";
    /// JPEG 2000 namespace
    pub const JPK: &str = "http://ns.adobe.com/jp2k/1.0/";
    /// Camera Raw namespace
    pub const CAMERA_RAW: &str = "http://ns.adobe.com/camera-raw-settings/1.0/";
    /// XMP Dynamic Media namespace
    pub const XMP_DM: &str = "http://ns.adobe.com/xmp/1.0/DynamicMedia/";
    /// Adobe Stock Photo namespace
    pub const ADOBE_STOCK_PHOTO: &str = "http://ns.adobe.com/StockPhoto/1.0/";
    /// ASF namespace
    pub const ASF: &str = "http://ns.adobe.com/asf/1.0/";
    /// PDF/A identification namespace
    pub const PDFA: &str = "http://www.aiim.org/pdfa/ns/id/";
    /// RDF namespace
    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    /// XML namespace (for xml:lang)
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    /// Namespace of the `x:xmpmeta` wrapper element
    pub const X: &str = "adobe:ns:meta/";

    /// Identifier qualifier type
    pub const TYPE_IDENTIFIER_QUAL: &str = "http://ns.adobe.com/xmp/Identifier/qual/1.0/";
    /// Dimensions structure type
    pub const TYPE_DIMENSIONS: &str = "http://ns.adobe.com/xap/1.0/sType/Dimensions#";
    /// Paged text type
    pub const TYPE_TEXT: &str = "http://ns.adobe.com/xap/1.0/t/";
    /// Paged file type
    pub const TYPE_PAGEDFILE: &str = "http://ns.adobe.com/xap/1.0/t/pg/";
    /// Graphics type
    pub const TYPE_GRAPHICS: &str = "http://ns.adobe.com/xap/1.0/g/";
    /// Thumbnail image type
    pub const TYPE_IMAGE: &str = "http://ns.adobe.com/xap/1.0/g/img/";
    /// Font structure type
    pub const TYPE_FONT: &str = "http://ns.adobe.com/xap/1.0/sType/Font#";
    /// Resource event structure type
    pub const TYPE_RESOURCE_EVENT: &str = "http://ns.adobe.com/xap/1.0/sType/ResourceEvent#";
    /// Resource reference structure type
    pub const TYPE_RESOURCE_REF: &str = "http://ns.adobe.com/xap/1.0/sType/ResourceRef#";
    /// Version structure type
    pub const TYPE_ST_VERSION: &str = "http://ns.adobe.com/xap/1.0/sType/Version#";
    /// Job structure type
    pub const TYPE_ST_JOB: &str = "http://ns.adobe.com/xap/1.0/sType/Job#";
    /// Manifest item structure type
    pub const TYPE_MANIFEST_ITEM: &str = "http://ns.adobe.com/xap/1.0/sType/ManifestItem#";
    /// PDF/A schema type
    pub const TYPE_PDFA_SCHEMA: &str = "http://www.aiim.org/pdfa/ns/schema#";
    /// PDF/A property type
    pub const TYPE_PDFA_PROPERTY: &str = "http://www.aiim.org/pdfa/ns/property#";
    /// PDF/A value type
    pub const TYPE_PDFA_TYPE: &str = "http://www.aiim.org/pdfa/ns/type#";
    /// PDF/A field type
    pub const TYPE_PDFA_FIELD: &str = "http://www.aiim.org/pdfa/ns/field#";
    /// PDF/A extension type
    pub const TYPE_PDFA_EXTENSION: &str = "http://www.aiim.org/pdfa/ns/extension/";

    /// Built-in (URI, prefix) pairs, registered in every new context
    pub const BUILTIN: &[(&str, &str)] = &[
        (XML, "xml"),
        (RDF, "rdf"),
        (X, "x"),
        (DC, "dc"),
        (XMP, "xmp"),
        (XMP_RIGHTS, "xmpRights"),
        (XMP_MM, "xmpMM"),
        (XMP_BJ, "xmpBJ"),
        (XMP_NOTE, "xmpNote"),
        (XMP_DM, "xmpDM"),
        (IPTC_CORE, "Iptc4xmpCore"),
        (IPTC_EXT, "Iptc4xmpExt"),
        (PDF, "pdf"),
        (PDFX, "pdfx"),
        (PDFA, "pdfaid"),
        (PHOTOSHOP, "photoshop"),
        (PS_ALBUM, "album"),
        (EXIF, "exif"),
        (EXIF_EX, "exifEX"),
        (EXIF_AUX, "aux"),
        (TIFF, "tiff"),
        (PNG, "png"),
        (JPEG, "jpeg"),
        (SWF, "swf"),
        (JPK, "jpk"),
        (CAMERA_RAW, "crs"),
        (ADOBE_STOCK_PHOTO, "bmsp"),
        (ASF, "asf"),
        (TYPE_IDENTIFIER_QUAL, "xmpidq"),
        (TYPE_DIMENSIONS, "stDim"),
        (TYPE_TEXT, "xmpT"),
        (TYPE_PAGEDFILE, "xmpTPg"),
        (TYPE_GRAPHICS, "xmpG"),
        (TYPE_IMAGE, "xmpGImg"),
        (TYPE_FONT, "stFnt"),
        (TYPE_RESOURCE_EVENT, "stEvt"),
        (TYPE_RESOURCE_REF, "stRef"),
        (TYPE_ST_VERSION, "stVer"),
        (TYPE_ST_JOB, "stJob"),
        (TYPE_MANIFEST_ITEM, "stMfs"),
        (TYPE_PDFA_SCHEMA, "pdfaSchema"),
        (TYPE_PDFA_PROPERTY, "pdfaProperty"),
        (TYPE_PDFA_TYPE, "pdfaType"),
        (TYPE_PDFA_FIELD, "pdfaField"),
        (TYPE_PDFA_EXTENSION, "pdfaExtension"),
    ];
}

/// Bidirectional map between namespace URIs and prefixes
#[derive(Debug, Clone, Default)]
pub struct NamespaceMap {
    uri_to_prefix: HashMap<String, String>,
    prefix_to_uri: HashMap<String, String>,
}

impl NamespaceMap {
    /// Create a new namespace map with built-in namespaces registered
    pub fn new() -> Self {
        let mut map = Self::default();
        for (uri, prefix) in ns::BUILTIN {
            map.insert(uri, prefix);
        }
        map
    }

    /// Register a namespace URI with a suggested prefix
    ///
    /// Returns the prefix actually bound to `uri`:
    ///
    /// - an already registered URI keeps its existing prefix
    /// - a new URI gets `suggested` if free, else the first unused
    ///   `suggested_N_` variant
    pub fn register(&mut self, uri: &str, suggested: &str) -> XmpResult<String> {
        if uri.is_empty() {
            return Err(XmpError::BadSchema("Namespace URI cannot be empty".to_string()));
        }
        let suggested = suggested.strip_suffix(':').unwrap_or(suggested);
        if suggested.is_empty() {
            return Err(XmpError::BadParam("Prefix cannot be empty".to_string()));
        }
        if !is_xml_name(suggested) {
            return Err(XmpError::BadParam(format!(
                "Prefix '{}' is not a valid XML name",
                suggested
            )));
        }

        if let Some(existing) = self.uri_to_prefix.get(uri) {
            return Ok(existing.clone());
        }

        let mut prefix = suggested.to_string();
        let mut counter = 1;
        while self.prefix_to_uri.contains_key(&prefix) {
            prefix = format!("{}_{}_", suggested, counter);
            counter += 1;
        }
        if prefix != suggested {
            debug!(
                "Prefix '{}' taken, registering '{}' as '{}'",
                suggested, uri, prefix
            );
        }

        self.insert(uri, &prefix);
        Ok(prefix)
    }

    fn insert(&mut self, uri: &str, prefix: &str) {
        self.uri_to_prefix.insert(uri.to_string(), prefix.to_string());
        self.prefix_to_uri.insert(prefix.to_string(), uri.to_string());
    }

    /// Remove a namespace and its prefix. Unknown URIs are ignored.
    pub fn unregister(&mut self, uri: &str) {
        if let Some(prefix) = self.uri_to_prefix.remove(uri) {
            self.prefix_to_uri.remove(&prefix);
        }
    }

    /// Get the prefix for a namespace URI
    pub fn get_prefix(&self, uri: &str) -> Option<&str> {
        self.uri_to_prefix.get(uri).map(|s| s.as_str())
    }

    /// Get the URI for a namespace prefix
    pub fn get_uri(&self, prefix: &str) -> Option<&str> {
        let prefix = prefix.strip_suffix(':').unwrap_or(prefix);
        self.prefix_to_uri.get(prefix).map(|s| s.as_str())
    }

    /// Check if a namespace URI is registered
    pub fn has_uri(&self, uri: &str) -> bool {
        self.uri_to_prefix.contains_key(uri)
    }

    /// Check if a namespace prefix is registered
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.prefix_to_uri.contains_key(prefix)
    }

    /// All registered namespaces as (uri, prefix) pairs, sorted by prefix
    pub fn get_all_namespaces(&self) -> Vec<(String, String)> {
        let mut all: Vec<_> = self
            .uri_to_prefix
            .iter()
            .map(|(uri, prefix)| (uri.clone(), prefix.clone()))
            .collect();
        all.sort_by(|a, b| a.1.cmp(&b.1));
        all
    }

    /// Human-readable listing of the registry, one `prefix => uri` per line
    pub fn dump(&self) -> String {
        let mut out = String::from("Dumping namespace prefix to URI map\n");
        for (uri, prefix) in self.get_all_namespaces() {
            let _ = writeln!(out, "  {:<16} => {}", prefix, uri);
        }
        out
    }
}

/// Check that `name` is a non-colonized XML name.
pub(crate) fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Register a namespace URI in the global context
///
/// Returns the prefix bound to the URI, which may differ from `prefix`
/// when the suggestion was already taken.
pub fn register_namespace(uri: &str, prefix: &str) -> XmpResult<String> {
    XmpContext::global().register_namespace(uri, prefix)
}

/// Check if a namespace URI is registered globally
pub fn is_namespace_registered(uri: &str) -> bool {
    XmpContext::global().get_namespace_prefix(uri).is_some()
}

/// Get the prefix for a namespace URI from the global registry
pub fn get_namespace_prefix(uri: &str) -> Option<String> {
    XmpContext::global().get_namespace_prefix(uri)
}

/// Get the URI for a namespace prefix from the global registry
pub fn get_namespace_uri(prefix: &str) -> Option<String> {
    XmpContext::global().get_namespace_uri(prefix)
}

/// Get all registered namespaces from the global registry
pub fn get_all_registered_namespaces() -> Vec<(String, String)> {
    XmpContext::global().namespaces().get_all_namespaces()
}

/// Get all built-in namespace URIs
pub fn get_builtin_namespace_uris() -> Vec<String> {
    ns::BUILTIN.iter().map(|(uri, _)| uri.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_map_new() {
        let map = NamespaceMap::new();
        assert!(map.has_uri(ns::XMP));
        assert!(map.has_uri(ns::DC));
        assert!(map.has_prefix("xmp"));
        assert_eq!(map.get_prefix(ns::EXIF_AUX), Some("aux"));
    }

    #[test]
    fn test_namespace_map_register() {
        let mut map = NamespaceMap::new();
        assert_eq!(map.register("http://example.com/ns", "ex").unwrap(), "ex");
        assert_eq!(map.get_prefix("http://example.com/ns"), Some("ex"));
        assert_eq!(map.get_uri("ex"), Some("http://example.com/ns"));
        assert_eq!(map.get_uri("ex:"), Some("http://example.com/ns"));
    }

    #[test]
    fn test_register_same_uri_is_idempotent() {
        let mut map = NamespaceMap::new();
        let first = map.register("http://example.com/ns", "ex").unwrap();
        let second = map.register("http://example.com/ns", "other").unwrap();
        assert_eq!(first, second);
        assert!(!map.has_prefix("other"));
    }

    #[test]
    fn test_register_taken_prefix_generates_variant() {
        let mut map = NamespaceMap::new();
        map.register("http://example.com/ns1", "ex").unwrap();
        let p2 = map.register("http://example.com/ns2", "ex").unwrap();
        let p3 = map.register("http://example.com/ns3", "ex").unwrap();
        assert_eq!(p2, "ex_1_");
        assert_eq!(p3, "ex_2_");
        assert_eq!(map.get_uri("ex_1_"), Some("http://example.com/ns2"));

        // A builtin prefix is never stolen
        let dc = map.register("http://example.com/not-dc", "dc:").unwrap();
        assert_ne!(dc, "dc");
        assert_eq!(map.get_uri("dc"), Some(ns::DC));
    }

    #[test]
    fn test_register_rejects_bad_input() {
        let mut map = NamespaceMap::new();
        assert!(matches!(
            map.register("", "ex"),
            Err(XmpError::BadSchema(_))
        ));
        assert!(map.register("http://example.com/ns", "").is_err());
        assert!(map.register("http://example.com/ns", "1abc").is_err());
        assert!(map.register("http://example.com/ns", "a b").is_err());
    }

    #[test]
    fn test_lookups_never_fail() {
        let map = NamespaceMap::new();
        assert_eq!(map.get_prefix("http://unknown.com/ns"), None);
        assert_eq!(map.get_uri("nope"), None);
    }

    #[test]
    fn test_dump_lists_sorted_prefixes() {
        let map = NamespaceMap::new();
        let dump = map.dump();
        let dc = dump.find("dc ").unwrap();
        let xmp = dump.find("xmp ").unwrap();
        assert!(dc < xmp);
    }

    #[test]
    fn test_get_global_namespace_prefix() {
        assert_eq!(get_namespace_prefix(ns::XMP), Some("xmp".to_string()));
        assert_eq!(get_namespace_prefix("http://unknown.com/ns"), None);

        let prefix = register_namespace("http://example.com/global-ns", "gex").unwrap();
        assert_eq!(
            get_namespace_prefix("http://example.com/global-ns"),
            Some(prefix)
        );
        assert!(is_namespace_registered("http://example.com/global-ns"));
    }
}
