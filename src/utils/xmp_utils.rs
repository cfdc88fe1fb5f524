//! Document-level helpers
//!
//! Merging documents, converting between arrays and delimited strings,
//! bulk removal, and path composition.

use crate::core::error::{XmpError, XmpResult};
use crate::core::metadata::XmpMeta;
use crate::core::namespace::ns;
use crate::core::node::{ArrayNode, ArrayType, Field, Node, StructureNode, X_DEFAULT};
use crate::core::xpath::{self, ArrayIndex};
use log::debug;
use std::sync::Arc;

/// Merge policy for [`XmpUtils::append_properties`] and [`XmpUtils::duplicate_subtree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppendOptions {
    /// Copy internal properties too, not only external ones
    pub include_internal: bool,
    /// Source values replace existing destination values
    pub replace_old_values: bool,
    /// An empty source value deletes the destination property
    pub delete_empty_values: bool,
}

impl AppendOptions {
    /// Include internal properties
    pub fn include_internal(mut self, value: bool) -> Self {
        self.include_internal = value;
        self
    }

    /// Replace existing values
    pub fn replace_old_values(mut self, value: bool) -> Self {
        self.replace_old_values = value;
        self
    }

    /// Delete destination properties whose source is empty
    pub fn delete_empty_values(mut self, value: bool) -> Self {
        self.delete_empty_values = value;
        self
    }
}

/// Scope of [`XmpUtils::remove_properties`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoveOptions {
    /// Remove internal properties too
    pub do_all_properties: bool,
    /// When removing a schema, also remove the actual properties of its aliases
    pub include_aliases: bool,
}

impl RemoveOptions {
    /// Remove internal properties too
    pub fn do_all_properties(mut self, value: bool) -> Self {
        self.do_all_properties = value;
        self
    }

    /// Follow aliases of the removed schema
    pub fn include_aliases(mut self, value: bool) -> Self {
        self.include_aliases = value;
        self
    }
}

/// Options for [`XmpUtils::separate_array_items`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeparateOptions {
    /// Type of an array created by the call
    pub array_type: ArrayType,
    /// Commas are part of values rather than separators
    pub allow_commas: bool,
}

impl Default for SeparateOptions {
    fn default() -> Self {
        Self {
            array_type: ArrayType::Unordered,
            allow_commas: false,
        }
    }
}

impl SeparateOptions {
    /// Type of a newly created array
    pub fn array_type(mut self, array_type: ArrayType) -> Self {
        self.array_type = array_type;
        self
    }

    /// Treat commas as part of values
    pub fn allow_commas(mut self, value: bool) -> Self {
        self.allow_commas = value;
        self
    }
}

/// Quote pairs recognised when separating, as (open, close)
const QUOTE_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\u{201C}', '\u{201D}'),
    ('\u{00AB}', '\u{00BB}'),
    ('\u{2018}', '\u{2019}'),
    ('\u{201E}', '\u{201C}'),
];

const DEFAULT_SEPARATOR: &str = "; ";
const DEFAULT_QUOTES: &str = "\"";

fn is_separator(c: char, allow_commas: bool) -> bool {
    match c {
        ';' | '\t' | '\r' | '\n' | '\u{FF1B}' | '\u{2028}' | '\u{2029}' => true,
        ',' | '\u{FF0C}' | '\u{3001}' => !allow_commas,
        _ => false,
    }
}

fn is_space(c: char) -> bool {
    c == ' ' || c == '\u{3000}'
}

/// Whether a top-level property is internal (application-managed) rather
/// than descriptive
pub fn is_internal_property(namespace: &str, name: &str) -> bool {
    match namespace {
        ns::DC => matches!(name, "format" | "language"),
        ns::XMP => matches!(
            name,
            "BaseURL" | "CreatorTool" | "Format" | "Locale" | "MetadataDate" | "ModifyDate"
        ),
        ns::PDF => matches!(
            name,
            "BaseURL" | "Creator" | "ModDate" | "PDFVersion" | "Producer"
        ),
        ns::TIFF => !matches!(name, "ImageDescription" | "Artist" | "Copyright"),
        ns::EXIF => name != "UserComment",
        ns::PHOTOSHOP => matches!(name, "ICCProfile" | "TextLayers"),
        ns::EXIF_EX | ns::EXIF_AUX | ns::CAMERA_RAW | ns::XMP_MM | ns::XMP_NOTE => true,
        _ => false,
    }
}

/// Document-level helpers
pub struct XmpUtils;

impl XmpUtils {
    /// Merge the properties of `source` into `dest`
    ///
    /// Without `replace_old_values`, existing destination values win at
    /// every level: structs merge per field, alt-text arrays gain missing
    /// languages, other arrays gain items they do not already contain.
    ///
    /// # Example
    ///
    /// ```rust
    /// use xmpengine::{ns, AppendOptions, XmpMeta, XmpUtils};
    ///
    /// let mut source = XmpMeta::new();
    /// source.set_property(ns::DC, "source", "scan").unwrap();
    /// let mut dest = XmpMeta::new();
    /// XmpUtils::append_properties(&source, &mut dest, AppendOptions::default()).unwrap();
    /// assert!(dest.has_property(ns::DC, "source"));
    /// ```
    pub fn append_properties(
        source: &XmpMeta,
        dest: &mut XmpMeta,
        options: AppendOptions,
    ) -> XmpResult<()> {
        source.context().check_alive()?;
        dest.context().check_alive()?;
        import_namespaces(source, dest)?;

        let root = dest.root_mut();
        for field in &source.root().fields {
            if !options.include_internal && is_internal_property(&field.namespace, &field.name) {
                continue;
            }
            merge_field(root, field, options);
        }
        Ok(())
    }

    /// Copy one subtree (or, with an empty `src_root`, a whole schema) of
    /// `source` into `dest`
    ///
    /// An empty `dest_root` means the same path as `src_root`.
    #[allow(clippy::too_many_arguments)]
    pub fn duplicate_subtree(
        source: &XmpMeta,
        dest: &mut XmpMeta,
        src_ns: &str,
        src_root: &str,
        dest_ns: &str,
        dest_root: &str,
        options: AppendOptions,
    ) -> XmpResult<()> {
        dest.context().check_alive()?;
        import_namespaces(source, dest)?;
        let src_schema = source.schema_uri(src_ns)?;
        let dest_schema = dest.schema_uri(if dest_ns.is_empty() { src_ns } else { dest_ns })?;

        if src_root.is_empty() {
            if !dest_root.is_empty() {
                return Err(XmpError::BadParam(
                    "A schema can only be copied to a schema".to_string(),
                ));
            }
            let fields: Vec<Field> = source
                .schema_properties(&src_schema)
                .map(|f| Field::new(dest_schema.clone(), f.name.clone(), f.node.clone()))
                .collect();
            let root = dest.root_mut();
            for field in &fields {
                merge_field(root, field, options);
            }
            return Ok(());
        }

        let (_, node) = source.find_node(&src_schema, src_root).ok_or_else(|| {
            XmpError::NotFound(format!("Source subtree '{}' does not exist", src_root))
        })?;
        let node = node.clone();
        let dest_path = if dest_root.is_empty() { src_root } else { dest_root };

        if options.delete_empty_values && node.is_empty_value() {
            return dest.delete_property(&dest_schema, dest_path);
        }
        match dest.find_node_mut(&dest_schema, dest_path) {
            Some(existing) if !options.replace_old_values => {
                merge_node(existing, &node, options);
                Ok(())
            }
            Some(existing) => {
                *existing = node;
                Ok(())
            }
            None => dest.put_node(&dest_schema, dest_path, node),
        }
    }

    /// Join the items of a simple array into one string
    ///
    /// Empty `separator` and `quotes` take the defaults `"; "` and `"`.
    /// `quotes` is one character, or an opening and a closing character.
    /// Items that would not survive [`XmpUtils::separate_array_items`]
    /// unchanged are quoted, with the closing quote doubled inside.
    pub fn catenate_array_items(
        meta: &XmpMeta,
        namespace: &str,
        array_name: &str,
        separator: &str,
        quotes: &str,
        allow_commas: bool,
    ) -> XmpResult<String> {
        let separator = if separator.is_empty() {
            DEFAULT_SEPARATOR
        } else {
            separator
        };
        if separator.chars().filter(|&c| is_separator(c, allow_commas)).count() != 1
            || !separator
                .chars()
                .all(|c| is_space(c) || is_separator(c, allow_commas))
        {
            return Err(XmpError::BadParam(format!(
                "Separator '{}' must be one separator character with optional spaces",
                separator.escape_debug()
            )));
        }
        let quotes = if quotes.is_empty() { DEFAULT_QUOTES } else { quotes };
        let (open, close) = match quotes.chars().collect::<Vec<_>>().as_slice() {
            [q] => (*q, *q),
            [o, c] => (*o, *c),
            _ => {
                return Err(XmpError::BadParam(
                    "Quotes must be one or two characters".to_string(),
                ))
            }
        };
        if !QUOTE_PAIRS.contains(&(open, close)) {
            return Err(XmpError::BadParam(format!(
                "Unrecognised quote pair '{}{}'",
                open, close
            )));
        }

        let schema = meta.schema_uri(namespace)?;
        let Some((_, node)) = meta.find_node(&schema, array_name) else {
            return Ok(String::new());
        };
        let array = node.as_array().ok_or_else(|| {
            XmpError::TypeMismatch(format!("'{}' is not an array", array_name))
        })?;

        let mut parts = Vec::with_capacity(array.len());
        for item in &array.items {
            let value = item.as_simple().map(|s| s.value.as_str()).ok_or_else(|| {
                XmpError::TypeMismatch(format!("'{}' has a non-simple item", array_name))
            })?;
            parts.push(quote_item(value, open, close, allow_commas));
        }
        Ok(parts.join(separator))
    }

    /// Split `text` into the items of a simple array, replacing its content
    ///
    /// The array is created with `options.array_type` if missing; an
    /// existing array keeps its type and qualifiers.
    pub fn separate_array_items(
        meta: &mut XmpMeta,
        namespace: &str,
        array_name: &str,
        options: SeparateOptions,
        text: &str,
    ) -> XmpResult<()> {
        let schema = meta.schema_uri(namespace)?;
        if let Some((_, existing)) = meta.find_node(&schema, array_name) {
            match existing.as_array() {
                Some(array) if array.items.iter().all(Node::is_simple) => {}
                _ => {
                    return Err(XmpError::TypeMismatch(format!(
                        "'{}' is not an array of simple values",
                        array_name
                    )))
                }
            }
        }

        let mut array = ArrayNode::new(options.array_type);
        for item in split_items(text, options.allow_commas) {
            array.append(Node::simple(item));
        }
        debug!("Separated {} items into {}", array.len(), array_name);
        meta.put_node(&schema, array_name, Node::Array(array))
    }

    /// Remove properties in bulk
    ///
    /// - `namespace` and `prop_name` empty: every property;
    /// - `prop_name` empty: every property of one schema;
    /// - otherwise the one named property (aliases resolved).
    ///
    /// Internal properties are kept unless `do_all_properties` is set.
    pub fn remove_properties(
        meta: &mut XmpMeta,
        namespace: &str,
        prop_name: &str,
        options: RemoveOptions,
    ) -> XmpResult<()> {
        meta.context().check_alive()?;
        let keep = |f: &Field| {
            !options.do_all_properties && is_internal_property(&f.namespace, &f.name)
        };

        if namespace.is_empty() {
            if !prop_name.is_empty() {
                return Err(XmpError::BadParam(
                    "A property name needs a namespace".to_string(),
                ));
            }
            meta.root_mut().fields.retain(|f| keep(f));
            return Ok(());
        }

        let schema = match meta.schema_uri(namespace) {
            Ok(schema) => schema,
            Err(XmpError::BadSchema(_)) => return Ok(()),
            Err(e) => return Err(e),
        };

        if !prop_name.is_empty() {
            let actual = {
                let aliases = meta.context().aliases();
                aliases
                    .resolve(&schema, prop_name)
                    .map(|info| (info.namespace.clone(), info.name.clone()))
            };
            let (actual_ns, actual_name) =
                actual.unwrap_or_else(|| (schema.clone(), prop_name.to_string()));
            if options.do_all_properties || !is_internal_property(&actual_ns, &actual_name) {
                meta.root_mut().remove_field(&actual_ns, &actual_name);
            }
            return Ok(());
        }

        let mut targets: Vec<(String, String)> = Vec::new();
        if options.include_aliases {
            let aliases = meta.context().aliases();
            for (_, info) in aliases.aliases_in(&schema) {
                targets.push((info.namespace, info.name));
            }
        }
        meta.root_mut().fields.retain(|f| {
            let in_scope = f.namespace == schema
                || targets
                    .iter()
                    .any(|(uri, name)| *uri == f.namespace && *name == f.name);
            !in_scope || keep(f)
        });
        Ok(())
    }

    /// Compose `array[n]` or `array[last()]`
    pub fn compose_array_item_path(
        meta: &XmpMeta,
        namespace: &str,
        array_name: &str,
        index: impl Into<ArrayIndex>,
    ) -> XmpResult<String> {
        let schema = meta.schema_uri(namespace)?;
        xpath::compose_array_item_path(
            &meta.context().namespaces(),
            &schema,
            array_name,
            index.into(),
        )
    }

    /// Compose `struct/prefix:field`
    pub fn compose_struct_field_path(
        meta: &XmpMeta,
        namespace: &str,
        struct_name: &str,
        field_ns: &str,
        field_name: &str,
    ) -> XmpResult<String> {
        let schema = meta.schema_uri(namespace)?;
        let field_ns = meta.schema_uri(field_ns)?;
        xpath::compose_struct_field_path(
            &meta.context().namespaces(),
            &schema,
            struct_name,
            &field_ns,
            field_name,
        )
    }

    /// Compose `prop/?prefix:qualifier`
    pub fn compose_qualifier_path(
        meta: &XmpMeta,
        namespace: &str,
        prop_name: &str,
        qual_ns: &str,
        qual_name: &str,
    ) -> XmpResult<String> {
        let schema = meta.schema_uri(namespace)?;
        let qual_ns = meta.schema_uri(qual_ns)?;
        xpath::compose_qualifier_path(
            &meta.context().namespaces(),
            &schema,
            prop_name,
            &qual_ns,
            qual_name,
        )
    }

    /// Compose `array[?xml:lang="lang"]`
    pub fn compose_lang_selector(
        meta: &XmpMeta,
        namespace: &str,
        array_name: &str,
        lang: &str,
    ) -> XmpResult<String> {
        let schema = meta.schema_uri(namespace)?;
        xpath::compose_lang_selector(&meta.context().namespaces(), &schema, array_name, lang)
    }

    /// Compose `array[prefix:field="value"]`; the first matching item is selected
    pub fn compose_field_selector(
        meta: &XmpMeta,
        namespace: &str,
        array_name: &str,
        field_ns: &str,
        field_name: &str,
        value: &str,
    ) -> XmpResult<String> {
        let schema = meta.schema_uri(namespace)?;
        let field_ns = meta.schema_uri(field_ns)?;
        xpath::compose_field_selector(
            &meta.context().namespaces(),
            &schema,
            array_name,
            &field_ns,
            field_name,
            value,
        )
    }
}

/// Make every namespace of `source` known to the context of `dest`
fn import_namespaces(source: &XmpMeta, dest: &XmpMeta) -> XmpResult<()> {
    if Arc::ptr_eq(source.context(), dest.context()) {
        return Ok(());
    }
    let known = source.context().namespaces().get_all_namespaces();
    for (uri, prefix) in known {
        if dest.context().get_namespace_prefix(&uri).is_none() {
            dest.context().register_namespace(&uri, &prefix)?;
        }
    }
    Ok(())
}

fn merge_field(dest: &mut StructureNode, field: &Field, options: AppendOptions) {
    if options.delete_empty_values && field.node.is_empty_value() {
        dest.remove_field(&field.namespace, &field.name);
        return;
    }
    match dest.get_field_mut(&field.namespace, &field.name) {
        None => dest.fields.push(field.clone()),
        Some(existing) if options.replace_old_values => *existing = field.node.clone(),
        Some(existing) => merge_node(existing, &field.node, options),
    }
}

/// Merge `source` into an existing `dest` without replacing values
fn merge_node(dest: &mut Node, source: &Node, options: AppendOptions) {
    match (dest, source) {
        (Node::Structure(d), Node::Structure(s)) => {
            for field in &s.fields {
                merge_field(d, field, options);
            }
        }
        (Node::Array(d), Node::Array(s)) if d.array_type == ArrayType::AltText => {
            for item in &s.items {
                let Some(lang) = item.lang() else { continue };
                if d.find_lang(lang).is_some() {
                    continue;
                }
                if lang.eq_ignore_ascii_case(X_DEFAULT) {
                    d.items.insert(0, item.clone());
                } else {
                    d.append(item.clone());
                }
            }
        }
        (Node::Array(d), Node::Array(s)) => {
            for item in &s.items {
                if !d.items.contains(item) {
                    d.append(item.clone());
                }
            }
        }
        // Simple values, and kind mismatches, keep the destination
        _ => {}
    }
}

fn quote_item(value: &str, open: char, close: char, allow_commas: bool) -> String {
    let needs_quotes = value.is_empty()
        || value.starts_with(is_space)
        || value.ends_with(is_space)
        || value
            .chars()
            .zip(value.chars().skip(1))
            .any(|(a, b)| is_space(a) && is_space(b))
        || value.chars().any(|c| {
            is_separator(c, allow_commas)
                || c == open
                || c == close
                || QUOTE_PAIRS.iter().any(|&(o, _)| o == c)
        });
    if !needs_quotes {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push(open);
    for c in value.chars() {
        out.push(c);
        if c == close {
            out.push(close);
        }
    }
    out.push(close);
    out
}

fn split_items(text: &str, allow_commas: bool) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut items = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if is_space(c) || is_separator(c, allow_commas) {
            i += 1;
            continue;
        }

        if let Some(&(_, close)) = QUOTE_PAIRS.iter().find(|&&(open, _)| open == c) {
            let mut item = String::new();
            i += 1;
            while i < chars.len() {
                if chars[i] == close {
                    if chars.get(i + 1) == Some(&close) {
                        item.push(close);
                        i += 2;
                        continue;
                    }
                    i += 1;
                    break;
                }
                item.push(chars[i]);
                i += 1;
            }
            items.push(item);
            continue;
        }

        let start = i;
        while i < chars.len() {
            let c = chars[i];
            if is_separator(c, allow_commas) {
                break;
            }
            if is_space(c) && chars.get(i + 1).copied().is_some_and(is_space) {
                break;
            }
            i += 1;
        }
        let item: String = chars[start..i].iter().collect();
        items.push(item.trim_end_matches(is_space).to_string());
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::XmpContext;
    use pretty_assertions::assert_eq;

    fn fresh() -> XmpMeta {
        XmpMeta::with_context(XmpContext::new())
    }

    fn set_items(meta: &mut XmpMeta, items: &[&str]) {
        for item in items {
            meta.append_array_item(ns::DC, "subject", ArrayType::Unordered, *item)
                .unwrap();
        }
    }

    fn items(meta: &XmpMeta) -> Vec<String> {
        (1..=meta.count_array_items(ns::DC, "subject"))
            .map(|i| {
                meta.get_array_item(ns::DC, "subject", i)
                    .and_then(|p| p.as_str().map(str::to_string))
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_catenate_and_separate_round_trip() {
        let original = ["cat", "dog food", "a;b", "say \"hi\"", "", " padded"];
        let mut meta = fresh();
        set_items(&mut meta, &original);

        let text = XmpUtils::catenate_array_items(&meta, ns::DC, "subject", "", "", false)
            .unwrap();
        assert_eq!(
            text,
            "cat; dog food; \"a;b\"; \"say \"\"hi\"\"\"; \"\"; \" padded\""
        );

        let mut back = fresh();
        XmpUtils::separate_array_items(&mut back, ns::DC, "subject", SeparateOptions::default(), &text)
            .unwrap();
        assert_eq!(items(&back), original);
    }

    #[test]
    fn test_commas_round_trip_when_allowed() {
        let mut meta = fresh();
        set_items(&mut meta, &["Smith, John", "Doe, Jane"]);
        for allow in [false, true] {
            let text =
                XmpUtils::catenate_array_items(&meta, ns::DC, "subject", "; ", "", allow)
                    .unwrap();
            let mut back = fresh();
            XmpUtils::separate_array_items(
                &mut back,
                ns::DC,
                "subject",
                SeparateOptions::default().allow_commas(allow),
                &text,
            )
            .unwrap();
            assert_eq!(items(&back), ["Smith, John", "Doe, Jane"]);
        }
    }

    #[test]
    fn test_separate_conventional_delimiters() {
        let mut meta = fresh();
        XmpUtils::separate_array_items(
            &mut meta,
            ns::DC,
            "subject",
            SeparateOptions::default(),
            "one, two;three\tfour\nfive  six  \u{201C}se;ven\u{201D} \u{00AB}eight\u{00BB}",
        )
        .unwrap();
        assert_eq!(
            items(&meta),
            ["one", "two", "three", "four", "five", "six", "se;ven", "eight"]
        );
    }

    #[test]
    fn test_catenate_errors() {
        let mut meta = fresh();
        meta.set_property(ns::DC, "source", "x").unwrap();
        assert!(matches!(
            XmpUtils::catenate_array_items(&meta, ns::DC, "source", "", "", false),
            Err(XmpError::TypeMismatch(_))
        ));
        assert!(matches!(
            XmpUtils::catenate_array_items(&meta, ns::DC, "subject", "ab", "", false),
            Err(XmpError::BadParam(_))
        ));
        assert!(matches!(
            XmpUtils::catenate_array_items(&meta, ns::DC, "subject", "", "'", false),
            Err(XmpError::BadParam(_))
        ));
        assert!(matches!(
            XmpUtils::catenate_array_items(&meta, ns::DC, "subject", "", "\u{201D}\u{201C}", false),
            Err(XmpError::BadParam(_))
        ));
        assert_eq!(
            XmpUtils::catenate_array_items(&meta, ns::DC, "subject", "", "", false).unwrap(),
            ""
        );
    }

    #[test]
    fn test_alternate_quote_pair_round_trip() {
        let mut meta = fresh();
        set_items(&mut meta, &["a;b", "c"]);
        let text =
            XmpUtils::catenate_array_items(&meta, ns::DC, "subject", "", "\u{00AB}\u{00BB}", false)
                .unwrap();
        assert_eq!(text, "\u{00AB}a;b\u{00BB}; c");

        let mut back = fresh();
        XmpUtils::separate_array_items(&mut back, ns::DC, "subject", SeparateOptions::default(), &text)
            .unwrap();
        assert_eq!(items(&back), ["a;b", "c"]);
    }

    #[test]
    fn test_mixed_space_runs_are_quoted() {
        let original = ["a \u{3000}b", "c\u{3000} d", "e"];
        let mut meta = fresh();
        set_items(&mut meta, &original);
        let text = XmpUtils::catenate_array_items(&meta, ns::DC, "subject", "", "", false)
            .unwrap();
        assert_eq!(text, "\"a \u{3000}b\"; \"c\u{3000} d\"; e");

        let mut back = fresh();
        XmpUtils::separate_array_items(&mut back, ns::DC, "subject", SeparateOptions::default(), &text)
            .unwrap();
        assert_eq!(items(&back), original);
    }

    #[test]
    fn test_quoted_items_separated_by_single_space() {
        let mut meta = fresh();
        XmpUtils::separate_array_items(
            &mut meta,
            ns::DC,
            "subject",
            SeparateOptions::default(),
            "\"one\" \u{00AB}two\u{00BB}\"three\"",
        )
        .unwrap();
        assert_eq!(items(&meta), ["one", "two", "three"]);
    }

    #[test]
    fn test_append_properties_merge_policy() {
        let ctx = XmpContext::new();
        let mut source = XmpMeta::with_context(ctx.clone());
        source.set_property(ns::DC, "source", "new").unwrap();
        source.set_property(ns::XMP, "CreatorTool", "internal").unwrap();
        source
            .append_array_item(ns::DC, "subject", ArrayType::Unordered, "b")
            .unwrap();
        source
            .set_localized_text(ns::DC, "title", "", "fr", "Bonjour")
            .unwrap();

        let mut dest = XmpMeta::with_context(ctx);
        dest.set_property(ns::DC, "source", "old").unwrap();
        dest.append_array_item(ns::DC, "subject", ArrayType::Unordered, "a")
            .unwrap();
        dest.set_localized_text(ns::DC, "title", "", "x-default", "Hello")
            .unwrap();

        XmpUtils::append_properties(&source, &mut dest, AppendOptions::default()).unwrap();
        assert_eq!(dest.get_property(ns::DC, "source").unwrap().as_str(), Some("old"));
        assert!(!dest.has_property(ns::XMP, "CreatorTool"));
        assert_eq!(dest.count_array_items(ns::DC, "subject"), 2);
        let (value, _) = dest.get_localized_text(ns::DC, "title", "", "fr").unwrap();
        assert_eq!(value, "Bonjour");
        let (value, _) = dest.get_localized_text(ns::DC, "title", "", "x-default").unwrap();
        assert_eq!(value, "Hello");

        let replace = AppendOptions::default()
            .replace_old_values(true)
            .include_internal(true);
        XmpUtils::append_properties(&source, &mut dest, replace).unwrap();
        assert_eq!(dest.get_property(ns::DC, "source").unwrap().as_str(), Some("new"));
        assert!(dest.has_property(ns::XMP, "CreatorTool"));
        assert_eq!(dest.count_array_items(ns::DC, "subject"), 1);
    }

    #[test]
    fn test_append_delete_empty() {
        let mut source = fresh();
        source.set_property(ns::DC, "source", "").unwrap();
        let mut dest = fresh();
        dest.set_property(ns::DC, "source", "keep me?").unwrap();
        XmpUtils::append_properties(
            &source,
            &mut dest,
            AppendOptions::default().delete_empty_values(true),
        )
        .unwrap();
        assert!(!dest.has_property(ns::DC, "source"));
    }

    #[test]
    fn test_append_across_contexts_imports_namespaces() {
        let source_ctx = XmpContext::new();
        source_ctx
            .register_namespace("http://ns.example.com/custom/", "custom")
            .unwrap();
        let mut source = XmpMeta::with_context(source_ctx);
        source
            .set_property("http://ns.example.com/custom/", "thing", "1")
            .unwrap();
        let mut dest = fresh();
        XmpUtils::append_properties(&source, &mut dest, AppendOptions::default()).unwrap();
        assert_eq!(
            dest.get_property("custom", "thing").unwrap().as_str(),
            Some("1")
        );
    }

    #[test]
    fn test_duplicate_subtree() {
        let mut source = fresh();
        source
            .set_struct_field(ns::EXIF, "Flash", ns::EXIF, "Fired", "True")
            .unwrap();
        source.set_property(ns::DC, "source", "s").unwrap();

        let mut dest = XmpMeta::with_context(source.context().clone());
        XmpUtils::duplicate_subtree(&source, &mut dest, ns::EXIF, "Flash", ns::EXIF, "", AppendOptions::default())
            .unwrap();
        assert!(dest.has_struct_field(ns::EXIF, "Flash", ns::EXIF, "Fired"));

        XmpUtils::duplicate_subtree(&source, &mut dest, ns::DC, "", ns::XMP, "", AppendOptions::default())
            .unwrap();
        assert_eq!(dest.get_property(ns::XMP, "source").unwrap().as_str(), Some("s"));

        assert!(matches!(
            XmpUtils::duplicate_subtree(&source, &mut dest, ns::DC, "nope", "", "", AppendOptions::default()),
            Err(XmpError::NotFound(_))
        ));
    }

    #[test]
    fn test_remove_properties() {
        let mut meta = fresh();
        meta.set_property(ns::DC, "source", "s").unwrap();
        meta.set_property(ns::DC, "format", "image/png").unwrap();
        meta.set_property(ns::XMP, "CreatorTool", "t").unwrap();
        meta.set_property(ns::XMP, "Label", "l").unwrap();

        XmpUtils::remove_properties(&mut meta, ns::DC, "", RemoveOptions::default()).unwrap();
        assert!(!meta.has_property(ns::DC, "source"));
        assert!(meta.has_property(ns::DC, "format"));

        // tiff:Software is an alias of xmp:CreatorTool, which is internal
        XmpUtils::remove_properties(&mut meta, ns::TIFF, "Software", RemoveOptions::default())
            .unwrap();
        assert!(meta.has_property(ns::XMP, "CreatorTool"));
        XmpUtils::remove_properties(
            &mut meta,
            ns::TIFF,
            "",
            RemoveOptions::default().include_aliases(true).do_all_properties(true),
        )
        .unwrap();
        assert!(!meta.has_property(ns::XMP, "CreatorTool"));

        XmpUtils::remove_properties(&mut meta, "", "", RemoveOptions::default().do_all_properties(true))
            .unwrap();
        assert!(meta.is_empty());
    }

    #[test]
    fn test_composers() {
        let meta = fresh();
        assert_eq!(
            XmpUtils::compose_array_item_path(&meta, ns::DC, "creator", 2usize).unwrap(),
            "creator[2]"
        );
        assert_eq!(
            XmpUtils::compose_array_item_path(&meta, ns::DC, "creator", ArrayIndex::Last)
                .unwrap(),
            "creator[last()]"
        );
        assert_eq!(
            XmpUtils::compose_struct_field_path(&meta, ns::EXIF, "Flash", ns::EXIF, "Fired")
                .unwrap(),
            "Flash/exif:Fired"
        );
        assert_eq!(
            XmpUtils::compose_qualifier_path(&meta, ns::DC, "title", ns::XML, "lang").unwrap(),
            "title/?xml:lang"
        );
        assert_eq!(
            XmpUtils::compose_lang_selector(&meta, ns::DC, "title", "en-US").unwrap(),
            "title[?xml:lang=\"en-US\"]"
        );
        assert!(matches!(
            XmpUtils::compose_struct_field_path(&meta, ns::EXIF, "Flash", "nope:", "x"),
            Err(XmpError::BadSchema(_))
        ));
    }
}
