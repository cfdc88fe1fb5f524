//! XMP XML/RDF serializer
//!
//! This module provides functionality for serializing XMP metadata to XML/RDF format.
//!
//! Output is canonical RDF/XML: one `rdf:Description` per schema in the
//! verbose layout, or a single one carrying simple properties as attributes
//! in the compact layout. A full packet adds the `xpacket` wrapper and
//! trailing whitespace padding for in-place updates.

use crate::core::alias::AliasMap;
use crate::core::context::XmpContext;
use crate::core::error::{XmpError, XmpResult};
use crate::core::metadata::XmpMeta;
use crate::core::namespace::{ns, NamespaceMap};
use crate::core::node::{Field, Node};
use crate::core::parser::CharEncoding;
use log::debug;
use quick_xml::escape::{escape, partial_escape};

/// Packet id written in the `xpacket` header
pub const PACKET_ID: &str = "W5M0MpCehiHzreSzNTczkc9d";

/// Default padding, in characters
pub const DEFAULT_PADDING: usize = 2048;

/// Extra padding reserved by [`SerializeOptions::include_thumbnail_pad`]
pub const THUMBNAIL_PADDING: usize = 10000;

const MAX_PADDING_LINE: usize = 100;

/// Options controlling serialization
///
/// # Example
///
/// ```rust
/// use xmpengine::SerializeOptions;
///
/// let options = SerializeOptions::default()
///     .use_compact_format(true)
///     .padding(512);
/// assert!(options.use_compact_format);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Leave out the `<?xpacket ...?>` wrapper and padding
    pub omit_packet_wrapper: bool,
    /// Mark the packet read-only (`end="r"`)
    pub read_only_packet: bool,
    /// Write simple properties as attributes of one `rdf:Description`
    pub use_compact_format: bool,
    /// Reserve room for a thumbnail in the padding
    pub include_thumbnail_pad: bool,
    /// Treat `padding` as the exact total packet length in bytes
    pub exact_packet_length: bool,
    /// Comment each actual property with the aliases that map to it
    pub write_alias_comments: bool,
    /// Padding in characters, or the total length with `exact_packet_length`
    pub padding: Option<usize>,
    /// One level of indentation
    pub indent: String,
    /// Line terminator
    pub newline: String,
    /// Indentation levels added to every line
    pub base_indent: usize,
    /// Encoding used by [`XmpMeta::serialize_to_bytes`]
    pub encoding: CharEncoding,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            omit_packet_wrapper: false,
            read_only_packet: false,
            use_compact_format: false,
            include_thumbnail_pad: false,
            exact_packet_length: false,
            write_alias_comments: false,
            padding: None,
            indent: " ".to_string(),
            newline: "\n".to_string(),
            base_indent: 0,
            encoding: CharEncoding::Utf8,
        }
    }
}

impl SerializeOptions {
    /// Set whether the packet wrapper is omitted
    pub fn omit_packet_wrapper(mut self, value: bool) -> Self {
        self.omit_packet_wrapper = value;
        self
    }

    /// Set whether the packet is marked read-only
    pub fn read_only_packet(mut self, value: bool) -> Self {
        self.read_only_packet = value;
        self
    }

    /// Set whether the compact layout is used
    pub fn use_compact_format(mut self, value: bool) -> Self {
        self.use_compact_format = value;
        self
    }

    /// Set whether thumbnail padding is reserved
    pub fn include_thumbnail_pad(mut self, value: bool) -> Self {
        self.include_thumbnail_pad = value;
        self
    }

    /// Request an exact total packet length of `length` bytes
    pub fn exact_packet_length(mut self, length: usize) -> Self {
        self.exact_packet_length = true;
        self.padding = Some(length);
        self
    }

    /// Set whether alias comments are written
    pub fn write_alias_comments(mut self, value: bool) -> Self {
        self.write_alias_comments = value;
        self
    }

    /// Set the padding in characters
    pub fn padding(mut self, padding: usize) -> Self {
        self.padding = Some(padding);
        self
    }

    /// Set the indentation unit
    pub fn indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    /// Set the line terminator
    pub fn newline(mut self, newline: impl Into<String>) -> Self {
        self.newline = newline.into();
        self
    }

    /// Set the number of indentation levels added to every line
    pub fn base_indent(mut self, levels: usize) -> Self {
        self.base_indent = levels;
        self
    }

    /// Set the byte encoding
    pub fn encoding(mut self, encoding: CharEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Reject mutually exclusive combinations
    pub fn validate(&self) -> XmpResult<()> {
        let conflict = |what: &str| Err(XmpError::BadOptions(what.to_string()));
        if self.exact_packet_length {
            if self.omit_packet_wrapper {
                return conflict("Exact packet length requires the packet wrapper");
            }
            if self.include_thumbnail_pad {
                return conflict("Exact packet length excludes thumbnail padding");
            }
            if self.padding.is_none() {
                return conflict("Exact packet length requires a length");
            }
        }
        if self.read_only_packet {
            if self.omit_packet_wrapper {
                return conflict("A read-only packet requires the packet wrapper");
            }
            if self.include_thumbnail_pad {
                return conflict("A read-only packet excludes thumbnail padding");
            }
        }
        if self.omit_packet_wrapper && (self.padding.is_some() || self.include_thumbnail_pad) {
            return conflict("Padding requires the packet wrapper");
        }
        if !self.indent.chars().all(|c| c == ' ' || c == '\t') {
            return conflict("Indent must be spaces or tabs");
        }
        if !matches!(self.newline.as_str(), "\n" | "\r\n" | "\r") {
            return conflict("Newline must be LF, CRLF or CR");
        }
        Ok(())
    }
}

/// Serializer for XMP Packets
pub struct XmpSerializer<'a> {
    ctx: &'a XmpContext,
    options: &'a SerializeOptions,
}

impl<'a> XmpSerializer<'a> {
    /// Create a serializer, checking `options` for conflicts first
    pub fn new(ctx: &'a XmpContext, options: &'a SerializeOptions) -> XmpResult<Self> {
        options.validate()?;
        Ok(Self { ctx, options })
    }

    /// Serialize to text. Exact lengths are counted in the configured encoding.
    pub fn serialize(&self, meta: &XmpMeta) -> XmpResult<String> {
        let body = self.serialize_rdf(meta)?;
        if self.options.omit_packet_wrapper {
            return Ok(body);
        }
        self.wrap_packet(body)
    }

    /// Serialize to bytes in the configured encoding
    pub fn serialize_to_bytes(&self, meta: &XmpMeta) -> XmpResult<Vec<u8>> {
        let text = self.serialize(meta)?;
        Ok(self.options.encoding.encode(&text))
    }

    fn wrap_packet(&self, body: String) -> XmpResult<String> {
        let opts = self.options;
        let nl = opts.newline.as_str();
        let header = format!(
            "{}<?xpacket begin=\"\u{feff}\" id=\"{}\"?>{}",
            opts.indent.repeat(opts.base_indent),
            PACKET_ID,
            nl
        );
        let trailer = format!(
            "<?xpacket end=\"{}\"?>",
            if opts.read_only_packet { "r" } else { "w" }
        );
        let unpadded = format!("{}{}{}{}", header, body, nl, trailer);

        let padding_chars = if opts.exact_packet_length {
            let available = opts.padding.unwrap_or_default();
            let needed = opts.encoding.encode(&unpadded).len();
            if needed > available {
                return Err(XmpError::CapacityExceeded { needed, available });
            }
            let unit = opts.encoding.unit_size();
            if (available - needed) % unit != 0 {
                return Err(XmpError::BadParam(format!(
                    "Packet length {} is not a multiple of the {}-byte code unit",
                    available, unit
                )));
            }
            (available - needed) / unit
        } else {
            let mut padding = opts.padding.unwrap_or(DEFAULT_PADDING);
            if opts.include_thumbnail_pad {
                padding += THUMBNAIL_PADDING;
            }
            padding
        };
        debug!("Padding packet with {} characters", padding_chars);

        let mut packet = String::with_capacity(unpadded.len() + padding_chars);
        packet.push_str(&header);
        packet.push_str(&body);
        packet.push_str(nl);
        packet.push_str(&padding_text(padding_chars, nl));
        packet.push_str(&trailer);
        Ok(packet)
    }

    /// Serialize the `x:xmpmeta` element
    fn serialize_rdf(&self, meta: &XmpMeta) -> XmpResult<String> {
        let namespaces = self.ctx.namespaces();
        let aliases = self
            .options
            .write_alias_comments
            .then(|| self.ctx.aliases());
        let writer = RdfWriter {
            options: self.options,
            namespaces: &namespaces,
            aliases: aliases.as_deref(),
            about: escape(meta.about_uri().unwrap_or_default()).into_owned(),
            out: String::new(),
        };
        writer.write(meta)
    }
}

/// Padding of `len` characters in lines of at most 100 spaces
fn padding_text(mut len: usize, newline: &str) -> String {
    let mut out = String::with_capacity(len);
    while len > MAX_PADDING_LINE {
        let spaces = (len - newline.len()).min(MAX_PADDING_LINE);
        out.push_str(&" ".repeat(spaces));
        out.push_str(newline);
        len -= spaces + newline.len();
    }
    out.push_str(&" ".repeat(len));
    out
}

fn escape_attr(value: &str) -> String {
    escape(value)
        .replace('\t', "&#x9;")
        .replace('\n', "&#xA;")
        .replace('\r', "&#xD;")
}

struct RdfWriter<'w> {
    options: &'w SerializeOptions,
    namespaces: &'w NamespaceMap,
    aliases: Option<&'w AliasMap>,
    about: String,
    out: String,
}

impl RdfWriter<'_> {
    fn write(mut self, meta: &XmpMeta) -> XmpResult<String> {
        self.line(
            0,
            &format!(
                "<x:xmpmeta xmlns:x=\"{}\" x:xmptk=\"{} {}\">",
                ns::X,
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ),
        );
        self.line(1, &format!("<rdf:RDF xmlns:rdf=\"{}\">", ns::RDF));

        let schemas = meta.schemas();
        if schemas.is_empty() {
            self.line(2, &format!("<rdf:Description rdf:about=\"{}\"/>", self.about));
        } else if self.options.use_compact_format {
            let fields: Vec<&Field> = meta.root().fields.iter().collect();
            self.write_description(&fields)?;
        } else {
            for schema in schemas {
                let fields: Vec<&Field> = meta.schema_properties(schema).collect();
                self.write_description(&fields)?;
            }
        }

        self.line(1, "</rdf:RDF>");
        self.out.push_str(&self.options.indent.repeat(self.options.base_indent));
        self.out.push_str("</x:xmpmeta>");
        Ok(self.out)
    }

    fn write_description(&mut self, fields: &[&Field]) -> XmpResult<()> {
        let mut used = Vec::new();
        for field in fields {
            collect_namespaces(&field.namespace, &field.node, &mut used);
        }
        let mut open = format!("<rdf:Description rdf:about=\"{}\"", self.about);
        for uri in &used {
            let prefix = self.prefix(uri)?;
            open.push_str(&format!(" xmlns:{}=\"{}\"", prefix, escape_attr(uri)));
        }

        let compact = self.options.use_compact_format;
        let (attributes, elements): (Vec<&Field>, Vec<&Field>) = fields
            .iter()
            .copied()
            .partition(|f| compact && is_attribute_form(&f.node));
        for field in &attributes {
            if let Some(value) = field.node.value() {
                open.push_str(&format!(" {}=\"{}\"", self.qname(field)?, escape_attr(value)));
            }
        }

        if elements.is_empty() {
            open.push_str("/>");
            self.line(2, &open);
            return Ok(());
        }
        open.push('>');
        self.line(2, &open);
        for field in elements {
            let name = self.qname(field)?;
            self.write_alias_comment(field)?;
            self.write_property(3, &name, &field.node)?;
        }
        self.line(2, "</rdf:Description>");
        Ok(())
    }

    fn write_alias_comment(&mut self, field: &Field) -> XmpResult<()> {
        let Some(aliases) = self.aliases else {
            return Ok(());
        };
        let names: Vec<String> = aliases
            .aliases_of(&field.namespace, &field.name)
            .into_iter()
            .filter_map(|(uri, name)| {
                self.namespaces
                    .get_prefix(&uri)
                    .map(|prefix| format!("{}:{}", prefix, name))
            })
            .collect();
        if !names.is_empty() {
            self.line(3, &format!("<!-- aliases: {} -->", names.join(", ")));
        }
        Ok(())
    }

    /// Write a node with its qualifiers
    fn write_property(&mut self, depth: usize, name: &str, node: &Node) -> XmpResult<()> {
        let lang_attr = node
            .lang()
            .map(|lang| format!(" xml:lang=\"{}\"", escape_attr(lang)))
            .unwrap_or_default();
        let qualifiers: Vec<&Field> = node
            .qualifiers()
            .iter()
            .filter(|q| !q.is(ns::XML, "lang"))
            .collect();
        if qualifiers.is_empty() {
            return self.write_value(depth, name, node, &lang_attr);
        }

        self.line(depth, &format!("<{}{} rdf:parseType=\"Resource\">", name, lang_attr));
        self.write_value(depth + 1, "rdf:value", node, "")?;
        for qualifier in qualifiers {
            let qname = self.qname(qualifier)?;
            self.write_property(depth + 1, &qname, &qualifier.node)?;
        }
        self.line(depth, &format!("</{}>", name));
        Ok(())
    }

    /// Write a node's value, ignoring its qualifiers
    fn write_value(&mut self, depth: usize, name: &str, node: &Node, attrs: &str) -> XmpResult<()> {
        match node {
            Node::Simple(simple) if simple.is_uri => {
                self.line(
                    depth,
                    &format!("<{}{} rdf:resource=\"{}\"/>", name, attrs, escape_attr(&simple.value)),
                );
            }
            Node::Simple(simple) if simple.value.is_empty() => {
                self.line(depth, &format!("<{}{}/>", name, attrs));
            }
            Node::Simple(simple) => {
                self.line(
                    depth,
                    &format!("<{0}{1}>{2}</{0}>", name, attrs, partial_escape(&simple.value)),
                );
            }
            Node::Array(array) => {
                let container = format!("rdf:{}", array.array_type.rdf_type());
                self.line(depth, &format!("<{}{}>", name, attrs));
                if array.items.is_empty() {
                    self.line(depth + 1, &format!("<{}/>", container));
                } else {
                    self.line(depth + 1, &format!("<{}>", container));
                    for item in &array.items {
                        self.write_property(depth + 2, "rdf:li", item)?;
                    }
                    self.line(depth + 1, &format!("</{}>", container));
                }
                self.line(depth, &format!("</{}>", name));
            }
            Node::Structure(structure) if structure.fields.is_empty() => {
                self.line(depth, &format!("<{}{} rdf:parseType=\"Resource\"/>", name, attrs));
            }
            Node::Structure(structure) => {
                self.line(depth, &format!("<{}{} rdf:parseType=\"Resource\">", name, attrs));
                for field in &structure.fields {
                    let qname = self.qname(field)?;
                    self.write_property(depth + 1, &qname, &field.node)?;
                }
                self.line(depth, &format!("</{}>", name));
            }
        }
        Ok(())
    }

    fn prefix(&self, uri: &str) -> XmpResult<&str> {
        self.namespaces
            .get_prefix(uri)
            .ok_or_else(|| XmpError::BadSchema(format!("Unregistered namespace '{}'", uri)))
    }

    fn qname(&self, field: &Field) -> XmpResult<String> {
        Ok(format!("{}:{}", self.prefix(&field.namespace)?, field.name))
    }

    fn line(&mut self, depth: usize, text: &str) {
        let levels = self.options.base_indent + depth;
        self.out.push_str(&self.options.indent.repeat(levels));
        self.out.push_str(text);
        self.out.push_str(&self.options.newline);
    }
}

/// Simple, unqualified, non-URI values may be written as attributes
fn is_attribute_form(node: &Node) -> bool {
    matches!(node, Node::Simple(s) if !s.is_uri && s.qualifiers.is_empty())
}

/// Namespaces used by a property subtree, excluding rdf and xml
fn collect_namespaces(namespace: &str, node: &Node, used: &mut Vec<String>) {
    if namespace != ns::RDF && namespace != ns::XML && !used.iter().any(|u| u == namespace) {
        used.push(namespace.to_string());
    }
    collect_children(node, used);
}

fn collect_children(node: &Node, used: &mut Vec<String>) {
    for qualifier in node.qualifiers() {
        collect_namespaces(&qualifier.namespace, &qualifier.node, used);
    }
    match node {
        Node::Simple(_) => {}
        Node::Array(array) => array.items.iter().for_each(|item| collect_children(item, used)),
        Node::Structure(structure) => {
            for field in &structure.fields {
                collect_namespaces(&field.namespace, &field.node, used);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::ArrayType;
    use pretty_assertions::assert_eq;

    fn sample() -> XmpMeta {
        let mut meta = XmpMeta::with_context(XmpContext::new());
        meta.set_property(ns::XMP, "CreatorTool", "Tool <1> & \"2\"").unwrap();
        meta.append_array_item(ns::DC, "subject", ArrayType::Unordered, "cat")
            .unwrap();
        meta.set_localized_text(ns::DC, "title", "", "x-default", "Hello")
            .unwrap();
        meta.set_struct_field(ns::EXIF, "Flash", ns::EXIF, "Fired", "True")
            .unwrap();
        meta
    }

    #[test]
    fn test_option_conflicts() {
        let ctx = XmpContext::new();
        for options in [
            SerializeOptions::default()
                .exact_packet_length(4096)
                .omit_packet_wrapper(true),
            SerializeOptions::default()
                .exact_packet_length(4096)
                .include_thumbnail_pad(true),
            SerializeOptions::default()
                .read_only_packet(true)
                .omit_packet_wrapper(true),
            SerializeOptions::default()
                .padding(10)
                .omit_packet_wrapper(true),
            SerializeOptions::default().newline("x"),
        ] {
            assert!(matches!(
                XmpSerializer::new(&ctx, &options),
                Err(XmpError::BadOptions(_))
            ));
        }
    }

    #[test]
    fn test_packet_wrapper() {
        let meta = sample();
        let packet = meta.serialize_packet().unwrap();
        assert!(packet.starts_with("<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>"));
        assert!(packet.ends_with("<?xpacket end=\"w\"?>"));
        assert!(packet.contains(&" ".repeat(100)));
        assert!(packet.lines().all(|l| l.len() <= 200));
        assert!(packet.contains("Tool &lt;1&gt; &amp; \"2\""));

        let read_only = meta
            .serialize_with(&SerializeOptions::default().read_only_packet(true))
            .unwrap();
        assert!(read_only.ends_with("<?xpacket end=\"r\"?>"));

        let bare = meta.serialize().unwrap();
        assert!(bare.starts_with("<x:xmpmeta"));
        assert!(!bare.contains("xpacket"));
    }

    #[test]
    fn test_round_trip() {
        let meta = sample();
        for compact in [false, true] {
            let xml = meta
                .serialize_with(&SerializeOptions::default().use_compact_format(compact))
                .unwrap();
            let back = XmpMeta::parse_with_context(&xml, meta.context().clone()).unwrap();
            assert_eq!(back.root(), meta.root());
        }
    }

    #[test]
    fn test_compact_uses_attributes() {
        let meta = sample();
        let xml = meta
            .serialize_with(
                &SerializeOptions::default()
                    .use_compact_format(true)
                    .omit_packet_wrapper(true),
            )
            .unwrap();
        assert!(xml.contains("xmp:CreatorTool=\"Tool &lt;1&gt; &amp; &quot;2&quot;\""));
        assert_eq!(xml.matches("<rdf:Description").count(), 1);
    }

    #[test]
    fn test_exact_length() {
        let meta = sample();
        let bytes = meta
            .serialize_to_bytes(&SerializeOptions::default().exact_packet_length(4000))
            .unwrap();
        assert_eq!(bytes.len(), 4000);

        let utf16 = meta
            .serialize_to_bytes(
                &SerializeOptions::default()
                    .exact_packet_length(8000)
                    .encoding(CharEncoding::Utf16Be),
            )
            .unwrap();
        assert_eq!(utf16.len(), 8000);
        assert_eq!(&utf16[..4], &[0x00, b'<', 0x00, b'?']);

        let err = meta
            .serialize_with(&SerializeOptions::default().exact_packet_length(100))
            .unwrap_err();
        assert!(matches!(err, XmpError::CapacityExceeded { available: 100, .. }));
    }

    #[test]
    fn test_padding_sizes() {
        let meta = sample();
        let base = meta.serialize_packet().unwrap().len();
        let thumb = meta
            .serialize_with(&SerializeOptions::default().include_thumbnail_pad(true))
            .unwrap()
            .len();
        assert_eq!(thumb - base, THUMBNAIL_PADDING);
        assert_eq!(padding_text(250, "\n").len(), 250);
        assert_eq!(padding_text(101, "\n"), format!("{}\n", " ".repeat(100)));
    }

    #[test]
    fn test_alias_comments() {
        let meta = sample();
        let xml = meta
            .serialize_with(&SerializeOptions::default().write_alias_comments(true))
            .unwrap();
        assert!(xml.contains("<!-- aliases:"));
        assert!(xml.contains("pdf:Title"));
    }

    #[test]
    fn test_qualified_values_round_trip() {
        let mut meta = XmpMeta::with_context(XmpContext::new());
        meta.set_property_uri(ns::DC, "source", "http://example.com/a?b&c")
            .unwrap();
        meta.set_property(ns::DC, "rights", "Mine").unwrap();
        meta.set_qualifier(ns::DC, "rights", ns::XMP, "note", "about")
            .unwrap();
        meta.set_qualifier(ns::DC, "rights", ns::XML, "lang", "en")
            .unwrap();
        meta.set_property(ns::DC, "description", "line1\nline2").unwrap();
        let xml = meta.serialize().unwrap();
        let back = XmpMeta::parse_with_context(&xml, meta.context().clone()).unwrap();
        assert_eq!(back.root(), meta.root());
    }
}
