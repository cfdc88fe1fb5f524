//! XMP XML/RDF parser
//!
//! This module provides functionality for parsing XMP Packets from XML/RDF format.
//!
//! The packet is first read into a small element tree with namespaces
//! resolved, then the RDF subset used by XMP is mapped onto property
//! nodes. Aliased properties are moved to their actual location last.

use crate::core::alias::AliasForm;
use crate::core::context::XmpContext;
use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::ns;
use crate::core::node::{ArrayNode, ArrayType, Field, Node, StructureNode, X_DEFAULT};
use log::{debug, trace};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

/// An XML attribute with its namespace resolved
#[derive(Debug, Clone)]
struct XmlAttr {
    ns: String,
    local: String,
    value: String,
}

/// An XML element with its namespace resolved
#[derive(Debug, Clone, Default)]
struct XmlElement {
    ns: String,
    local: String,
    attrs: Vec<XmlAttr>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    fn is(&self, namespace: &str, local: &str) -> bool {
        self.ns == namespace && self.local == local
    }

    fn is_rdf(&self, local: &str) -> bool {
        self.is(ns::RDF, local)
    }

    fn find(&self, namespace: &str, local: &str) -> Option<&XmlElement> {
        if self.is(namespace, local) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(namespace, local))
    }
}

/// Result of parsing one packet
#[derive(Debug)]
pub(crate) struct ParsedDocument {
    pub root: StructureNode,
    pub about_uri: Option<String>,
}

/// Parser for XMP Packets
pub struct XmpParser<'a> {
    ctx: &'a XmpContext,
}

impl<'a> XmpParser<'a> {
    /// Create a parser that registers packet namespaces in `ctx`
    pub fn new(ctx: &'a XmpContext) -> Self {
        Self { ctx }
    }

    /// Parse a packet, a bare `x:xmpmeta` element or a bare `rdf:RDF` element
    pub(crate) fn parse(&self, xml: &str) -> XmpResult<ParsedDocument> {
        let xml = xml.trim_start_matches('\u{feff}');
        if xml.trim().is_empty() {
            return Ok(ParsedDocument {
                root: StructureNode::new(),
                about_uri: None,
            });
        }

        let document = self.read_elements(xml)?;
        let rdf = document
            .iter()
            .find_map(|e| e.find(ns::RDF, "RDF"))
            .ok_or_else(|| XmpError::ParseError("No rdf:RDF element found".to_string()))?;

        let mut root = StructureNode::new();
        let mut about_uri: Option<String> = None;
        for description in &rdf.children {
            if !description.is_rdf("Description") {
                trace!(
                    "Treating typed node {}:{} as rdf:Description",
                    description.ns,
                    description.local
                );
            }
            self.parse_description(description, &mut root, &mut about_uri)?;
        }

        self.normalize_aliases(&mut root);
        Ok(ParsedDocument { root, about_uri })
    }

    /// Read the XML into elements, resolving prefixes with a scope stack
    fn read_elements(&self, xml: &str) -> XmpResult<Vec<XmlElement>> {
        let mut reader = Reader::from_str(xml);
        let mut buf = Vec::new();
        let mut scopes: Vec<HashMap<String, String>> = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut document: Vec<XmlElement> = Vec::new();

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| XmpError::ParseError(format!("XML parsing error: {}", e)))?;
            match event {
                Event::Start(e) => {
                    let element = self.open_element(&e, &mut scopes)?;
                    stack.push(element);
                }
                Event::Empty(e) => {
                    let element = self.open_element(&e, &mut scopes)?;
                    scopes.pop();
                    attach(&mut stack, &mut document, element);
                }
                Event::End(_) => {
                    scopes.pop();
                    let element = stack.pop().ok_or_else(|| {
                        XmpError::ParseError("Unbalanced end tag".to_string())
                    })?;
                    attach(&mut stack, &mut document, element);
                }
                Event::Text(e) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Event::CData(e) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Event::GeneralRef(e) => {
                    if let Some(top) = stack.last_mut() {
                        let reference = format!("&{};", String::from_utf8_lossy(&e));
                        let resolved = unescape(&reference).map_err(|err| {
                            XmpError::ParseError(format!("Bad entity reference: {}", err))
                        })?;
                        top.text.push_str(&resolved);
                    }
                }
                Event::Eof => break,
                // Declarations, processing instructions (the xpacket wrapper),
                // comments and doctypes carry no metadata
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(XmpError::ParseError("Unexpected end of input".to_string()));
        }
        Ok(document)
    }

    fn open_element(
        &self,
        e: &BytesStart<'_>,
        scopes: &mut Vec<HashMap<String, String>>,
    ) -> XmpResult<XmlElement> {
        let mut declared = HashMap::new();
        let mut raw_attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| XmpError::ParseError(format!("Bad attribute: {}", err)))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let raw_value = String::from_utf8_lossy(attr.value.as_ref());
            let value = unescape(&raw_value)
                .map_err(|err| XmpError::ParseError(format!("Bad attribute value: {}", err)))?
                .to_string();
            if key == "xmlns" {
                declared.insert(String::new(), value);
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                if !value.is_empty() {
                    self.register_prefix(&value, prefix);
                }
                declared.insert(prefix.to_string(), value);
            } else {
                raw_attrs.push((key, value));
            }
        }
        scopes.push(declared);

        let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
        let (element_ns, local) = resolve_name(scopes, &name, true)?;
        let mut attrs = Vec::with_capacity(raw_attrs.len());
        for (key, value) in raw_attrs {
            let (ns, local) = resolve_name(scopes, &key, false)?;
            attrs.push(XmlAttr { ns, local, value });
        }
        Ok(XmlElement {
            ns: element_ns,
            local,
            attrs,
            ..XmlElement::default()
        })
    }

    fn register_prefix(&self, uri: &str, prefix: &str) {
        if let Err(e) = self.ctx.register_namespace(uri, prefix) {
            trace!("Ignoring namespace declaration {}={}: {}", prefix, uri, e);
        }
    }

    fn parse_description(
        &self,
        description: &XmlElement,
        root: &mut StructureNode,
        about_uri: &mut Option<String>,
    ) -> XmpResult<()> {
        for attr in &description.attrs {
            if attr.ns == ns::RDF {
                match attr.local.as_str() {
                    "about" => merge_about(about_uri, &attr.value)?,
                    other => trace!("Ignoring rdf:{} on rdf:Description", other),
                }
                continue;
            }
            if attr.ns.is_empty() || attr.ns == ns::XML {
                trace!("Ignoring attribute {} on rdf:Description", attr.local);
                continue;
            }
            add_top_level(root, Field::new(&attr.ns, &attr.local, Node::simple(&attr.value)))?;
        }
        for child in &description.children {
            let node = self.parse_property(child)?;
            add_top_level(root, Field::new(&child.ns, &child.local, node))?;
        }
        Ok(())
    }

    /// Map one property element (or `rdf:li`) onto a node
    fn parse_property(&self, element: &XmlElement) -> XmpResult<Node> {
        let mut lang = None;
        let mut resource = None;
        let mut parse_type = None;
        let mut props = Vec::new();
        for attr in &element.attrs {
            match (attr.ns.as_str(), attr.local.as_str()) {
                (ns::XML, "lang") => lang = Some(attr.value.as_str()),
                (ns::RDF, "resource") => resource = Some(attr.value.as_str()),
                (ns::RDF, "parseType") => parse_type = Some(attr.value.as_str()),
                (ns::RDF, "value") => props.push(attr),
                (ns::RDF, other) => trace!("Ignoring rdf:{} on {}", other, element.local),
                ("", other) => trace!("Ignoring unqualified attribute {}", other),
                _ => props.push(attr),
            }
        }

        let mut node = match parse_type {
            Some("Resource") => self.build_struct(&props, &element.children)?,
            Some("Literal") => {
                trace!("Reading rdf:parseType=\"Literal\" as plain text");
                Node::simple(element.text.as_str())
            }
            Some(other) => {
                return Err(XmpError::ParseError(format!(
                    "Unsupported rdf:parseType \"{}\"",
                    other
                )))
            }
            None => match (resource, element.children.as_slice()) {
                (Some(uri), []) => {
                    let mut node = Node::uri(uri);
                    for attr in &props {
                        node.set_qualifier(&attr.ns, &attr.local, Node::simple(&attr.value));
                    }
                    node
                }
                (Some(_), _) => {
                    return Err(XmpError::ParseError(format!(
                        "{} has both rdf:resource and content",
                        element.local
                    )))
                }
                (None, []) if props.is_empty() => Node::simple(element.text.as_str()),
                (None, []) => self.build_struct(&props, &[])?,
                (None, [child]) if child.is_rdf("Description") => {
                    let mut inner = Vec::new();
                    for attr in &child.attrs {
                        if attr.ns == ns::RDF && attr.local != "value" {
                            trace!("Ignoring rdf:{} on nested rdf:Description", attr.local);
                        } else if !attr.ns.is_empty() && attr.ns != ns::XML {
                            inner.push(attr);
                        }
                    }
                    inner.extend(props.iter().copied());
                    self.build_struct(&inner, &child.children)?
                }
                (None, [child]) => match ArrayType::from_rdf_type(&child.local) {
                    Some(array_type) if child.ns == ns::RDF => {
                        let mut node = self.build_array(array_type, child)?;
                        for attr in &props {
                            node.set_qualifier(&attr.ns, &attr.local, Node::simple(&attr.value));
                        }
                        node
                    }
                    _ => {
                        return Err(XmpError::ParseError(format!(
                            "Unexpected element {} inside property {}",
                            child.local, element.local
                        )))
                    }
                },
                (None, _) => {
                    return Err(XmpError::ParseError(format!(
                        "Property {} has several child elements without rdf:parseType",
                        element.local
                    )))
                }
            },
        };

        if let Some(lang) = lang {
            node.set_qualifier(ns::XML, "lang", Node::simple(lang));
        }
        Ok(node)
    }

    /// Build a struct from property attributes and property elements.
    ///
    /// A struct with an `rdf:value` field is a qualified value instead: the
    /// value becomes the node and the other fields its qualifiers.
    fn build_struct(&self, attrs: &[&XmlAttr], children: &[XmlElement]) -> XmpResult<Node> {
        let mut fields = Vec::with_capacity(attrs.len() + children.len());
        for attr in attrs {
            fields.push(Field::new(&attr.ns, &attr.local, Node::simple(&attr.value)));
        }
        for child in children {
            fields.push(Field::new(&child.ns, &child.local, self.parse_property(child)?));
        }

        match fields.iter().position(|f| f.is(ns::RDF, "value")) {
            Some(i) => {
                let mut value = fields.remove(i).node;
                for field in fields {
                    value.set_qualifier(&field.namespace, &field.name, field.node);
                }
                Ok(value)
            }
            None => {
                let mut structure = StructureNode::new();
                for field in fields {
                    if structure.has_field(&field.namespace, &field.name) {
                        return Err(XmpError::ParseError(format!(
                            "Duplicate struct field {}",
                            field.name
                        )));
                    }
                    structure.fields.push(field);
                }
                Ok(Node::Structure(structure))
            }
        }
    }

    fn build_array(&self, array_type: ArrayType, container: &XmlElement) -> XmpResult<Node> {
        let mut array = ArrayNode::new(array_type);
        for item in &container.children {
            if !item.is_rdf("li") {
                trace!("Ignoring {} inside rdf:{}", item.local, container.local);
                continue;
            }
            array.append(self.parse_property(item)?);
        }
        if array_type == ArrayType::Alternative && array.all_items_have_lang() {
            array.array_type = ArrayType::AltText;
            if let Some(i) = array.find_lang(X_DEFAULT).filter(|i| *i > 0) {
                let default = array.items.remove(i);
                array.items.insert(0, default);
            }
        }
        Ok(Node::Array(array))
    }

    /// Move aliased top-level properties to their actual location
    fn normalize_aliases(&self, root: &mut StructureNode) {
        let aliases = self.ctx.aliases();
        let mut index = 0;
        while index < root.fields.len() {
            let field = &root.fields[index];
            let Some(info) = aliases.resolve(&field.namespace, &field.name).cloned() else {
                index += 1;
                continue;
            };
            let field = root.fields.remove(index);
            if root.has_field(&info.namespace, &info.name) {
                debug!(
                    "Dropping alias {} in favour of existing {}",
                    field.name, info.name
                );
                continue;
            }
            let node = match (info.form, field.node) {
                (AliasForm::Simple, node) | (_, node @ Node::Array(_)) => node,
                (AliasForm::AltText, mut item) => {
                    if item.lang().is_none() {
                        item.set_qualifier(ns::XML, "lang", Node::simple(X_DEFAULT));
                    }
                    let mut array = ArrayNode::new(ArrayType::AltText);
                    array.append(item);
                    Node::Array(array)
                }
                (form, item) => {
                    let mut array =
                        ArrayNode::new(form.array_type().unwrap_or(ArrayType::Unordered));
                    array.append(item);
                    Node::Array(array)
                }
            };
            root.fields.push(Field::new(info.namespace, info.name, node));
        }
    }
}

fn attach(stack: &mut [XmlElement], document: &mut Vec<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => document.push(element),
    }
}

/// Split a qualified name and resolve its prefix against the open scopes.
///
/// Unprefixed elements take the default namespace; unprefixed attributes
/// have no namespace.
fn resolve_name(
    scopes: &[HashMap<String, String>],
    name: &str,
    is_element: bool,
) -> XmpResult<(String, String)> {
    let (prefix, local) = match name.split_once(':') {
        Some((prefix, local)) => (prefix, local),
        None if !is_element => return Ok((String::new(), name.to_string())),
        None => ("", name),
    };
    if prefix == "xml" {
        return Ok((ns::XML.to_string(), local.to_string()));
    }
    let uri = scopes.iter().rev().find_map(|scope| scope.get(prefix));
    match uri {
        Some(uri) => Ok((uri.clone(), local.to_string())),
        None if prefix.is_empty() => Ok((String::new(), local.to_string())),
        None => Err(XmpError::ParseError(format!(
            "Undeclared namespace prefix '{}'",
            prefix
        ))),
    }
}

fn merge_about(about_uri: &mut Option<String>, value: &str) -> XmpResult<()> {
    match about_uri {
        Some(existing) if !existing.is_empty() && !value.is_empty() && existing != value => {
            Err(XmpError::ParseError(format!(
                "Mismatched rdf:about values \"{}\" and \"{}\"",
                existing, value
            )))
        }
        Some(existing) if !existing.is_empty() => Ok(()),
        _ => {
            *about_uri = Some(value.to_string());
            Ok(())
        }
    }
}

fn add_top_level(root: &mut StructureNode, field: Field) -> XmpResult<()> {
    if root.has_field(&field.namespace, &field.name) {
        return Err(XmpError::ParseError(format!(
            "Duplicate property {}",
            field.name
        )));
    }
    root.fields.push(field);
    Ok(())
}

/// Decode packet bytes in UTF-8, UTF-16 or UTF-32.
///
/// The encoding comes from the byte order mark, or from the position of
/// NUL bytes around the leading `<`.
pub(crate) fn decode_packet_bytes(bytes: &[u8]) -> XmpResult<String> {
    let bad = |what: &str| XmpError::ParseError(format!("Invalid {} packet data", what));
    let (encoding, body) = detect_encoding(bytes);

    match encoding {
        CharEncoding::Utf8 => String::from_utf8(body.to_vec()).map_err(|_| bad("UTF-8")),
        CharEncoding::Utf16Be | CharEncoding::Utf16Le => {
            let codec = if encoding == CharEncoding::Utf16Be {
                encoding_rs::UTF_16BE
            } else {
                encoding_rs::UTF_16LE
            };
            let (text, had_errors) = codec.decode_without_bom_handling(body);
            if had_errors {
                return Err(bad("UTF-16"));
            }
            Ok(text.into_owned())
        }
        CharEncoding::Utf32Be | CharEncoding::Utf32Le => {
            if body.len() % 4 != 0 {
                return Err(bad("UTF-32"));
            }
            body.chunks_exact(4)
                .map(|c| {
                    let unit = [c[0], c[1], c[2], c[3]];
                    let code = if encoding == CharEncoding::Utf32Be {
                        u32::from_be_bytes(unit)
                    } else {
                        u32::from_le_bytes(unit)
                    };
                    char::from_u32(code).ok_or_else(|| bad("UTF-32"))
                })
                .collect()
        }
    }
}

/// Detect the encoding of packet bytes, returning it with the bytes after
/// any byte order mark.
pub(crate) fn detect_encoding(bytes: &[u8]) -> (CharEncoding, &[u8]) {
    match bytes {
        [0xEF, 0xBB, 0xBF, rest @ ..] => (CharEncoding::Utf8, rest),
        [0x00, 0x00, 0xFE, 0xFF, rest @ ..] => (CharEncoding::Utf32Be, rest),
        [0xFF, 0xFE, 0x00, 0x00, rest @ ..] => (CharEncoding::Utf32Le, rest),
        [0xFE, 0xFF, rest @ ..] => (CharEncoding::Utf16Be, rest),
        [0xFF, 0xFE, rest @ ..] => (CharEncoding::Utf16Le, rest),
        [0x00, 0x00, 0x00, _, ..] => (CharEncoding::Utf32Be, bytes),
        [_, 0x00, 0x00, 0x00, ..] => (CharEncoding::Utf32Le, bytes),
        [0x00, _, ..] => (CharEncoding::Utf16Be, bytes),
        [_, 0x00, ..] => (CharEncoding::Utf16Le, bytes),
        _ => (CharEncoding::Utf8, bytes),
    }
}

/// Character encoding of a serialized packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CharEncoding {
    /// UTF-8
    #[default]
    Utf8,
    /// UTF-16, big endian
    Utf16Be,
    /// UTF-16, little endian
    Utf16Le,
    /// UTF-32, big endian
    Utf32Be,
    /// UTF-32, little endian
    Utf32Le,
}

impl CharEncoding {
    /// Bytes per code unit
    pub fn unit_size(self) -> usize {
        match self {
            CharEncoding::Utf8 => 1,
            CharEncoding::Utf16Be | CharEncoding::Utf16Le => 2,
            CharEncoding::Utf32Be | CharEncoding::Utf32Le => 4,
        }
    }

    /// Encode text, without a byte order mark
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            CharEncoding::Utf8 => text.as_bytes().to_vec(),
            CharEncoding::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            CharEncoding::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            CharEncoding::Utf32Be => text.chars().flat_map(|c| (c as u32).to_be_bytes()).collect(),
            CharEncoding::Utf32Le => text.chars().flat_map(|c| (c as u32).to_le_bytes()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(xml: &str) -> ParsedDocument {
        let ctx = XmpContext::new();
        XmpParser::new(&ctx).parse(xml).unwrap()
    }

    const RDF_OPEN: &str = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
  xmlns:dc="http://purl.org/dc/elements/1.1/"
  xmlns:xmp="http://ns.adobe.com/xap/1.0/"
  xmlns:exif="http://ns.adobe.com/exif/1.0/">"#;

    fn wrap(body: &str) -> String {
        format!("{}{}</rdf:RDF>", RDF_OPEN, body)
    }

    #[test]
    fn test_parse_simple_rdf() {
        let doc = parse(&wrap(
            r#"<rdf:Description rdf:about="uuid:1" xmp:CreatorTool="MyApp"/>"#,
        ));
        assert_eq!(doc.about_uri.as_deref(), Some("uuid:1"));
        assert_eq!(
            doc.root.get_field(ns::XMP, "CreatorTool").and_then(Node::value),
            Some("MyApp")
        );
    }

    #[test]
    fn test_packet_wrapper_and_entities() {
        let xml = format!(
            "<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n\
             <x:xmpmeta xmlns:x=\"adobe:ns:meta/\">{}</x:xmpmeta>\n\
             <?xpacket end=\"w\"?>",
            wrap(r#"<rdf:Description rdf:about=""><dc:source>Tom &amp; Jerry &#x41;</dc:source></rdf:Description>"#)
        );
        let doc = parse(&xml);
        assert_eq!(
            doc.root.get_field(ns::DC, "source").and_then(Node::value),
            Some("Tom & Jerry A")
        );
    }

    #[test]
    fn test_arrays_and_alt_text() {
        let doc = parse(&wrap(
            r#"<rdf:Description rdf:about="">
  <dc:subject><rdf:Bag><rdf:li>cat</rdf:li><rdf:li>dog</rdf:li></rdf:Bag></dc:subject>
  <dc:title><rdf:Alt>
    <rdf:li xml:lang="en">Hi</rdf:li>
    <rdf:li xml:lang="x-default">Hello</rdf:li>
  </rdf:Alt></dc:title>
</rdf:Description>"#,
        ));
        let subject = doc.root.get_field(ns::DC, "subject").unwrap().as_array().unwrap();
        assert_eq!(subject.array_type, ArrayType::Unordered);
        assert_eq!(subject.len(), 2);

        let title = doc.root.get_field(ns::DC, "title").unwrap().as_array().unwrap();
        assert_eq!(title.array_type, ArrayType::AltText);
        assert_eq!(title.items[0].lang(), Some("x-default"));
    }

    #[test]
    fn test_structs_and_qualifiers() {
        let doc = parse(&wrap(
            r#"<rdf:Description rdf:about="">
  <exif:Flash rdf:parseType="Resource"><exif:Fired>True</exif:Fired></exif:Flash>
  <exif:Other><rdf:Description exif:Mode="2"/></exif:Other>
  <dc:source rdf:resource="http://example.com/"/>
  <dc:rights rdf:parseType="Resource">
    <rdf:value>Mine</rdf:value><xmp:note>qualified</xmp:note>
  </dc:rights>
</rdf:Description>"#,
        ));
        let flash = doc.root.get_field(ns::EXIF, "Flash").unwrap().as_structure().unwrap();
        assert_eq!(flash.get_field(ns::EXIF, "Fired").and_then(Node::value), Some("True"));
        let other = doc.root.get_field(ns::EXIF, "Other").unwrap().as_structure().unwrap();
        assert_eq!(other.get_field(ns::EXIF, "Mode").and_then(Node::value), Some("2"));

        let source = doc.root.get_field(ns::DC, "source").unwrap().as_simple().unwrap();
        assert!(source.is_uri);

        let rights = doc.root.get_field(ns::DC, "rights").unwrap();
        assert_eq!(rights.value(), Some("Mine"));
        assert_eq!(rights.get_qualifier(ns::XMP, "note").and_then(Node::value), Some("qualified"));
    }

    #[test]
    fn test_alias_normalization() {
        let xml = wrap(
            r#"<rdf:Description rdf:about="" xmlns:pdf="http://ns.adobe.com/pdf/1.3/"
  pdf:Author="Jane" pdf:Title="Doc"/>"#,
        );
        let doc = parse(&xml);
        assert!(!doc.root.has_field(ns::PDF, "Author"));
        let creator = doc.root.get_field(ns::DC, "creator").unwrap().as_array().unwrap();
        assert_eq!(creator.array_type, ArrayType::Ordered);
        assert_eq!(creator.items[0].value(), Some("Jane"));
        let title = doc.root.get_field(ns::DC, "title").unwrap().as_array().unwrap();
        assert_eq!(title.items[0].lang(), Some("x-default"));
    }

    #[test]
    fn test_registers_prefixes() {
        let ctx = XmpContext::new();
        let xml = wrap(
            r#"<rdf:Description rdf:about="" xmlns:my="http://ns.example.com/my/" my:a="1"/>"#,
        );
        XmpParser::new(&ctx).parse(&xml).unwrap();
        assert_eq!(
            ctx.get_namespace_prefix("http://ns.example.com/my/").as_deref(),
            Some("my")
        );
    }

    #[test]
    fn test_malformed() {
        let ctx = XmpContext::new();
        let parser = XmpParser::new(&ctx);
        assert!(matches!(parser.parse("<a><b></a>"), Err(XmpError::ParseError(_))));
        assert!(matches!(parser.parse("<a/>"), Err(XmpError::ParseError(_))));
        assert!(matches!(
            parser.parse(&wrap(r#"<rdf:Description><q:a>1</q:a></rdf:Description>"#)),
            Err(XmpError::ParseError(_))
        ));
        assert!(parser.parse("  ").unwrap().root.is_empty());
    }

    #[test]
    fn test_decode_packet_bytes() {
        let text = "<x>é</x>";
        for encoding in [
            CharEncoding::Utf8,
            CharEncoding::Utf16Be,
            CharEncoding::Utf16Le,
            CharEncoding::Utf32Be,
            CharEncoding::Utf32Le,
        ] {
            assert_eq!(decode_packet_bytes(&encoding.encode(text)).unwrap(), text);
        }
        let mut with_bom = vec![0xFF, 0xFE];
        with_bom.extend(CharEncoding::Utf16Le.encode(text));
        assert_eq!(decode_packet_bytes(&with_bom).unwrap(), text);
        assert!(decode_packet_bytes(&[0xC3, 0x28]).is_err());
    }
}
