//! XPath path handling for XMP
//!
//! Supported forms:
//! - `xmp:CreatorTool` or `CreatorTool` - top-level property (an unprefixed
//!   name takes the schema namespace)
//! - `dc:creator[1]`, `dc:creator[last()]` - 1-based array item
//! - `exif:Flash/exif:Fired` - structure field
//! - `dc:title[?xml:lang="en"]` (or `[@xml:lang='en']`) - item by qualifier
//! - `Iptc4xmpExt:ArtworkOrObject[Iptc4xmpExt:AOTitle="Mona"]` - struct item
//!   by field value
//! - `dc:title[1]/?xml:lang` - qualifier
//!
//! A doubled quote inside a quoted value stands for one quote character.

use crate::core::alias::{AliasForm, AliasMap};
use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::{is_xml_name, ns, NamespaceMap};
use crate::core::node::X_DEFAULT;

/// A possibly prefixed XML name as written in a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    /// Namespace prefix, if written
    pub prefix: Option<String>,
    /// Local name
    pub local: String,
}

impl QName {
    fn parse(text: &str) -> XmpResult<Self> {
        let (prefix, local) = match text.split_once(':') {
            Some((p, l)) => (Some(p), l),
            None => (None, text),
        };
        if let Some(p) = prefix {
            if !is_xml_name(p) {
                return Err(XmpError::BadXPath(format!("Bad namespace prefix '{}'", p)));
            }
        }
        if !is_xml_name(local) {
            return Err(XmpError::BadXPath(format!("Bad property name '{}'", text)));
        }
        Ok(Self {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
        })
    }

    fn write(&self, out: &mut String) {
        if let Some(p) = &self.prefix {
            out.push_str(p);
            out.push(':');
        }
        out.push_str(&self.local);
    }
}

/// A component of an XPath expression, before namespace resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathComponent {
    /// A property or field name
    Name(QName),
    /// A qualifier step (`?ns:name`)
    Qualifier(QName),
    /// A 1-based array index
    Index(usize),
    /// The `last()` array index
    Last,
    /// Array item whose struct field equals a value
    FieldSelector {
        /// Field name
        name: QName,
        /// Required field value
        value: String,
    },
    /// Array item whose qualifier equals a value
    QualifierSelector {
        /// Qualifier name
        name: QName,
        /// Required qualifier value
        value: String,
    },
}

/// Parsed path components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathComponents {
    pub components: Vec<PathComponent>,
}

impl PathComponents {
    /// Get the first component as a name
    pub fn first_name(&self) -> Option<&QName> {
        self.components.first().and_then(|c| match c {
            PathComponent::Name(n) => Some(n),
            _ => None,
        })
    }

    /// Get the last component
    pub fn last(&self) -> Option<&PathComponent> {
        self.components.last()
    }
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn take_until(&mut self, stop: &[char]) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if stop.contains(&c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.text[start..self.pos]
    }

    fn quoted(&mut self) -> XmpResult<String> {
        let quote = match self.bump() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(XmpError::BadXPath("Selector value must be quoted".to_string())),
        };
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => {
                    if self.eat(quote) {
                        value.push(quote);
                    } else {
                        return Ok(value);
                    }
                }
                Some(c) => value.push(c),
                None => {
                    return Err(XmpError::BadXPath("Unterminated quoted value".to_string()))
                }
            }
        }
    }
}

/// Parse an XPath-like path expression into unresolved components
pub fn parse_path(path: &str) -> XmpResult<PathComponents> {
    if path.is_empty() {
        return Err(XmpError::BadXPath("Empty path".to_string()));
    }
    let mut cur = Cursor { text: path, pos: 0 };
    let mut components = Vec::new();

    loop {
        let is_qualifier = cur.eat('?') || cur.eat('@');
        let name = QName::parse(cur.take_until(&['/', '[']))?;
        if components.is_empty() && is_qualifier {
            return Err(XmpError::BadXPath(
                "Path cannot start with a qualifier".to_string(),
            ));
        }
        components.push(if is_qualifier {
            PathComponent::Qualifier(name)
        } else {
            PathComponent::Name(name)
        });

        while cur.eat('[') {
            components.push(parse_predicate(&mut cur)?);
            if !cur.eat(']') {
                return Err(XmpError::BadXPath("Unclosed bracket".to_string()));
            }
        }

        match cur.bump() {
            None => break,
            Some('/') => continue,
            Some(c) => {
                return Err(XmpError::BadXPath(format!(
                    "Unexpected '{}' in path '{}'",
                    c, path
                )))
            }
        }
    }

    Ok(PathComponents { components })
}

fn parse_predicate(cur: &mut Cursor<'_>) -> XmpResult<PathComponent> {
    if matches!(cur.peek(), Some(c) if c.is_ascii_digit()) {
        let digits = cur.take_until(&[']']);
        let index = digits
            .parse::<usize>()
            .map_err(|_| XmpError::BadXPath(format!("Invalid array index: {}", digits)))?;
        if index == 0 {
            return Err(XmpError::BadXPath("Array indices start at 1".to_string()));
        }
        return Ok(PathComponent::Index(index));
    }
    if cur.text[cur.pos..].starts_with("last()") {
        cur.pos += "last()".len();
        return Ok(PathComponent::Last);
    }

    let is_qualifier = cur.eat('?') || cur.eat('@');
    let name = QName::parse(cur.take_until(&['=', ']']).trim())?;
    if !cur.eat('=') {
        return Err(XmpError::BadXPath(format!(
            "Expected '=' in selector for '{}'",
            name.local
        )));
    }
    let value = cur.quoted()?;
    Ok(if is_qualifier {
        PathComponent::QualifierSelector { name, value }
    } else {
        PathComponent::FieldSelector { name, value }
    })
}

fn push_quoted(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
}

/// Build a path string from components
pub fn build_path(components: &PathComponents) -> String {
    let mut result = String::new();
    for comp in &components.components {
        match comp {
            PathComponent::Name(name) => {
                if !result.is_empty() {
                    result.push('/');
                }
                name.write(&mut result);
            }
            PathComponent::Qualifier(name) => {
                result.push_str("/?");
                name.write(&mut result);
            }
            PathComponent::Index(idx) => {
                result.push('[');
                result.push_str(&idx.to_string());
                result.push(']');
            }
            PathComponent::Last => result.push_str("[last()]"),
            PathComponent::FieldSelector { name, value } => {
                result.push('[');
                name.write(&mut result);
                result.push('=');
                push_quoted(&mut result, value);
                result.push(']');
            }
            PathComponent::QualifierSelector { name, value } => {
                result.push_str("[?");
                name.write(&mut result);
                result.push('=');
                push_quoted(&mut result, value);
                result.push(']');
            }
        }
    }
    result
}

/// A navigation step with namespaces resolved to URIs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// Top-level property or struct field
    Property { namespace: String, name: String },
    /// Qualifier of the current node
    Qualifier { namespace: String, name: String },
    /// 1-based array index
    Index(usize),
    /// Last array item
    Last,
    /// First array item whose field equals `value`
    FieldSelector {
        namespace: String,
        name: String,
        value: String,
    },
    /// First array item whose qualifier equals `value`
    QualifierSelector {
        namespace: String,
        name: String,
        value: String,
    },
}

impl PathStep {
    /// Whether this step addresses an array item
    pub fn is_item_step(&self) -> bool {
        matches!(
            self,
            PathStep::Index(_)
                | PathStep::Last
                | PathStep::FieldSelector { .. }
                | PathStep::QualifierSelector { .. }
        )
    }

    /// Whether this step is an `xml:lang` selector
    pub fn is_lang_selector(&self) -> bool {
        matches!(self, PathStep::QualifierSelector { namespace, name, .. }
            if namespace == ns::XML && name == "lang")
    }
}

/// A fully resolved path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmpPath {
    pub steps: Vec<PathStep>,
    /// Set when the leading step was rewritten through an alias
    pub alias_form: Option<AliasForm>,
}

impl XmpPath {
    /// Parse `path` and resolve every prefix against `namespaces`.
    ///
    /// Unprefixed names take `schema_ns`. A prefixed first step must name
    /// `schema_ns` itself.
    pub fn resolve(schema_ns: &str, path: &str, namespaces: &NamespaceMap) -> XmpResult<Self> {
        if schema_ns.is_empty() {
            return Err(XmpError::BadSchema("Empty schema namespace URI".to_string()));
        }
        let parsed = parse_path(path)?;
        let uri_of = |name: &QName| -> XmpResult<String> {
            match &name.prefix {
                None => Ok(schema_ns.to_string()),
                Some(p) => namespaces.get_uri(p).map(str::to_string).ok_or_else(|| {
                    XmpError::BadSchema(format!("Unknown namespace prefix '{}'", p))
                }),
            }
        };

        let mut steps = Vec::with_capacity(parsed.components.len());
        for (i, comp) in parsed.components.iter().enumerate() {
            let step = match comp {
                PathComponent::Name(name) => {
                    let namespace = uri_of(name)?;
                    if i == 0 && namespace != schema_ns {
                        return Err(XmpError::BadSchema(format!(
                            "Prefix of '{}' does not match schema namespace {}",
                            path, schema_ns
                        )));
                    }
                    PathStep::Property {
                        namespace,
                        name: name.local.clone(),
                    }
                }
                PathComponent::Qualifier(name) => PathStep::Qualifier {
                    namespace: uri_of(name)?,
                    name: name.local.clone(),
                },
                PathComponent::Index(n) => PathStep::Index(*n),
                PathComponent::Last => PathStep::Last,
                PathComponent::FieldSelector { name, value } => PathStep::FieldSelector {
                    namespace: uri_of(name)?,
                    name: name.local.clone(),
                    value: value.clone(),
                },
                PathComponent::QualifierSelector { name, value } => {
                    PathStep::QualifierSelector {
                        namespace: uri_of(name)?,
                        name: name.local.clone(),
                        value: value.clone(),
                    }
                }
            };
            steps.push(step);
        }

        Ok(Self {
            steps,
            alias_form: None,
        })
    }

    /// Rewrite a leading alias step to its actual property.
    ///
    /// Array forms address item 1, the alt-text form the `x-default` item.
    pub fn apply_alias(&mut self, aliases: &AliasMap) {
        let (namespace, name) = match self.steps.first() {
            Some(PathStep::Property { namespace, name }) => (namespace, name),
            _ => return,
        };
        let Some(info) = aliases.resolve(namespace, name).cloned() else {
            return;
        };

        self.steps[0] = PathStep::Property {
            namespace: info.namespace,
            name: info.name,
        };
        match info.form {
            AliasForm::Simple => {}
            AliasForm::AltText => self.steps.insert(
                1,
                PathStep::QualifierSelector {
                    namespace: ns::XML.to_string(),
                    name: "lang".to_string(),
                    value: X_DEFAULT.to_string(),
                },
            ),
            _ => self.steps.insert(1, PathStep::Index(1)),
        }
        self.alias_form = Some(info.form);
    }

    /// Namespace and name of the top-level property
    pub fn root(&self) -> Option<(&str, &str)> {
        match self.steps.first() {
            Some(PathStep::Property { namespace, name }) => Some((namespace, name)),
            _ => None,
        }
    }
}

/// An array position: 1-based index or the last item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayIndex {
    /// 1-based position
    At(usize),
    /// The last item (or one past it when inserting)
    Last,
}

impl From<usize> for ArrayIndex {
    fn from(index: usize) -> Self {
        ArrayIndex::At(index)
    }
}

fn checked_base(schema_ns: &str, base: &str, namespaces: &NamespaceMap) -> XmpResult<()> {
    XmpPath::resolve(schema_ns, base, namespaces).map(|_| ())
}

fn qualified(namespaces: &NamespaceMap, uri: &str, name: &str) -> XmpResult<String> {
    if !is_xml_name(name) {
        return Err(XmpError::BadXPath(format!("Bad name '{}'", name)));
    }
    let prefix = namespaces
        .get_prefix(uri)
        .ok_or_else(|| XmpError::BadSchema(format!("Namespace '{}' is not registered", uri)))?;
    Ok(format!("{}:{}", prefix, name))
}

/// Compose the path of an array item: `array[3]` or `array[last()]`
pub fn compose_array_item_path(
    namespaces: &NamespaceMap,
    schema_ns: &str,
    array_name: &str,
    index: ArrayIndex,
) -> XmpResult<String> {
    checked_base(schema_ns, array_name, namespaces)?;
    match index {
        ArrayIndex::At(0) => Err(XmpError::BadParam("Array indices start at 1".to_string())),
        ArrayIndex::At(n) => Ok(format!("{}[{}]", array_name, n)),
        ArrayIndex::Last => Ok(format!("{}[last()]", array_name)),
    }
}

/// Compose the path of a struct field: `struct/prefix:field`
pub fn compose_struct_field_path(
    namespaces: &NamespaceMap,
    schema_ns: &str,
    struct_name: &str,
    field_ns: &str,
    field_name: &str,
) -> XmpResult<String> {
    checked_base(schema_ns, struct_name, namespaces)?;
    Ok(format!(
        "{}/{}",
        struct_name,
        qualified(namespaces, field_ns, field_name)?
    ))
}

/// Compose the path of a qualifier: `prop/?prefix:qual`
pub fn compose_qualifier_path(
    namespaces: &NamespaceMap,
    schema_ns: &str,
    prop_name: &str,
    qual_ns: &str,
    qual_name: &str,
) -> XmpResult<String> {
    checked_base(schema_ns, prop_name, namespaces)?;
    Ok(format!(
        "{}/?{}",
        prop_name,
        qualified(namespaces, qual_ns, qual_name)?
    ))
}

/// Compose a language selector: `array[?xml:lang="lang"]`
pub fn compose_lang_selector(
    namespaces: &NamespaceMap,
    schema_ns: &str,
    array_name: &str,
    lang: &str,
) -> XmpResult<String> {
    checked_base(schema_ns, array_name, namespaces)?;
    let mut out = format!("{}[?xml:lang=", array_name);
    push_quoted(&mut out, lang);
    out.push(']');
    Ok(out)
}

/// Compose a field selector: `array[prefix:field="value"]`
///
/// When several items match, the first one in array order is selected.
pub fn compose_field_selector(
    namespaces: &NamespaceMap,
    schema_ns: &str,
    array_name: &str,
    field_ns: &str,
    field_name: &str,
    value: &str,
) -> XmpResult<String> {
    checked_base(schema_ns, array_name, namespaces)?;
    let mut out = format!(
        "{}[{}=",
        array_name,
        qualified(namespaces, field_ns, field_name)?
    );
    push_quoted(&mut out, value);
    out.push(']');
    Ok(out)
}
