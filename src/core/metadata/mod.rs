//! XMP Metadata
//!
//! This module provides the main XmpMeta struct for working with XMP metadata.
//!
//! Every accessor takes a schema namespace (URI or registered prefix) and a
//! path expression relative to it. Paths are resolved against the
//! namespace registry of the document's [`XmpContext`], then rewritten
//! through the alias registry before the tree is touched.

use crate::core::context::XmpContext;
use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::NamespaceMap;
use crate::core::node::{ArrayType, Field, Node, PropKind, StructureNode};
use crate::core::parser::{decode_packet_bytes, XmpParser};
use crate::core::serializer::{SerializeOptions, XmpSerializer};
use crate::core::xpath::{ArrayIndex, PathStep, XmpPath};
use crate::types::property::XmpProperty;
use crate::types::value::{ValueType, XmpValue};
use crate::utils::datetime::XmpDateTime;
use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

mod localized;
mod resolve;

/// Main structure for working with XMP metadata
///
/// Cloning produces an independent deep copy bound to the same context.
#[derive(Debug, Clone)]
pub struct XmpMeta {
    /// Top-level properties keyed by (namespace, name)
    root: StructureNode,
    /// About URI (typically empty string for main metadata)
    about_uri: Option<String>,
    /// Registries used for path resolution
    ctx: Arc<XmpContext>,
}

fn schema_uri(namespaces: &NamespaceMap, namespace: &str) -> XmpResult<String> {
    if namespaces.has_uri(namespace) {
        return Ok(namespace.to_string());
    }
    namespaces
        .get_uri(namespace)
        .map(str::to_string)
        .ok_or_else(|| {
            XmpError::BadSchema(format!(
                "Unregistered schema namespace '{}'. Register the namespace first using register_namespace().",
                namespace
            ))
        })
}

/// Replace the content of `target` with `new`, keeping the qualifiers of
/// `target` and the array type of an existing array.
fn assign(target: &mut Node, new: Node) {
    let qualifiers = std::mem::take(target.qualifiers_mut());
    let array_type = target.as_array().map(|a| a.array_type);
    *target = new;
    if let (Some(t), Node::Array(a)) = (array_type, &mut *target) {
        a.array_type = t;
    }
    let fresh = std::mem::replace(target.qualifiers_mut(), qualifiers);
    for q in fresh {
        target.set_qualifier(&q.namespace, &q.name, q.node);
    }
}

impl XmpMeta {
    /// Create a new empty XMP metadata object bound to the global context
    pub fn new() -> Self {
        Self::with_context(XmpContext::global())
    }

    /// Create a new empty XMP metadata object bound to `ctx`
    pub fn with_context(ctx: Arc<XmpContext>) -> Self {
        Self {
            root: StructureNode::new(),
            about_uri: None,
            ctx,
        }
    }

    /// Parse XMP metadata from a packet string
    ///
    /// Accepts a full `<?xpacket ...?>` wrapped packet, a bare
    /// `x:xmpmeta` element or a bare `rdf:RDF` element.
    ///
    /// # Example
    ///
    /// ```rust
    /// use xmpengine::{ns, XmpMeta};
    ///
    /// let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
    ///     xmlns:xmp="http://ns.adobe.com/xap/1.0/">
    ///   <rdf:Description rdf:about="" xmp:CreatorTool="MyApp"/>
    /// </rdf:RDF>"#;
    ///
    /// let meta = XmpMeta::parse(xml).unwrap();
    /// let tool = meta.get_property(ns::XMP, "CreatorTool").unwrap();
    /// assert_eq!(tool.as_str(), Some("MyApp"));
    /// ```
    pub fn parse(xml: &str) -> XmpResult<Self> {
        Self::parse_with_context(xml, XmpContext::global())
    }

    /// Parse XMP metadata, registering its namespaces in `ctx`
    pub fn parse_with_context(xml: &str, ctx: Arc<XmpContext>) -> XmpResult<Self> {
        ctx.check_alive()?;
        let doc = XmpParser::new(&ctx).parse(xml)?;
        Ok(Self {
            root: doc.root,
            about_uri: doc.about_uri,
            ctx,
        })
    }

    /// Parse a packet from raw bytes in UTF-8, UTF-16 or UTF-32
    pub fn from_bytes(bytes: &[u8]) -> XmpResult<Self> {
        Self::from_bytes_with_context(bytes, XmpContext::global())
    }

    /// Parse a packet from raw bytes, registering its namespaces in `ctx`
    pub fn from_bytes_with_context(bytes: &[u8], ctx: Arc<XmpContext>) -> XmpResult<Self> {
        let text = decode_packet_bytes(bytes)?;
        Self::parse_with_context(&text, ctx)
    }

    /// The context this document resolves namespaces and aliases against
    pub fn context(&self) -> &Arc<XmpContext> {
        &self.ctx
    }

    pub(crate) fn root(&self) -> &StructureNode {
        &self.root
    }

    pub(crate) fn root_mut(&mut self) -> &mut StructureNode {
        &mut self.root
    }

    /// Whether the document has no properties
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Get the about URI (rdf:about attribute)
    pub fn about_uri(&self) -> Option<&str> {
        self.about_uri.as_deref()
    }

    /// Set the about URI (rdf:about attribute)
    pub fn set_about_uri(&mut self, uri: impl Into<String>) {
        self.about_uri = Some(uri.into());
    }

    /// Resolve `namespace` (URI or prefix) and `path`, then apply aliases.
    ///
    /// Returns the schema URI alongside the resolved path.
    fn resolve(&self, namespace: &str, path: &str) -> XmpResult<(String, XmpPath)> {
        self.ctx.check_alive()?;
        let (schema, mut resolved) = {
            let namespaces = self.ctx.namespaces();
            let schema = schema_uri(&namespaces, namespace)?;
            let resolved = XmpPath::resolve(&schema, path, &namespaces)?;
            (schema, resolved)
        };
        resolved.apply_alias(&self.ctx.aliases());
        Ok((schema, resolved))
    }

    /// Resolve the namespace of a struct field or qualifier
    fn member_uri(&self, namespace: &str) -> XmpResult<String> {
        schema_uri(&self.ctx.namespaces(), namespace)
    }

    fn resolve_member(
        &self,
        namespace: &str,
        path: &str,
        member_ns: &str,
        member_name: &str,
        qualifier: bool,
    ) -> XmpResult<(String, XmpPath)> {
        if member_name.is_empty() {
            return Err(XmpError::BadParam("Empty field or qualifier name".to_string()));
        }
        let (schema, mut resolved) = self.resolve(namespace, path)?;
        let namespace = self.member_uri(member_ns)?;
        let name = member_name.to_string();
        resolved.steps.push(if qualifier {
            PathStep::Qualifier { namespace, name }
        } else {
            PathStep::Property { namespace, name }
        });
        Ok((schema, resolved))
    }

    fn resolve_item(
        &self,
        namespace: &str,
        array_name: &str,
        index: ArrayIndex,
    ) -> XmpResult<(String, XmpPath)> {
        let step = match index {
            ArrayIndex::At(0) => {
                return Err(XmpError::BadParam("Array indices start at 1".to_string()))
            }
            ArrayIndex::At(n) => PathStep::Index(n),
            ArrayIndex::Last => PathStep::Last,
        };
        let (schema, mut resolved) = self.resolve(namespace, array_name)?;
        resolved.steps.push(step);
        Ok((schema, resolved))
    }

    fn snapshot(&self, schema: &str, path: String, resolved: &XmpPath) -> Option<XmpProperty> {
        let node = resolve::find(&self.root, &resolved.steps)?;
        Some(XmpProperty::from_node(
            schema,
            path,
            node,
            &self.ctx.namespaces(),
        ))
    }

    fn node_from_value(&self, schema: &str, value: &XmpValue) -> XmpResult<Node> {
        value.to_node(schema, &self.ctx.namespaces())
    }

    /// Ensure the node at `resolved` exists and give it `node`'s content
    fn store(&mut self, resolved: &XmpPath, node: Node) -> XmpResult<()> {
        // A new array value replaces the items of an existing array of any type
        let leaf = match (node.kind(), resolve::find(&self.root, &resolved.steps)) {
            (PropKind::Array(_), Some(existing)) if existing.is_array() => existing.kind(),
            (kind, _) => kind,
        };
        let target = resolve::ensure(&mut self.root, resolved, leaf)?;
        assign(target, node);
        Ok(())
    }

    /// Node addressed by `path`, with aliases applied
    pub(crate) fn find_node(&self, namespace: &str, path: &str) -> Option<(String, &Node)> {
        let (schema, resolved) = self.resolve(namespace, path).ok()?;
        resolve::find(&self.root, &resolved.steps).map(|node| (schema, node))
    }

    /// Mutable node addressed by `path`, with aliases applied
    pub(crate) fn find_node_mut(&mut self, namespace: &str, path: &str) -> Option<&mut Node> {
        let (_, resolved) = self.resolve(namespace, path).ok()?;
        resolve::find_mut(&mut self.root, &resolved.steps)
    }

    /// Store `node` at `path`, creating missing parents
    pub(crate) fn put_node(&mut self, namespace: &str, path: &str, node: Node) -> XmpResult<()> {
        let (_, resolved) = self.resolve(namespace, path)?;
        self.store(&resolved, node)
    }

    /// Schema URI for a namespace URI or prefix
    pub(crate) fn schema_uri(&self, namespace: &str) -> XmpResult<String> {
        self.ctx.check_alive()?;
        schema_uri(&self.ctx.namespaces(), namespace)
    }

    /// Check if a property exists
    ///
    /// # Arguments
    ///
    /// * `namespace` - The namespace URI or prefix
    /// * `path` - The property path
    pub fn has_property(&self, namespace: &str, path: &str) -> bool {
        self.resolve(namespace, path)
            .ok()
            .and_then(|(_, resolved)| resolve::find(&self.root, &resolved.steps))
            .is_some()
    }

    /// Get a property
    ///
    /// Returns `None` if the path resolves to nothing. Containers are
    /// returned with their nested items and fields.
    ///
    /// # Arguments
    ///
    /// * `namespace` - The namespace URI or prefix
    /// * `path` - The property path, e.g. `creator[2]` or `Flash/exif:Fired`
    pub fn get_property(&self, namespace: &str, path: &str) -> Option<XmpProperty> {
        let (schema, resolved) = self.resolve(namespace, path).ok()?;
        self.snapshot(&schema, path.to_string(), &resolved)
    }

    /// Set a property value
    ///
    /// Missing intermediate structs and arrays are created. Setting a
    /// scalar over an existing array or struct fails with
    /// [`XmpError::TypeMismatch`]; a failed call leaves the tree unchanged.
    ///
    /// # Arguments
    ///
    /// * `namespace` - The namespace URI or prefix
    /// * `path` - The property path
    /// * `value` - The value to set
    ///
    /// # Example
    ///
    /// ```rust
    /// use xmpengine::{ns, XmpMeta};
    ///
    /// let mut meta = XmpMeta::new();
    /// meta.set_property(ns::XMP, "CreatorTool", "MyApp").unwrap();
    /// assert!(meta.has_property(ns::XMP, "CreatorTool"));
    /// ```
    pub fn set_property(
        &mut self,
        namespace: &str,
        path: &str,
        value: impl Into<XmpValue>,
    ) -> XmpResult<()> {
        let (schema, resolved) = self.resolve(namespace, path)?;
        let node = self.node_from_value(&schema, &value.into())?;
        self.store(&resolved, node)
    }

    /// Set a property with an explicit node kind
    ///
    /// A container kind with no value creates the empty container, or
    /// leaves an existing one as it is.
    pub fn set_property_with(
        &mut self,
        namespace: &str,
        path: &str,
        value: Option<&str>,
        kind: PropKind,
    ) -> XmpResult<()> {
        if kind != PropKind::Simple && value.is_some_and(|v| !v.is_empty()) {
            return Err(XmpError::BadParam(
                "Arrays and structs cannot take a scalar value".to_string(),
            ));
        }
        let (_, resolved) = self.resolve(namespace, path)?;
        let target = resolve::ensure(&mut self.root, &resolved, kind)?;
        if let (Node::Simple(simple), Some(v)) = (target, value) {
            simple.value = v.to_string();
            simple.is_uri = false;
        }
        Ok(())
    }

    /// Set a property whose value is a URI reference (`rdf:resource`)
    pub fn set_property_uri(&mut self, namespace: &str, path: &str, uri: &str) -> XmpResult<()> {
        let (_, resolved) = self.resolve(namespace, path)?;
        self.store(&resolved, Node::uri(uri))
    }

    /// Set a property from a string, validated and canonicalised as `value_type`
    ///
    /// Malformed input fails with [`XmpError::BadValue`].
    pub fn set_property_typed(
        &mut self,
        namespace: &str,
        path: &str,
        text: &str,
        value_type: ValueType,
    ) -> XmpResult<()> {
        let value = value_type.convert(text)?;
        self.set_property(namespace, path, value)
    }

    /// Delete a property. Deleting a missing property is a no-op.
    ///
    /// Fails only for malformed paths or a terminated context.
    pub fn delete_property(&mut self, namespace: &str, path: &str) -> XmpResult<()> {
        let resolved = match self.resolve(namespace, path) {
            Ok((_, resolved)) => resolved,
            // Nothing can live under an unregistered namespace
            Err(XmpError::BadSchema(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        resolve::remove(&mut self.root, &resolved.steps);
        Ok(())
    }

    fn scalar(&self, namespace: &str, path: &str) -> XmpResult<Option<String>> {
        let Some(prop) = self.get_property(namespace, path) else {
            return Ok(None);
        };
        match prop.value {
            XmpValue::String(s) => Ok(Some(s)),
            _ => Err(XmpError::BadValue(format!(
                "Property '{}' is not a simple value",
                path
            ))),
        }
    }

    /// Get a boolean property; a present but malformed value is an error
    pub fn get_property_bool(&self, namespace: &str, path: &str) -> XmpResult<Option<bool>> {
        self.scalar(namespace, path)?
            .map(|s| ValueType::Boolean.convert(&s))
            .transpose()
            .map(|v| v.as_ref().and_then(XmpValue::as_bool))
    }

    /// Get an integer property; a present but malformed value is an error
    pub fn get_property_int(&self, namespace: &str, path: &str) -> XmpResult<Option<i64>> {
        self.scalar(namespace, path)?
            .map(|s| ValueType::Integer.convert(&s))
            .transpose()
            .map(|v| v.as_ref().and_then(XmpValue::as_int))
    }

    /// Get a floating point property; a present but malformed value is an error
    pub fn get_property_float(&self, namespace: &str, path: &str) -> XmpResult<Option<f64>> {
        self.scalar(namespace, path)?
            .map(|s| ValueType::Number.convert(&s))
            .transpose()
            .map(|v| v.as_ref().and_then(XmpValue::as_float))
    }

    /// Get a date property; a present but malformed value is an error
    pub fn get_property_date(
        &self,
        namespace: &str,
        path: &str,
    ) -> XmpResult<Option<XmpDateTime>> {
        self.scalar(namespace, path)?
            .map(|s| XmpDateTime::parse(&s))
            .transpose()
    }

    /// Set a date/time property
    ///
    /// The value is validated and written in ISO 8601 form.
    ///
    /// # Example
    ///
    /// ```rust
    /// use xmpengine::{ns, utils::datetime::XmpDateTime, XmpMeta};
    ///
    /// let mut meta = XmpMeta::new();
    /// let dt: XmpDateTime = "2023-12-25T10:30:00Z".parse().unwrap();
    /// meta.set_date_time(ns::XMP, "ModifyDate", &dt).unwrap();
    ///
    /// let back = meta.get_date_time(ns::XMP, "ModifyDate").unwrap();
    /// assert_eq!(back.year, 2023);
    /// assert_eq!(back.hour, 10);
    /// ```
    pub fn set_date_time(
        &mut self,
        namespace: &str,
        path: &str,
        dt: &XmpDateTime,
    ) -> XmpResult<()> {
        dt.validate()?;
        self.set_property(namespace, path, XmpValue::DateTime(dt.clone()))
    }

    /// Get a date/time property, `None` if missing or unparsable
    pub fn get_date_time(&self, namespace: &str, path: &str) -> Option<XmpDateTime> {
        self.get_property_date(namespace, path).ok().flatten()
    }

    /// Number of items in an array, 0 if it is missing or not an array
    pub fn count_array_items(&self, namespace: &str, array_name: &str) -> usize {
        self.resolve(namespace, array_name)
            .ok()
            .and_then(|(_, resolved)| resolve::find(&self.root, &resolved.steps))
            .and_then(Node::as_array)
            .map(|a| a.len())
            .unwrap_or(0)
    }

    /// Check if an array item exists
    pub fn has_array_item(
        &self,
        namespace: &str,
        array_name: &str,
        index: impl Into<ArrayIndex>,
    ) -> bool {
        self.resolve_item(namespace, array_name, index.into())
            .ok()
            .and_then(|(_, resolved)| resolve::find(&self.root, &resolved.steps))
            .is_some()
    }

    /// Get an array item
    ///
    /// # Arguments
    ///
    /// * `namespace` - The namespace URI or prefix
    /// * `array_name` - Path of the array
    /// * `index` - 1-based index, or [`ArrayIndex::Last`]
    pub fn get_array_item(
        &self,
        namespace: &str,
        array_name: &str,
        index: impl Into<ArrayIndex>,
    ) -> Option<XmpProperty> {
        let index = index.into();
        let (schema, resolved) = self.resolve_item(namespace, array_name, index).ok()?;
        let path = match index {
            ArrayIndex::At(n) => format!("{}[{}]", array_name, n),
            ArrayIndex::Last => format!("{}[last()]", array_name),
        };
        self.snapshot(&schema, path, &resolved)
    }

    /// Replace an array item. The array must exist; index `count + 1` appends.
    pub fn set_array_item(
        &mut self,
        namespace: &str,
        array_name: &str,
        index: impl Into<ArrayIndex>,
        value: impl Into<XmpValue>,
    ) -> XmpResult<()> {
        let (schema, resolved) = self.resolve_item(namespace, array_name, index.into())?;
        self.require_array(&resolved.steps[..resolved.steps.len() - 1], array_name)?;
        let node = self.node_from_value(&schema, &value.into())?;
        self.store(&resolved, node)
    }

    fn require_array(&self, steps: &[PathStep], array_name: &str) -> XmpResult<()> {
        match resolve::find(&self.root, steps) {
            Some(node) if node.is_array() => Ok(()),
            Some(_) => Err(XmpError::TypeMismatch(format!(
                "'{}' is not an array",
                array_name
            ))),
            None => Err(XmpError::NotFound(format!(
                "Array '{}' does not exist",
                array_name
            ))),
        }
    }

    /// Append an item, creating the array with `array_type` on first use
    ///
    /// An existing array must have a compatible type.
    ///
    /// # Example
    ///
    /// ```rust
    /// use xmpengine::{ns, ArrayType, XmpMeta};
    ///
    /// let mut meta = XmpMeta::new();
    /// meta.append_array_item(ns::DC, "subject", ArrayType::Unordered, "cat").unwrap();
    /// meta.append_array_item(ns::DC, "subject", ArrayType::Unordered, "dog").unwrap();
    /// assert_eq!(meta.count_array_items(ns::DC, "subject"), 2);
    /// ```
    pub fn append_array_item(
        &mut self,
        namespace: &str,
        array_name: &str,
        array_type: ArrayType,
        value: impl Into<XmpValue>,
    ) -> XmpResult<()> {
        let (schema, resolved) = self.resolve(namespace, array_name)?;
        let node = self.node_from_value(&schema, &value.into())?;
        let array = resolve::ensure(&mut self.root, &resolved, PropKind::Array(array_type))?;
        match array.as_array_mut() {
            Some(a) => {
                a.append(node);
                Ok(())
            }
            None => Err(XmpError::InternalError("Array node expected".to_string())),
        }
    }

    /// Insert an item so that it ends up at `index`, shifting later items
    ///
    /// The array must exist. [`ArrayIndex::Last`] means `count + 1`.
    pub fn insert_array_item(
        &mut self,
        namespace: &str,
        array_name: &str,
        index: impl Into<ArrayIndex>,
        value: impl Into<XmpValue>,
    ) -> XmpResult<()> {
        let (schema, resolved) = self.resolve(namespace, array_name)?;
        self.require_array(&resolved.steps, array_name)?;
        let node = self.node_from_value(&schema, &value.into())?;
        let array = resolve::find_mut(&mut self.root, &resolved.steps)
            .and_then(Node::as_array_mut)
            .ok_or_else(|| XmpError::InternalError("Array node expected".to_string()))?;
        let position = match index.into() {
            ArrayIndex::Last => array.len(),
            ArrayIndex::At(0) => {
                return Err(XmpError::BadParam("Array indices start at 1".to_string()))
            }
            ArrayIndex::At(n) => n - 1,
        };
        array.insert(position, node)
    }

    /// Delete an array item, shifting later items down. Missing items are a no-op.
    pub fn delete_array_item(
        &mut self,
        namespace: &str,
        array_name: &str,
        index: impl Into<ArrayIndex>,
    ) -> XmpResult<()> {
        let resolved = match self.resolve_item(namespace, array_name, index.into()) {
            Ok((_, resolved)) => resolved,
            Err(XmpError::BadSchema(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        resolve::remove(&mut self.root, &resolved.steps);
        Ok(())
    }

    /// Check if a struct field exists
    pub fn has_struct_field(
        &self,
        namespace: &str,
        struct_name: &str,
        field_ns: &str,
        field_name: &str,
    ) -> bool {
        self.resolve_member(namespace, struct_name, field_ns, field_name, false)
            .ok()
            .and_then(|(_, resolved)| resolve::find(&self.root, &resolved.steps))
            .is_some()
    }

    /// Get a struct field
    ///
    /// # Arguments
    ///
    /// * `namespace` - The namespace URI or prefix of the struct
    /// * `struct_name` - Path of the struct
    /// * `field_ns` - The namespace URI or prefix of the field
    /// * `field_name` - Local name of the field
    pub fn get_struct_field(
        &self,
        namespace: &str,
        struct_name: &str,
        field_ns: &str,
        field_name: &str,
    ) -> Option<XmpProperty> {
        let (schema, resolved) = self
            .resolve_member(namespace, struct_name, field_ns, field_name, false)
            .ok()?;
        let prefix = self.ctx.get_namespace_prefix(&self.member_uri(field_ns).ok()?)?;
        let path = format!("{}/{}:{}", struct_name, prefix, field_name);
        self.snapshot(&schema, path, &resolved)
    }

    /// Set a struct field, creating the struct if needed
    pub fn set_struct_field(
        &mut self,
        namespace: &str,
        struct_name: &str,
        field_ns: &str,
        field_name: &str,
        value: impl Into<XmpValue>,
    ) -> XmpResult<()> {
        let (_, resolved) =
            self.resolve_member(namespace, struct_name, field_ns, field_name, false)?;
        let field_uri = self.member_uri(field_ns)?;
        let node = self.node_from_value(&field_uri, &value.into())?;
        self.store(&resolved, node)
    }

    /// Delete a struct field. Missing fields are a no-op.
    pub fn delete_struct_field(
        &mut self,
        namespace: &str,
        struct_name: &str,
        field_ns: &str,
        field_name: &str,
    ) -> XmpResult<()> {
        match self.resolve_member(namespace, struct_name, field_ns, field_name, false) {
            Ok((_, resolved)) => {
                resolve::remove(&mut self.root, &resolved.steps);
                Ok(())
            }
            Err(XmpError::BadSchema(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Check if a qualifier exists
    pub fn has_qualifier(
        &self,
        namespace: &str,
        prop_name: &str,
        qual_ns: &str,
        qual_name: &str,
    ) -> bool {
        self.resolve_member(namespace, prop_name, qual_ns, qual_name, true)
            .ok()
            .and_then(|(_, resolved)| resolve::find(&self.root, &resolved.steps))
            .is_some()
    }

    /// Get a qualifier of a property
    pub fn get_qualifier(
        &self,
        namespace: &str,
        prop_name: &str,
        qual_ns: &str,
        qual_name: &str,
    ) -> Option<XmpProperty> {
        let (schema, resolved) = self
            .resolve_member(namespace, prop_name, qual_ns, qual_name, true)
            .ok()?;
        let prefix = self.ctx.get_namespace_prefix(&self.member_uri(qual_ns).ok()?)?;
        let path = format!("{}/?{}:{}", prop_name, prefix, qual_name);
        self.snapshot(&schema, path, &resolved)
    }

    /// Attach a qualifier to an existing property
    ///
    /// Fails with [`XmpError::NotFound`] if the property does not exist.
    pub fn set_qualifier(
        &mut self,
        namespace: &str,
        prop_name: &str,
        qual_ns: &str,
        qual_name: &str,
        value: impl Into<XmpValue>,
    ) -> XmpResult<()> {
        let (_, resolved) = self.resolve_member(namespace, prop_name, qual_ns, qual_name, true)?;
        let parent = &resolved.steps[..resolved.steps.len() - 1];
        if resolve::find(&self.root, parent).is_none() {
            return Err(XmpError::NotFound(format!(
                "Property '{}' does not exist",
                prop_name
            )));
        }
        let qual_uri = self.member_uri(qual_ns)?;
        let node = self.node_from_value(&qual_uri, &value.into())?;
        self.store(&resolved, node)
    }

    /// Delete a qualifier. Missing qualifiers are a no-op.
    pub fn delete_qualifier(
        &mut self,
        namespace: &str,
        prop_name: &str,
        qual_ns: &str,
        qual_name: &str,
    ) -> XmpResult<()> {
        match self.resolve_member(namespace, prop_name, qual_ns, qual_name, true) {
            Ok((_, resolved)) => {
                resolve::remove(&mut self.root, &resolved.steps);
                Ok(())
            }
            Err(XmpError::BadSchema(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Sort the tree into canonical order
    ///
    /// Top-level properties, struct fields and qualifiers are ordered by
    /// (namespace, name), with `xml:lang` and `rdf:type` leading the
    /// qualifiers. Array items keep their order.
    pub fn sort(&mut self) {
        crate::core::node::sort_fields(&mut self.root.fields);
    }

    /// Top-level properties of one schema, in document order
    pub(crate) fn schema_properties(&self, namespace: &str) -> impl Iterator<Item = &Field> + '_ {
        let namespace = namespace.to_string();
        self.root
            .fields
            .iter()
            .filter(move |f| f.namespace == namespace)
    }

    /// Schema namespaces present in the document, in first-use order
    pub(crate) fn schemas(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for field in &self.root.fields {
            if !out.contains(&field.namespace.as_str()) {
                out.push(&field.namespace);
            }
        }
        out
    }

    /// Indented textual dump of the whole tree
    pub fn dump_object(&self) -> String {
        let namespaces = self.ctx.namespaces();
        let mut out = format!(
            "Dumping XmpMeta object \"{}\"\n",
            self.about_uri.as_deref().unwrap_or_default()
        );
        for schema in self.schemas() {
            let prefix = namespaces.get_prefix(schema).unwrap_or("?");
            let _ = writeln!(out, "  {}  {}:", schema, prefix);
            for field in self.schema_properties(schema) {
                dump_node(&mut out, &namespaces, &qname(&namespaces, field), &field.node, 2);
            }
        }
        out
    }

    /// Serialize to RDF/XML without the packet wrapper
    pub fn serialize(&self) -> XmpResult<String> {
        self.serialize_with(&SerializeOptions::default().omit_packet_wrapper(true))
    }

    /// Serialize to a full XMP packet with the default padding
    pub fn serialize_packet(&self) -> XmpResult<String> {
        self.serialize_with(&SerializeOptions::default())
    }

    /// Serialize with explicit options
    pub fn serialize_with(&self, options: &SerializeOptions) -> XmpResult<String> {
        self.ctx.check_alive()?;
        XmpSerializer::new(&self.ctx, options)?.serialize(self)
    }

    /// Serialize into bytes in the encoding selected by `options`
    pub fn serialize_to_bytes(&self, options: &SerializeOptions) -> XmpResult<Vec<u8>> {
        self.ctx.check_alive()?;
        XmpSerializer::new(&self.ctx, options)?.serialize_to_bytes(self)
    }
}

fn qname(namespaces: &NamespaceMap, field: &Field) -> String {
    match namespaces.get_prefix(&field.namespace) {
        Some(prefix) => format!("{}:{}", prefix, field.name),
        None => field.name.clone(),
    }
}

fn dump_node(out: &mut String, namespaces: &NamespaceMap, label: &str, node: &Node, depth: usize) {
    let pad = "  ".repeat(depth);
    match node {
        Node::Simple(s) => {
            let uri = if s.is_uri { " (URI)" } else { "" };
            let _ = writeln!(out, "{}{} = \"{}\"{}", pad, label, s.value, uri);
        }
        Node::Array(a) => {
            let _ = writeln!(out, "{}{}  ({:?} array)", pad, label, a.array_type);
        }
        Node::Structure(_) => {
            let _ = writeln!(out, "{}{}  (struct)", pad, label);
        }
    }
    for q in node.qualifiers() {
        dump_node(out, namespaces, &format!("? {}", qname(namespaces, q)), &q.node, depth + 2);
    }
    match node {
        Node::Array(a) => {
            for (i, item) in a.items.iter().enumerate() {
                dump_node(out, namespaces, &format!("[{}]", i + 1), item, depth + 1);
            }
        }
        Node::Structure(s) => {
            for f in &s.fields {
                dump_node(out, namespaces, &qname(namespaces, f), &f.node, depth + 1);
            }
        }
        Node::Simple(_) => {}
    }
}

impl Default for XmpMeta {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for XmpMeta {
    type Err = XmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
