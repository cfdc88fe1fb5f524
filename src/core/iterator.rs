//! Depth-first traversal of an XMP document
//!
//! [`XmpIterator`] walks a whole document, one schema, or one property
//! subtree in pre-order. Qualifiers of a node come before its items or
//! fields. The walk is lazy, so [`XmpIterator::skip_subtree`] and
//! [`XmpIterator::skip_siblings`] take effect on the following step.

use crate::core::alias::{AliasForm, AliasInfo};
use crate::core::metadata::XmpMeta;
use crate::core::namespace::NamespaceMap;
use crate::core::node::{Field, Node, StructureNode, X_DEFAULT};
use crate::types::property::XmpProperty;

/// Options for [`XmpMeta::iter`] and [`XmpMeta::iter_property`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IteratorOptions {
    /// Visit only the immediate children of the starting point
    pub just_children: bool,
    /// Report only nodes without children
    pub just_leaf_nodes: bool,
    /// Report the last path segment instead of the full path
    pub just_leaf_names: bool,
    /// Visit aliases of present properties as if they were real
    pub include_aliases: bool,
    /// Do not visit qualifiers
    pub omit_qualifiers: bool,
}

impl IteratorOptions {
    /// Visit only immediate children
    pub fn just_children(mut self, value: bool) -> Self {
        self.just_children = value;
        self
    }

    /// Report only leaf nodes
    pub fn just_leaf_nodes(mut self, value: bool) -> Self {
        self.just_leaf_nodes = value;
        self
    }

    /// Report leaf names instead of full paths
    pub fn just_leaf_names(mut self, value: bool) -> Self {
        self.just_leaf_names = value;
        self
    }

    /// Include alias properties
    pub fn include_aliases(mut self, value: bool) -> Self {
        self.include_aliases = value;
        self
    }

    /// Skip qualifiers
    pub fn omit_qualifiers(mut self, value: bool) -> Self {
        self.omit_qualifiers = value;
        self
    }
}

/// A node waiting to be visited
struct Entry<'a> {
    schema: String,
    path: String,
    leaf: String,
    node: &'a Node,
}

/// Siblings at one level of the walk
struct Frame<'a> {
    entries: std::vec::IntoIter<Entry<'a>>,
    depth: usize,
}

/// Pre-order iterator over the nodes of an [`XmpMeta`]
///
/// The iterator is not restartable; create a new one to walk again.
pub struct XmpIterator<'a> {
    meta: &'a XmpMeta,
    options: IteratorOptions,
    stack: Vec<Frame<'a>>,
    /// Children of the node returned last, pushed on the next step
    pending: Option<Frame<'a>>,
}

impl<'a> XmpIterator<'a> {
    fn empty(meta: &'a XmpMeta, options: IteratorOptions) -> Self {
        Self {
            meta,
            options,
            stack: Vec::new(),
            pending: None,
        }
    }

    /// Walk the whole document, schema by schema
    pub(crate) fn document(meta: &'a XmpMeta, options: IteratorOptions) -> Self {
        let mut iter = Self::empty(meta, options);
        if meta.context().is_terminated() {
            return iter;
        }
        let mut schemas: Vec<String> = meta.schemas().into_iter().map(str::to_string).collect();
        if options.include_aliases {
            let aliases = meta.context().aliases();
            for info_ns in aliases.alias_namespaces() {
                if !schemas.contains(&info_ns) {
                    schemas.push(info_ns);
                }
            }
        }
        let mut entries = Vec::new();
        for schema in &schemas {
            entries.extend(iter.schema_entries(schema));
        }
        iter.stack.push(Frame {
            entries: entries.into_iter(),
            depth: 0,
        });
        iter
    }

    /// Walk one schema, or one property when `path` is not empty
    pub(crate) fn subtree(
        meta: &'a XmpMeta,
        namespace: &str,
        path: &str,
        options: IteratorOptions,
    ) -> Self {
        let mut iter = Self::empty(meta, options);
        let Ok(schema) = meta.schema_uri(namespace) else {
            return iter;
        };

        if path.is_empty() {
            let entries = iter.schema_entries(&schema);
            iter.stack.push(Frame {
                entries: entries.into_iter(),
                depth: 0,
            });
            return iter;
        }

        let Some((schema, node)) = meta.find_node(&schema, path) else {
            return iter;
        };
        let path = path.trim().to_string();
        let leaf = leaf_segment(&path).to_string();
        let root = Entry {
            schema,
            path,
            leaf,
            node,
        };
        if options.just_children {
            // The property itself is the parent level
            let children = iter.children_of(&root, 0);
            iter.stack.push(children);
        } else {
            iter.stack.push(Frame {
                entries: vec![root].into_iter(),
                depth: 0,
            });
        }
        iter
    }

    /// Do not descend into the node returned last
    pub fn skip_subtree(&mut self) {
        self.pending = None;
    }

    /// Skip the subtree and the remaining siblings of the node returned last
    pub fn skip_siblings(&mut self) {
        self.pending = None;
        self.stack.pop();
    }

    /// Top-level properties of a schema, followed by its aliases
    fn schema_entries(&self, schema: &str) -> Vec<Entry<'a>> {
        let meta = self.meta;
        let namespaces = meta.context().namespaces();
        let mut entries: Vec<Entry<'a>> = meta
            .schema_properties(schema)
            .map(|field| {
                let qname = qualified_name(&namespaces, field);
                Entry {
                    schema: schema.to_string(),
                    path: qname.clone(),
                    leaf: qname,
                    node: &field.node,
                }
            })
            .collect();

        if self.options.include_aliases {
            let aliases = meta.context().aliases();
            for (name, info) in aliases.aliases_in(schema) {
                if let Some(node) = alias_target(meta.root(), &info) {
                    let qname = match namespaces.get_prefix(schema) {
                        Some(prefix) => format!("{}:{}", prefix, name),
                        None => name,
                    };
                    entries.push(Entry {
                        schema: schema.to_string(),
                        path: qname.clone(),
                        leaf: qname,
                        node,
                    });
                }
            }
        }
        entries
    }

    /// Qualifiers, then items or fields, of one node
    fn children_of(&self, parent: &Entry<'a>, depth: usize) -> Frame<'a> {
        let namespaces = self.meta.context().namespaces();
        let node: &'a Node = parent.node;
        let mut entries = Vec::new();
        let mut push = |leaf: String, path: String, node: &'a Node| {
            entries.push(Entry {
                schema: parent.schema.clone(),
                path,
                leaf,
                node,
            });
        };

        if !self.options.omit_qualifiers {
            for qualifier in node.qualifiers() {
                let leaf = format!("?{}", qualified_name(&namespaces, qualifier));
                push(leaf.clone(), format!("{}/{}", parent.path, leaf), &qualifier.node);
            }
        }
        match node {
            Node::Simple(_) => {}
            Node::Array(array) => {
                for (i, item) in array.items.iter().enumerate() {
                    let leaf = format!("[{}]", i + 1);
                    push(leaf.clone(), format!("{}{}", parent.path, leaf), item);
                }
            }
            Node::Structure(structure) => {
                for field in &structure.fields {
                    let leaf = qualified_name(&namespaces, field);
                    push(leaf.clone(), format!("{}/{}", parent.path, leaf), &field.node);
                }
            }
        }
        Frame {
            entries: entries.into_iter(),
            depth,
        }
    }

    fn has_children(&self, node: &Node) -> bool {
        node.child_count() > 0 || (!self.options.omit_qualifiers && !node.qualifiers().is_empty())
    }
}

impl Iterator for XmpIterator<'_> {
    type Item = XmpProperty;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(children) = self.pending.take() {
            self.stack.push(children);
        }
        loop {
            let frame = self.stack.last_mut()?;
            let depth = frame.depth;
            let Some(entry) = frame.entries.next() else {
                self.stack.pop();
                continue;
            };

            let descend = !self.options.just_children && self.has_children(entry.node);
            if descend {
                self.pending = Some(self.children_of(&entry, depth + 1));
            }
            if self.options.just_leaf_nodes && self.has_children(entry.node) {
                if let Some(children) = self.pending.take() {
                    self.stack.push(children);
                }
                continue;
            }

            let path = if self.options.just_leaf_names {
                entry.leaf
            } else {
                entry.path
            };
            let namespaces = self.meta.context().namespaces();
            return Some(XmpProperty::from_node(
                &entry.schema,
                path,
                entry.node,
                &namespaces,
            ));
        }
    }
}

impl XmpMeta {
    /// Iterate over every node of the document
    ///
    /// # Example
    ///
    /// ```rust
    /// use xmpengine::{ns, IteratorOptions, XmpMeta};
    ///
    /// let mut meta = XmpMeta::new();
    /// meta.set_property(ns::DC, "format", "image/jpeg").unwrap();
    /// let paths: Vec<String> = meta
    ///     .iter(IteratorOptions::default())
    ///     .map(|p| p.path)
    ///     .collect();
    /// assert_eq!(paths, vec!["dc:format".to_string()]);
    /// ```
    pub fn iter(&self, options: IteratorOptions) -> XmpIterator<'_> {
        XmpIterator::document(self, options)
    }

    /// Iterate over one schema (empty `path`) or one property subtree
    pub fn iter_property(
        &self,
        namespace: &str,
        path: &str,
        options: IteratorOptions,
    ) -> XmpIterator<'_> {
        XmpIterator::subtree(self, namespace, path, options)
    }
}

fn qualified_name(namespaces: &NamespaceMap, field: &Field) -> String {
    match namespaces.get_prefix(&field.namespace) {
        Some(prefix) => format!("{}:{}", prefix, field.name),
        None => field.name.clone(),
    }
}

fn leaf_segment(path: &str) -> &str {
    let cut = path
        .rfind(['/', '['])
        .filter(|&i| !path[i..].contains(['\'', '"']));
    match cut {
        Some(i) if path.as_bytes()[i] == b'/' => &path[i + 1..],
        Some(i) => &path[i..],
        None => path,
    }
}

/// Node an alias currently reads from
fn alias_target<'a>(root: &'a StructureNode, info: &AliasInfo) -> Option<&'a Node> {
    let actual = root.get_field(&info.namespace, &info.name)?;
    match info.form {
        AliasForm::Simple => Some(actual),
        AliasForm::AltText => {
            let array = actual.as_array()?;
            array.find_lang(X_DEFAULT).and_then(|i| array.get(i))
        }
        _ => actual.as_array()?.items.first(),
    }
}
