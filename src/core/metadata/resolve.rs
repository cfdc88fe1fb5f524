//! Tree navigation for resolved paths
//!
//! Reads walk existing nodes only. Writes first probe the whole path
//! read-only, so a failing step never leaves half-created nodes behind,
//! then walk it again creating whatever is missing.

use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::ns;
use crate::core::node::{ArrayNode, ArrayType, Field, Node, PropKind, StructureNode, X_DEFAULT};
use crate::core::xpath::{PathStep, XmpPath};

/// Position of an existing child relative to its parent
#[derive(Debug, Clone, Copy)]
enum Slot {
    Field(usize),
    Qualifier(usize),
    Item(usize),
}

impl Slot {
    fn get(self, node: &Node) -> Option<&Node> {
        match self {
            Slot::Field(i) => node.as_structure()?.fields.get(i).map(|f| &f.node),
            Slot::Qualifier(i) => node.qualifiers().get(i).map(|q| &q.node),
            Slot::Item(i) => node.as_array()?.items.get(i),
        }
    }

    fn get_mut(self, node: &mut Node) -> Option<&mut Node> {
        match self {
            Slot::Field(i) => node
                .as_structure_mut()?
                .fields
                .get_mut(i)
                .map(|f| &mut f.node),
            Slot::Qualifier(i) => node.qualifiers_mut().get_mut(i).map(|q| &mut q.node),
            Slot::Item(i) => node.as_array_mut()?.items.get_mut(i),
        }
    }

    fn remove(self, node: &mut Node) -> Option<Node> {
        match self {
            Slot::Field(i) => Some(node.as_structure_mut()?.fields.remove(i).node),
            Slot::Qualifier(i) => Some(node.qualifiers_mut().remove(i).node),
            Slot::Item(i) => node.as_array_mut()?.remove(i).ok(),
        }
    }
}

enum Lookup {
    Found(Slot),
    /// Absent, but the step can create it
    Missing,
}

fn describe(node: &Node) -> &'static str {
    match node.kind() {
        PropKind::Simple => "a simple value",
        PropKind::Array(_) => "an array",
        PropKind::Struct => "a struct",
    }
}

fn array(node: &Node) -> XmpResult<&ArrayNode> {
    node.as_array()
        .ok_or_else(|| XmpError::TypeMismatch(format!("Array step applied to {}", describe(node))))
}

/// Find the child `step` addresses. Errors report kind conflicts and
/// targets that can never exist.
fn locate(node: &Node, step: &PathStep) -> XmpResult<Lookup> {
    let found = |pos: Option<usize>, slot: fn(usize) -> Slot| match pos {
        Some(i) => Lookup::Found(slot(i)),
        None => Lookup::Missing,
    };

    match step {
        PathStep::Property { namespace, name } => {
            let s = node.as_structure().ok_or_else(|| {
                XmpError::TypeMismatch(format!(
                    "Field step '{}' applied to {}",
                    name,
                    describe(node)
                ))
            })?;
            let pos = s.fields.iter().position(|f| f.is(namespace, name));
            Ok(found(pos, Slot::Field))
        }
        PathStep::Qualifier { namespace, name } => {
            let pos = node.qualifiers().iter().position(|q| q.is(namespace, name));
            Ok(found(pos, Slot::Qualifier))
        }
        PathStep::Index(n) => {
            let a = array(node)?;
            match *n {
                0 => Err(XmpError::BadXPath("Array indices start at 1".to_string())),
                n if n <= a.len() => Ok(Lookup::Found(Slot::Item(n - 1))),
                n if n == a.len() + 1 => Ok(Lookup::Missing),
                n => Err(XmpError::BadParam(format!(
                    "Index {} out of range for array of {} items",
                    n,
                    a.len()
                ))),
            }
        }
        PathStep::Last => match array(node)?.len() {
            0 => Err(XmpError::BadParam("last() of an empty array".to_string())),
            len => Ok(Lookup::Found(Slot::Item(len - 1))),
        },
        PathStep::FieldSelector {
            namespace,
            name,
            value,
        } => array(node)?
            .find_field(namespace, name, value)
            .map(|i| Lookup::Found(Slot::Item(i)))
            .ok_or_else(|| {
                XmpError::NotFound(format!("No array item with field {}=\"{}\"", name, value))
            }),
        PathStep::QualifierSelector {
            namespace,
            name,
            value,
        } => {
            let a = array(node)?;
            match a.find_qualifier(namespace, name, value) {
                Some(i) => Ok(Lookup::Found(Slot::Item(i))),
                None if step.is_lang_selector() => Ok(Lookup::Missing),
                None => Err(XmpError::NotFound(format!(
                    "No array item with qualifier {}=\"{}\"",
                    name, value
                ))),
            }
        }
    }
}

/// Kind of the node created for step `index - 1`, decided by the step
/// that follows it (or by `leaf` at the end of the path).
fn created_kind(path: &XmpPath, index: usize, leaf: PropKind) -> PropKind {
    let Some(next) = path.steps.get(index) else {
        return leaf;
    };
    match next {
        PathStep::Property { .. } => PropKind::Struct,
        PathStep::Qualifier { .. } => PropKind::Simple,
        _ if next.is_lang_selector() => PropKind::Array(ArrayType::AltText),
        _ => {
            let aliased = if index == 1 {
                path.alias_form.and_then(|f| f.array_type())
            } else {
                None
            };
            PropKind::Array(aliased.unwrap_or(ArrayType::Unordered))
        }
    }
}

fn check_leaf(node: &Node, leaf: PropKind) -> XmpResult<()> {
    if leaf.accepts(node.kind()) {
        Ok(())
    } else {
        Err(XmpError::TypeMismatch(format!(
            "Existing node is {}, requested {:?}",
            describe(node),
            leaf
        )))
    }
}

fn root_step(path: &[PathStep]) -> Option<(&str, &str)> {
    match path.first() {
        Some(PathStep::Property { namespace, name }) => Some((namespace, name)),
        _ => None,
    }
}

/// Node addressed by `steps`, if it exists
pub(super) fn find<'a>(root: &'a StructureNode, steps: &[PathStep]) -> Option<&'a Node> {
    let (namespace, name) = root_step(steps)?;
    let mut cur = root.get_field(namespace, name)?;
    for step in &steps[1..] {
        match locate(cur, step).ok()? {
            Lookup::Found(slot) => cur = slot.get(cur)?,
            Lookup::Missing => return None,
        }
    }
    Some(cur)
}

/// Mutable node addressed by `steps`, if it exists
pub(super) fn find_mut<'a>(root: &'a mut StructureNode, steps: &[PathStep]) -> Option<&'a mut Node> {
    let (namespace, name) = root_step(steps)?;
    let mut cur = root.get_field_mut(namespace, name)?;
    for step in &steps[1..] {
        match locate(cur, step).ok()? {
            Lookup::Found(slot) => cur = slot.get_mut(cur)?,
            Lookup::Missing => return None,
        }
    }
    Some(cur)
}

/// Check that `ensure` would succeed, without touching the tree
fn probe(root: &StructureNode, path: &XmpPath, leaf: PropKind) -> XmpResult<()> {
    let (namespace, name) = root_step(&path.steps)
        .ok_or_else(|| XmpError::BadXPath("Path must start with a property".to_string()))?;
    let Some(mut cur) = root.get_field(namespace, name) else {
        return probe_created(path, 1, leaf);
    };
    for (i, step) in path.steps.iter().enumerate().skip(1) {
        match locate(cur, step)? {
            Lookup::Found(slot) => {
                cur = slot
                    .get(cur)
                    .ok_or_else(|| XmpError::InternalError("Dangling slot".to_string()))?
            }
            Lookup::Missing => return probe_created(path, i + 1, leaf),
        }
    }
    check_leaf(cur, leaf)
}

/// Walk the tail of a path that runs through freshly created nodes
fn probe_created(path: &XmpPath, from: usize, leaf: PropKind) -> XmpResult<()> {
    for i in from..path.steps.len() {
        let fresh = Node::with_kind(created_kind(path, i, leaf), None);
        locate(&fresh, &path.steps[i])?;
    }
    Ok(())
}

fn create_child<'a>(
    node: &'a mut Node,
    step: &PathStep,
    kind: PropKind,
) -> XmpResult<&'a mut Node> {
    let mut child = Node::with_kind(kind, None);
    let created = match step {
        PathStep::Property { namespace, name } => node.as_structure_mut().and_then(|s| {
            s.fields.push(Field::new(namespace.as_str(), name.as_str(), child));
            s.fields.last_mut().map(|f| &mut f.node)
        }),
        PathStep::Qualifier { namespace, name } => {
            node.set_qualifier(namespace, name, child);
            node.get_qualifier_mut(namespace, name)
        }
        PathStep::Index(_) => node.as_array_mut().and_then(|a| {
            a.append(child);
            a.items.last_mut()
        }),
        PathStep::QualifierSelector { value, .. } if step.is_lang_selector() => {
            child.set_qualifier(ns::XML, "lang", Node::simple(value.as_str()));
            node.as_array_mut().and_then(|a| {
                let at = if value.eq_ignore_ascii_case(X_DEFAULT) {
                    0
                } else {
                    a.len()
                };
                a.items.insert(at, child);
                if a.array_type == ArrayType::Alternative && a.all_items_have_lang() {
                    a.array_type = ArrayType::AltText;
                }
                a.items.get_mut(at)
            })
        }
        _ => None,
    };
    created.ok_or_else(|| XmpError::InternalError(format!("Cannot create node for {:?}", step)))
}

/// Node addressed by `path`, creating missing nodes along the way.
///
/// An existing leaf must be compatible with `leaf`; a created leaf gets
/// that kind.
pub(super) fn ensure<'a>(
    root: &'a mut StructureNode,
    path: &XmpPath,
    leaf: PropKind,
) -> XmpResult<&'a mut Node> {
    probe(root, path, leaf)?;

    let (namespace, name) = root_step(&path.steps)
        .ok_or_else(|| XmpError::BadXPath("Path must start with a property".to_string()))?;
    if !root.has_field(namespace, name) {
        let node = Node::with_kind(created_kind(path, 1, leaf), None);
        root.fields.push(Field::new(namespace, name, node));
    }
    let mut cur = root
        .get_field_mut(namespace, name)
        .ok_or_else(|| XmpError::InternalError("Top-level property vanished".to_string()))?;

    for (i, step) in path.steps.iter().enumerate().skip(1) {
        cur = match locate(cur, step)? {
            Lookup::Found(slot) => slot
                .get_mut(cur)
                .ok_or_else(|| XmpError::InternalError("Dangling slot".to_string()))?,
            Lookup::Missing => create_child(cur, step, created_kind(path, i + 1, leaf))?,
        };
    }
    Ok(cur)
}

/// Remove the node addressed by `steps`, returning it
pub(super) fn remove(root: &mut StructureNode, steps: &[PathStep]) -> Option<Node> {
    let (last, parent_steps) = steps.split_last()?;
    if parent_steps.is_empty() {
        let (namespace, name) = root_step(steps)?;
        return root.remove_field(namespace, name);
    }
    let parent = find_mut(root, parent_steps)?;
    match locate(parent, last).ok()? {
        Lookup::Found(slot) => slot.remove(parent),
        Lookup::Missing => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alias::AliasForm;

    fn prop(name: &str) -> PathStep {
        PathStep::Property {
            namespace: ns::DC.to_string(),
            name: name.to_string(),
        }
    }

    fn path(steps: Vec<PathStep>) -> XmpPath {
        XmpPath {
            steps,
            alias_form: None,
        }
    }

    #[test]
    fn test_ensure_creates_intermediates() {
        let mut root = StructureNode::new();
        let p = path(vec![prop("subject"), PathStep::Index(1), prop("name")]);
        ensure(&mut root, &p, PropKind::Simple).unwrap();

        let subject = root.get_field(ns::DC, "subject").unwrap();
        assert_eq!(subject.kind(), PropKind::Array(ArrayType::Unordered));
        let item = subject.as_array().unwrap().get(0).unwrap();
        assert!(item.as_structure().unwrap().has_field(ns::DC, "name"));
        assert!(find(&root, &p.steps).is_some());
    }

    #[test]
    fn test_failed_ensure_leaves_tree_untouched() {
        let mut root = StructureNode::new();
        // Index 2 of a new array can never exist
        let p = path(vec![prop("subject"), PathStep::Index(2)]);
        assert!(matches!(
            ensure(&mut root, &p, PropKind::Simple),
            Err(XmpError::BadParam(_))
        ));
        assert!(root.is_empty());

        root.set_field(ns::DC, "title", Node::simple("plain"));
        let p = path(vec![prop("title"), PathStep::Index(1)]);
        assert!(matches!(
            ensure(&mut root, &p, PropKind::Simple),
            Err(XmpError::TypeMismatch(_))
        ));
        assert_eq!(root.get_field(ns::DC, "title").and_then(Node::value), Some("plain"));
    }

    #[test]
    fn test_lang_selector_creates_item() {
        let mut root = StructureNode::new();
        let lang = |v: &str| PathStep::QualifierSelector {
            namespace: ns::XML.to_string(),
            name: "lang".to_string(),
            value: v.to_string(),
        };
        ensure(&mut root, &path(vec![prop("title"), lang("en")]), PropKind::Simple).unwrap();
        ensure(
            &mut root,
            &path(vec![prop("title"), lang(X_DEFAULT)]),
            PropKind::Simple,
        )
        .unwrap();

        let title = root.get_field(ns::DC, "title").unwrap().as_array().unwrap();
        assert_eq!(title.array_type, ArrayType::AltText);
        assert_eq!(title.items[0].lang(), Some(X_DEFAULT));
        assert_eq!(title.items[1].lang(), Some("en"));
    }

    #[test]
    fn test_alias_form_picks_array_type() {
        let mut root = StructureNode::new();
        let p = XmpPath {
            steps: vec![prop("creator"), PathStep::Index(1)],
            alias_form: Some(AliasForm::OrderedArray),
        };
        ensure(&mut root, &p, PropKind::Simple).unwrap();
        assert_eq!(
            root.get_field(ns::DC, "creator").unwrap().kind(),
            PropKind::Array(ArrayType::Ordered)
        );
    }

    #[test]
    fn test_remove() {
        let mut root = StructureNode::new();
        let p = path(vec![prop("subject"), PathStep::Index(1)]);
        ensure(&mut root, &p, PropKind::Simple).unwrap();
        assert!(remove(&mut root, &p.steps).is_some());
        assert!(remove(&mut root, &p.steps).is_none());
        assert!(remove(&mut root, &[prop("subject")]).is_some());
        assert!(root.is_empty());
    }
}
