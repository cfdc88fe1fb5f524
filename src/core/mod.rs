//! XMP Core module
//!
//! This module contains the core functionality for XMP metadata processing:
//! the registries of an [`XmpContext`], the property tree, path
//! expressions, parsing and serialization.

pub mod alias;
pub mod context;
pub mod error;
pub mod iterator;
pub mod metadata;
pub mod namespace;
pub mod node;
pub mod parser;
pub mod serializer;
pub mod xpath;

pub use alias::{AliasForm, AliasInfo, AliasMap};
pub use context::{register_alias, resolve_alias, XmpContext};
pub use error::{XmpError, XmpResult};
pub use iterator::{IteratorOptions, XmpIterator};
pub use metadata::XmpMeta;
pub use namespace::{
    get_all_registered_namespaces, get_builtin_namespace_uris, get_namespace_prefix,
    get_namespace_uri, is_namespace_registered, ns, register_namespace, NamespaceMap,
};
pub use node::{ArrayNode, ArrayType, Field, Node, PropKind, SimpleNode, StructureNode, X_DEFAULT};
pub use parser::{CharEncoding, XmpParser};
pub use serializer::{SerializeOptions, XmpSerializer, DEFAULT_PADDING, PACKET_ID, THUMBNAIL_PADDING};
pub use xpath::{
    build_path, compose_array_item_path, compose_field_selector, compose_lang_selector,
    compose_qualifier_path, compose_struct_field_path, parse_path, ArrayIndex, PathComponent,
    PathComponents, PathStep, QName, XmpPath,
};
