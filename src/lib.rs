//! # xmpengine
//!
//! An embeddable engine for XMP metadata: parse RDF/XML packets into a
//! property tree, query and edit it through path expressions, serialize it
//! back to a packet, and locate or update packets inside files.
//!
//! ## Metadata
//!
//! ```rust
//! use xmpengine::{ns, ArrayType, XmpMeta};
//!
//! let packet = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
//! <x:xmpmeta xmlns:x="adobe:ns:meta/">
//!   <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
//!     <rdf:Description rdf:about="" xmlns:xmp="http://ns.adobe.com/xap/1.0/"
//!         xmp:CreatorTool="Camera"/>
//!   </rdf:RDF>
//! </x:xmpmeta>
//! <?xpacket end="w"?>"#;
//!
//! let mut meta = XmpMeta::parse(packet).unwrap();
//! assert_eq!(
//!     meta.get_property(ns::XMP, "CreatorTool").unwrap().as_str(),
//!     Some("Camera")
//! );
//!
//! meta.append_array_item(ns::DC, "subject", ArrayType::Unordered, "sunset").unwrap();
//! meta.set_localized_text(ns::DC, "title", "", "x-default", "Evening").unwrap();
//!
//! let xml = meta.serialize_packet().unwrap();
//! let reparsed = XmpMeta::parse(&xml).unwrap();
//! assert_eq!(reparsed.count_array_items(ns::DC, "subject"), 1);
//! ```
//!
//! ## Files
//!
//! With the `files` feature (on by default) [`XmpFile`] opens a file,
//! extracts its packet and writes changes back on close:
//!
//! ```rust,no_run
//! use xmpengine::{ns, CloseOptions, FileFormat, XmpFile, XmpOptions};
//!
//! let mut file = XmpFile::open("photo.jpg", FileFormat::Unknown, XmpOptions::default().for_update())?;
//! let mut meta = file.get_xmp().unwrap_or_default();
//! meta.set_property(ns::XMP, "Rating", 5i64)?;
//! file.put_xmp(meta)?;
//! file.close_file(CloseOptions::default().update_safely())?;
//! # Ok::<(), xmpengine::XmpError>(())
//! ```
//!
//! ## Registries
//!
//! Namespaces and aliases live in an [`XmpContext`]. The free functions
//! such as [`register_namespace`] work on the process-wide context; build a
//! separate one with [`XmpContext::new`] to keep registrations isolated.

pub mod core;
#[cfg(feature = "files")]
pub mod files;
pub mod types;
pub mod utils;

pub use core::alias::{AliasForm, AliasInfo};
pub use core::context::{register_alias, resolve_alias, XmpContext};
pub use core::error::{XmpError, XmpResult};
pub use core::iterator::{IteratorOptions, XmpIterator};
pub use core::metadata::XmpMeta;
pub use core::namespace::{
    get_all_registered_namespaces, get_builtin_namespace_uris, get_namespace_prefix,
    get_namespace_uri, is_namespace_registered, ns, register_namespace,
};
pub use core::node::{ArrayType, PropKind};
pub use core::parser::CharEncoding;
pub use core::serializer::SerializeOptions;
pub use core::xpath::ArrayIndex;
pub use types::{ValueType, XmpProperty, XmpValue};
pub use utils::{AppendOptions, RemoveOptions, SeparateOptions, XmpDateTime, XmpUtils};

#[cfg(feature = "files")]
pub use files::{
    CloseOptions, FileFormat, FileInfo, HandlerFlags, PacketInfo, XmpFile, XmpOptions,
};
