//! File format support for XMP
//!
//! This module locates, reads and updates the main XMP packet of a file.
//! JPEG and PNG have smart handlers; other formats are served by scanning
//! the raw bytes for a wrapped packet.

pub mod file;
pub mod format;
pub mod formats;
pub mod handler;
pub mod packet;
pub mod registry;

pub use file::{FileInfo, XmpFile};
pub use format::FileFormat;
#[cfg(feature = "jpeg")]
pub use formats::jpeg::JpegHandler;
#[cfg(feature = "png")]
pub use formats::png::PngHandler;
pub use formats::scanner::PacketScanner;
pub use handler::{CloseOptions, FileHandler, HandlerFlags, PacketLocation, XmpOptions};
pub use packet::PacketInfo;
pub use registry::{default_registry, Handler, HandlerRegistry};
