//! Handler selection for packet locating
//!
//! Smart handlers are looked up by format, extension or content detection;
//! the packet scanner is the fallback for everything else.

use crate::core::error::XmpResult;
use crate::files::format::FileFormat;
use crate::files::formats::scanner::PacketScanner;
use crate::files::handler::{FileHandler, HandlerFlags, PacketLocation};
use std::io::{Read, Seek, SeekFrom, Write};

/// A smart handler or the packet scanner
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Handler {
    #[cfg(feature = "jpeg")]
    Jpeg(crate::files::formats::jpeg::JpegHandler),
    #[cfg(feature = "png")]
    Png(crate::files::formats::png::PngHandler),
    Scanner(PacketScanner),
}

impl Handler {
    /// Whether this is the packet-scanning fallback
    pub fn is_scanner(&self) -> bool {
        matches!(self, Handler::Scanner(_))
    }
}

impl FileHandler for Handler {
    fn can_handle<R: Read + Seek>(&self, reader: &mut R) -> XmpResult<bool> {
        match self {
            #[cfg(feature = "jpeg")]
            Handler::Jpeg(h) => h.can_handle(reader),
            #[cfg(feature = "png")]
            Handler::Png(h) => h.can_handle(reader),
            Handler::Scanner(h) => h.can_handle(reader),
        }
    }

    fn locate_packet<R: Read + Seek>(&self, reader: &mut R) -> XmpResult<Option<PacketLocation>> {
        match self {
            #[cfg(feature = "jpeg")]
            Handler::Jpeg(h) => h.locate_packet(reader),
            #[cfg(feature = "png")]
            Handler::Png(h) => h.locate_packet(reader),
            Handler::Scanner(h) => h.locate_packet(reader),
        }
    }

    fn update_in_place<F: Read + Write + Seek>(
        &self,
        file: &mut F,
        location: &PacketLocation,
        packet: &[u8],
    ) -> XmpResult<()> {
        match self {
            #[cfg(feature = "jpeg")]
            Handler::Jpeg(h) => h.update_in_place(file, location, packet),
            #[cfg(feature = "png")]
            Handler::Png(h) => h.update_in_place(file, location, packet),
            Handler::Scanner(h) => h.update_in_place(file, location, packet),
        }
    }

    fn rewrite<R: Read + Seek, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
        packet: &[u8],
    ) -> XmpResult<()> {
        match self {
            #[cfg(feature = "jpeg")]
            Handler::Jpeg(h) => h.rewrite(reader, writer, packet),
            #[cfg(feature = "png")]
            Handler::Png(h) => h.rewrite(reader, writer, packet),
            Handler::Scanner(h) => h.rewrite(reader, writer, packet),
        }
    }

    fn max_packet_size(&self) -> Option<usize> {
        match self {
            #[cfg(feature = "jpeg")]
            Handler::Jpeg(h) => h.max_packet_size(),
            #[cfg(feature = "png")]
            Handler::Png(h) => h.max_packet_size(),
            Handler::Scanner(h) => h.max_packet_size(),
        }
    }

    fn flags(&self) -> HandlerFlags {
        match self {
            #[cfg(feature = "jpeg")]
            Handler::Jpeg(h) => h.flags(),
            #[cfg(feature = "png")]
            Handler::Png(h) => h.flags(),
            Handler::Scanner(h) => h.flags(),
        }
    }

    fn format(&self) -> FileFormat {
        match self {
            #[cfg(feature = "jpeg")]
            Handler::Jpeg(h) => h.format(),
            #[cfg(feature = "png")]
            Handler::Png(h) => h.format(),
            Handler::Scanner(h) => h.format(),
        }
    }

    fn format_name(&self) -> &'static str {
        match self {
            #[cfg(feature = "jpeg")]
            Handler::Jpeg(h) => h.format_name(),
            #[cfg(feature = "png")]
            Handler::Png(h) => h.format_name(),
            Handler::Scanner(h) => h.format_name(),
        }
    }
}

/// The smart handlers known to the file layer
pub struct HandlerRegistry {
    handlers: Vec<Handler>,
}

impl HandlerRegistry {
    /// Create a new handler registry with the smart handlers registered
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: Vec::new(),
        };
        registry.register_defaults();
        registry
    }

    /// Add a handler; earlier registrations win detection
    pub fn register(&mut self, handler: Handler) {
        self.handlers.push(handler);
    }

    fn register_defaults(&mut self) {
        #[cfg(feature = "jpeg")]
        self.register(Handler::Jpeg(crate::files::formats::jpeg::JpegHandler));
        #[cfg(feature = "png")]
        self.register(Handler::Png(crate::files::formats::png::PngHandler));
    }

    /// Find the smart handler for a format
    pub fn find_by_format(&self, format: FileFormat) -> Option<&Handler> {
        self.handlers.iter().find(|h| h.format() == format)
    }

    /// Find a smart handler by file extension
    pub fn find_by_extension(&self, extension: &str) -> Option<&Handler> {
        self.find_by_format(FileFormat::from_extension(extension))
    }

    /// First smart handler whose magic bytes match, reader position untouched
    pub fn find_by_detection<R: Read + Seek>(&self, reader: &mut R) -> XmpResult<Option<&Handler>> {
        let saved_pos = reader.stream_position()?;

        for handler in &self.handlers {
            reader.seek(SeekFrom::Start(saved_pos))?;
            if handler.can_handle(reader)? {
                reader.seek(SeekFrom::Start(saved_pos))?;
                return Ok(Some(handler));
            }
        }

        reader.seek(SeekFrom::Start(saved_pos))?;
        Ok(None)
    }

    /// The packet scanner, reporting `format`
    pub fn scanner(&self, format: FileFormat) -> Handler {
        Handler::Scanner(PacketScanner::new(format))
    }

    /// Capabilities for `format`, `None` if nothing handles it
    pub fn format_info(&self, format: FileFormat) -> Option<HandlerFlags> {
        if let Some(handler) = self.find_by_format(format) {
            return Some(handler.flags());
        }
        format
            .is_scanned()
            .then(|| self.scanner(format).flags())
    }

    /// Registered smart handlers, in detection order
    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with the built-in handlers
pub fn default_registry() -> HandlerRegistry {
    HandlerRegistry::new()
}
