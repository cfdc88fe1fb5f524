//! File handler trait for XMP metadata
//!
//! This module defines the trait that all file format handlers must implement.
//! A handler locates the packet in its format, and knows how to write a new
//! packet either over the old one or by copying the whole file.

use crate::core::error::{XmpError, XmpResult};
use crate::files::format::FileFormat;
use bitflags::bitflags;
use std::io::{Read, Seek, SeekFrom, Write};

/// Options for opening an [`XmpFile`](crate::files::XmpFile).
///
/// Use the builder pattern to configure options.
///
/// # Example
///
/// ```rust,no_run
/// use xmpengine::{FileFormat, XmpFile, XmpOptions};
///
/// let mut file = XmpFile::open(
///     "photo.jpg",
///     FileFormat::Unknown,
///     XmpOptions::default().for_update().use_smart_handler(),
/// )?;
/// # Ok::<(), xmpengine::XmpError>(())
/// ```
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct XmpOptions {
    /// Open for reading and writing (default: read-only)
    pub for_update: bool,
    /// Only the XMP is wanted, skip reconciliation with native metadata
    pub only_xmp: bool,
    /// Be strict about the designated format and locating XMP
    pub strict: bool,
    /// Require the use of a smart handler
    pub use_smart_handler: bool,
    /// Force packet scanning (do not use smart handler)
    pub use_packet_scanning: bool,
    /// Only packet scan files "known" to need scanning
    pub limited_scanning: bool,
}

impl XmpOptions {
    /// Open for read-only access (default).
    pub fn for_read(mut self) -> Self {
        self.for_update = false;
        self
    }

    /// Open for reading and writing.
    ///
    /// Files opened for update are written to only when closing.
    pub fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }

    /// Only the XMP is wanted.
    pub fn only_xmp(mut self) -> Self {
        self.only_xmp = true;
        self
    }

    /// Be strict about only attempting to use the designated file handler.
    ///
    /// Do not fall back to detection or scanning when the given format does
    /// not match.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Require the use of a smart handler.
    ///
    /// Do not fall back to packet scanning.
    pub fn use_smart_handler(mut self) -> Self {
        self.use_smart_handler = true;
        self
    }

    /// Force packet scanning.
    ///
    /// Do not use a smart handler.
    pub fn use_packet_scanning(mut self) -> Self {
        self.use_packet_scanning = true;
        self
    }

    /// Only packet scan files "known" to need scanning.
    pub fn limited_scanning(mut self) -> Self {
        self.limited_scanning = true;
        self
    }

    /// Reject mutually exclusive flags
    pub fn validate(&self) -> XmpResult<()> {
        if self.use_smart_handler && self.use_packet_scanning {
            return Err(XmpError::BadOptions(
                "Smart handler and packet scanning are mutually exclusive".to_string(),
            ));
        }
        if self.use_smart_handler && self.limited_scanning {
            return Err(XmpError::BadOptions(
                "Limited scanning has no effect with a smart handler".to_string(),
            ));
        }
        Ok(())
    }
}

/// Options for [`XmpFile::close_file`](crate::files::XmpFile::close_file)
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CloseOptions {
    /// Write to a temporary file in the same directory, then swap it in
    pub update_safely: bool,
}

impl CloseOptions {
    /// Write through a temporary file and an atomic rename.
    pub fn update_safely(mut self) -> Self {
        self.update_safely = true;
        self
    }
}

bitflags! {
    /// Capabilities reported by a format handler
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HandlerFlags: u32 {
        /// Can inject first-time XMP into an existing file
        const CAN_INJECT_XMP = 0x0000_0001;
        /// Can expand XMP or other metadata in an existing file
        const CAN_EXPAND = 0x0000_0002;
        /// Can copy one file to another, writing new metadata
        const CAN_REWRITE = 0x0000_0004;
        /// Can expand, but prefers in-place update
        const PREFERS_IN_PLACE = 0x0000_0008;
        /// Supports reconciliation between XMP and other forms
        const CAN_RECONCILE = 0x0000_0010;
        /// Allows access to just the XMP, ignoring other forms
        const ALLOWS_ONLY_XMP = 0x0000_0020;
        /// Returns raw packet information
        const RETURNS_RAW_PACKET = 0x0000_0040;
        /// Returns a native thumbnail
        const RETURNS_TNAIL = 0x0000_0080;
        /// The handler does the file open and close
        const OWNS_FILE = 0x0000_0100;
        /// Allows crash-safe file updates
        const ALLOWS_SAFE_UPDATE = 0x0000_0200;
        /// The format needs the packet to be read-only
        const NEEDS_READONLY_PACKET = 0x0000_0400;
        /// Uses a sidecar file for the XMP
        const USES_SIDECAR_XMP = 0x0000_0800;
    }
}

/// Where a handler found the packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketLocation {
    /// Byte offset from the start of the file
    pub offset: u64,
    /// Length in bytes
    pub length: usize,
}

/// Trait for file format handlers
///
/// Handlers follow a locate/extract/inject contract: `locate_packet` finds
/// the packet bytes, `extract_packet` reads them, and new packets go in
/// either with `update_in_place` (same length) or `rewrite` (full copy).
pub trait FileHandler: Send + Sync {
    /// Check if this handler can handle the given stream.
    ///
    /// Peeks at the header; the reader position is restored.
    fn can_handle<R: Read + Seek>(&self, reader: &mut R) -> XmpResult<bool>;

    /// Find the packet in the stream, `None` if the file has no XMP
    fn locate_packet<R: Read + Seek>(&self, reader: &mut R) -> XmpResult<Option<PacketLocation>>;

    /// Read the packet bytes at `location`
    fn extract_packet<R: Read + Seek>(
        &self,
        reader: &mut R,
        location: &PacketLocation,
    ) -> XmpResult<Vec<u8>> {
        reader.seek(SeekFrom::Start(location.offset))?;
        let mut packet = vec![0u8; location.length];
        reader.read_exact(&mut packet)?;
        Ok(packet)
    }

    /// Overwrite the packet at `location` with `packet` of the same length
    fn update_in_place<F: Read + Write + Seek>(
        &self,
        file: &mut F,
        location: &PacketLocation,
        packet: &[u8],
    ) -> XmpResult<()> {
        if packet.len() != location.length {
            return Err(XmpError::CapacityExceeded {
                needed: packet.len(),
                available: location.length,
            });
        }
        file.seek(SeekFrom::Start(location.offset))?;
        file.write_all(packet)?;
        Ok(())
    }

    /// Copy `reader` to `writer`, replacing or injecting the packet
    fn rewrite<R: Read + Seek, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
        packet: &[u8],
    ) -> XmpResult<()>;

    /// Largest packet the format can hold, in bytes
    fn max_packet_size(&self) -> Option<usize> {
        None
    }

    /// Capabilities of this handler
    fn flags(&self) -> HandlerFlags;

    /// The format this handler serves
    fn format(&self) -> FileFormat;

    /// Get the name of the file format this handler supports
    fn format_name(&self) -> &'static str;
}
