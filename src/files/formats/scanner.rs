//! Packet scanning handler
//!
//! Finds a wrapped packet anywhere in the file by its `<?xpacket` markers.
//! Used for formats without a smart handler (PDF, PostScript, HTML, XML,
//! text). Updates are in place only: the new packet must be serialized to
//! exactly the old length.

use crate::core::error::{XmpError, XmpResult};
use crate::files::format::FileFormat;
use crate::files::handler::{FileHandler, HandlerFlags, PacketLocation};
use crate::files::packet::find_packet;
use std::io::{Read, Seek, Write};

/// Packet scanning file handler
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketScanner {
    format: FileFormat,
}

impl PacketScanner {
    /// A scanner reporting `format` as the file format
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }
}

impl FileHandler for PacketScanner {
    /// Any stream can be scanned
    fn can_handle<R: Read + Seek>(&self, _reader: &mut R) -> XmpResult<bool> {
        Ok(true)
    }

    fn locate_packet<R: Read + Seek>(&self, reader: &mut R) -> XmpResult<Option<PacketLocation>> {
        reader.rewind()?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(find_packet(&data).map(|(offset, length)| PacketLocation {
            offset: offset as u64,
            length,
        }))
    }

    fn rewrite<R: Read + Seek, W: Write>(
        &self,
        _reader: &mut R,
        _writer: &mut W,
        _packet: &[u8],
    ) -> XmpResult<()> {
        Err(XmpError::NotSupported(format!(
            "Packet scanning cannot rewrite {} files",
            self.format
        )))
    }

    fn flags(&self) -> HandlerFlags {
        HandlerFlags::ALLOWS_ONLY_XMP
            | HandlerFlags::RETURNS_RAW_PACKET
            | HandlerFlags::ALLOWS_SAFE_UPDATE
    }

    fn format(&self) -> FileFormat {
        self.format
    }

    fn format_name(&self) -> &'static str {
        "Packet scanner"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const PACKET: &[u8] = b"<?xpacket begin=\"\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?><x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/>   <?xpacket end=\"w\"?>";

    #[test]
    fn test_locate_in_text() {
        let mut data = b"<html><head>".to_vec();
        data.extend_from_slice(PACKET);
        data.extend_from_slice(b"</head></html>");

        let scanner = PacketScanner::new(FileFormat::Html);
        let mut reader = Cursor::new(data);
        let location = scanner.locate_packet(&mut reader).unwrap().unwrap();
        assert_eq!(location.offset, 12);
        assert_eq!(location.length, PACKET.len());
        assert_eq!(scanner.extract_packet(&mut reader, &location).unwrap(), PACKET);
    }

    #[test]
    fn test_in_place_only() {
        let scanner = PacketScanner::new(FileFormat::Pdf);
        let mut reader = Cursor::new(PACKET.to_vec());
        let mut out = Vec::new();
        assert!(matches!(
            scanner.rewrite(&mut reader, &mut out, b"<x/>"),
            Err(XmpError::NotSupported(_))
        ));
        assert!(!scanner.flags().contains(HandlerFlags::CAN_REWRITE));
        assert!(!scanner.flags().contains(HandlerFlags::CAN_INJECT_XMP));

        let location = scanner.locate_packet(&mut reader).unwrap().unwrap();
        let mut replacement = PACKET.to_vec();
        replacement[60] = b' ';
        scanner.update_in_place(&mut reader, &location, &replacement).unwrap();
        assert_eq!(reader.into_inner(), replacement);
    }

    #[test]
    fn test_no_packet() {
        let scanner = PacketScanner::new(FileFormat::Text);
        let mut reader = Cursor::new(b"plain text".to_vec());
        assert!(scanner.locate_packet(&mut reader).unwrap().is_none());
        assert_eq!(scanner.format(), FileFormat::Text);
    }
}
