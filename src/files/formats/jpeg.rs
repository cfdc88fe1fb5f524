//! JPEG file format handler
//!
//! JPEG XMP Storage:
//! - XMP Packet is stored in APP1 segment with identifier `http://ns.adobe.com/xap/1.0/\0`
//! - Standard APP1 segment size limit: 64KB (65535 bytes including the length field)
//! - Extended XMP (GUID-chunked APP1 segments) is not handled; such segments
//!   are dropped on rewrite

use crate::core::error::{XmpError, XmpResult};
use crate::files::format::FileFormat;
use crate::files::handler::{FileHandler, HandlerFlags, PacketLocation};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// JPEG segment markers
const MARKER_SOI: u8 = 0xD8; // Start of Image
const MARKER_APP0: u8 = 0xE0;
const MARKER_APP1: u8 = 0xE1;
const MARKER_SOS: u8 = 0xDA; // Start of Scan
const MARKER_EOI: u8 = 0xD9; // End of Image
const MARKER_TEM: u8 = 0x01;

/// XMP namespace identifier in APP1 segment
const XMP_NAMESPACE: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

/// Extended XMP namespace identifier
const EXTENDED_XMP_NAMESPACE: &[u8] = b"http://ns.adobe.com/xap/1.0/ext/\0";

/// Maximum content size of an APP1 segment (64KB - 2 bytes for length)
const MAX_APP1_SIZE: usize = 65533;

/// JPEG file handler for XMP metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegHandler;

/// A segment header: marker and content length (without the length field)
#[derive(Debug, Clone, Copy)]
struct Segment {
    marker: u8,
    marker_offset: u64,
    content_offset: u64,
    content_len: usize,
}

impl FileHandler for JpegHandler {
    /// Check if this is a valid JPEG file:
    /// 1. Check for SOI marker (0xFFD8) at offset 0
    /// 2. Skip any 0xFF padding bytes
    /// 3. Validate the second marker ID
    fn can_handle<R: Read + Seek>(&self, reader: &mut R) -> XmpResult<bool> {
        let pos = reader.stream_position()?;
        let mut buffer = [0u8; 100];
        let bytes_read = read_up_to(reader, &mut buffer)?;
        reader.seek(SeekFrom::Start(pos))?;

        if bytes_read < 2 || buffer[0] != 0xFF || buffer[1] != MARKER_SOI {
            return Ok(false);
        }

        let mut at = 2;
        while at < bytes_read && buffer[at] == 0xFF {
            at += 1;
        }
        // Nothing but 0xFF bytes after SOI, close enough
        if at >= bytes_read {
            return Ok(true);
        }

        let id = buffer[at];
        if id >= 0xDD {
            return Ok(true);
        }
        // Standalone markers (RST, SOI, SOS, DNL) and anything below 0xC0
        // cannot follow SOI
        Ok(!(id < 0xC0 || (id & 0xF8) == 0xD0 || id == 0xD8 || id == 0xDA || id == 0xDC))
    }

    fn locate_packet<R: Read + Seek>(&self, reader: &mut R) -> XmpResult<Option<PacketLocation>> {
        reader.rewind()?;
        expect_soi(reader)?;

        while let Some(segment) = next_segment(reader)? {
            if segment.marker == MARKER_SOS || segment.marker == MARKER_EOI {
                break;
            }
            if segment.marker == MARKER_APP1 && segment.content_len >= XMP_NAMESPACE.len() {
                let mut signature = [0u8; 29];
                reader.read_exact(&mut signature)?;
                if signature[..] == *XMP_NAMESPACE {
                    return Ok(Some(PacketLocation {
                        offset: segment.content_offset + XMP_NAMESPACE.len() as u64,
                        length: segment.content_len - XMP_NAMESPACE.len(),
                    }));
                }
            }
            skip_segment(reader, &segment)?;
        }
        Ok(None)
    }

    fn rewrite<R: Read + Seek, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
        packet: &[u8],
    ) -> XmpResult<()> {
        let available = MAX_APP1_SIZE - XMP_NAMESPACE.len();
        if packet.len() > available {
            return Err(XmpError::CapacityExceeded {
                needed: packet.len(),
                available,
            });
        }

        reader.rewind()?;
        expect_soi(reader)?;
        writer.write_all(&[0xFF, MARKER_SOI])?;

        // The new XMP goes after any leading APP0 (JFIF) segments
        let mut pending = next_segment(reader)?;
        while let Some(segment) = pending.filter(|s| s.marker == MARKER_APP0) {
            copy_segment(reader, writer, &segment)?;
            pending = next_segment(reader)?;
        }
        write_xmp_segment(writer, packet)?;

        while let Some(segment) = pending {
            if segment.marker == MARKER_SOS || segment.marker == MARKER_EOI {
                // Back up to the marker and copy everything that is left
                reader.seek(SeekFrom::Start(segment.marker_offset))?;
                io::copy(reader, writer)?;
                return Ok(());
            }
            if segment.marker == MARKER_APP1 && is_xmp_segment(reader, &segment)? {
                skip_segment(reader, &segment)?;
            } else {
                copy_segment(reader, writer, &segment)?;
            }
            pending = next_segment(reader)?;
        }
        Ok(())
    }

    fn max_packet_size(&self) -> Option<usize> {
        Some(MAX_APP1_SIZE - XMP_NAMESPACE.len())
    }

    fn flags(&self) -> HandlerFlags {
        HandlerFlags::CAN_INJECT_XMP
            | HandlerFlags::CAN_EXPAND
            | HandlerFlags::CAN_REWRITE
            | HandlerFlags::PREFERS_IN_PLACE
            | HandlerFlags::CAN_RECONCILE
            | HandlerFlags::ALLOWS_ONLY_XMP
            | HandlerFlags::RETURNS_RAW_PACKET
            | HandlerFlags::ALLOWS_SAFE_UPDATE
    }

    fn format(&self) -> FileFormat {
        FileFormat::Jpeg
    }

    fn format_name(&self) -> &'static str {
        "JPEG"
    }
}

fn read_up_to<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

fn expect_soi<R: Read>(reader: &mut R) -> XmpResult<()> {
    let mut header = [0u8; 2];
    reader.read_exact(&mut header)?;
    if header != [0xFF, MARKER_SOI] {
        return Err(XmpError::BadValue("Not a valid JPEG file".to_string()));
    }
    Ok(())
}

fn has_length(marker: u8) -> bool {
    !(marker == MARKER_TEM
        || (0xD0..=0xD7).contains(&marker)
        || marker == MARKER_SOI
        || marker == MARKER_EOI)
}

/// Read the next marker and its length; `None` at end of file.
///
/// Fill bytes (0xFF runs) before a marker are skipped.
fn next_segment<R: Read + Seek>(reader: &mut R) -> XmpResult<Option<Segment>> {
    let mut byte = [0u8; 1];
    loop {
        if reader.read(&mut byte)? == 0 {
            return Ok(None);
        }
        if byte[0] != 0xFF {
            return Err(XmpError::BadValue(format!(
                "Expected a JPEG marker, found 0x{:02X}",
                byte[0]
            )));
        }
        let mut marker = 0xFF;
        while marker == 0xFF {
            if reader.read(&mut byte)? == 0 {
                return Ok(None);
            }
            marker = byte[0];
        }
        if marker == 0x00 {
            continue;
        }

        let pos = reader.stream_position()?;
        let marker_offset = pos - 2;
        if !has_length(marker) || marker == MARKER_SOS {
            // SOS is followed by entropy-coded data; callers stop there
            return Ok(Some(Segment {
                marker,
                marker_offset,
                content_offset: pos,
                content_len: 0,
            }));
        }

        let mut length = [0u8; 2];
        reader.read_exact(&mut length)?;
        let length = u16::from_be_bytes(length) as usize;
        if length < 2 {
            return Err(XmpError::BadValue(format!(
                "Invalid JPEG segment length {}",
                length
            )));
        }
        return Ok(Some(Segment {
            marker,
            marker_offset,
            content_offset: pos + 2,
            content_len: length - 2,
        }));
    }
}

fn skip_segment<R: Seek>(reader: &mut R, segment: &Segment) -> XmpResult<()> {
    reader.seek(SeekFrom::Start(segment.content_offset + segment.content_len as u64))?;
    Ok(())
}

fn is_xmp_segment<R: Read + Seek>(reader: &mut R, segment: &Segment) -> XmpResult<bool> {
    let len = segment.content_len.min(EXTENDED_XMP_NAMESPACE.len());
    let mut signature = vec![0u8; len];
    reader.seek(SeekFrom::Start(segment.content_offset))?;
    reader.read_exact(&mut signature)?;
    reader.seek(SeekFrom::Start(segment.content_offset))?;
    Ok(signature.starts_with(XMP_NAMESPACE) || signature.starts_with(EXTENDED_XMP_NAMESPACE))
}

fn copy_segment<R: Read + Seek, W: Write>(
    reader: &mut R,
    writer: &mut W,
    segment: &Segment,
) -> XmpResult<()> {
    writer.write_all(&[0xFF, segment.marker])?;
    if !has_length(segment.marker) {
        return Ok(());
    }
    writer.write_all(&((segment.content_len + 2) as u16).to_be_bytes())?;
    reader.seek(SeekFrom::Start(segment.content_offset))?;
    let copied = io::copy(&mut reader.by_ref().take(segment.content_len as u64), writer)?;
    if copied != segment.content_len as u64 {
        return Err(XmpError::IoError(io::Error::from(io::ErrorKind::UnexpectedEof)));
    }
    Ok(())
}

fn write_xmp_segment<W: Write>(writer: &mut W, packet: &[u8]) -> XmpResult<()> {
    writer.write_all(&[0xFF, MARKER_APP1])?;
    let segment_length = (XMP_NAMESPACE.len() + packet.len() + 2) as u16;
    writer.write_all(&segment_length.to_be_bytes())?;
    writer.write_all(XMP_NAMESPACE)?;
    writer.write_all(packet)?;
    Ok(())
}
