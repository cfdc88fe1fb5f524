//! PNG file format handler
//!
//! PNG XMP Storage:
//! - XMP Packet is stored in iTXt chunk with keyword "XML:com.adobe.xmp"
//! - iTXt chunk format: keyword (null-terminated) + compression flag + compression method + language tag + translated keyword + text
//! - For XMP, compression flag is 0 (uncompressed)
//! - New packets are written right after IHDR

use crate::core::error::{XmpError, XmpResult};
use crate::files::format::FileFormat;
use crate::files::handler::{FileHandler, HandlerFlags, PacketLocation};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// PNG file signature
const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// XMP keyword in iTXt chunk
const XMP_KEYWORD: &[u8] = b"XML:com.adobe.xmp\0";

const CHUNK_TYPE_ITXT: &[u8; 4] = b"iTXt";
const CHUNK_TYPE_IHDR: &[u8; 4] = b"IHDR";
const CHUNK_TYPE_IEND: &[u8; 4] = b"IEND";

/// PNG file handler for XMP metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct PngHandler;

/// Chunk header; `data_offset` is where the chunk data starts in the file
#[derive(Debug, Clone, Copy)]
struct ChunkHeader {
    length: u32,
    chunk_type: [u8; 4],
    data_offset: u64,
}

impl ChunkHeader {
    fn start(&self) -> u64 {
        self.data_offset - 8
    }

    fn end(&self) -> u64 {
        self.data_offset + self.length as u64 + 4
    }
}

/// The XMP iTXt chunk and where its text starts
#[derive(Debug, Clone, Copy)]
struct XmpChunk {
    header: ChunkHeader,
    text_offset: u64,
}

impl FileHandler for PngHandler {
    fn can_handle<R: Read + Seek>(&self, reader: &mut R) -> XmpResult<bool> {
        let pos = reader.stream_position()?;
        let mut signature = [0u8; 8];
        let matched = match reader.read_exact(&mut signature) {
            Ok(()) => signature == PNG_SIGNATURE,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => false,
            Err(e) => return Err(e.into()),
        };
        reader.seek(SeekFrom::Start(pos))?;
        Ok(matched)
    }

    fn locate_packet<R: Read + Seek>(&self, reader: &mut R) -> XmpResult<Option<PacketLocation>> {
        Ok(find_xmp_chunk(reader)?.map(|chunk| PacketLocation {
            offset: chunk.text_offset,
            length: (chunk.header.end() - 4 - chunk.text_offset) as usize,
        }))
    }

    /// Overwrite the packet text and refresh the chunk CRC
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
        let chunk = find_xmp_chunk(file)?
            .filter(|c| c.text_offset == location.offset)
            .ok_or_else(|| XmpError::BadValue("XMP chunk moved since open".to_string()))?;

        file.seek(SeekFrom::Start(location.offset))?;
        file.write_all(packet)?;

        let mut data = vec![0u8; chunk.header.length as usize];
        file.seek(SeekFrom::Start(chunk.header.data_offset))?;
        file.read_exact(&mut data)?;
        let crc = calculate_crc(&[&chunk.header.chunk_type, &data]);
        file.write_all(&crc.to_be_bytes())?;
        Ok(())
    }

    fn rewrite<R: Read + Seek, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
        packet: &[u8],
    ) -> XmpResult<()> {
        reader.rewind()?;
        expect_signature(reader)?;
        writer.write_all(PNG_SIGNATURE)?;

        let mut xmp_written = false;
        while let Some(header) = read_chunk_header(reader)? {
            if header.chunk_type == *CHUNK_TYPE_ITXT && is_xmp_chunk(reader, &header)? {
                reader.seek(SeekFrom::Start(header.end()))?;
                continue;
            }
            if header.chunk_type == *CHUNK_TYPE_IEND && !xmp_written {
                write_xmp_chunk(writer, packet)?;
                xmp_written = true;
            }

            reader.seek(SeekFrom::Start(header.start()))?;
            let total = header.end() - header.start();
            let copied = io::copy(&mut reader.by_ref().take(total), writer)?;
            if copied != total {
                return Err(XmpError::IoError(io::Error::from(io::ErrorKind::UnexpectedEof)));
            }

            if header.chunk_type == *CHUNK_TYPE_IHDR && !xmp_written {
                write_xmp_chunk(writer, packet)?;
                xmp_written = true;
            }
            if header.chunk_type == *CHUNK_TYPE_IEND {
                break;
            }
        }
        if !xmp_written {
            return Err(XmpError::BadValue("PNG file has no IHDR chunk".to_string()));
        }
        Ok(())
    }

    fn max_packet_size(&self) -> Option<usize> {
        Some(i32::MAX as usize - XMP_KEYWORD.len() - 4)
    }

    fn flags(&self) -> HandlerFlags {
        HandlerFlags::CAN_INJECT_XMP
            | HandlerFlags::CAN_EXPAND
            | HandlerFlags::CAN_REWRITE
            | HandlerFlags::PREFERS_IN_PLACE
            | HandlerFlags::ALLOWS_ONLY_XMP
            | HandlerFlags::RETURNS_RAW_PACKET
            | HandlerFlags::ALLOWS_SAFE_UPDATE
            | HandlerFlags::NEEDS_READONLY_PACKET
    }

    fn format(&self) -> FileFormat {
        FileFormat::Png
    }

    fn format_name(&self) -> &'static str {
        "PNG"
    }
}

fn expect_signature<R: Read>(reader: &mut R) -> XmpResult<()> {
    let mut signature = [0u8; 8];
    reader.read_exact(&mut signature)?;
    if signature != PNG_SIGNATURE {
        return Err(XmpError::BadValue("Not a valid PNG file".to_string()));
    }
    Ok(())
}

/// Read the next chunk header; `None` at end of file
fn read_chunk_header<R: Read + Seek>(reader: &mut R) -> XmpResult<Option<ChunkHeader>> {
    let mut header = [0u8; 8];
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let chunk_type = [header[4], header[5], header[6], header[7]];
    Ok(Some(ChunkHeader {
        length,
        chunk_type,
        data_offset: reader.stream_position()?,
    }))
}

fn is_xmp_chunk<R: Read + Seek>(reader: &mut R, header: &ChunkHeader) -> XmpResult<bool> {
    if (header.length as usize) < XMP_KEYWORD.len() {
        return Ok(false);
    }
    let mut keyword = [0u8; 18];
    reader.seek(SeekFrom::Start(header.data_offset))?;
    reader.read_exact(&mut keyword)?;
    Ok(keyword[..] == *XMP_KEYWORD)
}

fn find_xmp_chunk<R: Read + Seek>(reader: &mut R) -> XmpResult<Option<XmpChunk>> {
    reader.rewind()?;
    expect_signature(reader)?;

    while let Some(header) = read_chunk_header(reader)? {
        if header.chunk_type == *CHUNK_TYPE_IEND {
            break;
        }
        if header.chunk_type == *CHUNK_TYPE_ITXT && is_xmp_chunk(reader, &header)? {
            let mut data = vec![0u8; header.length as usize];
            reader.seek(SeekFrom::Start(header.data_offset))?;
            reader.read_exact(&mut data)?;
            let text_start = text_start(&data)?;
            return Ok(Some(XmpChunk {
                header,
                text_offset: header.data_offset + text_start as u64,
            }));
        }
        reader.seek(SeekFrom::Start(header.end()))?;
    }
    Ok(None)
}

/// Offset of the text within XMP iTXt chunk data
fn text_start(data: &[u8]) -> XmpResult<usize> {
    let keyword_len = XMP_KEYWORD.len();
    let malformed = || XmpError::BadValue("Malformed XMP iTXt chunk".to_string());
    let flags = data.get(keyword_len..keyword_len + 2).ok_or_else(malformed)?;
    if flags[0] != 0 {
        return Err(XmpError::NotSupported(
            "Compressed XMP in PNG is not supported".to_string(),
        ));
    }
    // Skip the language tag and the translated keyword
    let mut at = keyword_len + 2;
    for _ in 0..2 {
        let nul = data[at..].iter().position(|&b| b == 0).ok_or_else(malformed)?;
        at += nul + 1;
    }
    Ok(at)
}

/// Write an XMP iTXt chunk
fn write_xmp_chunk<W: Write>(writer: &mut W, packet: &[u8]) -> XmpResult<()> {
    let mut chunk_data = Vec::with_capacity(XMP_KEYWORD.len() + 4 + packet.len());
    chunk_data.extend_from_slice(XMP_KEYWORD);
    chunk_data.push(0); // compression flag (0 = uncompressed)
    chunk_data.push(0); // compression method
    chunk_data.push(0); // language tag (empty, null-terminated)
    chunk_data.push(0); // translated keyword (empty, null-terminated)
    chunk_data.extend_from_slice(packet);

    let crc = calculate_crc(&[CHUNK_TYPE_ITXT, &chunk_data]);
    writer.write_all(&(chunk_data.len() as u32).to_be_bytes())?;
    writer.write_all(CHUNK_TYPE_ITXT)?;
    writer.write_all(&chunk_data)?;
    writer.write_all(&crc.to_be_bytes())?;
    Ok(())
}

/// PNG CRC-32 (polynomial 0xEDB88320) over the concatenation of `parts`
fn calculate_crc(parts: &[&[u8]]) -> u32 {
    let table = crc_table();
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in parts.iter().flat_map(|p| p.iter()) {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = (crc >> 8) ^ table[index];
    }
    crc ^ 0xFFFF_FFFF
}

fn crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    for (i, item) in table.iter_mut().enumerate() {
        let mut crc = i as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
        }
        *item = crc;
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn chunk(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = (data.len() as u32).to_be_bytes().to_vec();
        out.extend_from_slice(chunk_type);
        out.extend_from_slice(data);
        out.extend_from_slice(&calculate_crc(&[chunk_type, data]).to_be_bytes());
        out
    }

    fn xmp_chunk(packet: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        write_xmp_chunk(&mut out, packet).unwrap();
        out
    }

    fn sample_png(packet: Option<&[u8]>) -> Vec<u8> {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend(chunk(CHUNK_TYPE_IHDR, &[0, 0, 0, 1, 0, 0, 0, 1, 8, 0, 0, 0, 0]));
        data.extend(chunk(b"tEXt", b"Comment\0hello"));
        if let Some(packet) = packet {
            data.extend(xmp_chunk(packet));
        }
        data.extend(chunk(b"IDAT", &[0x78, 0x9C, 0x63, 0x00, 0x00]));
        data.extend(chunk(CHUNK_TYPE_IEND, &[]));
        data
    }

    #[test]
    fn test_crc_known_value() {
        // CRC of an empty IEND chunk
        assert_eq!(calculate_crc(&[b"IEND"]), 0xAE42_6082);
        assert_eq!(calculate_crc(&[b"IE", b"ND"]), 0xAE42_6082);
    }

    #[test]
    fn test_can_handle() {
        let handler = PngHandler;
        assert!(handler.can_handle(&mut Cursor::new(sample_png(None))).unwrap());
        assert!(!handler.can_handle(&mut Cursor::new(b"GIF89a".to_vec())).unwrap());
        assert!(!handler.can_handle(&mut Cursor::new(vec![0x89, 0x50])).unwrap());
    }

    #[test]
    fn test_locate_and_extract() {
        let packet = b"<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/>";
        let mut reader = Cursor::new(sample_png(Some(packet)));
        let location = PngHandler.locate_packet(&mut reader).unwrap().unwrap();
        assert_eq!(location.length, packet.len());
        assert_eq!(
            PngHandler.extract_packet(&mut reader, &location).unwrap(),
            packet
        );

        let mut reader = Cursor::new(sample_png(None));
        assert!(PngHandler.locate_packet(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_text_start_rejects_compressed() {
        let mut data = XMP_KEYWORD.to_vec();
        data.extend_from_slice(&[1, 0, 0, 0]);
        data.extend_from_slice(b"compressed");
        assert!(matches!(text_start(&data), Err(XmpError::NotSupported(_))));

        let mut data = XMP_KEYWORD.to_vec();
        data.extend_from_slice(&[0, 0, b'e', b'n', 0, 0]);
        assert_eq!(text_start(&data).unwrap(), XMP_KEYWORD.len() + 6);
    }

    #[test]
    fn test_rewrite_inserts_after_ihdr() {
        let mut reader = Cursor::new(sample_png(None));
        let mut out = Vec::new();
        PngHandler.rewrite(&mut reader, &mut out, b"<new/>").unwrap();

        let mut expected = PNG_SIGNATURE.to_vec();
        expected.extend(chunk(CHUNK_TYPE_IHDR, &[0, 0, 0, 1, 0, 0, 0, 1, 8, 0, 0, 0, 0]));
        expected.extend(xmp_chunk(b"<new/>"));
        expected.extend(chunk(b"tEXt", b"Comment\0hello"));
        expected.extend(chunk(b"IDAT", &[0x78, 0x9C, 0x63, 0x00, 0x00]));
        expected.extend(chunk(CHUNK_TYPE_IEND, &[]));
        assert_eq!(out, expected);
    }

    #[test]
    fn test_rewrite_replaces_packet() {
        let mut reader = Cursor::new(sample_png(Some(b"<old/>")));
        let mut out = Vec::new();
        PngHandler.rewrite(&mut reader, &mut out, b"<replacement/>").unwrap();

        let mut reader = Cursor::new(out.clone());
        let location = PngHandler.locate_packet(&mut reader).unwrap().unwrap();
        assert_eq!(
            PngHandler.extract_packet(&mut reader, &location).unwrap(),
            b"<replacement/>"
        );
        assert_eq!(memchr::memmem::find_iter(&out, XMP_KEYWORD).count(), 1);
    }

    #[test]
    fn test_update_in_place_refreshes_crc() {
        let mut file = Cursor::new(sample_png(Some(b"<old/>")));
        let location = PngHandler.locate_packet(&mut file).unwrap().unwrap();
        PngHandler.update_in_place(&mut file, &location, b"<new/>").unwrap();

        assert_eq!(file.into_inner(), sample_png(Some(b"<new/>")));
    }
}
