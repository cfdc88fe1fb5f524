//! Raw packet inspection
//!
//! Locates `<?xpacket ...?>` wrapped packets inside arbitrary bytes and
//! describes an extracted packet: its encoding, padding and whether the
//! wrapper allows it to be rewritten in place.

use crate::core::parser::{detect_encoding, CharEncoding};
use memchr::memmem;

const PACKET_BEGIN: &str = "<?xpacket begin=";
const PACKET_END: &str = "<?xpacket end=";
const PI_CLOSE: &str = "?>";

const SCAN_ENCODINGS: [CharEncoding; 5] = [
    CharEncoding::Utf8,
    CharEncoding::Utf16Be,
    CharEncoding::Utf16Le,
    CharEncoding::Utf32Be,
    CharEncoding::Utf32Le,
];

/// Description of the packet found in a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketInfo {
    /// Byte offset of the packet from the start of the file
    pub offset: u64,
    /// Packet length in bytes
    pub length: usize,
    /// Trailing padding in bytes, 0 if unknown
    pub pad_size: usize,
    /// Character encoding of the packet
    pub char_form: CharEncoding,
    /// The wrapper says the packet may be updated in place (`end="w"`)
    pub writeable: bool,
    /// The raw packet bytes
    pub packet: Vec<u8>,
}

impl PacketInfo {
    /// Describe the packet `bytes` found at `offset`
    pub fn analyze(offset: u64, bytes: Vec<u8>) -> Self {
        let (char_form, _) = detect_encoding(&bytes);
        let trailer = find_trailer(&bytes, char_form);
        let (writeable, pad_size) = match trailer {
            Some(end) => (
                trailer_mode(&bytes[end..], char_form) == Some('w'),
                padding_before(&bytes[..end], char_form),
            ),
            None => (false, 0),
        };
        Self {
            offset,
            length: bytes.len(),
            pad_size,
            char_form,
            writeable,
            packet: bytes,
        }
    }

    /// Byte range of the packet within the file
    pub fn range(&self) -> std::ops::Range<u64> {
        self.offset..self.offset + self.length as u64
    }
}

/// Find the first complete wrapped packet in `data`.
///
/// Returns the byte offset and length, covering `<?xpacket begin` up to
/// and including the `?>` that closes the trailer. Every encoding is tried
/// and the earliest match wins.
pub fn find_packet(data: &[u8]) -> Option<(usize, usize)> {
    SCAN_ENCODINGS
        .iter()
        .filter_map(|&encoding| find_packet_in(data, encoding))
        .min_by_key(|&(offset, _)| offset)
}

fn find_packet_in(data: &[u8], encoding: CharEncoding) -> Option<(usize, usize)> {
    let begin = encoding.encode(PACKET_BEGIN);
    let end = encoding.encode(PACKET_END);
    let close = encoding.encode(PI_CLOSE);
    let unit = encoding.unit_size();

    for start in memmem::find_iter(data, &begin) {
        if start % unit != 0 && encoding != CharEncoding::Utf8 {
            continue;
        }
        let Some(end_rel) = memmem::find(&data[start..], &end) else {
            return None;
        };
        let trailer = start + end_rel;
        let Some(close_rel) = memmem::find(&data[trailer..], &close) else {
            return None;
        };
        let stop = trailer + close_rel + close.len();
        return Some((start, stop - start));
    }
    None
}

fn find_trailer(bytes: &[u8], encoding: CharEncoding) -> Option<usize> {
    memmem::rfind(bytes, &encoding.encode(PACKET_END))
}

/// The `w` or `r` after `end=` in the trailer
fn trailer_mode(trailer: &[u8], encoding: CharEncoding) -> Option<char> {
    let unit = encoding.unit_size();
    let skip = PACKET_END.len() + 1;
    let at = skip * unit;
    let chunk = trailer.get(at..at + unit)?;
    let code = match encoding {
        CharEncoding::Utf8 => chunk[0] as u32,
        CharEncoding::Utf16Be => u16::from_be_bytes([chunk[0], chunk[1]]) as u32,
        CharEncoding::Utf16Le => u16::from_le_bytes([chunk[0], chunk[1]]) as u32,
        CharEncoding::Utf32Be => u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
        CharEncoding::Utf32Le => u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
    };
    char::from_u32(code)
}

/// Bytes of whitespace immediately before the trailer
fn padding_before(bytes: &[u8], encoding: CharEncoding) -> usize {
    let unit = encoding.unit_size();
    let blanks: Vec<Vec<u8>> = [" ", "\t", "\n", "\r"]
        .iter()
        .map(|c| encoding.encode(c))
        .collect();
    let mut end = bytes.len();
    while end >= unit && blanks.iter().any(|b| bytes[end - unit..end] == b[..]) {
        end -= unit;
    }
    bytes.len() - end
}
