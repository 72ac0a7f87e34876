//! Error taxonomy (§4.9 / §7): two kinds suffice — caller-facing precondition
//! violations, and internal codec inconsistencies found while reading or
//! writing a stream.

use thiserror::Error;

/// A precondition failed before any read or write was attempted.
///
/// Raised only at public entry points, before any mutation — callers must
/// correct their inputs; there is no recovery path.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ValidationError {
    #[error("{field} out of range: expected 1..=65535, got {value}")]
    DimensionOutOfRange { field: &'static str, value: u32 },

    #[error("pixel buffer length mismatch: expected {expected} bytes for {width}x{height}, got {actual}")]
    BufferLengthMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("palette has {len} colors, maximum is 256")]
    PaletteTooLarge { len: usize },

    #[error("palette is empty")]
    EmptyPalette,

    #[error("pixel index {index} at position {position} is out of range for a palette of {palette_len} colors")]
    IndexOutOfPalette {
        index: u8,
        position: usize,
        palette_len: usize,
    },

    #[error("frame sub-rectangle ({left},{top},{width},{height}) has zero area or overflows u16 bounds")]
    InvalidSubRectangle {
        left: u16,
        top: u16,
        width: u16,
        height: u16,
    },

    #[error("max_colors must be in 1..=256, got {0}")]
    MaxColorsOutOfRange(u32),

    #[error("encode_animated_gif requires at least one frame")]
    NoFrames,

    #[error("frame {index} has dimensions {width}x{height}, expected {expected_width}x{expected_height} to match the animation canvas")]
    FrameSizeMismatch {
        index: usize,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },
}

/// A stream being read or written turned out to be internally inconsistent.
///
/// Raised by low-level helpers (bit I/O, sub-block framer, LZW codec,
/// container reader/writer). Bubbles up except in the per-frame decode path
/// of the canvas compositor (§4.8), which catches it and substitutes a
/// placeholder frame.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum EncodingError {
    #[error("bit width must be in 1..=16, got {0}")]
    InvalidBitWidth(u8),

    #[error("code {code} does not fit in {bits} bits")]
    CodeOutOfRange { code: u32, bits: u8 },

    #[error("LZW code {code} not in dictionary (size {dict_size}, width {width} bits) at symbol {symbol_index}")]
    UnknownLzwCode {
        code: u16,
        dict_size: usize,
        width: u8,
        symbol_index: usize,
    },

    #[error("unexpected end of input at byte offset {offset}: {context}")]
    UnexpectedEof { offset: usize, context: &'static str },

    #[error("bad GIF signature at offset {offset}: expected \"GIF87a\" or \"GIF89a\", found {dump}")]
    BadSignature { offset: usize, dump: String },

    #[error("unexpected block separator 0x{byte:02X} at offset {offset} ({context}); nearby bytes: {context_dump}")]
    UnexpectedSeparator {
        byte: u8,
        offset: usize,
        context: &'static str,
        context_dump: String,
    },

    #[error("malformed extension block at offset {offset}: {reason}")]
    MalformedExtension { offset: usize, reason: &'static str },
}

impl EncodingError {
    /// Renders the first few bytes of a buffer as a hex dump, for
    /// `BadSignature` diagnostics (§4.7: "include a short hex dump of the
    /// first 16 bytes in the error").
    pub(crate) fn hex_dump(bytes: &[u8]) -> String {
        let take = bytes.len().min(16);
        bytes[..take]
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Renders the bytes surrounding `offset` (a few before, several after)
    /// as printable ASCII or a `\xNN` escape, for `UnexpectedSeparator`
    /// diagnostics (§4.7: "record the label... rendered as printable-or-
    /// escape").
    pub(crate) fn printable_or_escape_dump(bytes: &[u8], offset: usize) -> String {
        let start = offset.saturating_sub(4);
        let end = (offset + 12).min(bytes.len());
        bytes[start..end]
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    (b as char).to_string()
                } else {
                    format!("\\x{b:02X}")
                }
            })
            .collect()
    }
}
