//! The LZW sub-block coder (C3/C4, §4.3/§4.4), specialized to GIF's
//! conventions: reserved clear/end codes, bit-width growth that happens in
//! lockstep between encoder and decoder, and a 4096-entry dictionary cap.

pub mod decoder;
pub mod encoder;

pub use decoder::decompress;
pub use encoder::compress;

/// GIF requires the LZW minimum code size to be at least 2, even for a
/// 2-color (1-bit) palette (§4.3 "Edge case").
pub(crate) fn effective_init_code_size(init_code_size: u8) -> u8 {
    init_code_size.max(2)
}
