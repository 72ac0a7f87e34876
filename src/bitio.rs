//! Bit I/O (C1, §4.1): pack codes of `N ∈ [1, 16]` bits into a
//! little-endian (LSB-first) byte stream, and unpack them in reverse.
//!
//! GIF's LZW bitstream is unusual in that codes are written low-bit-first
//! both within a byte and across byte boundaries — `bitvec`'s `Lsb0`
//! ordering models that directly.

use bitvec::prelude::*;

use crate::error::EncodingError;

/// Accumulates codes into a packed, LSB-first byte stream.
///
/// Mirrors the "bit buffer" entity of §3: the trailing partial byte is the
/// pending accumulator: it isn't flushed to bytes until [`BitWriter::finish`]
/// pads it with zero high bits.
#[derive(Debug, Default)]
pub struct BitWriter {
    bits: BitVec<u8, Lsb0>,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter { bits: BitVec::new() }
    }

    /// Writes the low `num_bits` bits of `code`. GIF LZW never exceeds 12
    /// bits per code; this accepts up to 16 for headroom and symmetry with
    /// [`BitReader`].
    pub fn write_code(&mut self, code: u16, num_bits: u8) -> Result<(), EncodingError> {
        if num_bits == 0 || num_bits > 16 {
            return Err(EncodingError::InvalidBitWidth(num_bits));
        }
        if num_bits < 16 && u32::from(code) >= (1u32 << num_bits) {
            return Err(EncodingError::CodeOutOfRange { code: u32::from(code), bits: num_bits });
        }
        for i in 0..num_bits {
            self.bits.push((code >> i) & 1 != 0);
        }
        Ok(())
    }

    /// Number of bits written so far, before padding.
    pub fn len_bits(&self) -> usize {
        self.bits.len()
    }

    /// Pads the trailing partial byte with zero high bits and returns the
    /// packed bytes.
    pub fn finish(mut self) -> Vec<u8> {
        let pad = (8 - self.bits.len() % 8) % 8;
        self.bits.extend(core::iter::repeat(false).take(pad));
        self.bits.into_vec()
    }
}

/// Reads codes back out of a byte slice written by [`BitWriter`].
pub struct BitReader<'a> {
    bits: &'a BitSlice<u8, Lsb0>,
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        BitReader { bits: BitSlice::from_slice(bytes), pos: 0 }
    }

    /// Extracts `num_bits` least-significant-first. Returns `None` ("no
    /// code") when fewer than `num_bits` remain in the input.
    pub fn read_code(&mut self, num_bits: u8) -> Option<u16> {
        if num_bits == 0 || num_bits > 16 {
            return None;
        }
        let n = num_bits as usize;
        if self.pos + n > self.bits.len() {
            return None;
        }
        let mut code: u16 = 0;
        for i in 0..n {
            if self.bits[self.pos + i] {
                code |= 1 << i;
            }
        }
        self.pos += n;
        Some(code)
    }

    pub fn bits_remaining(&self) -> usize {
        self.bits.len() - self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_growing_bit_widths() {
        let codes: Vec<(u16, u8)> = vec![(1, 3), (2, 3), (3, 3), (8, 4), (15, 4), (200, 9)];
        let mut w = BitWriter::new();
        for &(code, bits) in &codes {
            w.write_code(code, bits).unwrap();
        }
        let bytes = w.finish();

        let mut r = BitReader::new(&bytes);
        for &(code, bits) in &codes {
            assert_eq!(r.read_code(bits), Some(code));
        }
    }

    #[test]
    fn flush_pads_final_byte_with_zero_high_bits() {
        let mut w = BitWriter::new();
        w.write_code(0b101, 3).unwrap();
        let bytes = w.finish();
        assert_eq!(bytes.len(), 1);
        // low 3 bits are the code, high 5 bits are zero padding.
        assert_eq!(bytes[0], 0b0000_0101);
    }

    #[test]
    fn read_code_returns_none_past_end_of_input() {
        let bytes = [0xFFu8];
        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read_code(8), Some(0xFF));
        assert_eq!(r.read_code(1), None);
    }

    #[test]
    fn rejects_invalid_bit_width() {
        let mut w = BitWriter::new();
        assert_eq!(w.write_code(0, 0), Err(EncodingError::InvalidBitWidth(0)));
        assert_eq!(w.write_code(0, 17), Err(EncodingError::InvalidBitWidth(17)));
    }

    #[test]
    fn rejects_code_that_does_not_fit_width() {
        let mut w = BitWriter::new();
        assert_eq!(
            w.write_code(8, 3),
            Err(EncodingError::CodeOutOfRange { code: 8, bits: 3 })
        );
    }
}
