//! Sub-block framer (C2, §4.2): GIF wraps arbitrary byte streams in
//! length-prefixed blocks of 1–255 payload bytes, terminated by a
//! zero-length block. Every payload the LZW codec produces or consumes
//! passes through here.

use crate::error::EncodingError;

/// Splits `payload` into `<=255`-byte chunks, each preceded by its length
/// byte, followed by a single `0x00` terminator.
pub fn write_sub_blocks(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + payload.len() / 255 + 2);
    for chunk in payload.chunks(255) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
    out
}

/// Reads a run of sub-blocks starting at `bytes[*offset]`, advancing
/// `*offset` past the terminating zero-length block, and returns the
/// concatenated payload.
pub fn read_sub_blocks(bytes: &[u8], offset: &mut usize) -> Result<Vec<u8>, EncodingError> {
    let mut out = Vec::new();
    loop {
        let len = read_block_len(bytes, offset)?;
        if len == 0 {
            return Ok(out);
        }
        let start = *offset;
        let end = start + len as usize;
        if end > bytes.len() {
            return Err(EncodingError::UnexpectedEof { offset: start, context: "sub-block payload" });
        }
        out.extend_from_slice(&bytes[start..end]);
        *offset = end;
    }
}

/// Discards a run of sub-blocks without copying their payload.
pub fn skip_sub_blocks(bytes: &[u8], offset: &mut usize) -> Result<(), EncodingError> {
    loop {
        let len = read_block_len(bytes, offset)?;
        if len == 0 {
            return Ok(());
        }
        let end = *offset + len as usize;
        if end > bytes.len() {
            return Err(EncodingError::UnexpectedEof { offset: *offset, context: "sub-block payload" });
        }
        *offset = end;
    }
}

fn read_block_len(bytes: &[u8], offset: &mut usize) -> Result<u8, EncodingError> {
    let len = *bytes
        .get(*offset)
        .ok_or(EncodingError::UnexpectedEof { offset: *offset, context: "sub-block length byte" })?;
    *offset += 1;
    Ok(len)
}
