//! LZW decoder (C4, §4.4). Mirrors the encoder; the dictionary is stored as
//! `(prefix_code, last_byte)` pairs rather than full strings (§9 design
//! note), reconstructing a string on demand by walking the prefix chain.

use crate::bitio::BitReader;
use crate::error::EncodingError;

use super::effective_init_code_size;

/// Decompresses an LZW bitstream produced by [`super::encoder::compress`].
pub fn decompress(data: &[u8], init_code_size: u8) -> Result<Vec<u8>, EncodingError> {
    let init_code_size = effective_init_code_size(init_code_size);
    let clear_code = 1u16 << init_code_size;
    let end_code = clear_code + 1;
    let first_dynamic_code = end_code + 1;

    let mut next_code = first_dynamic_code;
    let mut width = init_code_size + 1;
    // Entry for dynamic code `first_dynamic_code + i` lives at index `i`.
    let mut dict: Vec<(u16, u8)> = Vec::new();
    let mut reader = BitReader::new(data);
    let mut out = Vec::new();
    let mut previous: Option<(u16, Vec<u8>)> = None;
    let mut symbol_index = 0usize;

    loop {
        let code = reader.read_code(width).ok_or(EncodingError::UnexpectedEof {
            offset: data.len(),
            context: "LZW stream ended before the end code",
        })?;
        symbol_index += 1;

        if code == clear_code {
            dict.clear();
            next_code = first_dynamic_code;
            width = init_code_size + 1;
            previous = None;
            continue;
        }
        if code == end_code {
            return Ok(out);
        }

        let s: Vec<u8> = if code < clear_code {
            vec![code as u8]
        } else if code >= first_dynamic_code && (code - first_dynamic_code) as usize < dict.len() {
            resolve_chain(&dict, clear_code, first_dynamic_code, code)
        } else if code == next_code {
            // KwKwK: the code refers to the entry about to be created.
            match &previous {
                Some((_, prev_string)) => {
                    let mut s = prev_string.clone();
                    s.push(prev_string[0]);
                    s
                }
                None => {
                    return Err(EncodingError::UnknownLzwCode {
                        code,
                        dict_size: dict.len(),
                        width,
                        symbol_index,
                    })
                }
            }
        } else {
            return Err(EncodingError::UnknownLzwCode { code, dict_size: dict.len(), width, symbol_index });
        };

        out.extend_from_slice(&s);

        if let Some((prev_code, _)) = previous {
            if next_code <= 4095 {
                dict.push((prev_code, s[0]));
                next_code += 1;
                // Growth happens right after the insertion that filled the
                // current width — matching the encoder's pre-emission
                // growth (§4.4 "Boundary").
                if next_code >= (1u16 << width) && width < 12 {
                    width += 1;
                }
            }
        }

        previous = Some((code, s));
    }
}

/// Walks the `(prefix_code, last_byte)` chain for `code` back to a literal
/// byte, and returns the resulting string in forward order.
fn resolve_chain(dict: &[(u16, u8)], clear_code: u16, first_dynamic_code: u16, code: u16) -> Vec<u8> {
    let mut bytes_rev = Vec::new();
    let mut current = code;
    loop {
        if current < clear_code {
            bytes_rev.push(current as u8);
            break;
        }
        let (prefix, last) = dict[(current - first_dynamic_code) as usize];
        bytes_rev.push(last);
        current = prefix;
    }
    bytes_rev.reverse();
    bytes_rev
}
