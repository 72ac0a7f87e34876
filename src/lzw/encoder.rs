//! LZW encoder (C3, §4.3).

use std::collections::HashMap;

use crate::bitio::BitWriter;
use crate::error::EncodingError;

use super::effective_init_code_size;

/// Compresses `data` (a sequence of palette indices) with GIF's variable-width
/// LZW, given the writer-chosen `init_code_size` (`2..=8`, such that
/// `2^init_code_size >= palette.len()`).
pub fn compress(data: &[u8], init_code_size: u8) -> Result<Vec<u8>, EncodingError> {
    let init_code_size = effective_init_code_size(init_code_size);
    let clear_code = 1u16 << init_code_size;
    let end_code = clear_code + 1;
    let mut next_code = end_code + 1;
    let mut width = init_code_size + 1;

    let mut dict: HashMap<Vec<u8>, u16> = HashMap::new();
    let mut w = BitWriter::new();
    w.write_code(clear_code, width)?;

    let Some((&first, rest)) = data.split_first() else {
        w.write_code(end_code, width)?;
        return Ok(w.finish());
    };

    let mut current = vec![first];
    for &byte in rest {
        let mut extended = current.clone();
        extended.push(byte);

        if dict.contains_key(&extended) {
            current = extended;
            continue;
        }

        let code = code_of(&dict, &current, clear_code)?;
        w.write_code(code, width)?;

        if next_code <= 4095 {
            dict.insert(extended, next_code);
            next_code += 1;
            if next_code >= (1u16 << width) && width < 12 {
                width += 1;
            }
        } else {
            // Dictionary full: emit an extra clear code and reset (§4.3 step 4).
            w.write_code(clear_code, width)?;
            dict.clear();
            width = init_code_size + 1;
            next_code = end_code + 1;
        }
        current = vec![byte];
    }

    let code = code_of(&dict, &current, clear_code)?;
    w.write_code(code, width)?;
    w.write_code(end_code, width)?;
    Ok(w.finish())
}

/// Looks up the code for `s`. Single-byte strings are always the literal
/// code equal to their byte value (the dictionary's implicit initial
/// population, §3) — and must be `< clear_code`, since a byte stream of
/// palette indices can never legally reach the reserved codes. Longer
/// strings must already be present because the caller only ever builds `s`
/// by extending a string it just matched.
fn code_of(dict: &HashMap<Vec<u8>, u16>, s: &[u8], clear_code: u16) -> Result<u16, EncodingError> {
    if s.len() == 1 {
        let code = u16::from(s[0]);
        if code >= clear_code {
            return Err(EncodingError::CodeOutOfRange { code: u32::from(code), bits: 8 });
        }
        Ok(code)
    } else {
        Ok(*dict.get(s).expect("current string must have been inserted when first extended"))
    }
}
