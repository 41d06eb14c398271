//! Unsigned LEB128 variable-length integers.
//!
//! Used both for the multihash prefix and for the canonical node encoding.

use thiserror::Error;

/// Errors from decoding a varint.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    #[error("truncated varint")]
    Truncated,

    #[error("varint overflow")]
    Overflow,
}

/// Append `value` to `buf` as an unsigned varint.
pub fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Number of bytes `value` occupies when varint-encoded.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Decode a varint from the front of `data`. Returns (value, bytes_consumed).
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize), VarintError> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    for (i, &byte) in data.iter().enumerate() {
        if shift == 63 && byte > 1 {
            return Err(VarintError::Overflow);
        }
        value |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
        if shift > 63 {
            return Err(VarintError::Overflow);
        }
    }
    Err(VarintError::Truncated)
}
