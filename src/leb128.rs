//! ULEB128 / SLEB128 decoding against an [`Extractor`] cursor.
//!
//! The shift-and-mask decode loop follows the teacher's `leb.rs`; it reads
//! through a bounds-checked cursor instead of a raw slice, so truncation
//! surfaces as the shared [`Error::Truncation`](crate::error::Error::Truncation)
//! instead of a dedicated LEB128 error type.

use crate::error::Result;
use crate::extractor::Extractor;

/// Decode an unsigned variable-length integer, advancing `cursor` past the
/// bytes consumed.
pub fn read_uleb128(extractor: &Extractor<'_>, cursor: &mut u32) -> Result<u64> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        let byte = extractor.read_u8(cursor)?;
        if shift < 64 {
            result |= u64::from(byte & 0x7f) << shift;
        }
        shift += 7;
        if byte & 0x80 == 0 {
            break;
        }
    }
    Ok(result)
}

/// Decode a signed variable-length integer, advancing `cursor` past the
/// bytes consumed.
pub fn read_sleb128(extractor: &Extractor<'_>, cursor: &mut u32) -> Result<i64> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;
    let mut byte;
    loop {
        byte = extractor.read_u8(cursor)?;
        if shift < 64 {
            result |= i64::from(byte & 0x7f) << shift;
        }
        shift += 7;
        if byte & 0x80 == 0 {
            break;
        }
    }
    if shift < 64 && (byte & 0x40) != 0 {
        result |= -1i64 << shift;
    }
    Ok(result)
}
