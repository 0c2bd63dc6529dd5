//! Bounds-checked, cursor-based reading over a borrowed byte blob.
//!
//! An [`Extractor`] never owns the bytes it reads and never mutates its own
//! cursor — cursors are plain `u32` values threaded through by the caller.
//! Every read either succeeds and advances the caller's cursor, or fails and
//! leaves it untouched.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// An immutable side table of relocations, keyed by the byte offset of the
/// word they patch.
#[derive(Debug, Default, Clone)]
pub struct Relocations {
    entries: HashMap<u32, u32>,
}

impl Relocations {
    /// An empty relocation table — every `read_relocated_u32` behaves like a
    /// plain `read_u32`.
    pub fn empty() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Build a relocation table from `(offset, value)` pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = (u32, u32)>) -> Self {
        Self { entries: entries.into_iter().collect() }
    }

    /// The relocated value registered at `offset`, if any.
    pub fn get(&self, offset: u32) -> Option<u32> {
        self.entries.get(&offset).copied()
    }
}

/// A process-wide empty relocation table, shared by extractors built over
/// data that is never relocated (string sections, standalone test blobs).
pub fn empty_relocations() -> &'static Relocations {
    static EMPTY: std::sync::OnceLock<Relocations> = std::sync::OnceLock::new();
    EMPTY.get_or_init(Relocations::empty)
}

/// A bounds-checked reader over a borrowed byte slice, aware of a borrowed
/// relocation table and a fixed endianness.
///
/// `Copy`/`Clone` because every field is a shared reference or a plain flag;
/// parsed structures that need their own extractor (each DWARF v5 unit, for
/// instance) can simply hold a copy instead of fighting self-referential
/// lifetimes.
#[derive(Debug, Clone, Copy)]
pub struct Extractor<'a> {
    data: &'a [u8],
    relocations: &'a Relocations,
    little_endian: bool,
}

impl<'a> Extractor<'a> {
    /// Wrap `data`, consulting `relocations` for relocated word reads.
    pub fn new(data: &'a [u8], relocations: &'a Relocations, little_endian: bool) -> Self {
        Self { data, relocations, little_endian }
    }

    /// The length of the underlying blob.
    pub fn len(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether `offset` is a valid (inclusive) position within the blob —
    /// i.e. a read of zero bytes starting there would not go out of bounds.
    pub fn is_valid_offset(&self, offset: u32) -> bool {
        offset <= self.len()
    }

    /// Whether a read of `size` bytes starting at `offset` stays within the
    /// blob, without actually performing the read.
    pub fn is_valid_range(&self, offset: u32, size: u32) -> bool {
        match offset.checked_add(size) {
            Some(end) => end <= self.len(),
            None => false,
        }
    }

    fn bytes_at(&self, offset: u32, size: u32) -> Result<&'a [u8]> {
        if !self.is_valid_range(offset, size) {
            return Err(Error::Truncation(format!(
                "read of {size} bytes at offset {offset} exceeds section of {} bytes",
                self.len()
            )));
        }
        Ok(&self.data[offset as usize..(offset + size) as usize])
    }

    /// Read one byte, advancing `cursor`.
    pub fn read_u8(&self, cursor: &mut u32) -> Result<u8> {
        let bytes = self.bytes_at(*cursor, 1)?;
        *cursor += 1;
        Ok(bytes[0])
    }

    /// Read a little- or big-endian (per construction) `u16`, advancing
    /// `cursor`.
    pub fn read_u16(&self, cursor: &mut u32) -> Result<u16> {
        let bytes = self.bytes_at(*cursor, 2)?;
        let array: [u8; 2] = bytes.try_into().expect("bytes_at returned 2 bytes");
        *cursor += 2;
        Ok(if self.little_endian {
            u16::from_le_bytes(array)
        } else {
            u16::from_be_bytes(array)
        })
    }

    /// Read a `u32`, advancing `cursor`. Does not consult relocations — use
    /// [`Extractor::read_relocated_u32`] for offsets that may be patched.
    pub fn read_u32(&self, cursor: &mut u32) -> Result<u32> {
        let bytes = self.bytes_at(*cursor, 4)?;
        let array: [u8; 4] = bytes.try_into().expect("bytes_at returned 4 bytes");
        *cursor += 4;
        Ok(if self.little_endian {
            u32::from_le_bytes(array)
        } else {
            u32::from_be_bytes(array)
        })
    }

    /// Read a `u64`, advancing `cursor`.
    pub fn read_u64(&self, cursor: &mut u32) -> Result<u64> {
        let bytes = self.bytes_at(*cursor, 8)?;
        let array: [u8; 8] = bytes.try_into().expect("bytes_at returned 8 bytes");
        *cursor += 8;
        Ok(if self.little_endian {
            u64::from_le_bytes(array)
        } else {
            u64::from_be_bytes(array)
        })
    }

    /// Read a `u32`, substituting any relocation registered at the
    /// *pre-read* cursor position.
    pub fn read_relocated_u32(&self, cursor: &mut u32) -> Result<u32> {
        let site = *cursor;
        let raw = self.read_u32(cursor)?;
        Ok(self.relocations.get(site).unwrap_or(raw))
    }

    /// Decode a ULEB128-encoded unsigned integer, advancing `cursor` by the
    /// number of bytes consumed.
    pub fn read_uleb128(&self, cursor: &mut u32) -> Result<u64> {
        crate::leb128::read_uleb128(self, cursor)
    }

    /// Decode a SLEB128-encoded signed integer, advancing `cursor` by the
    /// number of bytes consumed.
    pub fn read_sleb128(&self, cursor: &mut u32) -> Result<i64> {
        crate::leb128::read_sleb128(self, cursor)
    }

    /// Read `size` raw bytes starting at `cursor`, advancing it.
    pub fn read_bytes(&self, cursor: &mut u32, size: u32) -> Result<&'a [u8]> {
        let bytes = self.bytes_at(*cursor, size)?;
        *cursor += size;
        Ok(bytes)
    }

    /// Read a NUL-terminated string starting at `offset` (does not advance
    /// any cursor — used for string-section lookups by absolute offset).
    pub fn read_cstr_at(&self, offset: u32) -> Result<&'a str> {
        if !self.is_valid_offset(offset) {
            return Err(Error::Truncation(format!(
                "string offset {offset} exceeds section of {} bytes",
                self.len()
            )));
        }
        let start = offset as usize;
        let rest = &self.data[start..];
        let nul = rest.iter().position(|&b| b == 0).ok_or_else(|| {
            Error::Truncation(format!("unterminated string at offset {offset}"))
        })?;
        std::str::from_utf8(&rest[..nul])
            .map_err(|e| Error::Truncation(format!("invalid utf8 string at offset {offset}: {e}")))
    }
}
