//! The legacy Apple accelerator table decoder
//! (`.apple_names`/`.apple_types`/`.apple_namespaces`/`.apple_objc`).

use crate::constants::*;
use crate::dump::{ListScope, Scope, Sink};
use crate::error::{Error, Result};
use crate::extractor::{empty_relocations, Extractor, Relocations};
use crate::form::{DwarfFormat, FormValue, FormatParams};

const HEADER_SIZE: u32 = 20;
const EMPTY_BUCKET: u32 = 0xFFFF_FFFF;

/// The fixed 20-byte table header.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub magic: u32,
    pub version: u16,
    pub hash_function: u16,
    pub bucket_count: u32,
    pub hash_count: u32,
    pub header_data_length: u32,
}

/// One `(atom_type, form)` descriptor pair.
#[derive(Debug, Clone, Copy)]
pub struct AtomDescriptor {
    pub atom_type: u16,
    pub form: u16,
}

/// The variable-length header data: the DIE offset base and the atom list.
#[derive(Debug, Clone)]
pub struct HeaderData {
    pub die_offset_base: u32,
    pub atoms: Vec<AtomDescriptor>,
}

/// One decoded hash-match payload: every atom value, with `die_offset` and
/// `die_tag` additionally captured for convenient access.
#[derive(Debug, Clone)]
pub struct AppleValueEntry {
    pub die_offset: u64,
    pub die_tag: u64,
    pub values: Vec<FormValue>,
}

/// A parsed Apple accelerator table.
pub struct AppleTable<'a> {
    extractor: Extractor<'a>,
    strings: Extractor<'a>,
    header: Header,
    header_data: HeaderData,
    buckets_base: u32,
    hashes_base: u32,
    offsets_base: u32,
    valid: bool,
}

impl<'a> AppleTable<'a> {
    /// Parse a table rooted at offset 0 of `section_bytes`.
    pub fn extract(
        section_bytes: &'a [u8],
        relocations: &'a Relocations,
        string_section_bytes: &'a [u8],
        is_little_endian: bool,
    ) -> Result<Self> {
        let extractor = Extractor::new(section_bytes, relocations, is_little_endian);
        // The string section is read only for null-terminated lookups; it
        // carries no relocations of its own.
        let strings = Extractor::new(string_section_bytes, empty_relocations(), is_little_endian);

        if !extractor.is_valid_range(0, HEADER_SIZE) {
            return Err(Error::Truncation("Section too small: cannot read header.".into()));
        }

        let mut cursor = 0u32;
        let magic = extractor.read_u32(&mut cursor)?;
        let version = extractor.read_u16(&mut cursor)?;
        let hash_function = extractor.read_u16(&mut cursor)?;
        let bucket_count = extractor.read_u32(&mut cursor)?;
        let hash_count = extractor.read_u32(&mut cursor)?;
        let header_data_length = extractor.read_u32(&mut cursor)?;
        let header = Header { magic, version, hash_function, bucket_count, hash_count, header_data_length };

        let index_size = u64::from(HEADER_SIZE)
            + u64::from(header_data_length)
            + 4 * u64::from(bucket_count)
            + 8 * u64::from(hash_count);
        if index_size == 0 || index_size - 1 > u64::from(u32::MAX)
            || !extractor.is_valid_offset((index_size - 1) as u32)
        {
            return Err(Error::Truncation(
                "Section too small: cannot read buckets and hashes.".into(),
            ));
        }

        let die_offset_base = extractor.read_u32(&mut cursor)?;
        let num_atoms = extractor.read_u32(&mut cursor)?;
        let mut atoms = Vec::with_capacity(num_atoms as usize);
        for _ in 0..num_atoms {
            let atom_type = extractor.read_u16(&mut cursor)?;
            let form = extractor.read_u16(&mut cursor)?;
            atoms.push(AtomDescriptor { atom_type, form });
        }
        let header_data = HeaderData { die_offset_base, atoms };

        let buckets_base = HEADER_SIZE + header_data_length;
        let hashes_base = buckets_base + 4 * bucket_count;
        let offsets_base = hashes_base + 4 * hash_count;

        tracing::debug!(
            bucket_count,
            hash_count,
            num_atoms,
            "parsed apple accelerator table header"
        );

        Ok(Self {
            extractor,
            strings,
            header,
            header_data,
            buckets_base,
            hashes_base,
            offsets_base,
            valid: true,
        })
    }

    pub fn get_num_buckets(&self) -> u32 {
        self.header.bucket_count
    }

    pub fn get_num_hashes(&self) -> u32 {
        self.header.hash_count
    }

    pub fn get_atoms_desc(&self) -> &[AtomDescriptor] {
        &self.header_data.atoms
    }

    /// Every atom whose type is `die_offset`, `die_tag`, or `type_flags`
    /// must pair with a form in the constant or flag class, excluding
    /// `SDATA` specifically.
    pub fn validate_forms(&self) -> bool {
        for atom in &self.header_data.atoms {
            if matches!(
                atom.atom_type,
                DW_ATOM_DIE_OFFSET | DW_ATOM_DIE_TAG | DW_ATOM_TYPE_FLAGS
            ) {
                if atom.form == DW_FORM_SDATA {
                    return false;
                }
                if !is_constant_form(atom.form) && !is_flag_form(atom.form) {
                    return false;
                }
            }
        }
        true
    }

    fn format_params(&self) -> FormatParams {
        FormatParams { version: self.header.version, addr_size: 0, format: DwarfFormat::Dwarf32 }
    }

    fn read_atoms(&self, cursor: &mut u32) -> Result<AppleValueEntry> {
        let params = self.format_params();
        let mut die_offset = DW_INVALID_OFFSET;
        let mut die_tag = u64::from(DW_TAG_NULL);
        let mut values = Vec::with_capacity(self.header_data.atoms.len());
        for atom in &self.header_data.atoms {
            let value = FormValue::extract(atom.form, params, &self.extractor, cursor)?;
            match atom.atom_type {
                DW_ATOM_DIE_OFFSET => die_offset = value.as_unsigned().unwrap_or(die_offset),
                DW_ATOM_DIE_TAG => die_tag = value.as_unsigned().unwrap_or(die_tag),
                _ => {}
            }
            values.push(value);
        }
        Ok(AppleValueEntry { die_offset, die_tag, values })
    }

    /// Look up every hash-chain entry whose stored string equals `key`, in
    /// on-disk order.
    pub fn equal_range(&self, key: &str) -> ValueIterator<'_, 'a> {
        if !self.valid || self.header.bucket_count == 0 {
            return ValueIterator::empty(self);
        }
        let hash = djb_hash(key);
        let bucket = hash % self.header.bucket_count;

        let mut bcur = self.buckets_base + 4 * bucket;
        let index = match self.extractor.read_u32(&mut bcur) {
            Ok(v) => v,
            Err(_) => return ValueIterator::empty(self),
        };
        if index == EMPTY_BUCKET {
            return ValueIterator::empty(self);
        }

        for hash_idx in index..self.header.hash_count {
            let mut hcur = self.hashes_base + 4 * hash_idx;
            let h = match self.extractor.read_u32(&mut hcur) {
                Ok(v) => v,
                Err(_) => break,
            };
            if h % self.header.bucket_count != bucket {
                break;
            }
            let mut ocur = self.offsets_base + 4 * hash_idx;
            let data_offset = match self.extractor.read_u32(&mut ocur) {
                Ok(v) => v,
                Err(_) => break,
            };

            let mut name_cursor = data_offset;
            loop {
                let string_offset = match self.extractor.read_relocated_u32(&mut name_cursor) {
                    Ok(v) => v,
                    Err(_) => break,
                };
                if string_offset == 0 {
                    break;
                }
                match self.strings.read_cstr_at(string_offset) {
                    Ok(s) if s == key => {
                        return ValueIterator::new(self, name_cursor)
                            .unwrap_or_else(|_| ValueIterator::empty(self));
                    }
                    Err(_) => break,
                    _ => {}
                }
                let num_data = match self.extractor.read_u32(&mut name_cursor) {
                    Ok(v) => v,
                    Err(_) => break,
                };
                let mut skip_ok = true;
                for _ in 0..num_data {
                    if self.read_atoms(&mut name_cursor).is_err() {
                        skip_ok = false;
                        break;
                    }
                }
                if !skip_ok {
                    break;
                }
            }
        }

        ValueIterator::empty(self)
    }

    /// Print the header, the atom list, and every bucket's contents.
    pub fn dump(&self, sink: &mut dyn Sink) {
        {
            let mut scope = Scope::open(sink, "AppleTable");
            let s = scope.sink();
            s.print_hex("magic", self.header.magic as u64);
            s.print_number("version", self.header.version as u64);
            s.print_number("hash_function", self.header.hash_function as u64);
            s.print_number("bucket_count", self.header.bucket_count as u64);
            s.print_number("hash_count", self.header.hash_count as u64);
            s.print_hex("die_offset_base", self.header_data.die_offset_base as u64);
            {
                let mut atoms = ListScope::open(s, "atoms");
                for atom in &self.header_data.atoms {
                    atoms.sink().print_hex("atom_type", atom.atom_type as u64);
                    atoms.sink().print_hex("form", atom.form as u64);
                }
            }

            for bucket in 0..self.header.bucket_count {
                let mut bcur = self.buckets_base + 4 * bucket;
                let index = match self.extractor.read_u32(&mut bcur) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(bucket, error = %e, "failed to read bucket entry");
                        continue;
                    }
                };
                if index == EMPTY_BUCKET {
                    s.print_string(&format!("Bucket {bucket}"), "EMPTY");
                    continue;
                }
                let mut list = ListScope::open(s, &format!("Bucket {bucket}"));
                for hash_idx in index..self.header.hash_count {
                    let mut hcur = self.hashes_base + 4 * hash_idx;
                    let h = match self.extractor.read_u32(&mut hcur) {
                        Ok(v) => v,
                        Err(_) => break,
                    };
                    if h % self.header.bucket_count != bucket {
                        break;
                    }
                    let mut ocur = self.offsets_base + 4 * hash_idx;
                    let data_offset = match self.extractor.read_u32(&mut ocur) {
                        Ok(v) => v,
                        Err(_) => break,
                    };
                    self.dump_name_chain(list.sink(), data_offset);
                }
            }
        }
    }

    fn dump_name_chain(&self, sink: &mut dyn Sink, mut cursor: u32) {
        loop {
            let string_offset = match self.extractor.read_relocated_u32(&mut cursor) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "truncated name chain");
                    return;
                }
            };
            if string_offset == 0 {
                return;
            }
            let name = self.strings.read_cstr_at(string_offset).unwrap_or("<invalid>");
            let mut name_scope = Scope::open(sink, name);
            name_scope.sink().print_hex("string_offset", string_offset as u64);
            let num_data = match self.extractor.read_u32(&mut cursor) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "truncated num_data");
                    return;
                }
            };
            for _ in 0..num_data {
                match self.read_atoms(&mut cursor) {
                    Ok(entry) => {
                        let mut item = Scope::open(name_scope.sink(), "entry");
                        item.sink().print_hex("die_offset", entry.die_offset);
                        item.sink().print_hex("die_tag", entry.die_tag);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to decode atom values");
                        return;
                    }
                }
            }
        }
    }
}

/// A lazy iterator over the payload entries of one matched name.
pub struct ValueIterator<'t, 'a> {
    table: &'t AppleTable<'a>,
    cursor: u32,
    num_data: u32,
    data: u32,
    exhausted: bool,
}

impl<'t, 'a> ValueIterator<'t, 'a> {
    fn new(table: &'t AppleTable<'a>, data_offset: u32) -> Result<Self> {
        if !table.extractor.is_valid_range(data_offset, 4) {
            return Err(Error::Truncation(
                "Section too small: cannot read entry data count.".into(),
            ));
        }
        let mut cursor = data_offset;
        let num_data = table.extractor.read_u32(&mut cursor)?;
        Ok(Self { table, cursor, num_data, data: 0, exhausted: false })
    }

    fn empty(table: &'t AppleTable<'a>) -> Self {
        Self { table, cursor: 0, num_data: 0, data: 0, exhausted: true }
    }
}

impl Iterator for ValueIterator<'_, '_> {
    type Item = Result<AppleValueEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted || self.data >= self.num_data {
            self.exhausted = true;
            return None;
        }
        let result = self.table.read_atoms(&mut self.cursor);
        self.data += 1;
        match result {
            Ok(entry) => Some(Ok(entry)),
            Err(e) => {
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }
}

impl PartialEq for ValueIterator<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        if self.exhausted && other.exhausted {
            return true;
        }
        std::ptr::eq(self.table, other.table) && self.cursor == other.cursor
    }
}

fn is_constant_form(form: u16) -> bool {
    matches!(
        form,
        DW_FORM_DATA1 | DW_FORM_DATA2 | DW_FORM_DATA4 | DW_FORM_DATA8 | DW_FORM_UDATA | DW_FORM_SDATA
    )
}

fn is_flag_form(form: u16) -> bool {
    matches!(form, DW_FORM_FLAG | DW_FORM_FLAG_PRESENT)
}

/// The DJB hash used throughout: `h = 5381; for c in key: h = 33*h + c`.
pub fn djb_hash(key: &str) -> u32 {
    let mut h: u32 = 5381;
    for byte in key.bytes() {
        h = h.wrapping_mul(33).wrapping_add(u32::from(byte));
    }
    h
}
