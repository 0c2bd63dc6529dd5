//! The DWARF v5 `.debug_names` decoder.
//!
//! A `.debug_names` section is a chain of self-contained units; each unit
//! carries its own abbreviation table, compile/type-unit offset arrays,
//! bucket/hash/name arrays, and entry pool. [`DebugNames::extract`] parses
//! the whole chain; [`NameIndex`] is one unit.

use std::collections::HashMap;

use crate::dump::{ListScope, Scope, Sink};
use crate::error::{Error, Result};
use crate::extractor::{empty_relocations, Extractor, Relocations};
use crate::form::{DwarfFormat, FormValue, FormatParams};

const HEADER_FIXED_SIZE: u32 = 36;

/// The fixed part of a name-index unit header (36 bytes), plus the
/// (4-byte-padded) augmentation string.
#[derive(Debug, Clone)]
pub struct UnitHeader {
    pub unit_length: u32,
    pub version: u16,
    pub cu_count: u32,
    pub local_tu_count: u32,
    pub foreign_tu_count: u32,
    pub bucket_count: u32,
    pub name_count: u32,
    pub abbrev_table_size: u32,
    pub augmentation_string: Vec<u8>,
}

/// One `(index_code, form_code)` pair inside an abbreviation's attribute
/// list. `(0, 0)` is the sentinel terminator.
#[derive(Debug, Clone, Copy)]
pub struct AttributeEncoding {
    pub index_code: u32,
    pub form_code: u32,
}

/// One abbreviation: a tag plus the ordered attribute encodings every
/// entry referencing this code carries.
#[derive(Debug, Clone)]
pub struct Abbrev {
    pub code: u32,
    pub tag: u32,
    pub attributes: Vec<AttributeEncoding>,
}

/// An insertion-ordered set of [`Abbrev`]s keyed by code — no crate in this
/// workspace's dependency stack supplies an order-preserving map, so this
/// is a small hand-rolled parallel `Vec` + index.
#[derive(Debug, Clone, Default)]
pub struct AbbrevTable {
    entries: Vec<Abbrev>,
    by_code: HashMap<u32, usize>,
}

impl AbbrevTable {
    fn parse(extractor: &Extractor<'_>, cursor: &mut u32, limit: u32) -> Result<Self> {
        let mut table = AbbrevTable::default();
        loop {
            if *cursor > limit {
                return Err(Error::MalformedAbbrev(
                    "Incorrectly terminated abbreviation table.".into(),
                ));
            }
            let code = extractor.read_uleb128(cursor)?;
            if *cursor > limit {
                return Err(Error::MalformedAbbrev(
                    "Incorrectly terminated abbreviation table.".into(),
                ));
            }
            if code == 0 {
                break;
            }
            let code = code as u32;
            let tag = extractor.read_uleb128(cursor)? as u32;
            if *cursor > limit {
                return Err(Error::MalformedAbbrev(
                    "Incorrectly terminated abbreviation table.".into(),
                ));
            }
            let mut attributes = Vec::new();
            loop {
                let index_code = extractor.read_uleb128(cursor)? as u32;
                let form_code = extractor.read_uleb128(cursor)? as u32;
                if *cursor > limit {
                    return Err(Error::MalformedAbbrev(
                        "Incorrectly terminated abbreviation table.".into(),
                    ));
                }
                if index_code == 0 && form_code == 0 {
                    break;
                }
                attributes.push(AttributeEncoding { index_code, form_code });
            }
            if table.by_code.contains_key(&code) {
                return Err(Error::MalformedAbbrev("Duplicate abbreviation code.".into()));
            }
            table.by_code.insert(code, table.entries.len());
            table.entries.push(Abbrev { code, tag, attributes });
        }
        Ok(table)
    }

    fn get(&self, code: u32) -> Option<&Abbrev> {
        self.by_code.get(&code).map(|&i| &self.entries[i])
    }

    /// The abbreviations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Abbrev> {
        self.entries.iter()
    }
}

/// One decoded entry: the abbreviation it was built from, and one
/// [`FormValue`] per attribute, positionally matched.
#[derive(Debug, Clone)]
pub struct Entry<'u> {
    pub abbrev: &'u Abbrev,
    pub values: Vec<FormValue>,
}

/// One parsed name-table entry: where the name's string lives, and where
/// its entry-pool chain starts.
#[derive(Debug, Clone, Copy)]
pub struct NameTableEntry {
    pub string_offset: u32,
    pub entry_offset: u32,
}

/// One chained `.debug_names` unit.
pub struct NameIndex<'a> {
    extractor: Extractor<'a>,
    strings: Extractor<'a>,
    header: UnitHeader,
    cus_base: u32,
    buckets_base: u32,
    hashes_base: u32,
    string_offsets_base: u32,
    entry_offsets_base: u32,
    entries_base: u32,
    abbrevs: AbbrevTable,
}

impl<'a> NameIndex<'a> {
    fn extract(extractor: Extractor<'a>, strings: Extractor<'a>, base: u32) -> Result<Self> {
        if !extractor.is_valid_range(base, HEADER_FIXED_SIZE) {
            return Err(Error::Truncation("Section too small: cannot read header.".into()));
        }

        let mut cursor = base;
        let unit_length = extractor.read_u32(&mut cursor)?;
        let version = extractor.read_u16(&mut cursor)?;
        let _padding = extractor.read_u16(&mut cursor)?;
        let cu_count = extractor.read_u32(&mut cursor)?;
        let local_tu_count = extractor.read_u32(&mut cursor)?;
        let foreign_tu_count = extractor.read_u32(&mut cursor)?;
        let bucket_count = extractor.read_u32(&mut cursor)?;
        let name_count = extractor.read_u32(&mut cursor)?;
        let abbrev_table_size = extractor.read_u32(&mut cursor)?;
        let augmentation_size = extractor.read_u32(&mut cursor)?;

        if !extractor.is_valid_range(cursor, augmentation_size) {
            return Err(Error::Truncation(
                "Section too small: cannot read header augmentation.".into(),
            ));
        }
        let augmentation_string = extractor.read_bytes(&mut cursor, augmentation_size)?.to_vec();
        cursor = (cursor + 3) & !3u32;

        let header = UnitHeader {
            unit_length,
            version,
            cu_count,
            local_tu_count,
            foreign_tu_count,
            bucket_count,
            name_count,
            abbrev_table_size,
            augmentation_string,
        };

        let cus_base = cursor;
        cursor = cursor
            .checked_add(4 * cu_count)
            .and_then(|c| c.checked_add(4 * local_tu_count))
            .and_then(|c| c.checked_add(8 * foreign_tu_count))
            .ok_or_else(|| Error::Truncation("Section too small: cannot read unit offset arrays.".into()))?;

        let buckets_base = cursor;
        cursor = cursor
            .checked_add(4 * bucket_count)
            .ok_or_else(|| Error::Truncation("Section too small: cannot read buckets.".into()))?;

        let hashes_base = cursor;
        if bucket_count > 0 {
            cursor = cursor
                .checked_add(4 * name_count)
                .ok_or_else(|| Error::Truncation("Section too small: cannot read hashes.".into()))?;
        }

        let string_offsets_base = cursor;
        cursor = cursor
            .checked_add(4 * name_count)
            .ok_or_else(|| Error::Truncation("Section too small: cannot read string offsets.".into()))?;

        let entry_offsets_base = cursor;
        cursor = cursor
            .checked_add(4 * name_count)
            .ok_or_else(|| Error::Truncation("Section too small: cannot read entry offsets.".into()))?;

        if !extractor.is_valid_range(cursor, abbrev_table_size) {
            return Err(Error::Truncation("Section too small: cannot read abbreviations.".into()));
        }
        let entries_base = cursor + abbrev_table_size;
        let abbrevs = AbbrevTable::parse(&extractor, &mut cursor, entries_base)?;

        tracing::debug!(
            version = header.version,
            cu_count,
            name_count,
            bucket_count,
            "parsed debug_names unit"
        );

        Ok(Self {
            extractor,
            strings,
            header,
            cus_base,
            buckets_base,
            hashes_base,
            string_offsets_base,
            entry_offsets_base,
            entries_base,
            abbrevs,
        })
    }

    pub fn header(&self) -> &UnitHeader {
        &self.header
    }

    pub fn abbrevs(&self) -> &AbbrevTable {
        &self.abbrevs
    }

    /// The `i`-th compile-unit offset, `0 <= i < cu_count`.
    pub fn get_cu_offset(&self, i: u32) -> Result<u32> {
        let mut cursor = self.cus_base + 4 * i;
        self.extractor.read_u32(&mut cursor)
    }

    /// The `i`-th local type-unit offset, `0 <= i < local_tu_count`.
    ///
    /// Resolved per the design note on `get_local_tu_offset`: this follows
    /// the on-disk contract (`cus_base + 4*cu_count + 4*i`) rather than a
    /// possible off-by-unit bug in the source this was distilled from.
    pub fn get_local_tu_offset(&self, i: u32) -> Result<u32> {
        let mut cursor = self.cus_base + 4 * self.header.cu_count + 4 * i;
        self.extractor.read_u32(&mut cursor)
    }

    /// The `i`-th foreign type-unit signature, `0 <= i < foreign_tu_count`.
    pub fn get_foreign_tu_offset(&self, i: u32) -> Result<u64> {
        let mut cursor =
            self.cus_base + 4 * self.header.cu_count + 4 * self.header.local_tu_count + 8 * i;
        self.extractor.read_u64(&mut cursor)
    }

    /// `buckets[b]`, 1-based start index into the hash/name arrays, `0` if
    /// the bucket is empty.
    pub fn get_bucket_array_entry(&self, b: u32) -> Result<u32> {
        let mut cursor = self.buckets_base + 4 * b;
        self.extractor.read_u32(&mut cursor)
    }

    /// `hashes[i]`, `1 <= i <= name_count`. Only meaningful when
    /// `bucket_count > 0`.
    pub fn get_hash_array_entry(&self, i: u32) -> Result<u32> {
        if self.header.bucket_count == 0 {
            return Err(Error::Truncation(
                "hash array absent: bucket_count is zero".into(),
            ));
        }
        let mut cursor = self.hashes_base + 4 * (i - 1);
        self.extractor.read_u32(&mut cursor)
    }

    /// The `i`-th name-table entry, `1 <= i <= name_count`: the relocated
    /// string offset and the entry-pool offset (rebased to be absolute
    /// within the section).
    pub fn get_name_table_entry(&self, i: u32) -> Result<NameTableEntry> {
        let mut string_cursor = self.string_offsets_base + 4 * (i - 1);
        let string_offset = self.extractor.read_relocated_u32(&mut string_cursor)?;
        let mut entry_cursor = self.entry_offsets_base + 4 * (i - 1);
        let relative = self.extractor.read_u32(&mut entry_cursor)?;
        Ok(NameTableEntry { string_offset, entry_offset: relative + self.entries_base })
    }

    fn format_params(&self) -> FormatParams {
        FormatParams { version: self.header.version, addr_size: 0, format: DwarfFormat::Dwarf32 }
    }

    /// Decode one entry at `cursor`, advancing it. Returns `Ok(None)` at
    /// the sentinel terminator (`code == 0`), never surfacing it as an
    /// error.
    pub fn get_entry(&self, cursor: &mut u32) -> Result<Option<Entry<'_>>> {
        if !self.extractor.is_valid_offset(*cursor) {
            return Err(Error::Truncation("Incorrectly terminated entry list".into()));
        }
        let code = self.extractor.read_uleb128(cursor)?;
        if code == 0 {
            return Ok(None);
        }
        let code = code as u32;
        let abbrev = self
            .abbrevs
            .get(code)
            .ok_or(Error::InvalidAbbrev(code))?;

        let params = self.format_params();
        let mut values = Vec::with_capacity(abbrev.attributes.len());
        for attr in &abbrev.attributes {
            let value = FormValue::extract(attr.form_code as u16, params, &self.extractor, cursor)
                .map_err(|e| Error::FormExtractFailure(e.to_string()))?;
            values.push(value);
        }
        Ok(Some(Entry { abbrev, values }))
    }

    /// Visit every name in bucket `bucket`, calling `visit(name_index)` for
    /// each. Stops as soon as a hash no longer belongs to this bucket.
    pub fn for_each_name_in_bucket(&self, bucket: u32, mut visit: impl FnMut(u32)) -> Result<()> {
        let start = self.get_bucket_array_entry(bucket)?;
        if start == 0 || start > self.header.name_count {
            return Ok(());
        }
        let mut i = start;
        while i <= self.header.name_count {
            let h = self.get_hash_array_entry(i)?;
            if h % self.header.bucket_count != bucket {
                break;
            }
            visit(i);
            i += 1;
        }
        Ok(())
    }

    /// Emit the header, CU/TU offset lists, abbreviation table, and either
    /// the bucketised or linear name traversal.
    pub fn dump(&self, sink: &mut dyn Sink) {
        let mut scope = Scope::open(sink, "NameIndex");
        let s = scope.sink();
        s.print_number("version", self.header.version as u64);
        s.print_number("cu_count", self.header.cu_count as u64);
        s.print_number("local_tu_count", self.header.local_tu_count as u64);
        s.print_number("foreign_tu_count", self.header.foreign_tu_count as u64);
        s.print_number("bucket_count", self.header.bucket_count as u64);
        s.print_number("name_count", self.header.name_count as u64);

        if self.header.cu_count > 0 {
            let mut list = ListScope::open(s, "cu_offsets");
            for i in 0..self.header.cu_count {
                match self.get_cu_offset(i) {
                    Ok(v) => list.sink().print_hex("cu_offset", v as u64),
                    Err(e) => tracing::warn!(error = %e, "failed to read cu offset"),
                }
            }
        }
        if self.header.local_tu_count > 0 {
            let mut list = ListScope::open(s, "local_tu_offsets");
            for i in 0..self.header.local_tu_count {
                match self.get_local_tu_offset(i) {
                    Ok(v) => list.sink().print_hex("local_tu_offset", v as u64),
                    Err(e) => tracing::warn!(error = %e, "failed to read local tu offset"),
                }
            }
        }
        if self.header.foreign_tu_count > 0 {
            let mut list = ListScope::open(s, "foreign_tu_offsets");
            for i in 0..self.header.foreign_tu_count {
                match self.get_foreign_tu_offset(i) {
                    Ok(v) => list.sink().print_hex("foreign_tu_signature", v),
                    Err(e) => tracing::warn!(error = %e, "failed to read foreign tu offset"),
                }
            }
        }

        {
            let mut list = ListScope::open(s, "abbreviations");
            for abbrev in self.abbrevs.iter() {
                let mut a = Scope::open(list.sink(), "abbrev");
                a.sink().print_number("code", abbrev.code as u64);
                a.sink().print_hex("tag", abbrev.tag as u64);
            }
        }

        let mut names = ListScope::open(s, "names");
        if self.header.bucket_count == 0 {
            for i in 1..=self.header.name_count {
                self.dump_name(names.sink(), i);
            }
        } else {
            for bucket in 0..self.header.bucket_count {
                let result = self.for_each_name_in_bucket(bucket, |i| {
                    self.dump_name(names.sink(), i);
                });
                if let Err(e) = result {
                    tracing::warn!(bucket, error = %e, "failed to walk bucket");
                }
            }
        }
    }

    fn dump_name(&self, sink: &mut dyn Sink, i: u32) {
        let entry = match self.get_name_table_entry(i) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(index = i, error = %e, "failed to read name table entry");
                return;
            }
        };
        let name = self.strings.read_cstr_at(entry.string_offset).unwrap_or("<invalid>");
        let mut name_scope = Scope::open(sink, name);
        name_scope.sink().print_hex("string_offset", entry.string_offset as u64);

        let mut cursor = entry.entry_offset;
        loop {
            match self.get_entry(&mut cursor) {
                Ok(None) => break,
                Ok(Some(decoded)) => {
                    let mut item = Scope::open(name_scope.sink(), "entry");
                    item.sink().print_hex("tag", decoded.abbrev.tag as u64);
                    for (attr, value) in decoded.abbrev.attributes.iter().zip(decoded.values.iter()) {
                        item.sink().print_string(
                            &format!("idx_{}", attr.index_code),
                            &value.to_string(),
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(name = name, error = %e, "stopping entry stream after error");
                    break;
                }
            }
        }
    }
}

/// A fully parsed `.debug_names` section: the chain of [`NameIndex`] units
/// it contains.
pub struct DebugNames<'a> {
    units: Vec<NameIndex<'a>>,
}

impl<'a> DebugNames<'a> {
    /// Parse every unit in `section_bytes`, starting at offset 0.
    pub fn extract(
        section_bytes: &'a [u8],
        relocations: &'a Relocations,
        string_section_bytes: &'a [u8],
        is_little_endian: bool,
    ) -> Result<Self> {
        let extractor = Extractor::new(section_bytes, relocations, is_little_endian);
        let strings = Extractor::new(string_section_bytes, empty_relocations(), is_little_endian);

        let mut units = Vec::new();
        let mut base = 0u32;
        while base < extractor.len() {
            let unit = NameIndex::extract(extractor, strings, base)?;
            let next = base
                .checked_add(4)
                .and_then(|c| c.checked_add(unit.header.unit_length))
                .ok_or_else(|| Error::Truncation("unit_length overflows section".into()))?;
            units.push(unit);
            base = next;
        }

        tracing::debug!(unit_count = units.len(), "parsed debug_names section");
        Ok(Self { units })
    }

    /// The parsed units, in on-disk order.
    pub fn units(&self) -> &[NameIndex<'a>] {
        &self.units
    }

    /// Dump every unit in turn.
    pub fn dump(&self, sink: &mut dyn Sink) {
        let mut scope = Scope::open(sink, "DebugNames");
        for unit in &self.units {
            unit.dump(scope.sink());
        }
    }
}
