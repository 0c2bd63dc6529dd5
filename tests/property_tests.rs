//! Property-based checks for spec.md §8's invariants P1–P6.

mod common;

use dwarf_accel::apple::AppleTable;
use dwarf_accel::constants::*;
use dwarf_accel::debug_names::DebugNames;
use dwarf_accel::extractor::Relocations;
use proptest::prelude::*;

proptest! {
    /// P2 (generalised): parsing arbitrary bytes as an Apple table never
    /// panics — either it succeeds or it reports a `Truncation`-family
    /// error.
    #[test]
    fn apple_extract_never_panics(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let relocs = Relocations::empty();
        let _ = AppleTable::extract(&data, &relocs, &[], true);
    }

    /// P2 (generalised): same, for `.debug_names`.
    #[test]
    fn debug_names_extract_never_panics(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let relocs = Relocations::empty();
        let _ = DebugNames::extract(&data, &relocs, &[], true);
    }

    /// P2: truncating a well-formed Apple table below the minimum size
    /// that covers its header, atom list, buckets, and hashes always
    /// surfaces a `Truncation` — and never reads past the truncation
    /// point (bounds-checked reads mean this follows from not panicking).
    #[test]
    fn apple_truncation_below_minimum_always_fails(t in 0u32..36) {
        let full = common::apple_empty_buckets(2);
        let relocs = Relocations::empty();
        let truncated = &full[..t as usize];
        prop_assert!(AppleTable::extract(truncated, &relocs, &[], true).is_err());
    }

    /// P2: truncating a well-formed no-hash-table `.debug_names` unit
    /// below the point where its abbreviation table becomes readable
    /// always fails. (A truncation to zero bytes is not included here:
    /// an empty section is a legitimate zero-unit `.debug_names`, per
    /// `DebugNames::extract`'s `while base < len` chain loop.)
    #[test]
    fn debug_names_truncation_below_abbrev_region_always_fails(t in 1u32..61) {
        let (full, strings) = common::debug_names_no_hash_table(&["a", "b", "c"]);
        let relocs = Relocations::empty();
        let truncated = &full[..t as usize];
        prop_assert!(DebugNames::extract(truncated, &relocs, &strings, true).is_err());
    }

    /// P1: `equal_range` finds exactly the inserted key and nothing else.
    #[test]
    fn apple_equal_range_finds_only_the_matching_key(
        name in "[a-zA-Z][a-zA-Z0-9]{0,15}",
        other in "[a-zA-Z][a-zA-Z0-9]{0,15}",
        die_offset in any::<u32>(),
    ) {
        prop_assume!(name != other);
        let fixture = common::apple_single_bucket_one_hit(&name, &[die_offset]);
        let relocs = Relocations::empty();
        let table = AppleTable::extract(&fixture.section, &relocs, &fixture.strings, true).unwrap();

        let hits: Vec<_> = table.equal_range(&name).collect::<Result<Vec<_>, _>>().unwrap();
        prop_assert_eq!(hits.len(), 1);
        prop_assert_eq!(hits[0].die_offset, die_offset as u64);
        prop_assert_eq!(table.equal_range(&other).count(), 0);
    }

    /// P4: every name-table entry's resolved `entry_offset` lies within
    /// `[entries_base, section_end]`.
    #[test]
    fn debug_names_entry_offsets_stay_in_bounds(n in 1usize..8) {
        let names: Vec<String> = (0..n).map(|i| format!("name{i}")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let (section, strings) = common::debug_names_no_hash_table(&name_refs);
        let relocs = Relocations::empty();
        let parsed = DebugNames::extract(&section, &relocs, &strings, true).unwrap();
        let unit = &parsed.units()[0];

        for i in 1..=n as u32 {
            let entry = unit.get_name_table_entry(i).unwrap();
            prop_assert!(entry.entry_offset as usize <= section.len());
        }
    }

    /// P5: `validate_forms` rejects exactly the atoms whose form falls
    /// outside `{Constant, Flag}` or equals `SDATA`, for the three
    /// gated atom types.
    #[test]
    fn validate_forms_matches_the_gating_rule(
        form in prop_oneof![
            Just(DW_FORM_DATA1), Just(DW_FORM_DATA2), Just(DW_FORM_DATA4), Just(DW_FORM_DATA8),
            Just(DW_FORM_UDATA), Just(DW_FORM_SDATA), Just(DW_FORM_FLAG), Just(DW_FORM_FLAG_PRESENT),
            Just(DW_FORM_ADDR), Just(DW_FORM_STRP),
        ],
        atom_type in prop_oneof![Just(DW_ATOM_DIE_OFFSET), Just(DW_ATOM_DIE_TAG), Just(DW_ATOM_TYPE_FLAGS)],
    ) {
        let is_constant = matches!(
            form,
            DW_FORM_DATA1 | DW_FORM_DATA2 | DW_FORM_DATA4 | DW_FORM_DATA8 | DW_FORM_UDATA | DW_FORM_SDATA
        );
        let is_flag = matches!(form, DW_FORM_FLAG | DW_FORM_FLAG_PRESENT);
        let expected_valid = form != DW_FORM_SDATA && (is_constant || is_flag);

        let mut section = Vec::new();
        common::push_u32(&mut section, 0x4841_5348);
        common::push_u16(&mut section, 1);
        common::push_u16(&mut section, 0);
        common::push_u32(&mut section, 0);
        common::push_u32(&mut section, 0);
        common::push_u32(&mut section, 4 + 4 + 4);
        common::push_u32(&mut section, 0);
        common::push_u32(&mut section, 1);
        common::push_u16(&mut section, atom_type);
        common::push_u16(&mut section, form);

        let relocs = Relocations::empty();
        let table = AppleTable::extract(&section, &relocs, &[], true).unwrap();
        prop_assert_eq!(table.validate_forms(), expected_valid);
    }
}

/// P2: a well-formed Apple table at its exact minimum size parses
/// successfully (the boundary complement of the truncation property
/// above).
#[test]
fn apple_full_minimum_size_succeeds() {
    let full = common::apple_empty_buckets(2);
    let relocs = Relocations::empty();
    assert!(AppleTable::extract(&full, &relocs, &[], true).is_ok());
}

/// P3: abbreviation codes are unique within a parsed unit (multi-abbrev
/// fixture, not just the single-abbrev no-hash-table one).
#[test]
fn abbrev_codes_are_unique_in_a_well_formed_unit() {
    let mut buf = Vec::new();
    common::push_u32(&mut buf, 0);
    common::push_u16(&mut buf, 5);
    common::push_u16(&mut buf, 0);
    common::push_u32(&mut buf, 0);
    common::push_u32(&mut buf, 0);
    common::push_u32(&mut buf, 0);
    common::push_u32(&mut buf, 0);
    common::push_u32(&mut buf, 0);

    let mut abbrevs = Vec::new();
    for code in 1..=5u64 {
        common::push_uleb128(&mut abbrevs, code);
        common::push_uleb128(&mut abbrevs, 0x2e);
        common::push_uleb128(&mut abbrevs, 0);
        common::push_uleb128(&mut abbrevs, 0);
    }
    common::push_uleb128(&mut abbrevs, 0);

    common::push_u32(&mut buf, abbrevs.len() as u32);
    common::push_u32(&mut buf, 0);
    assert_eq!(buf.len(), 36);
    buf.extend_from_slice(&abbrevs);

    let unit_length = (buf.len() - 4) as u32;
    buf[0..4].copy_from_slice(&unit_length.to_le_bytes());

    let relocs = Relocations::empty();
    let parsed = DebugNames::extract(&buf, &relocs, &[], true).unwrap();
    let unit = &parsed.units()[0];

    let codes: Vec<u32> = unit.abbrevs().iter().map(|a| a.code).collect();
    let unique: std::collections::HashSet<u32> = codes.iter().copied().collect();
    assert_eq!(codes.len(), unique.len());
    assert_eq!(codes, vec![1, 2, 3, 4, 5]);
}

/// P6: bucket chain contiguity — a two-bucket Apple table stops walking
/// a bucket's hash chain the moment it meets a hash belonging to the
/// other bucket, never spilling entries across buckets.
#[test]
fn apple_bucket_chain_stops_at_the_first_foreign_hash() {
    const DW_ATOM_DIE_OFFSET_TYPE: u16 = 1;
    const DW_FORM_DATA4: u16 = 0x06;

    // Two buckets, two hash-array slots: slot 0 belongs to bucket 0,
    // slot 1 belongs to bucket 1. Bucket 0's chain must stop after slot 0
    // and never read slot 1's payload as if it were its own.
    let mut strings = Vec::new();
    common::push_cstr(&mut strings, "pad");
    let a_off = strings.len() as u32;
    common::push_cstr(&mut strings, "aaa");
    let b_off = strings.len() as u32;
    common::push_cstr(&mut strings, "bbb");

    let header_data_length = 4 + 4 + 4;
    let mut buf = Vec::new();
    common::push_u32(&mut buf, 0x4841_5348);
    common::push_u16(&mut buf, 1);
    common::push_u16(&mut buf, 0);
    common::push_u32(&mut buf, 2); // bucket_count
    common::push_u32(&mut buf, 2); // hash_count
    common::push_u32(&mut buf, header_data_length);
    common::push_u32(&mut buf, 0);
    common::push_u32(&mut buf, 1);
    common::push_u16(&mut buf, DW_ATOM_DIE_OFFSET_TYPE);
    common::push_u16(&mut buf, DW_FORM_DATA4);

    // buckets[0] = 0, buckets[1] = 1
    common::push_u32(&mut buf, 0);
    common::push_u32(&mut buf, 1);
    // hashes[0] % 2 == 0, hashes[1] % 2 == 1
    common::push_u32(&mut buf, 0);
    common::push_u32(&mut buf, 1);
    // offsets[0], offsets[1]: filled in after we know the layout
    let offsets_pos = buf.len();
    common::push_u32(&mut buf, 0);
    common::push_u32(&mut buf, 0);

    let name_a_offset = buf.len() as u32;
    common::push_u32(&mut buf, a_off);
    common::push_u32(&mut buf, 1);
    common::push_u32(&mut buf, 0x111);
    common::push_u32(&mut buf, 0);

    let name_b_offset = buf.len() as u32;
    common::push_u32(&mut buf, b_off);
    common::push_u32(&mut buf, 1);
    common::push_u32(&mut buf, 0x222);
    common::push_u32(&mut buf, 0);

    buf[offsets_pos..offsets_pos + 4].copy_from_slice(&name_a_offset.to_le_bytes());
    buf[offsets_pos + 4..offsets_pos + 8].copy_from_slice(&name_b_offset.to_le_bytes());

    let relocs = Relocations::empty();
    let table = AppleTable::extract(&buf, &relocs, &strings, true).unwrap();

    let a_hits: Vec<_> = table.equal_range("aaa").collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(a_hits.len(), 1);
    assert_eq!(a_hits[0].die_offset, 0x111);

    let b_hits: Vec<_> = table.equal_range("bbb").collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(b_hits.len(), 1);
    assert_eq!(b_hits[0].die_offset, 0x222);
}
