//! Byte-blob builders shared by the integration tests, in the style of
//! `hadron-dwarf/src/header.rs`'s `make_v4_line_program` hand-built test
//! fixtures.

pub fn push_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

pub fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

pub fn push_uleb128(buf: &mut Vec<u8>, mut v: u64) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

pub fn push_cstr(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
}

/// An Apple table with `bucket_count` buckets, all empty, and no atoms.
pub fn apple_empty_buckets(bucket_count: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    push_u32(&mut buf, 0x4841_5348); // magic, uninterpreted by this crate
    push_u16(&mut buf, 1); // version
    push_u16(&mut buf, 0); // hash_function
    push_u32(&mut buf, bucket_count);
    push_u32(&mut buf, 0); // hash_count
    push_u32(&mut buf, 8); // header_data_length: die_offset_base + num_atoms
    push_u32(&mut buf, 0); // die_offset_base
    push_u32(&mut buf, 0); // num_atoms
    for _ in 0..bucket_count {
        push_u32(&mut buf, 0xFFFF_FFFF);
    }
    buf
}

/// Shape used by several apple scenarios: one atom `(die_offset, DATA4)`,
/// a single bucket (so `DJB(key) mod 1 == 0` always holds), and a
/// caller-supplied name-chain payload appended after the offsets array.
pub struct AppleSingleBucketFixture {
    pub section: Vec<u8>,
    pub strings: Vec<u8>,
}

pub fn apple_single_bucket_one_hit(
    name: &str,
    die_offsets: &[u32],
) -> AppleSingleBucketFixture {
    const DW_ATOM_DIE_OFFSET: u16 = 1;
    const DW_FORM_DATA4: u16 = 0x06;

    let mut strings = Vec::new();
    push_cstr(&mut strings, "pad"); // offset 0: filler so offset 0 never matches
    let string_offset = strings.len() as u32;
    push_cstr(&mut strings, name);

    let header_data_length = 4 + 4 + (2 + 2); // die_offset_base + num_atoms + 1 atom
    let mut buf = Vec::new();
    push_u32(&mut buf, 0x4841_5348);
    push_u16(&mut buf, 1);
    push_u16(&mut buf, 0);
    push_u32(&mut buf, 1); // bucket_count
    push_u32(&mut buf, 1); // hash_count
    push_u32(&mut buf, header_data_length);
    push_u32(&mut buf, 0); // die_offset_base
    push_u32(&mut buf, 1); // num_atoms
    push_u16(&mut buf, DW_ATOM_DIE_OFFSET);
    push_u16(&mut buf, DW_FORM_DATA4);

    // buckets[0] = 0 (hash_idx 0 starts this bucket's chain)
    push_u32(&mut buf, 0);
    // hashes[0]: value doesn't matter for a single-bucket table since
    // h % 1 == 0 always, but use the real DJB value for realism.
    let hash = {
        let mut h: u32 = 5381;
        for b in name.bytes() {
            h = h.wrapping_mul(33).wrapping_add(u32::from(b));
        }
        h
    };
    push_u32(&mut buf, hash);
    // offsets[0]: points just past the offsets array itself
    let offsets_base_plus_one = buf.len() as u32 + 4;
    let name_chain_offset = offsets_base_plus_one;
    push_u32(&mut buf, name_chain_offset);

    debug_assert_eq!(buf.len() as u32, name_chain_offset);

    push_u32(&mut buf, string_offset);
    push_u32(&mut buf, die_offsets.len() as u32);
    for off in die_offsets {
        push_u32(&mut buf, *off);
    }
    push_u32(&mut buf, 0); // chain terminator

    AppleSingleBucketFixture { section: buf, strings }
}

/// A minimal `.debug_names` unit with `bucket_count == 0`, `name_count`
/// names (each pointing at an empty, immediately-sentinel-terminated entry
/// list), and an empty abbreviation table.
pub fn debug_names_no_hash_table(names: &[&str]) -> (Vec<u8>, Vec<u8>) {
    let name_count = names.len() as u32;

    let mut strings = Vec::new();
    let mut string_offsets = Vec::new();
    for n in names {
        string_offsets.push(strings.len() as u32);
        push_cstr(&mut strings, n);
    }

    let abbrev_table_size = 1u32; // single sentinel byte

    let mut buf = Vec::new();
    push_u32(&mut buf, 0); // unit_length, patched below
    push_u16(&mut buf, 5); // version
    push_u16(&mut buf, 0); // padding
    push_u32(&mut buf, 0); // cu_count
    push_u32(&mut buf, 0); // local_tu_count
    push_u32(&mut buf, 0); // foreign_tu_count
    push_u32(&mut buf, 0); // bucket_count
    push_u32(&mut buf, name_count);
    push_u32(&mut buf, abbrev_table_size);
    push_u32(&mut buf, 0); // augmentation_size
    assert_eq!(buf.len(), 36);

    // string offsets
    for off in &string_offsets {
        push_u32(&mut buf, *off);
    }
    // entry offsets: all names share the same (empty) entry list at
    // relative offset 0.
    for _ in 0..name_count {
        push_u32(&mut buf, 0);
    }
    // abbreviation table: single sentinel byte (code == 0)
    buf.push(0);
    // entry pool: single sentinel byte, shared by every name
    buf.push(0);

    let unit_length = (buf.len() - 4) as u32;
    buf[0..4].copy_from_slice(&unit_length.to_le_bytes());

    (buf, strings)
}
