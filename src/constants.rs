//! DWARF tag, form, and atom constants used by accelerator tables.
//!
//! Kept as plain associated consts rather than a fielded enum: the decoders
//! only ever compare a handful of named codes against raw `u16`/`u32`
//! values read off disk, never match exhaustively over the whole DWARF
//! constant space.

/// `DW_TAG_null`, used as the default tag for an un-decoded Apple atom pair.
pub const DW_TAG_NULL: u32 = 0x00;

/// Sentinel "no DIE offset" value used when an Apple hash entry carries no
/// `die_offset` atom.
pub const DW_INVALID_OFFSET: u64 = u64::MAX;

// Apple atom types (`HeaderData.atoms[i].atom_type`).
pub const DW_ATOM_NULL: u16 = 0;
pub const DW_ATOM_DIE_OFFSET: u16 = 1;
pub const DW_ATOM_CU_OFFSET: u16 = 2;
pub const DW_ATOM_DIE_TAG: u16 = 3;
pub const DW_ATOM_TYPE_FLAGS: u16 = 4;

// Form codes relevant to atom validation and general form decoding. Values
// match the standard DWARF `DW_FORM_*` encoding.
pub const DW_FORM_ADDR: u16 = 0x01;
pub const DW_FORM_BLOCK2: u16 = 0x03;
pub const DW_FORM_BLOCK4: u16 = 0x04;
pub const DW_FORM_DATA2: u16 = 0x05;
pub const DW_FORM_DATA4: u16 = 0x06;
pub const DW_FORM_DATA8: u16 = 0x07;
pub const DW_FORM_STRING: u16 = 0x08;
pub const DW_FORM_BLOCK: u16 = 0x09;
pub const DW_FORM_BLOCK1: u16 = 0x0a;
pub const DW_FORM_DATA1: u16 = 0x0b;
pub const DW_FORM_FLAG: u16 = 0x0c;
pub const DW_FORM_SDATA: u16 = 0x0d;
pub const DW_FORM_STRP: u16 = 0x0e;
pub const DW_FORM_UDATA: u16 = 0x0f;
pub const DW_FORM_REF_ADDR: u16 = 0x10;
pub const DW_FORM_REF1: u16 = 0x11;
pub const DW_FORM_REF2: u16 = 0x12;
pub const DW_FORM_REF4: u16 = 0x13;
pub const DW_FORM_REF8: u16 = 0x14;
pub const DW_FORM_REF_UDATA: u16 = 0x15;
pub const DW_FORM_INDIRECT: u16 = 0x16;
pub const DW_FORM_SEC_OFFSET: u16 = 0x17;
pub const DW_FORM_FLAG_PRESENT: u16 = 0x19;
pub const DW_FORM_REF_SIG8: u16 = 0x20;

/// DWARF v5 `.debug_names` index attribute codes (`DW_IDX_*`).
pub const DW_IDX_COMPILE_UNIT: u32 = 1;
pub const DW_IDX_TYPE_UNIT: u32 = 2;
pub const DW_IDX_DIE_OFFSET: u32 = 3;
pub const DW_IDX_PARENT: u32 = 4;
pub const DW_IDX_TYPE_HASH: u32 = 5;
