//! Error taxonomy for accelerator-table parsing.
//!
//! The end-of-list "sentinel" condition described in the design notes is
//! deliberately not a variant here: `NameIndex::get_entry` and abbreviation
//! parsing surface it as `Ok(None)`, never as an `Err`.

/// Everything that can go wrong while parsing an Apple or DWARF v5
/// accelerator table.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A bounds check failed while reading a header, atom list,
    /// augmentation, abbreviations region, or entry.
    #[error("{0}")]
    Truncation(String),

    /// The abbreviation table was not terminated before `entries_base`, or
    /// contained a duplicate abbreviation code.
    #[error("{0}")]
    MalformedAbbrev(String),

    /// An entry referenced an abbreviation code absent from the unit's
    /// abbreviation set.
    #[error("Invalid abbreviation code {0}")]
    InvalidAbbrev(u64),

    /// The form-value decoder refused a byte pattern.
    #[error("Error extracting index attribute values: {0}")]
    FormExtractFailure(String),
}

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;
