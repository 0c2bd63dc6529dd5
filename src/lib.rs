//! Reader for DWARF debug-info accelerator tables: the legacy Apple
//! `.apple_names`/`.apple_types`/`.apple_namespaces`/`.apple_objc` tables,
//! and the standardised DWARF v5 `.debug_names` section.
//!
//! This crate parses the binary sections, validates their internal
//! consistency, exposes name-based lookup for the Apple format, and
//! produces a structured dump of either format via an external
//! [`dump::Sink`] collaborator. Loading the object file, resolving
//! relocations ahead of time, and decoding `.debug_info` itself are all
//! left to the caller — see each module's documentation for the exact
//! seam.
//!
//! Parsing never panics: every read is bounds-checked against the
//! borrowed byte blob, and truncation surfaces as [`error::Error`].
//! Enable `tracing` output (e.g. via `tracing_subscriber::fmt::init()`) to
//! see per-unit parse diagnostics and non-fatal warnings swallowed during
//! dumping.

pub mod apple;
pub mod constants;
pub mod debug_names;
pub mod dump;
pub mod error;
pub mod extractor;
pub mod form;
pub mod leb128;

pub use apple::{AppleTable, AppleValueEntry, AtomDescriptor, ValueIterator};
pub use debug_names::{Abbrev, AbbrevTable, AttributeEncoding, DebugNames, Entry, NameIndex, NameTableEntry};
pub use dump::{Sink, TextSink};
pub use error::{Error, Result};
pub use extractor::{Extractor, Relocations};
pub use form::{DwarfFormat, FormValue, FormatParams};

/// Convenience re-exports for crates that only need the common surface.
pub mod prelude {
    pub use crate::apple::AppleTable;
    pub use crate::debug_names::DebugNames;
    pub use crate::dump::{Sink, TextSink};
    pub use crate::error::{Error, Result};
    pub use crate::extractor::Relocations;
}
