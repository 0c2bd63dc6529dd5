//! Minimal manual-inspection CLI: dump whichever accelerator sections are
//! present in a raw section dump passed on argv.
//!
//! This binary is a demonstration only, not the crate's library surface —
//! loading a real object file (Mach-O, ELF) and locating its named
//! sections is explicitly out of scope for the parsing core; this just
//! memory-maps one file and tries to parse it first as a `.debug_names`
//! section, then as an Apple accelerator table.

use std::env;
use std::fs::File;
use std::process;

use dwarf_accel::{apple::AppleTable, debug_names::DebugNames, dump::TextSink, extractor::Relocations};

fn usage(program: &str) -> ! {
    eprintln!("usage: {program} <section-dump> [string-section-dump]");
    process::exit(1);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "dump".to_string());
    let section_path = match args.next() {
        Some(p) => p,
        None => usage(&program),
    };
    let string_path = args.next();

    let section_file = File::open(&section_path).unwrap_or_else(|e| {
        eprintln!("failed to open {section_path}: {e}");
        process::exit(1);
    });
    let section_map = unsafe { memmap2::Mmap::map(&section_file) }.unwrap_or_else(|e| {
        eprintln!("failed to map {section_path}: {e}");
        process::exit(1);
    });

    let string_map = string_path.map(|p| {
        let f = File::open(&p).unwrap_or_else(|e| {
            eprintln!("failed to open {p}: {e}");
            process::exit(1);
        });
        unsafe { memmap2::Mmap::map(&f) }.unwrap_or_else(|e| {
            eprintln!("failed to map {p}: {e}");
            process::exit(1);
        })
    });
    let strings: &[u8] = string_map.as_deref().unwrap_or(&[]);

    let relocations = Relocations::empty();
    let stdout = std::io::stdout();
    let mut sink = TextSink::new(stdout.lock());

    match DebugNames::extract(&section_map, &relocations, strings, true) {
        Ok(names) => {
            names.dump(&mut sink);
            return;
        }
        Err(e) => {
            tracing::debug!(error = %e, "not a valid .debug_names section, trying apple format");
        }
    }

    match AppleTable::extract(&section_map, &relocations, strings, true) {
        Ok(table) => table.dump(&mut sink),
        Err(e) => {
            eprintln!("failed to parse as either accelerator table format: {e}");
            process::exit(1);
        }
    }
}
