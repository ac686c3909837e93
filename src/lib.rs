// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! Intel Object Module Format Dumper
//!
//! This crate decodes the relocatable object and library files produced by
//! the Intel style cross toolchains of the 1980s and renders them as text:
//!
//! - **OMF-85**: 8080/8085 (ISIS-II)
//! - **OMF-51**: 8051, including the Keil extension records
//! - **OMF-96**: 8096
//! - **OMF-86**: 8086 and later, in the Intel, Microsoft, IBM and PharLap
//!   dialects
//!
//! # Overview
//!
//! Every variant shares the same framing: a type byte, a little endian
//! length and a payload closed by an additive checksum. The [record] module
//! frames a stream, [detect] works out which variant it holds, and [dump]
//! drives the per-variant decoders in [omf] over each record, sending the
//! decoded fields to a [Reporter](report::Reporter).
//!
//! Decoding is best effort. A record with a bad checksum is still decoded
//! with a warning, and a record whose fields do not fit its length is shown
//! as a hex dump from the point where decoding failed.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::{stdout, BufReader};
//! use omfdump::display::TextReporter;
//! use omfdump::DumpOptions;
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let input = BufReader::new(File::open("PROG.OBJ")?);
//!     let mut reporter = TextReporter::new(stdout().lock());
//!     let summary = omfdump::dump(input, &mut reporter, &DumpOptions::default())?;
//!     reporter.finish()?;
//!     eprintln!("{} records, {} malformed", summary.records, summary.malformed);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod context;
pub mod cursor;
pub mod detect;
pub mod display;
pub mod dump;
pub mod error;
pub mod fixup;
pub mod index;
pub mod leaf;
pub mod omf;
pub mod record;
pub mod report;

pub use detect::{Flavour, Variant};
pub use dump::{dump, DumpOptions, DumpSummary};

/// Formats `n` as an Intel style hex number.
///
/// Values above 9 carry an `H` suffix, and a leading `0` is kept only
/// when the first digit is a letter: `5`, `0EH`, `2CH`, `0A0H`.
pub fn hex_str(n: u32) -> String {
    let digits = format!("{n:X}");
    let suffix = if n > 9 { "H" } else { "" };
    if digits.starts_with(|c: char| c.is_ascii_digit()) {
        format!("{digits}{suffix}")
    } else {
        format!("0{digits}{suffix}")
    }
}
