// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! The decode session: reads a stream record by record and reports each
//! one.

use std::io::{Read, Seek};

use anyhow::Result;
use log::{debug, warn};

use crate::context::DecoderContext;
use crate::detect::{Flavour, FormatDetector, Variant};
use crate::hex_str;
use crate::omf::{omf85, Omf51Kind, Omf85Kind, RecordDecoder, RecordKind};
use crate::record::{Record, RecordReader, RecordStatus};
use crate::report::Reporter;

/// How a stream is to be dumped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DumpOptions {
    /// Hex dump every record instead of decoding it.
    pub raw: bool,
    /// The OMF86 flavour to use in place of inferring it.
    pub flavour: Option<Flavour>,
    /// The variant to use in place of detecting it.
    pub variant: Option<Variant>,
}

/// What a dump saw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DumpSummary {
    pub variant: Variant,
    /// The OMF86 flavour in force at the end of the stream.
    pub flavour: Flavour,
    pub records: usize,
    pub bad_crc: usize,
    pub malformed: usize,
    /// Whether the stream ended in bytes that did not frame as a record.
    pub junk: bool,
}

/// Dumps every record of `input` to `out`.
///
/// Only I/O failures are errors. Bad checksums, malformed records and a
/// trailing partial record are reported inline and counted in the summary.
pub fn dump<R: Read + Seek>(
    input: R,
    out: &mut dyn Reporter,
    options: &DumpOptions,
) -> Result<DumpSummary> {
    let mut reader = RecordReader::new(input)?;
    let variant = match options.variant {
        Some(variant) => variant,
        None => FormatDetector::detect(&mut reader)?,
    };
    let mut ctx = DecoderContext::new(variant, options.flavour.unwrap_or_default());
    let mut summary = DumpSummary {
        variant,
        flavour: ctx.flavour(),
        records: 0,
        bad_crc: 0,
        malformed: 0,
        junk: false,
    };

    loop {
        let (record, crc_valid) = match reader.next_record()? {
            RecordStatus::Ok(record) => (record, true),
            RecordStatus::BadCrc(record) => (record, false),
            RecordStatus::Eof => break,
            RecordStatus::Junk { offset } => {
                warn!("unexpected data at offset {offset:#x}");
                out.begin_record(offset);
                out.log_diagnostic("Unexpected data at end of file");
                summary.junk = true;
                break;
            }
        };
        summary.records += 1;

        let kind = classify(&mut ctx, &record);
        if kind.is_module_header() {
            ctx.reset();
            if kind == RecordKind::Omf85(Omf85Kind::ModHdr) {
                omf85::prefetch_common_names(&mut reader, &mut ctx)?;
            }
        }

        out.begin_record(record.offset());
        out.start_columns(0);
        out.emit_raw(&format!(
            "{}({}): ",
            kind.name(),
            hex_str(record.rec_type().into())
        ));
        out.commit_pending();

        if !crc_valid {
            warn!("checksum error in record at offset {:#x}", record.offset());
            out.log_diagnostic("-- Warning CRC error --");
            summary.bad_crc += 1;
        }

        if options.raw || !kind.is_decodable() {
            out.hex_dump(0, false, record.payload());
        } else {
            let next_type = reader.peek_next_type()?;
            let mut decoder = RecordDecoder::new(&record, &mut ctx, out, next_type);
            let result = decoder.decode(kind);
            if decoder.recover(result) {
                summary.malformed += 1;
            }
        }
        out.flush_line();

        if kind.is_end_of_file() {
            debug!("end of file record at offset {:#x}", record.offset());
            break;
        }
    }

    summary.variant = ctx.variant();
    summary.flavour = ctx.flavour();
    Ok(summary)
}

/// Works out what `record` is, updating what the record type alone tells
/// about the stream.
fn classify(ctx: &mut DecoderContext, record: &Record) -> RecordKind {
    let rec_type = record.rec_type();
    match ctx.variant() {
        Variant::Omf51 if Omf51Kind::keil_only(rec_type) => ctx.promote_keil(),
        Variant::Omf86 => {
            if let Some(flavour) = Flavour::from_record_type(rec_type) {
                ctx.pin_flavour(flavour);
            }
        }
        _ => {}
    }
    RecordKind::classify(ctx.variant(), rec_type)
}
