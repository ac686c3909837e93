// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

use anyhow::Result;

use omfdump::display::TextReporter;
use omfdump::index::{Category, IndexTable};
use omfdump::record::{RecordReader, RecordStatus};
use omfdump::report::Recorder;
use omfdump::{dump, DumpOptions, Flavour, Variant};

mod common;
use common::Stream;

fn record_dump(stream: Stream) -> Result<(omfdump::DumpSummary, Recorder)> {
    let mut out = Recorder::new();
    let summary = dump(stream.reader(), &mut out, &DumpOptions::default())?;
    Ok((summary, out))
}

#[test]
fn test_module_header_and_eof() -> Result<()> {
    let stream = Stream::new()
        .record(0x02, b"\x04TEST\x00\x00")
        .record(0x0e, b"");
    let (summary, out) = record_dump(stream)?;
    assert_eq!(summary.variant, Variant::Omf85);
    assert_eq!(summary.records, 2);
    assert_eq!(summary.malformed, 0);
    assert_eq!(summary.bad_crc, 0);
    assert!(!summary.junk);
    assert_eq!(out.lines()[0], "MODHDR(2): TEST - UKN80");
    assert!(out.diagnostics().is_empty());
    Ok(())
}

#[test]
fn test_text_output() -> Result<()> {
    let stream = Stream::new()
        .record(0x02, b"\x04TEST\x00\x00")
        .record(0x0e, b"");
    let mut reporter = TextReporter::new(Vec::new());
    dump(stream.reader(), &mut reporter, &DumpOptions::default())?;
    let text = String::from_utf8(reporter.finish()?)?;
    let first = text.lines().next().unwrap_or_default();
    assert_eq!(first, "0000:00 #1 MODHDR(2): TEST - UKN80");
    assert!(text.contains("EOF(0EH):"));
    Ok(())
}

#[test]
fn test_records_sum_to_zero() -> Result<()> {
    let bytes = Stream::new()
        .record(0x02, b"\x04TEST\x00\x00")
        .record(0x16, b"\x01\x10\x00\x04MAIN\x00")
        .record(0x0e, b"")
        .build();
    let mut reader = RecordReader::new(std::io::Cursor::new(bytes))?;
    let mut count = 0;
    while let RecordStatus::Ok(record) = reader.next_record()? {
        assert!(record.crc_valid());
        count += 1;
    }
    assert_eq!(count, 3);
    Ok(())
}

#[test]
fn test_short_final_record_is_junk() -> Result<()> {
    // claims 10 payload bytes, 6 are present
    let stream = Stream::new()
        .record(0x02, b"\x04TEST\x00\x00")
        .bytes(&[0x16, 11, 0, 1, 2, 3, 4, 5, 6]);
    let (summary, out) = record_dump(stream)?;
    assert!(summary.junk);
    assert_eq!(summary.records, 1);
    assert_eq!(out.diagnostics(), vec!["Unexpected data at end of file"]);
    Ok(())
}

#[test]
fn test_truncated_group_then_continue() -> Result<()> {
    let stream = Stream::new()
        .record(0x80, b"\x04TEST")
        .record(0x96, b"\x06DGROUP")
        .record(0x9a, &[1, 0xff, 1, 0xfb, 0x00])
        .record(0x8a, &[0x00]);
    let (summary, out) = record_dump(stream)?;
    assert_eq!(summary.variant, Variant::Omf86);
    assert_eq!(summary.records, 4);
    assert_eq!(summary.malformed, 1);
    assert_eq!(out.diagnostics(), vec!["-- Malformed record --"]);
    assert_eq!(out.hex_dumps(), vec![&[0xfb, 0x00][..]]);

    let lines = out.lines();
    assert!(lines.contains(&"SI @1".to_string()));
    assert_eq!(lines.last().map(String::as_str), Some("MODEND(8AH):"));
    Ok(())
}

#[test]
fn test_leftover_bytes_are_malformed() -> Result<()> {
    let stream = Stream::new()
        .record(0x80, b"\x01A")
        .record(0x78, &[0x01, 0xee]);
    let (summary, out) = record_dump(stream)?;
    assert_eq!(summary.malformed, 1);
    assert!(out.lines().contains(&"ENDREC(78H): Block".to_string()));
    assert_eq!(out.hex_dumps(), vec![&[0xee][..]]);
    Ok(())
}

#[test]
fn test_bad_crc_is_decoded() -> Result<()> {
    let stream = Stream::new()
        .record(0x02, b"\x04TEST\x00\x00")
        .bad_crc(0x16, b"\x01\x10\x00\x01A\x00")
        .record(0x0e, b"");
    let (summary, out) = record_dump(stream)?;
    assert_eq!(summary.bad_crc, 1);
    assert_eq!(summary.malformed, 0);
    assert_eq!(summary.records, 3);
    assert_eq!(out.diagnostics(), vec!["-- Warning CRC error --"]);
    assert!(out.lines().contains(&"0010 A".to_string()));
    Ok(())
}

#[test]
fn test_variant_detection() -> Result<()> {
    for (trn, variant) in [
        (0x00u8, Variant::Omf85),
        (0xff, Variant::Omf51),
        (0x24, Variant::Omf96),
    ] {
        let stream = Stream::new().record(0x02, &[4, b'T', b'E', b'S', b'T', trn, 0]);
        let (summary, _) = record_dump(stream)?;
        assert_eq!(summary.variant, variant, "translator {trn:02X}");
    }
    Ok(())
}

#[test]
fn test_variant_override() -> Result<()> {
    let stream = Stream::new().record(0x40, b"\x00");
    let mut out = Recorder::new();
    let options = DumpOptions {
        variant: Some(Variant::Omf86),
        ..Default::default()
    };
    let summary = dump(stream.reader(), &mut out, &options)?;
    assert_eq!(summary.variant, Variant::Omf86);
    assert_eq!(out.lines(), vec!["INVALID(40H):"]);
    Ok(())
}

#[test]
fn test_omf86_explicit_fixup() -> Result<()> {
    let stream = Stream::new()
        .record(0x80, b"\x04TEST")
        .record(0x96, b"\x00\x05_TEXT\x04CODE")
        .record(0x98, &[0x28, 0x10, 0x00, 2, 3, 1])
        .record(0xa0, &[1, 0x00, 0x00, 0xb8, 0x34, 0x12, 0x90])
        // Offset16 at 001, absolute frame 1234, segment 1 target + 0010
        .record(0x9c, &[0x84, 0x01, 0x30, 0x34, 0x12, 0x01, 0x10, 0x00])
        .record(0x8a, &[0x00]);
    let (summary, out) = record_dump(stream)?;
    assert_eq!(summary.malformed, 0);
    assert_eq!(summary.flavour, Flavour::Any);
    let lines = out.lines();
    assert!(lines.contains(&"#1 _TEXT:CODE 0010 Byte Public".to_string()));
    assert!(lines.contains(&"LEDATA(0A0H): _TEXT:CODE".to_string()));
    assert!(lines.contains(&"001> Seg Offset16 1234 Seg[_TEXT:CODE],0010".to_string()));
    Ok(())
}

#[test]
fn test_module_header_resets_names() -> Result<()> {
    let stream = Stream::new()
        .record(0x80, b"\x01A")
        .record(0x96, b"\x03ONE")
        .record(0x80, b"\x01B")
        .record(0x9a, &[1]);
    let (_, out) = record_dump(stream)?;
    assert!(out.lines().contains(&"GRPDEF(9AH): #1 @1".to_string()));
    Ok(())
}

#[test]
fn test_placeholder_names_are_stable() {
    let mut names = IndexTable::new(20);
    assert_eq!(names.get(Category::Segment, 7), "@7");
    assert_eq!(names.get(Category::Segment, 7), "@7");
    assert!(names.contains(Category::Segment, 7));
}
