// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

use std::fs;
use std::path::Path;

use anyhow::Result;
use tempfile::TempDir;

use omfdump::cli;
use omfdump::{DumpOptions, Variant};

mod common;
use common::Stream;

fn write_object(dir: &Path, name: &str, stream: Stream) -> Result<std::path::PathBuf> {
    let path = dir.join(name);
    fs::write(&path, stream.build())?;
    Ok(path)
}

#[test]
fn test_dump_omf85_module() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let stream = Stream::new()
        .record(0x02, b"\x04TEST\x01\x12\x01\x00\x01\x03")
        .record(0x18, b"\x04PUTS\x00")
        .record(0x04, &[0x01, 0x01, 0x00, 0x01])
        .record(0x0e, b"");
    let path = write_object(temp_dir.path(), "TEST.OBJ", stream)?;

    let mut output: Vec<u8> = Vec::new();
    let summary = cli::dump(&mut output, &path, &DumpOptions::default())?;
    assert_eq!(summary.variant, Variant::Omf85);
    assert_eq!(summary.records, 4);
    assert_eq!(summary.malformed, 0);

    let text = String::from_utf8(output)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "0000:00 #1 MODHDR(2): TEST - PL/M-80 v1.2");
    assert!(text.contains("EXTDEF(18H):"));
    assert!(text.contains("PUTS"));
    assert!(text.contains("MODEND(4): Main Entry CODE:0100"));
    assert!(text.contains("EOF(0EH):"));
    Ok(())
}

#[test]
fn test_raw_dump() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let stream = Stream::new().record(0x80, b"\x04MAIN");
    let path = write_object(temp_dir.path(), "MAIN.OBJ", stream)?;

    let mut output: Vec<u8> = Vec::new();
    let options = DumpOptions {
        raw: true,
        ..Default::default()
    };
    cli::dump(&mut output, &path, &options)?;

    let text = String::from_utf8(output)?;
    assert!(text.contains("THEADR(80H):"));
    assert!(!text.contains("THEADR(80H): MAIN"));
    assert!(text.contains("|.MAIN|"));
    Ok(())
}

#[test]
fn test_malformed_record_is_reported() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let stream = Stream::new()
        .record(0x02, b"\x04TEST\x00\x00")
        .record(0x16, b"\x01\x10\x00\x04MA")
        .record(0x0e, b"");
    let path = write_object(temp_dir.path(), "BAD.OBJ", stream)?;

    let mut output: Vec<u8> = Vec::new();
    let summary = cli::dump(&mut output, &path, &DumpOptions::default())?;
    assert_eq!(summary.malformed, 1);

    let text = String::from_utf8(output)?;
    assert!(text.contains("-- Malformed record --"));
    assert!(text.contains("EOF(0EH):"));
    Ok(())
}

#[test]
fn test_missing_input_is_an_error() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("MISSING.OBJ");
    let mut output: Vec<u8> = Vec::new();
    let result = cli::dump(&mut output, &path, &DumpOptions::default());
    assert!(result.is_err());
    assert!(output.is_empty());
}
