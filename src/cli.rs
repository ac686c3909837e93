// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use super::display::TextReporter;
use super::dump::{DumpOptions, DumpSummary};

/// Prints a text dump of the object file or library at `infile`.
pub fn dump(write: &mut impl Write, infile: &Path, options: &DumpOptions) -> Result<DumpSummary> {
    let file =
        File::open(infile).with_context(|| format!("cannot open {}", infile.display()))?;
    let mut reporter = TextReporter::new(write);
    let summary = crate::dump(BufReader::new(file), &mut reporter, options)?;
    reporter.finish()?;
    info!(
        "{}: {} records, {} with bad checksums, {} malformed",
        infile.display(),
        summary.records,
        summary.bad_crc,
        summary.malformed
    );
    Ok(summary)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::omf::testing::frame;
    use crate::Variant;

    #[test]
    fn test_dump_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("TEST.OBJ");
        let mut bytes = frame(0x02, b"\x04TEST\x00\x00");
        bytes.extend(frame(0x0e, b""));
        std::fs::write(&path, bytes)?;

        let mut out = Vec::new();
        let summary = dump(&mut out, &path, &DumpOptions::default())?;
        assert_eq!(summary.variant, Variant::Omf85);
        let text = String::from_utf8(out)?;
        assert!(text.contains("TEST - UKN80"));
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let mut out = Vec::new();
        let err = dump(&mut out, Path::new("/nonexistent/NONE.OBJ"), &DumpOptions::default())
            .expect_err("missing file");
        assert!(err.to_string().contains("cannot open"));
    }
}
