// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

use std::default::Default;
use std::io::{self, Write};

use crate::report::{Column, Reporter};

/// Options for rendering a dump as text.
#[derive(Clone, Debug)]
pub struct Options {
    /// Nominal line width, excluding the indent of detail lines.
    pub width: usize,

    /// Indent of lines after the record header line.
    pub indent: usize,

    /// Minimum gap between table cells.
    pub gap: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            width: 110,
            indent: 8,
            gap: 3,
        }
    }
}

impl Options {
    // width of the 'XXXX:XX #nnn ' record prefix
    const LOCATION_WIDTH: usize = 13;

    fn column_width(&self, columns: usize) -> usize {
        if columns == 0 {
            self.width - Self::LOCATION_WIDTH
        } else {
            (self.width - self.indent) / columns
        }
    }
}

/// Renders reporter output as plain text lines.
///
/// Record header lines are prefixed with the record location as
/// `block:byte` (128 byte blocks) and the record ordinal. Detail lines are
/// indented. Tables wrap several groups onto one line, separated by `|`.
pub struct TextReporter<W: Write> {
    out: W,
    options: Options,
    error: Option<io::Error>,

    offset: u64,
    records: usize,

    line: String,
    columns: usize,
    cell_start: usize,
    cell_width: usize,
    line_end: usize,
    tabs: Vec<usize>,
    field: usize,
}

impl<W: Write> TextReporter<W> {
    pub fn new(out: W) -> Self {
        Self::with_options(out, Options::default())
    }

    pub fn with_options(out: W, options: Options) -> Self {
        let width = options.column_width(0);
        Self {
            out,
            options,
            error: None,
            offset: 0,
            records: 0,
            line: String::new(),
            columns: 0,
            cell_start: 0,
            cell_width: width,
            line_end: width,
            tabs: Vec::new(),
            field: 0,
        }
    }

    /// Flushes pending output and returns the writer, or the first write
    /// error encountered.
    pub fn finish(mut self) -> io::Result<W> {
        self.flush_line();
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_line(&mut self, text: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = writeln!(self.out, "{text}") {
            self.error = Some(e);
        }
    }

    fn location(&self) -> String {
        format!("{:04X}:{:02X}", self.offset / 128, self.offset % 128)
    }

    fn cell_column(&self) -> usize {
        self.line.len() - self.cell_start
    }

    fn pad_to(&mut self, column: usize) {
        while self.cell_column() < column {
            self.line.push(' ');
        }
    }

    fn set_tabs(&mut self, columns: &[Column]) -> usize {
        self.tabs.clear();
        let mut stop = 0;
        for column in columns {
            self.tabs.push(stop);
            stop += column.label.len().max(column.width) + 1;
        }
        stop
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn begin_record(&mut self, offset: u64) {
        self.flush_line();
        self.offset = offset;
    }

    fn start_columns(&mut self, columns: usize) {
        if self.columns != columns || columns <= 1 {
            self.flush_line();
            self.columns = columns;
            self.cell_width = self.options.column_width(columns);
            self.line_end = if columns == 0 {
                self.cell_width
            } else {
                self.cell_width * columns
            };
        } else {
            let used = self.line.len();
            loop {
                self.cell_start += self.cell_width;
                if self.cell_start >= self.line_end || used + self.options.gap <= self.cell_start {
                    break;
                }
            }
            if self.cell_start >= self.line_end {
                self.flush_line();
            } else {
                let start = self.cell_start;
                while self.line.len() + 2 < start {
                    self.line.push(' ');
                }
                self.line.push_str("| ");
                self.cell_start = self.line.len();
            }
        }
        if columns == 0 {
            if self.records > 0 {
                self.write_line("");
            }
            self.records += 1;
        }
        self.field = 0;
    }

    fn emit_field(&mut self, text: &str) {
        if self.columns > 0 {
            let tab = self.tabs.get(self.field).copied().unwrap_or(0);
            self.field += 1;
            let col = self.cell_column();
            if tab > col || (col > 0 && !self.line.ends_with(' ')) {
                self.line.push(' ');
                self.pad_to(tab);
            }
        } else if self.cell_column() > 0 && !self.line.ends_with(' ') {
            self.line.push(' ');
        }
        self.line.push_str(text);
    }

    fn emit_raw(&mut self, text: &str) {
        self.line.push_str(text);
    }

    fn flush_line(&mut self) {
        let text = self.line.trim_end().to_string();
        if !text.is_empty() {
            let line = if self.columns > 0 {
                format!("{:indent$}{text}", "", indent = self.options.indent)
            } else {
                format!("{} #{} {text}", self.location(), self.records)
            };
            self.write_line(&line);
        }
        self.line.clear();
        self.cell_start = 0;
    }

    fn log_diagnostic(&mut self, text: &str) {
        self.flush_line();
        let line = if self.columns > 0 {
            format!("{:indent$}{text}", "", indent = self.options.indent)
        } else {
            format!("{} ={} {text}", self.location(), self.records)
        };
        self.write_line(&line);
    }

    fn hex_dump(&mut self, base: u32, show_offsets: bool, data: &[u8]) {
        self.start_columns(1);
        let show_offsets = show_offsets && base != 0;
        let mut address = base & !0xf;
        let mut skip = (base & 0xf) as usize;
        let mut offset = 0usize;
        let mut rest = data;
        while !rest.is_empty() {
            let take = (16 - skip).min(rest.len());
            let (row, tail) = rest.split_at(take);
            let mut line = String::new();
            if show_offsets {
                line.push_str(&format!("{offset:03X}> "));
            }
            line.push_str(&format!("{address:04X} "));
            let mut ascii = String::new();
            for i in 0..16usize {
                if i == 8 {
                    line.push_str(" |");
                } else if i % 4 == 0 {
                    line.push(' ');
                }
                match i.checked_sub(skip).and_then(|j| row.get(j)) {
                    Some(b) => {
                        line.push_str(&format!(" {b:02X}"));
                        ascii.push(if (0x20..0x7f).contains(b) { *b as char } else { '.' });
                    }
                    None => {
                        line.push_str("   ");
                        ascii.push(' ');
                    }
                }
            }
            line.push_str(&format!("  |{}|", ascii.trim_end()));
            self.line = line;
            self.flush_line();
            offset += take;
            address = address.wrapping_add(16);
            skip = 0;
            rest = tail;
        }
    }

    fn discard_pending(&mut self) {
        let start = self.cell_start.min(self.line.len());
        self.line.truncate(start);
    }

    fn commit_pending(&mut self) {
        self.cell_start = self.line.len();
    }

    fn repeat_header(&mut self, columns: &[Column]) -> usize {
        let width = self.set_tabs(columns).saturating_sub(1) + self.options.gap;
        let groups = ((self.options.width - self.options.indent + self.options.gap) / width).max(1);
        for _ in 0..groups {
            self.start_columns(groups);
            for column in columns {
                self.emit_field(column.label);
            }
        }
        groups
    }

    fn fixed_header(&mut self, columns: &[Column]) {
        self.set_tabs(columns);
        self.start_columns(1);
        for column in columns {
            self.emit_field(column.label);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn render(f: impl FnOnce(&mut TextReporter<Vec<u8>>)) -> String {
        let mut r = TextReporter::new(Vec::new());
        f(&mut r);
        String::from_utf8(r.finish().expect("finish")).expect("utf8")
    }

    #[test]
    fn test_header_line() {
        let out = render(|r| {
            r.begin_record(0x85);
            r.start_columns(0);
            r.emit_raw("MODHDR(2): ");
            r.emit_raw("TEST - UKN80");
        });
        assert_eq!(out, "0001:05 #1 MODHDR(2): TEST - UKN80\n");
    }

    #[test]
    fn test_records_are_separated() {
        let out = render(|r| {
            r.start_columns(0);
            r.emit_raw("A");
            r.begin_record(4);
            r.start_columns(0);
            r.emit_raw("B");
        });
        assert_eq!(out, "0000:00 #1 A\n\n0000:04 #2 B\n");
    }

    #[test]
    fn test_fixed_table() {
        let out = render(|r| {
            r.start_columns(0);
            r.emit_raw("X: ");
            r.fixed_header(&[Column::new("Name", 6), Column::label("Size")]);
            r.start_columns(1);
            r.emit_field("CODE");
            r.emit_field("0010");
        });
        assert_eq!(
            out,
            "0000:00 #1 X:\n        Name   Size\n        CODE   0010\n"
        );
    }

    #[test]
    fn test_repeat_table_wraps_groups() {
        let out = render(|r| {
            r.start_columns(0);
            let groups = r.repeat_header(&[Column::label("Offset"), Column::new("Line", 5)]);
            assert_eq!(groups, 7);
            for line in 0..8 {
                r.start_columns(groups);
                r.emit_field(&format!("{:04X}", line * 2));
                r.emit_field(&format!("#{line}"));
            }
        });
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("        Offset Line | Offset Line"));
        assert!(lines[1].starts_with("        0000   #0   | 0002   #1"));
        assert_eq!(lines[2], "        000E   #7");
    }

    #[test]
    fn test_diagnostic_and_discard() {
        let out = render(|r| {
            r.start_columns(0);
            r.emit_raw("PUBLICS(16H): ");
            r.start_columns(1);
            r.emit_field("partial");
            r.discard_pending();
            r.log_diagnostic("-- Malformed record --");
        });
        assert_eq!(out, "0000:00 #1 PUBLICS(16H):\n        -- Malformed record --\n");
    }

    #[test]
    fn test_commit_survives_discard() {
        let out = render(|r| {
            r.start_columns(0);
            r.emit_raw("MODHDR(2): ");
            r.commit_pending();
            r.emit_raw("TE");
            r.discard_pending();
            r.log_diagnostic("-- Malformed record --");
        });
        assert_eq!(out, "0000:00 #1 MODHDR(2):\n0000:00 =1 -- Malformed record --\n");
    }

    #[test]
    fn test_hex_dump() {
        let out = render(|r| {
            r.start_columns(0);
            r.hex_dump(0x12, false, b"AB\x00");
        });
        let line = out.lines().next().expect("row");
        assert!(line.starts_with("        0010 "));
        assert!(line.contains(" 41 42  00"));
        assert!(line.ends_with("|  AB.|"));
    }
}
