// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! The output boundary of the decoder.
//!
//! Decoders never format lines themselves. They hand an ordered stream of
//! fields to a [Reporter], which decides how to lay them out.
//! [TextReporter](crate::display::TextReporter) renders plain text and
//! [Recorder] keeps the calls for inspection.

/// A labelled column of a record table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    pub label: &'static str,
    /// Minimum width of the values in this column.
    pub width: usize,
}

impl Column {
    pub const fn new(label: &'static str, width: usize) -> Self {
        Self { label, width }
    }

    /// A column whose label sets its width.
    pub const fn label(label: &'static str) -> Self {
        Self { label, width: 0 }
    }
}

/// Receives decoded fields for display.
pub trait Reporter {
    /// A new record starts at `offset` in the input.
    fn begin_record(&mut self, offset: u64);

    /// Starts a new column group.
    ///
    /// `0` starts the record header line, `1` a new detail line, and larger
    /// values the next cell of a table with that many cells per line.
    fn start_columns(&mut self, columns: usize);

    /// Adds a field to the current line.
    fn emit_field(&mut self, text: &str);

    /// Appends text to the current field.
    fn emit_raw(&mut self, text: &str);

    fn flush_line(&mut self);

    fn log_diagnostic(&mut self, text: &str);

    /// Dumps `data` as hex and ASCII with addresses starting at `base`.
    /// `show_offsets` adds each row's offset within `data`, for data that a
    /// following fixup record refers to.
    fn hex_dump(&mut self, base: u32, show_offsets: bool, data: &[u8]);

    /// Drops whatever was emitted since the last [start_columns](Self::start_columns)
    /// or [commit_pending](Self::commit_pending).
    fn discard_pending(&mut self);

    /// Keeps the text emitted so far on the current line out of reach of
    /// [discard_pending](Self::discard_pending).
    fn commit_pending(&mut self);

    /// Emits the labels of a repeating table and returns the number of
    /// groups per line to pass to [start_columns](Self::start_columns).
    fn repeat_header(&mut self, columns: &[Column]) -> usize;

    /// Emits the labels of a table with a single group per line.
    fn fixed_header(&mut self, columns: &[Column]);
}

/// A reporter call, as captured by [Recorder].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    BeginRecord(u64),
    StartColumns(usize),
    Field(String),
    Raw(String),
    Flush,
    Diagnostic(String),
    HexDump {
        base: u32,
        show_offsets: bool,
        data: Vec<u8>,
    },
    Header(Vec<&'static str>),
}

/// Captures reporter calls.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    events: Vec<Event>,
    committed: usize,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn diagnostics(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Diagnostic(d) => Some(d.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn hex_dumps(&self) -> Vec<&[u8]> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::HexDump { data, .. } => Some(data.as_slice()),
                _ => None,
            })
            .collect()
    }

    /// The text of each line, with fields separated by a single space.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut line = String::new();
        let mut done = |line: &mut String| {
            let text = line.trim_end().to_string();
            if !text.is_empty() {
                lines.push(text);
            }
            line.clear();
        };
        for event in &self.events {
            match event {
                Event::StartColumns(_) | Event::Flush | Event::BeginRecord(_) => done(&mut line),
                Event::Field(text) => {
                    if !line.is_empty() && !line.ends_with(' ') {
                        line.push(' ');
                    }
                    line.push_str(text);
                }
                Event::Raw(text) => line.push_str(text),
                Event::Diagnostic(_) | Event::HexDump { .. } | Event::Header(_) => {}
            }
        }
        done(&mut line);
        lines
    }
}

impl Reporter for Recorder {
    fn begin_record(&mut self, offset: u64) {
        self.events.push(Event::BeginRecord(offset));
    }

    fn start_columns(&mut self, columns: usize) {
        self.events.push(Event::StartColumns(columns));
    }

    fn emit_field(&mut self, text: &str) {
        self.events.push(Event::Field(text.to_string()));
    }

    fn emit_raw(&mut self, text: &str) {
        self.events.push(Event::Raw(text.to_string()));
    }

    fn flush_line(&mut self) {
        self.events.push(Event::Flush);
    }

    fn log_diagnostic(&mut self, text: &str) {
        self.events.push(Event::Diagnostic(text.to_string()));
    }

    fn hex_dump(&mut self, base: u32, show_offsets: bool, data: &[u8]) {
        self.events.push(Event::HexDump {
            base,
            show_offsets,
            data: data.to_vec(),
        });
    }

    fn discard_pending(&mut self) {
        while self.events.len() > self.committed {
            match self.events.last() {
                Some(Event::Field(_) | Event::Raw(_)) => {
                    self.events.pop();
                }
                _ => break,
            }
        }
    }

    fn commit_pending(&mut self) {
        self.committed = self.events.len();
    }

    fn repeat_header(&mut self, columns: &[Column]) -> usize {
        self.events
            .push(Event::Header(columns.iter().map(|c| c.label).collect()));
        1
    }

    fn fixed_header(&mut self, columns: &[Column]) {
        self.events
            .push(Event::Header(columns.iter().map(|c| c.label).collect()));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_recorder_lines() {
        let mut r = Recorder::new();
        r.start_columns(0);
        r.emit_raw("MODHDR(2): ");
        r.emit_raw("TEST");
        r.start_columns(1);
        r.emit_field("CODE");
        r.emit_field("0010");
        r.emit_raw("H");
        r.flush_line();
        assert_eq!(r.lines(), vec!["MODHDR(2): TEST", "CODE 0010H"]);
    }

    #[test]
    fn test_discard_pending() {
        let mut r = Recorder::new();
        r.start_columns(1);
        r.emit_field("kept");
        r.start_columns(1);
        r.emit_field("dropped");
        r.emit_raw("too");
        r.discard_pending();
        assert_eq!(r.lines(), vec!["kept"]);
    }

    #[test]
    fn test_commit_pending() {
        let mut r = Recorder::new();
        r.start_columns(0);
        r.emit_raw("LINNUM(8): ");
        r.commit_pending();
        r.emit_raw("partial");
        r.discard_pending();
        assert_eq!(r.lines(), vec!["LINNUM(8):"]);
    }
}
