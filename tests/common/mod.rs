// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

#![allow(dead_code)]

use std::io::Cursor;

/// Builds record streams for the dump tests.
#[derive(Default)]
pub struct Stream {
    bytes: Vec<u8>,
}

impl Stream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record holding `payload` with a correct checksum.
    pub fn record(mut self, rec_type: u8, payload: &[u8]) -> Self {
        let start = self.bytes.len();
        self.push_frame(rec_type, payload);
        let sum = self.bytes[start..]
            .iter()
            .fold(0u8, |s, b| s.wrapping_add(*b));
        self.bytes.push(0u8.wrapping_sub(sum));
        self
    }

    /// Appends a record whose checksum is off by one.
    pub fn bad_crc(mut self, rec_type: u8, payload: &[u8]) -> Self {
        let start = self.bytes.len();
        self.push_frame(rec_type, payload);
        let sum = self.bytes[start..]
            .iter()
            .fold(0u8, |s, b| s.wrapping_add(*b));
        self.bytes.push(1u8.wrapping_sub(sum));
        self
    }

    /// Appends raw bytes, framed or not.
    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }

    pub fn reader(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.bytes)
    }

    fn push_frame(&mut self, rec_type: u8, payload: &[u8]) {
        let len = (payload.len() + 1) as u16;
        self.bytes.push(rec_type);
        self.bytes.extend_from_slice(&len.to_le_bytes());
        self.bytes.extend_from_slice(payload);
    }
}
