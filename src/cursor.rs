// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! Bounds-checked field reads over a single record payload.

use winnow::binary;
use winnow::error::ContextError;
use winnow::token::take;
use winnow::Parser;

use crate::error::{DecodeError, Result};

/// A sequential reader over one record's payload (the CRC byte excluded).
///
/// Every read is checked against the end of the payload. A read that would
/// run past the end fails with [DecodeError::Truncated] and leaves the
/// cursor at the end, so a decode routine can never loop on a short record.
#[derive(Clone, Debug)]
pub struct FieldCursor<'a> {
    payload: &'a [u8],
    input: &'a [u8],
}

impl<'a> FieldCursor<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            payload,
            input: payload,
        }
    }

    /// Offset of the next unread byte from the start of the payload.
    pub fn position(&self) -> usize {
        self.payload.len() - self.input.len()
    }

    /// Payload length, excluding the CRC byte.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn at_end(&self) -> bool {
        self.input.is_empty()
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        self.input
    }

    /// Moves the cursor to `position`, clamped to the payload.
    pub fn seek(&mut self, position: usize) {
        let position = position.min(self.payload.len());
        self.input = &self.payload[position..];
    }

    /// Consumes and returns everything left in the payload.
    pub fn take_rest(&mut self) -> &'a [u8] {
        let rest = self.input;
        self.input = &self.payload[self.payload.len()..];
        rest
    }

    fn read<O, P>(&mut self, wanted: usize, mut parser: P) -> Result<O>
    where
        P: Parser<&'a [u8], O, ContextError>,
    {
        let offset = self.position();
        match parser.parse_next(&mut self.input) {
            Ok(value) => Ok(value),
            Err(_) => {
                self.take_rest();
                Err(DecodeError::Truncated { offset, wanted })
            }
        }
    }

    pub fn u8(&mut self) -> Result<u8> {
        self.read(1, binary::u8::<&'a [u8], ContextError>)
    }

    pub fn i8(&mut self) -> Result<i8> {
        self.read(1, binary::i8::<&'a [u8], ContextError>)
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.read(2, binary::le_u16::<&'a [u8], ContextError>)
    }

    pub fn i16(&mut self) -> Result<i16> {
        self.read(2, binary::le_i16::<&'a [u8], ContextError>)
    }

    pub fn u24(&mut self) -> Result<u32> {
        self.read(3, binary::le_u24::<&'a [u8], ContextError>)
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.read(4, binary::le_u32::<&'a [u8], ContextError>)
    }

    pub fn i32(&mut self) -> Result<i32> {
        self.read(4, binary::le_i32::<&'a [u8], ContextError>)
    }

    /// Reads a u32 for 32-bit record forms, otherwise a u16.
    pub fn word(&mut self, wide: bool) -> Result<u32> {
        if wide {
            self.u32()
        } else {
            self.u16().map(u32::from)
        }
    }

    pub fn bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.read(
            count,
            |input: &mut &'a [u8]| -> std::result::Result<&'a [u8], ContextError> {
                take(count).parse_next(input)
            },
        )
    }

    /// Reads a variable width index: one byte, or two when the high bit of
    /// the first is set (`(first & 0x7f) << 8 | second`).
    pub fn index(&mut self) -> Result<u16> {
        let first = self.u8()?;
        if first & 0x80 == 0 {
            return Ok(first.into());
        }
        let second = self.u8()?;
        Ok((u16::from(first & 0x7f) << 8) | u16::from(second))
    }

    /// Reads a length prefixed name.
    pub fn name(&mut self) -> Result<String> {
        let len = self.u8()?;
        let bytes = self.bytes(len.into())?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn skip_name(&mut self) -> Result<()> {
        let len = self.u8()?;
        self.bytes(len.into()).map(|_| ())
    }
}
