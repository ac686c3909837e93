// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! Record framing.
//!
//! Every OMF variant shares the same outer shape:
//!
//! | Offset | Type         | Description                                    |
//! |--------|--------------|------------------------------------------------|
//! |   0    | `u8`         | Record type                                    |
//! |   1    | `u16`        | Length of the rest of the record, CRC included |
//! |   3    | `[u8; n-1]`  | Payload                                        |
//! |  n+2   | `u8`         | Checksum, the whole record sums to 0 mod 256   |

use std::io::{Read, Seek, SeekFrom};

use anyhow::Result;
use binrw::{binrw, BinRead};

use crate::cursor::FieldCursor;

/// The fixed three byte prefix of every record.
#[binrw]
#[brw(little)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecordHeader {
    pub rec_type: u8,
    pub length: u16,
}

impl RecordHeader {
    pub const SIZE: u64 = 3;

    fn checksum(&self) -> u8 {
        let [lo, hi] = self.length.to_le_bytes();
        self.rec_type.wrapping_add(lo).wrapping_add(hi)
    }
}

#[binrw]
#[brw(little, import(length: u16))]
#[derive(Clone, Debug, PartialEq)]
struct RecordBody {
    #[br(count = length)]
    bytes: Vec<u8>,
}

/// One framed record.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    offset: u64,
    header: RecordHeader,
    payload: Vec<u8>,
    crc_valid: bool,
}

impl Record {
    /// File offset of the record type byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn rec_type(&self) -> u8 {
        self.header.rec_type
    }

    /// Declared length, payload plus the CRC byte.
    pub fn length(&self) -> u16 {
        self.header.length
    }

    /// The record contents without the trailing CRC byte.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn crc_valid(&self) -> bool {
        self.crc_valid
    }

    /// Odd record types are the 32-bit forms of OMF86 records.
    pub fn is_32bit(&self) -> bool {
        self.header.rec_type & 1 == 1
    }

    pub fn cursor(&self) -> FieldCursor<'_> {
        FieldCursor::new(&self.payload)
    }

    fn from_body(offset: u64, header: RecordHeader, mut body: Vec<u8>) -> Self {
        let sum = body
            .iter()
            .fold(header.checksum(), |sum, b| sum.wrapping_add(*b));
        // a zero length record has no CRC byte to strip
        body.pop();
        Self {
            offset,
            header,
            payload: body,
            crc_valid: sum == 0,
        }
    }
}

/// The outcome of reading one record.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordStatus {
    Ok(Record),
    /// Checksum mismatch; the record is still returned for a best effort decode.
    BadCrc(Record),
    /// No bytes remain at a record boundary.
    Eof,
    /// The stream ends inside a record, or resynchronisation failed.
    Junk { offset: u64 },
}

/// Reads framed records from a seekable byte stream.
pub struct RecordReader<R> {
    inner: R,
    len: u64,
}

impl<R: Read + Seek> RecordReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self { inner, len })
    }

    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.inner.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    /// Whether the stream is positioned at physical end of file.
    pub fn at_end(&mut self) -> Result<bool> {
        Ok(self.position()? >= self.len)
    }

    /// Reads exactly one record without any resynchronisation.
    fn load(&mut self) -> Result<RecordStatus> {
        let offset = self.position()?;
        let available = self.len.saturating_sub(offset);
        if available == 0 {
            return Ok(RecordStatus::Eof);
        }
        if available < RecordHeader::SIZE {
            self.inner.seek(SeekFrom::End(0))?;
            return Ok(RecordStatus::Junk { offset });
        }

        let header = RecordHeader::read(&mut self.inner)?;
        if available - RecordHeader::SIZE < u64::from(header.length) {
            self.inner.seek(SeekFrom::End(0))?;
            return Ok(RecordStatus::Junk { offset });
        }
        let body = RecordBody::read_le_args(&mut self.inner, (header.length,))?;

        let record = Record::from_body(offset, header, body.bytes);
        Ok(if record.crc_valid {
            RecordStatus::Ok(record)
        } else {
            RecordStatus::BadCrc(record)
        })
    }

    /// Reads the next record.
    ///
    /// A record with a bad checksum is only handed back if the record after
    /// it frames correctly, otherwise the stream is considered lost and
    /// [RecordStatus::Junk] is returned. Either way the stream is left just
    /// after the bad record.
    pub fn next_record(&mut self) -> Result<RecordStatus> {
        let status = self.load()?;
        let RecordStatus::BadCrc(record) = status else {
            return Ok(status);
        };
        let resume = self.position()?;
        let next = self.load()?;
        self.inner.seek(SeekFrom::Start(resume))?;
        match next {
            RecordStatus::Ok(_) => Ok(RecordStatus::BadCrc(record)),
            _ => Ok(RecordStatus::Junk {
                offset: record.offset,
            }),
        }
    }

    /// The type of the following record, without consuming it.
    pub fn peek_next_type(&mut self) -> Result<Option<u8>> {
        let here = self.position()?;
        if here >= self.len {
            return Ok(None);
        }
        let mut rec_type = [0u8; 1];
        self.inner.read_exact(&mut rec_type)?;
        self.inner.seek(SeekFrom::Start(here))?;
        Ok(Some(rec_type[0]))
    }

    /// Runs `f` over the records that follow and then restores the stream
    /// position, whatever `f` returns.
    pub fn lookahead<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let here = self.position()?;
        let result = f(self);
        self.inner.seek(SeekFrom::Start(here))?;
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use binrw::io::Cursor;

    fn reader(bytes: &[u8]) -> RecordReader<Cursor<Vec<u8>>> {
        RecordReader::new(Cursor::new(bytes.to_vec())).expect("reader")
    }

    #[test]
    fn test_valid_record() -> Result<()> {
        // EOF record: type 0E, length 1, CRC F1
        let mut r = reader(&[0x0e, 0x01, 0x00, 0xf1]);
        let RecordStatus::Ok(record) = r.next_record()? else {
            panic!("expected a record");
        };
        assert_eq!(record.rec_type(), 0x0e);
        assert_eq!(record.length(), 1);
        assert!(record.payload().is_empty());
        assert!(record.crc_valid());
        assert_eq!(r.next_record()?, RecordStatus::Eof);
        Ok(())
    }

    #[test]
    fn test_short_header_is_junk() -> Result<()> {
        let mut r = reader(&[0x0e, 0x01]);
        assert_eq!(r.next_record()?, RecordStatus::Junk { offset: 0 });
        Ok(())
    }

    #[test]
    fn test_short_body_is_junk() -> Result<()> {
        // claims 10 bytes, 6 present
        let mut r = reader(&[0x06, 0x0a, 0x00, 1, 2, 3, 4, 5, 6]);
        assert_eq!(r.next_record()?, RecordStatus::Junk { offset: 0 });
        assert!(r.at_end()?);
        Ok(())
    }

    #[test]
    fn test_bad_crc_resync() -> Result<()> {
        let mut r = reader(&[0x10, 0x02, 0x00, 0x41, 0x00, 0x0e, 0x01, 0x00, 0xf1]);
        let RecordStatus::BadCrc(record) = r.next_record()? else {
            panic!("expected a bad crc");
        };
        assert_eq!(record.payload(), &[0x41]);
        assert!(matches!(r.next_record()?, RecordStatus::Ok(_)));
        Ok(())
    }

    #[test]
    fn test_bad_crc_without_resync_is_junk() -> Result<()> {
        let mut r = reader(&[0x10, 0x02, 0x00, 0x41, 0x00]);
        assert_eq!(r.next_record()?, RecordStatus::Junk { offset: 0 });
        Ok(())
    }

    #[test]
    fn test_peek_and_lookahead() -> Result<()> {
        let mut r = reader(&[0x0e, 0x01, 0x00, 0xf1, 0x0e, 0x01, 0x00, 0xf1]);
        assert_eq!(r.peek_next_type()?, Some(0x0e));
        let count = r.lookahead(|r| {
            let mut n = 0;
            while let RecordStatus::Ok(_) = r.next_record()? {
                n += 1;
            }
            Ok(n)
        })?;
        assert_eq!(count, 2);
        assert_eq!(r.position()?, 0);
        Ok(())
    }
}
