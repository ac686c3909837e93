// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! Stream variant detection.

use std::fmt;
use std::io::{Read, Seek};

use anyhow::Result;
use log::debug;

use crate::record::{Record, RecordReader, RecordStatus};

/// The OMF family a stream belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Variant {
    /// Not recognised. Records are hex dumped.
    #[value(name = "unknown")]
    Unknown,
    /// 8080/8085
    #[value(name = "85")]
    Omf85,
    /// 8051
    #[value(name = "51")]
    Omf51,
    /// 8051 with the Keil extension records
    #[value(name = "51k")]
    Omf51K,
    /// 8096
    #[value(name = "96")]
    Omf96,
    /// 8086 and later
    #[value(name = "86")]
    Omf86,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown OMF",
            Self::Omf85 => "OMF-85",
            Self::Omf51 => "OMF-51",
            Self::Omf51K => "OMF-51 (Keil)",
            Self::Omf96 => "OMF-96",
            Self::Omf86 => "OMF-86",
        })
    }
}

/// The OMF86 dialect in use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Flavour {
    /// Not yet known; Intel interpretation applies.
    #[default]
    #[value(skip)]
    Any,
    Intel,
    Ms,
    Ibm,
    #[value(name = "pharlap")]
    PharLap,
}

impl Flavour {
    /// Whether ambiguous Intel/Microsoft encodings take the Intel meaning.
    pub fn is_intel(&self) -> bool {
        matches!(self, Self::Any | Self::Intel)
    }

    /// The flavour implied by the record type alone, if any.
    pub fn from_record_type(rec_type: u8) -> Option<Flavour> {
        if rec_type < 0x80 || rec_type == 0x84 || rec_type == 0x86 {
            Some(Self::Intel)
        } else if rec_type > 0xaa || rec_type & 1 == 1 {
            Some(Self::Ms)
        } else {
            None
        }
    }
}

impl fmt::Display for Flavour {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Any => "Any",
            Self::Intel => "Intel",
            Self::Ms => "Microsoft",
            Self::Ibm => "IBM",
            Self::PharLap => "PharLap",
        })
    }
}

// translator ids, masked with 0xfe, that only OMF96 uses
const OMF96_TRANSLATORS: [u8; 11] = [
    0x04, 0x06, 0x20, 0x24, 0x26, 0x40, 0x44, 0x46, 0xe0, 0xe4, 0xe6,
];

const OMF86_HEADERS: [u8; 4] = [0x6e, 0x80, 0x82, 0xa4];

const LIBHDR_51_85: u8 = 0x2c;
const LIBHDR_96: u8 = 0x2e;
const LIBNAM_85: u8 = 0x28;
const MODHDR: u8 = 0x02;

/// Classifies a stream from its first module header.
pub struct FormatDetector;

impl FormatDetector {
    /// Inspects the first record (or the first two, for a library) and
    /// leaves the reader rewound to the start of the stream.
    pub fn detect<R: Read + Seek>(reader: &mut RecordReader<R>) -> Result<Variant> {
        reader.rewind()?;
        let variant = Self::classify(reader);
        reader.rewind()?;
        let variant = variant?;
        debug!("detected {variant}");
        Ok(variant)
    }

    fn classify<R: Read + Seek>(reader: &mut RecordReader<R>) -> Result<Variant> {
        let Some(mut record) = first_record(reader)? else {
            return Ok(Variant::Unknown);
        };

        let mut library = false;
        if record.rec_type() == LIBHDR_51_85 {
            library = true;
            let Some(next) = first_record(reader)? else {
                return Ok(Variant::Unknown);
            };
            record = next;
        }

        Ok(match record.rec_type() {
            LIBNAM_85 if library => Variant::Omf85,
            MODHDR => Self::classify_translator(&record),
            LIBHDR_96 => Variant::Omf96,
            t if OMF86_HEADERS.contains(&t) => Variant::Omf86,
            0x6e..=0xce => Variant::Omf86,
            _ => Variant::Unknown,
        })
    }

    /// The translator id follows the module name in an OMF85/51/96 MODHDR.
    fn classify_translator(record: &Record) -> Variant {
        let mut cursor = record.cursor();
        let trn = match cursor.skip_name().and_then(|_| cursor.u8()) {
            Ok(trn) => trn,
            Err(_) => return Variant::Unknown,
        };
        match trn {
            0..=2 => Variant::Omf85,
            0xfd..=0xff => Variant::Omf51,
            t if OMF96_TRANSLATORS.contains(&(t & 0xfe)) => Variant::Omf96,
            _ => Variant::Unknown,
        }
    }
}

fn first_record<R: Read + Seek>(reader: &mut RecordReader<R>) -> Result<Option<Record>> {
    Ok(match reader.next_record()? {
        RecordStatus::Ok(record) | RecordStatus::BadCrc(record) => Some(record),
        RecordStatus::Eof | RecordStatus::Junk { .. } => None,
    })
}
