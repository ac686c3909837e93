// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! Record kinds and the decoder shared by the variant routines.
//!
//! Each variant has a closed set of record kinds. A record type that has
//! no kind in the session's variant classifies as [RecordKind::Invalid]
//! and is hex dumped.

use log::warn;

use crate::context::DecoderContext;
use crate::cursor::FieldCursor;
use crate::detect::Variant;
use crate::error::Result;
use crate::index::Category;
use crate::record::Record;
use crate::report::{Column, Reporter};

pub mod library;
pub mod omf51;
pub mod omf85;
pub mod omf86;
pub mod omf96;

/// Display widths shared by the record tables.
pub(crate) mod width {
    use crate::context::MAX_NAME;

    pub const NAME: usize = 24;
    pub const NAME_85: usize = 12;
    pub const NAME_51: usize = 16;
    pub const NAME_96: usize = 20;
    pub const NAME_86: usize = 25;
    pub const INFO_51: usize = 22;
    pub const FIXUP_51: usize = 30;
    pub const SEG_ID_96: usize = 19;
    pub const TYPE_REF_96: usize = 8;
    pub const TYPEDEF_96: usize = 35;
    pub const SEG_OFFSET: usize = MAX_NAME + 5;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Omf85Kind {
    ModHdr,
    ModEnd,
    Content,
    LinNum,
    Eof,
    Ancestor,
    Locals,
    Publics,
    ExtDef,
    ExtFix,
    Fixup,
    SegFix,
    LibLoc,
    LibNam,
    LibDic,
    LibHdr,
    ComNam,
}

impl Omf85Kind {
    pub fn from_type(rec_type: u8) -> Option<Self> {
        Some(match rec_type {
            0x02 => Self::ModHdr,
            0x04 => Self::ModEnd,
            0x06 => Self::Content,
            0x08 => Self::LinNum,
            0x0e => Self::Eof,
            0x10 => Self::Ancestor,
            0x12 => Self::Locals,
            0x16 => Self::Publics,
            0x18 => Self::ExtDef,
            0x20 => Self::ExtFix,
            0x22 => Self::Fixup,
            0x24 => Self::SegFix,
            0x26 => Self::LibLoc,
            0x28 => Self::LibNam,
            0x2a => Self::LibDic,
            0x2c => Self::LibHdr,
            0x2e => Self::ComNam,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ModHdr => "MODHDR",
            Self::ModEnd => "MODEND",
            Self::Content => "CONTENT",
            Self::LinNum => "LINNUM",
            Self::Eof => "EOF",
            Self::Ancestor => "ANCESTOR",
            Self::Locals => "LOCALS",
            Self::Publics => "PUBLICS",
            Self::ExtDef => "EXTDEF",
            Self::ExtFix => "EXTFIX",
            Self::Fixup => "FIXUP",
            Self::SegFix => "SEGFIX",
            Self::LibLoc => "LIBLOC",
            Self::LibNam => "LIBNAM",
            Self::LibDic => "LIBDIC",
            Self::LibHdr => "LIBHDR",
            Self::ComNam => "COMNAM",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Omf51Kind {
    ModHdr,
    ModEnd,
    Content,
    Fixup,
    SegDef,
    ScopeDef,
    DbgItem,
    Publics,
    ExtDef,
    LibLoc,
    LibNam,
    LibDic,
    LibHdr,
    TypeDef,
    SymInfo,
    Depend,
    RegMsk,
    SrcName,
}

impl Omf51Kind {
    /// Classifies `rec_type`, including the Keil only record types.
    /// The odd Keil types are the 16-bit id forms of their even
    /// counterparts.
    pub fn from_type(rec_type: u8) -> Option<Self> {
        Some(match rec_type {
            0x02 => Self::ModHdr,
            0x04 => Self::ModEnd,
            0x06 | 0x07 => Self::Content,
            0x08 | 0x09 => Self::Fixup,
            0x0e | 0x0f => Self::SegDef,
            0x10 => Self::ScopeDef,
            0x12 => Self::DbgItem,
            0x16 | 0x17 => Self::Publics,
            0x18 | 0x19 => Self::ExtDef,
            0x20 => Self::TypeDef,
            0x22 => Self::SymInfo,
            0x26 => Self::LibLoc,
            0x28 => Self::LibNam,
            0x2a => Self::LibDic,
            0x2c => Self::LibHdr,
            0x62 => Self::Depend,
            0x70 => Self::RegMsk,
            0x72 => Self::SrcName,
            _ => return None,
        })
    }

    /// Whether `rec_type` only appears in Keil object files.
    pub fn keil_only(rec_type: u8) -> bool {
        rec_type & 1 == 1 || matches!(rec_type, 0x20 | 0x22 | 0x62 | 0x70 | 0x72)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ModHdr => "MODHDR",
            Self::ModEnd => "MODEND",
            Self::Content => "CONTENT",
            Self::Fixup => "FIXUP",
            Self::SegDef => "SEGDEF",
            Self::ScopeDef => "SCOPEDEF",
            Self::DbgItem => "DBGITEM",
            Self::Publics => "PUBLICS",
            Self::ExtDef => "EXTDEF",
            Self::LibLoc => "LIBLOC",
            Self::LibNam => "LIBNAM",
            Self::LibDic => "LIBDIC",
            Self::LibHdr => "LIBHDR",
            Self::TypeDef => "TYPEDEF",
            Self::SymInfo => "SYMINFO",
            Self::Depend => "DEPEND",
            Self::RegMsk => "REGMSK",
            Self::SrcName => "SRCNAME",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Omf96Kind {
    ModHdr,
    ModEnd,
    Content,
    LinNum,
    BlkDef,
    BlkEnd,
    Eof,
    Ancestor,
    Locals,
    TypeDef,
    Publics,
    ExtDef,
    SegDef,
    Fixup,
    LibLoc,
    LibNam,
    LibDic,
    LibHdr,
}

impl Omf96Kind {
    pub fn from_type(rec_type: u8) -> Option<Self> {
        Some(match rec_type {
            0x02 => Self::ModHdr,
            0x04 => Self::ModEnd,
            0x06 => Self::Content,
            0x08 => Self::LinNum,
            0x0a => Self::BlkDef,
            0x0c => Self::BlkEnd,
            0x0e => Self::Eof,
            0x10 => Self::Ancestor,
            0x12 => Self::Locals,
            0x14 => Self::TypeDef,
            0x16 => Self::Publics,
            0x18 => Self::ExtDef,
            0x20 => Self::SegDef,
            0x22 => Self::Fixup,
            0x26 => Self::LibLoc,
            0x28 => Self::LibNam,
            0x2a => Self::LibDic,
            0x2e => Self::LibHdr,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ModHdr => "MODHDR",
            Self::ModEnd => "MODEND",
            Self::Content => "CONTENT",
            Self::LinNum => "LINNUM",
            Self::BlkDef => "BLKDEF",
            Self::BlkEnd => "BLKEND",
            Self::Eof => "EOF",
            Self::Ancestor => "ANCESTOR",
            Self::Locals => "LOCALS",
            Self::TypeDef => "TYPEDEF",
            Self::Publics => "PUBLICS",
            Self::ExtDef => "EXTDEF",
            Self::SegDef => "SEGDEF",
            Self::Fixup => "FIXUP",
            Self::LibLoc => "LIBLOC",
            Self::LibNam => "LIBNAM",
            Self::LibDic => "LIBDIC",
            Self::LibHdr => "LIBHDR",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Omf86Kind {
    RHeadr,
    RegInt,
    ReData,
    RiData,
    OvlDef,
    EndRec,
    BlkDef,
    BlkEnd,
    DebSym,
    THeadr,
    LHeadr,
    PeData,
    PiData,
    Coment,
    ModEnd,
    ExtDef,
    TypDef,
    PubDef,
    LocSym,
    LinNum,
    LNames,
    SegDef,
    GrpDef,
    Fixupp,
    LeData,
    LiData,
    LibHed,
    LibNam,
    LibLoc,
    LibDic,
    ComDef,
    BakPat,
    LExtDef,
    LPubDef,
    LComDef,
    CExtDef,
    ComDat,
    LinSym,
    Alias,
    NBkPat,
    LLNames,
    VerNum,
    VendExt,
}

/// Odd record types with a 32-bit form.
const OMF86_WIDE_TYPES: [u8; 12] = [
    0x8b, 0x91, 0x95, 0x99, 0xa1, 0xa3, 0xb3, 0xb5, 0xb7, 0xc3, 0xc5, 0xc9,
];

impl Omf86Kind {
    pub fn from_type(rec_type: u8) -> Option<Self> {
        if rec_type & 1 == 1 && !OMF86_WIDE_TYPES.contains(&rec_type) {
            return None;
        }
        Some(match rec_type & !1 {
            0x6e => Self::RHeadr,
            0x70 => Self::RegInt,
            0x72 => Self::ReData,
            0x74 => Self::RiData,
            0x76 => Self::OvlDef,
            0x78 => Self::EndRec,
            0x7a => Self::BlkDef,
            0x7c => Self::BlkEnd,
            0x7e => Self::DebSym,
            0x80 => Self::THeadr,
            0x82 => Self::LHeadr,
            0x84 => Self::PeData,
            0x86 => Self::PiData,
            0x88 => Self::Coment,
            0x8a => Self::ModEnd,
            0x8c => Self::ExtDef,
            0x8e => Self::TypDef,
            0x90 => Self::PubDef,
            0x92 => Self::LocSym,
            0x94 => Self::LinNum,
            0x96 => Self::LNames,
            0x98 => Self::SegDef,
            0x9a => Self::GrpDef,
            0x9c => Self::Fixupp,
            0xa0 => Self::LeData,
            0xa2 => Self::LiData,
            0xa4 => Self::LibHed,
            0xa6 => Self::LibNam,
            0xa8 => Self::LibLoc,
            0xaa => Self::LibDic,
            0xb0 => Self::ComDef,
            0xb2 => Self::BakPat,
            0xb4 => Self::LExtDef,
            0xb6 => Self::LPubDef,
            0xb8 => Self::LComDef,
            0xbc => Self::CExtDef,
            0xc2 => Self::ComDat,
            0xc4 => Self::LinSym,
            0xc6 => Self::Alias,
            0xc8 => Self::NBkPat,
            0xca => Self::LLNames,
            0xcc => Self::VerNum,
            0xce => Self::VendExt,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RHeadr => "RHEADR",
            Self::RegInt => "REGINT",
            Self::ReData => "REDATA",
            Self::RiData => "RIDATA",
            Self::OvlDef => "OVLDEF",
            Self::EndRec => "ENDREC",
            Self::BlkDef => "BLKDEF",
            Self::BlkEnd => "BLKEND",
            Self::DebSym => "DEBSYM",
            Self::THeadr => "THEADR",
            Self::LHeadr => "LHEADR",
            Self::PeData => "PEDATA",
            Self::PiData => "PIDATA",
            Self::Coment => "COMENT",
            Self::ModEnd => "MODEND",
            Self::ExtDef => "EXTDEF",
            Self::TypDef => "TYPDEF",
            Self::PubDef => "PUBDEF",
            Self::LocSym => "LOCSYM",
            Self::LinNum => "LINNUM",
            Self::LNames => "LNAMES",
            Self::SegDef => "SEGDEF",
            Self::GrpDef => "GRPDEF",
            Self::Fixupp => "FIXUPP",
            Self::LeData => "LEDATA",
            Self::LiData => "LIDATA",
            Self::LibHed => "LIBHED",
            Self::LibNam => "LIBNAM",
            Self::LibLoc => "LIBLOC",
            Self::LibDic => "LIBDIC",
            Self::ComDef => "COMDEF",
            Self::BakPat => "BAKPAT",
            Self::LExtDef => "LEXTDEF",
            Self::LPubDef => "LPUBDEF",
            Self::LComDef => "LCOMDEF",
            Self::CExtDef => "CEXTDEF",
            Self::ComDat => "COMDAT",
            Self::LinSym => "LINSYM",
            Self::Alias => "ALIAS",
            Self::NBkPat => "NBKPAT",
            Self::LLNames => "LLNAMES",
            Self::VerNum => "VERNUM",
            Self::VendExt => "VENDEXT",
        }
    }
}

/// What a record type means in the session's variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Omf85(Omf85Kind),
    Omf51(Omf51Kind),
    Omf96(Omf96Kind),
    Omf86(Omf86Kind),
    /// No such record in this variant.
    Invalid,
    /// The stream variant is not known.
    Unknown,
}

impl RecordKind {
    pub fn classify(variant: Variant, rec_type: u8) -> Self {
        let kind = match variant {
            Variant::Unknown => return Self::Unknown,
            Variant::Omf85 => Omf85Kind::from_type(rec_type).map(Self::Omf85),
            Variant::Omf51 if Omf51Kind::keil_only(rec_type) => None,
            Variant::Omf51 | Variant::Omf51K => Omf51Kind::from_type(rec_type).map(Self::Omf51),
            Variant::Omf96 => Omf96Kind::from_type(rec_type).map(Self::Omf96),
            Variant::Omf86 => Omf86Kind::from_type(rec_type).map(Self::Omf86),
        };
        kind.unwrap_or(Self::Invalid)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Omf85(kind) => kind.name(),
            Self::Omf51(kind) => kind.name(),
            Self::Omf96(kind) => kind.name(),
            Self::Omf86(kind) => kind.name(),
            Self::Invalid => "INVALID",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Whether the record starts a new module.
    pub fn is_module_header(&self) -> bool {
        matches!(
            self,
            Self::Omf85(Omf85Kind::ModHdr)
                | Self::Omf51(Omf51Kind::ModHdr)
                | Self::Omf96(Omf96Kind::ModHdr)
                | Self::Omf86(Omf86Kind::THeadr | Omf86Kind::LHeadr | Omf86Kind::RHeadr)
        )
    }

    /// Whether this record ends the stream.
    pub fn is_end_of_file(&self) -> bool {
        matches!(
            self,
            Self::Omf85(Omf85Kind::Eof) | Self::Omf96(Omf96Kind::Eof)
        )
    }

    pub fn is_decodable(&self) -> bool {
        !matches!(self, Self::Invalid | Self::Unknown)
    }
}

/// Decodes the payload of one record.
///
/// Holds the payload cursor, the session context and the reporter for the
/// duration of one record. `row_mark` tracks the start of the group being
/// decoded so that a failure can be shown from there.
pub struct RecordDecoder<'a> {
    pub(crate) cur: FieldCursor<'a>,
    pub(crate) ctx: &'a mut DecoderContext,
    pub(crate) out: &'a mut dyn Reporter,
    rec_type: u8,
    next_type: Option<u8>,
    row_mark: usize,
}

impl<'a> RecordDecoder<'a> {
    pub fn new(
        record: &'a Record,
        ctx: &'a mut DecoderContext,
        out: &'a mut dyn Reporter,
        next_type: Option<u8>,
    ) -> Self {
        Self {
            cur: record.cursor(),
            ctx,
            out,
            rec_type: record.rec_type(),
            next_type,
            row_mark: 0,
        }
    }

    pub fn rec_type(&self) -> u8 {
        self.rec_type
    }

    /// Odd record types select the wide field forms.
    pub fn is32(&self) -> bool {
        self.rec_type & 1 == 1
    }

    /// Offset of the start of the current group within the payload.
    pub fn row_mark(&self) -> usize {
        self.row_mark
    }

    pub fn position(&self) -> usize {
        self.cur.position()
    }

    /// Whether the following record is one of `types`.
    pub fn followed_by(&self, types: &[u8]) -> bool {
        self.next_type.is_some_and(|t| types.contains(&t))
    }

    pub fn decode(&mut self, kind: RecordKind) -> Result<()> {
        match kind {
            RecordKind::Omf85(kind) => omf85::decode(self, kind),
            RecordKind::Omf51(kind) => omf51::decode(self, kind),
            RecordKind::Omf96(kind) => omf96::decode(self, kind),
            RecordKind::Omf86(kind) => omf86::decode(self, kind),
            RecordKind::Invalid | RecordKind::Unknown => {
                self.hex_rest(0, false);
                Ok(())
            }
        }
    }

    /// Starts a group of `columns` cells and marks its start.
    pub(crate) fn row(&mut self, columns: usize) {
        self.row_mark = self.cur.position();
        self.out.start_columns(columns);
    }

    pub(crate) fn field(&mut self, text: &str) {
        self.out.emit_field(text);
    }

    pub(crate) fn raw(&mut self, text: &str) {
        self.out.emit_raw(text);
    }

    /// Emits a repeating table header, unless there is nothing to tabulate.
    pub(crate) fn table(&mut self, columns: &[Column]) -> usize {
        if self.cur.at_end() {
            1
        } else {
            self.out.repeat_header(columns)
        }
    }

    pub(crate) fn fixed(&mut self, columns: &[Column]) {
        self.out.fixed_header(columns);
    }

    pub(crate) fn diag(&mut self, text: &str) {
        warn!("{text}");
        self.out.log_diagnostic(text);
    }

    /// Hex dumps the rest of the payload at address `base`.
    pub(crate) fn hex_rest(&mut self, base: u32, show_offsets: bool) {
        let rest = self.cur.take_rest();
        self.out.hex_dump(base, show_offsets, rest);
    }

    pub(crate) fn seg(&mut self, index: u16) -> String {
        self.ctx.names.get(Category::Segment, index)
    }

    pub(crate) fn ext(&mut self, index: u16) -> String {
        self.ctx.names.get(Category::External, index)
    }

    pub(crate) fn lname(&mut self, index: u16) -> String {
        self.ctx.names.get(Category::Name, index)
    }

    pub(crate) fn group(&mut self, index: u16) -> String {
        self.ctx.names.get(Category::Group, index)
    }

    pub(crate) fn overlay(&mut self, index: u16) -> String {
        self.ctx.names.get(Category::Overlay, index)
    }

    pub(crate) fn block(&mut self, index: u16) -> String {
        self.ctx.names.get(Category::Block, index)
    }

    /// Handles the outcome of [decode](Self::decode): a failed decode
    /// drops the partial group and is shown from the group start, and a
    /// decode that stops short shows what is left. Returns whether the
    /// record was malformed.
    pub fn recover(&mut self, result: Result<()>) -> bool {
        let start = match result {
            Err(e) => {
                warn!("record {:02X}: {e}", self.rec_type);
                self.out.discard_pending();
                self.row_mark
            }
            Ok(()) if !self.cur.at_end() => self.cur.position(),
            Ok(()) => return false,
        };
        self.diag("-- Malformed record --");
        self.cur.seek(start);
        self.hex_rest(start as u32, false);
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            RecordKind::classify(Variant::Omf85, 0x02),
            RecordKind::Omf85(Omf85Kind::ModHdr)
        );
        assert_eq!(RecordKind::classify(Variant::Omf85, 0x0a), RecordKind::Invalid);
        assert_eq!(RecordKind::classify(Variant::Omf85, 0x30), RecordKind::Invalid);
        assert_eq!(RecordKind::classify(Variant::Unknown, 0x02), RecordKind::Unknown);
        assert_eq!(
            RecordKind::classify(Variant::Omf96, 0x14),
            RecordKind::Omf96(Omf96Kind::TypeDef)
        );
    }

    #[test]
    fn test_keil_types_need_keil_variant() {
        assert_eq!(RecordKind::classify(Variant::Omf51, 0x20), RecordKind::Invalid);
        assert_eq!(RecordKind::classify(Variant::Omf51, 0x07), RecordKind::Invalid);
        assert_eq!(
            RecordKind::classify(Variant::Omf51K, 0x07),
            RecordKind::Omf51(Omf51Kind::Content)
        );
        assert_eq!(
            RecordKind::classify(Variant::Omf51K, 0x70),
            RecordKind::Omf51(Omf51Kind::RegMsk)
        );
        assert!(Omf51Kind::keil_only(0x62));
        assert!(!Omf51Kind::keil_only(0x16));
    }

    #[test]
    fn test_omf86_wide_forms() {
        assert_eq!(
            RecordKind::classify(Variant::Omf86, 0xa1),
            RecordKind::Omf86(Omf86Kind::LeData)
        );
        assert_eq!(RecordKind::classify(Variant::Omf86, 0x81), RecordKind::Invalid);
        assert_eq!(RecordKind::classify(Variant::Omf86, 0x9e), RecordKind::Invalid);
        assert_eq!(RecordKind::classify(Variant::Omf86, 0xcf), RecordKind::Invalid);
    }

    #[test]
    fn test_names() {
        assert_eq!(RecordKind::Omf86(Omf86Kind::Fixupp).name(), "FIXUPP");
        assert_eq!(RecordKind::Invalid.name(), "INVALID");
        assert_eq!(RecordKind::Unknown.name(), "UNKNOWN");
        assert!(RecordKind::Omf86(Omf86Kind::THeadr).is_module_header());
        assert!(RecordKind::Omf96(Omf96Kind::Eof).is_end_of_file());
        assert!(!RecordKind::Omf86(Omf86Kind::ModEnd).is_end_of_file());
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::record::{RecordReader, RecordStatus};
    use crate::report::Recorder;
    use binrw::io::Cursor;

    /// The bytes of a record holding `payload`, with a valid checksum.
    pub fn frame(rec_type: u8, payload: &[u8]) -> Vec<u8> {
        let len = (payload.len() + 1) as u16;
        let mut bytes = vec![rec_type];
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(payload);
        let sum = bytes.iter().fold(0u8, |s, b| s.wrapping_add(*b));
        bytes.push(0u8.wrapping_sub(sum));
        bytes
    }

    pub fn record(rec_type: u8, payload: &[u8]) -> Record {
        let mut reader = RecordReader::new(Cursor::new(frame(rec_type, payload))).expect("reader");
        match reader.next_record().expect("read") {
            RecordStatus::Ok(record) => record,
            other => panic!("unexpected {other:?}"),
        }
    }

    /// Decodes one record in `ctx`'s variant. Returns whether it was
    /// malformed and what was reported.
    pub fn run(
        ctx: &mut DecoderContext,
        rec_type: u8,
        payload: &[u8],
        next_type: Option<u8>,
    ) -> (bool, Recorder) {
        let record = record(rec_type, payload);
        let kind = RecordKind::classify(ctx.variant(), rec_type);
        let mut out = Recorder::new();
        let mut d = RecordDecoder::new(&record, ctx, &mut out, next_type);
        let result = d.decode(kind);
        let malformed = d.recover(result);
        (malformed, out)
    }
}
