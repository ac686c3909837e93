// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! 8096 object modules.

use super::{library, width, Omf96Kind, RecordDecoder};
use crate::context::{Counters, MAX_NAME};
use crate::error::Result;
use crate::hex_str;
use crate::index::Category;
use crate::leaf::intel96;
use crate::report::Column;

const FIXUP: u8 = 0x22;

const TRANSLATORS: [&str; 8] = [
    "ASM-96", "PL/M-96", "C-96", "UNK3-96", "UNK4-96", "UNK5-96", "UNK6-96", "ANY-96",
];
const VERSIONS: [&str; 5] = [
    "OMF96 v1.4",
    "OMF96 v1.?",
    "OMF96 v2.0",
    "OMF96 v3.0",
    "OMF96 v?.?",
];
const SIZES: [&str; 4] = ["Byte", "Word", "Long", "????"];

const VERSION_MASK: u8 = 0x1e;
const MAX_VERSION: u8 = 0x06;
const TRANSLATOR_MASK: u8 = 0xe0;
const GENERATED_BY_RL96: u8 = 0x01;

const RELOCATABLE: u8 = 0x80;
const BASED: u8 = 0x40;

const BLOCK_PROC: u8 = 0x40;
const BLOCK_EXTERNAL_FRAME: u8 = 0x80;

const FIXUP_EXTERNAL: u8 = 0x80;
const FIXUP_NO_OFFSET: u8 = 0x40;
const REF_TYPE_MASK: u8 = 0x3c;

pub fn decode(d: &mut RecordDecoder, kind: Omf96Kind) -> Result<()> {
    match kind {
        Omf96Kind::ModHdr => mod_hdr(d),
        Omf96Kind::ModEnd => {
            let main = d.cur.u8()? & 1 != 0;
            let invalid = d.cur.u8()? & 1 != 0;
            d.raw(match (main, invalid) {
                (true, true) => "Main Invalid",
                (true, false) => "Main ",
                (false, true) => "Invalid",
                (false, false) => "",
            });
            Ok(())
        }
        Omf96Kind::Content => {
            segment_id(d)?;
            let address = d.cur.u16()?;
            let show = d.followed_by(&[FIXUP]);
            d.hex_rest(address.into(), show);
            Ok(())
        }
        Omf96Kind::LinNum => {
            segment_id(d)?;
            library::line_numbers(d)
        }
        Omf96Kind::BlkDef => blk_def(d),
        Omf96Kind::BlkEnd | Omf96Kind::Eof => Ok(()),
        Omf96Kind::Ancestor => {
            let name = d.cur.name()?;
            d.raw(&name);
            seg_def(d)
        }
        Omf96Kind::Locals | Omf96Kind::Publics => symbols(d),
        Omf96Kind::TypeDef => type_def(d),
        Omf96Kind::ExtDef => ext_def(d),
        Omf96Kind::SegDef => seg_def(d),
        Omf96Kind::Fixup => fixup(d),
        Omf96Kind::LibLoc => library::lib_loc(d),
        Omf96Kind::LibNam => library::lib_nam(d),
        Omf96Kind::LibDic => library::lib_dic(d),
        Omf96Kind::LibHdr => library::lib_hdr(d),
    }
}

/// `NAME[REL BASED]` for a segment id byte.
fn segment_text(d: &mut RecordDecoder, id: u8) -> String {
    let seg = d.seg(u16::from(id & 7));
    let reloc = if id & RELOCATABLE != 0 { "REL" } else { "ABS" };
    let based = if id & BASED != 0 { " BASED" } else { "" };
    format!("{seg}[{reloc}{based}]")
}

fn segment_id(d: &mut RecordDecoder) -> Result<()> {
    let id = d.cur.u8()?;
    let text = segment_text(d, id);
    d.field(&text);
    Ok(())
}

fn mod_hdr(d: &mut RecordDecoder) -> Result<()> {
    let name = d.cur.name()?;
    let ver_gen = d.cur.u8()?;
    let time = d.cur.name()?;

    let mut version = ver_gen & VERSION_MASK;
    if version > MAX_VERSION {
        version = MAX_VERSION + 2;
    }
    let translator = TRANSLATORS[usize::from((ver_gen & TRANSLATOR_MASK) >> 5)];
    let linked = if ver_gen & GENERATED_BY_RL96 != 0 { "" } else { "|RL-96" };
    d.raw(&format!(
        "{name} - {} - {translator}{linked}",
        VERSIONS[usize::from(version >> 1)]
    ));
    if !time.is_empty() {
        d.raw(&format!(" - {time}"));
    }
    Ok(())
}

fn blk_def(d: &mut RecordDecoder) -> Result<()> {
    let name = d.cur.name()?;
    let seg = d.cur.u8()?;
    let offset = d.cur.u16()?;
    let size = d.cur.u16()?;
    let flags = d.cur.u8()?;
    let block_type = d.cur.index()?;
    let proc = flags & BLOCK_PROC != 0;
    d.raw(&format!("{}:{name}", if proc { "PROC" } else { "DO" }));

    let frame_width = MAX_NAME.max(width::SEG_ID_96) + 5;
    let columns = [
        Column::new("Location", width::SEG_ID_96 + 5),
        Column::new("Size", 4),
        Column::new("Type", width::TYPE_REF_96),
        Column::new("Frame", frame_width),
        Column::new("RetOff", 8),
        Column::label("PrologSize"),
    ];
    d.fixed(if proc { &columns } else { &columns[..3] });

    d.row(1);
    let location = segment_text(d, seg);
    d.field(&location);
    d.raw(&format!(",{offset:04X}"));
    d.field(&format!("{size:04X}"));
    if name.is_empty() {
        d.field("");
    } else {
        d.field(&intel96::type_ref(block_type));
    }
    if proc {
        if flags & BLOCK_EXTERNAL_FRAME != 0 {
            let ext = d.cur.u16()?;
            let ext = d.ext(ext);
            d.field(&ext);
        } else {
            segment_id(d)?;
        }
        let frame_offset = d.cur.u16()?;
        d.raw(&format!(",{frame_offset:04X}"));
        let ret = d.cur.u16()?;
        d.field(&format!("[FP+{ret}]"));
        let prolog = d.cur.u8()?;
        d.field(&format!("{prolog:02X}"));
    }
    Ok(())
}

fn symbols(d: &mut RecordDecoder) -> Result<()> {
    segment_id(d)?;
    let cols = d.table(&[
        Column::label("Offset"),
        Column::new("Name", width::NAME),
        Column::new("Type", width::TYPE_REF_96),
    ]);
    while !d.cur.at_end() {
        d.row(cols);
        let offset = d.cur.u16()?;
        d.field(&format!("{offset:04X}"));
        let name = d.cur.name()?;
        d.field(&name);
        let index = d.cur.index()?;
        d.field(&intel96::type_ref(index));
    }
    Ok(())
}

fn type_def(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[
        Column::label("Index"),
        Column::new("Definition", width::TYPEDEF_96),
    ]);
    while !d.cur.at_end() {
        d.row(cols);
        let index = Counters::next(&mut d.ctx.counters.typedef);
        d.field(&format!("@{index}"));
        intel96::descriptor(&mut d.cur, &mut *d.out)?;
    }
    Ok(())
}

fn ext_def(d: &mut RecordDecoder) -> Result<()> {
    segment_id(d)?;
    let cols = d.table(&[
        Column::new("Id", 4),
        Column::new("Type", width::TYPE_REF_96),
        Column::new("Name", width::NAME),
    ]);
    while !d.cur.at_end() {
        d.row(cols);
        let name = d.cur.name()?;
        let type_index = d.cur.index()?;
        let index = Counters::next(&mut d.ctx.counters.external);
        d.ctx.names.set(Category::External, index, &name);
        d.field(&format!("@{index}"));
        d.field(&intel96::type_ref(type_index));
        d.field(&name);
    }
    Ok(())
}

fn seg_def(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[
        Column::new("SegId", width::SEG_ID_96),
        Column::new("Reloc", 8),
        Column::label("Size"),
    ]);
    while !d.cur.at_end() {
        d.row(cols);
        let id = d.cur.u8()?;
        let text = segment_text(d, id);
        d.field(&text);
        if id & RELOCATABLE != 0 {
            let mode = d.cur.u8()?;
            d.field(SIZES[usize::from(mode & 3)]);
        } else {
            let base = d.cur.u16()?;
            d.field(&format!("Abs {base:04X}"));
        }
        let size = d.cur.u16()?;
        d.field(&format!("{size:04X}"));
    }
    Ok(())
}

fn reference(ftype: u8, pcr: u16) -> String {
    let signed = pcr as i16;
    match ftype & REF_TYPE_MASK {
        0x00 => format!("Reg({})", pcr & 0xff),
        0x04 => format!("RegIncr({})", pcr & 0xff),
        0x08 => format!("Shift({})", pcr & 0xf),
        0x0c => format!("ShiftReg({:02X})", pcr & 0xff),
        0x10 => format!("DcbConst({signed})"),
        0x18 => format!("SJmp({signed})"),
        0x1c => format!("MJmp({signed})"),
        0x20 => format!("MCall({signed})"),
        0x24 => format!("JmpCall({})", hex_str(pcr.into())),
        0x28 => format!("Direct({})", hex_str(pcr.into())),
        other => format!("Fixup{}({})", other >> 2, hex_str(pcr.into())),
    }
}

fn fixup(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[
        Column::new("Type", 15),
        Column::label("Align"),
        Column::new("Value", MAX_NAME.max(width::SEG_ID_96) + 5),
    ]);
    while !d.cur.at_end() {
        d.row(cols);
        let ftype = d.cur.u8()?;
        let pcr = d.cur.u16()?;
        d.field(&reference(ftype, pcr));
        d.field(SIZES[usize::from(ftype & 3)]);
        if ftype & FIXUP_EXTERNAL != 0 {
            let ext = d.cur.u16()?;
            let ext = d.ext(ext);
            d.field(&ext);
        } else {
            segment_id(d)?;
        }
        if ftype & FIXUP_NO_OFFSET == 0 {
            let offset = d.cur.u16()?;
            d.raw(&format!(",{offset:04X}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::DecoderContext;
    use crate::detect::{Flavour, Variant};
    use crate::omf::testing::run;

    fn context() -> DecoderContext {
        DecoderContext::new(Variant::Omf96, Flavour::Any)
    }

    #[test]
    fn test_mod_hdr() {
        let mut ctx = context();
        let (malformed, out) = run(&mut ctx, 0x02, b"\x04MAIN\x24\x05NOON!", None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["MAIN - OMF96 v2.0 - PL/M-96|RL-96 - NOON!"]);

        let (_, out) = run(&mut ctx, 0x02, b"\x01M\x1f\x00", None);
        assert_eq!(out.lines(), vec!["M - OMF96 v?.? - ASM-96"]);
    }

    #[test]
    fn test_seg_def() {
        let mut ctx = context();
        let segs = [0x81, 0x01, 0x20, 0x00, 0x02, 0x00, 0x01, 0x40, 0x00];
        let (malformed, out) = run(&mut ctx, 0x20, &segs, None);
        assert!(!malformed);
        assert_eq!(
            out.lines(),
            vec!["DATA[REL] Word 0020", "REGISTER[ABS] Abs 0100 0040"]
        );
    }

    #[test]
    fn test_types_start_at_32() {
        let mut ctx = context();
        let (malformed, out) = run(&mut ctx, 0x14, &[94, 10, 99, 106, 92, 104, 32, 106], None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["@32 Array 10 Scalar", "@33 List @32"]);
    }

    #[test]
    fn test_fixup_references() {
        assert_eq!(reference(0x00, 0x1234), "Reg(52)");
        assert_eq!(reference(0x18, 0xfffe), "SJmp(-2)");
        assert_eq!(reference(0x24, 0x2000), "JmpCall(2000H)");
        assert_eq!(reference(0x30, 0x0a), "Fixup12(0AH)");

        let mut ctx = context();
        ctx.names.set(Category::External, 1, "PRINTF");
        let fixup = [0x85, 0x10, 0x00, 0x01, 0x00, 0x08, 0x00];
        let (malformed, out) = run(&mut ctx, 0x22, &fixup, None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["RegIncr(16) Word PRINTF,0008"]);
    }

    #[test]
    fn test_proc_block() {
        let mut ctx = context();
        let mut block = b"\x03FOO".to_vec();
        block.extend([0x80, 0x10, 0x00, 0x20, 0x00, 0x40, 7]);
        block.extend([0x01, 0x02, 0x00, 0x04, 0x00, 0x03]);
        let (malformed, out) = run(&mut ctx, 0x0a, &block, None);
        assert!(!malformed);
        assert_eq!(
            out.lines(),
            vec![
                "PROC:FOO",
                "CODE[REL],0010 0020 INT16 DATA[ABS],0002 [FP+4] 03"
            ]
        );
    }
}
