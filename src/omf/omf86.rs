// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! 8086 object modules, covering the Intel, Microsoft, IBM and PharLap
//! flavours.
//!
//! Several records encode their fields differently per flavour. Until the
//! flavour is pinned the Intel reading is used.

use log::debug;

use super::{library, width, Omf86Kind, RecordDecoder};
use crate::context::Counters;
use crate::detect::Flavour;
use crate::error::{DecodeError, Result};
use crate::fixup::{FixDat, FixupDecoder, FixupEntry, ThreadDef};
use crate::index::Category;
use crate::leaf::intel86;
use crate::report::Column;

const FIXUPP: [u8; 2] = [0x9c, 0x9d];

/// Deepest nesting accepted in an iterated data block.
const MAX_BLOCK_DEPTH: usize = 32;
const CONTENT_ROW: usize = 16;

const MODULE_TYPES: [&str; 4] = ["ABS", "REL", "PIC", "LTL"];
const REGISTERS: [&str; 4] = ["CS,IP", "SS,SP", "DS", "ES"];
const ALIGNMENTS: [&str; 8] = ["Abs", "Byte", "Word", "Para", "Page", "MAS", "LTL", "???"];
const COMBINES: [&str; 8] = [
    "Private",
    "Memory",
    "Public",
    "Reserved",
    "PubNoAlign",
    "Stack",
    "Common",
    "CommonHi",
];
const BACKPATCH_SIZES: [&str; 3] = ["Byte", "Word", "DWord"];
const COMDAT_SELECTIONS: [&str; 4] = ["No Match", "Pick Any", "Same Size", "Exact Match"];
const COMDAT_ALLOCATIONS: [&str; 5] = ["Explicit", "Far Code", "Far Data", "Code32", "Data32"];
const COMDAT_ALIGNMENTS: [&str; 7] = ["Seg", "Byte", "Word", "Para", "Page", "DWord", "Page4K"];
const MEMORY_MODELS: [(u8, &str); 14] = [
    (b'0', "8086"),
    (b'1', "80186"),
    (b'2', "80286"),
    (b'3', "80386"),
    (b'O', "Optimised"),
    (b's', "Small"),
    (b'm', "Medium"),
    (b'c', "Compact"),
    (b'l', "Large"),
    (b'h', "Huge"),
    (b'A', "68000"),
    (b'B', "68010"),
    (b'C', "68020"),
    (b'D', "68030"),
];

// SEGDEF attribute fields
const ALIGN_ABS: u8 = 0;
const ALIGN_PAGE_DWORD: u8 = 5;
const ALIGN_LTL: u8 = 6;
const ATTR_BIG: u8 = 0x02;
const ATTR_USE32: u8 = 0x01;
const LTL_MAX_64K: u8 = 0x01;
const LTL_GROUP: u8 = 0x80;

const PROC_BLOCK: u8 = 0x80;
const FAR_PROC: u8 = 0x40;
const BASED_POINTER: u8 = 0x80;
const BASED_32: u8 = 0x40;
const OVERLAY_SHARED: u8 = 0x02;
const OVERLAY_ADJACENT: u8 = 0x01;
const MAIN_MODULE: u8 = 0x80;
const START_ADDRESS: u8 = 0x40;
const FIXUP_START: u8 = 0x01;
const COMDAT_CONTINUED: u8 = 0x01;
const COMDAT_ITERATED: u8 = 0x02;
const COMDAT_LOCAL: u8 = 0x04;

pub fn decode(d: &mut RecordDecoder, kind: Omf86Kind) -> Result<()> {
    match kind {
        Omf86Kind::RHeadr => r_headr(d),
        Omf86Kind::RegInt => reg_int(d),
        Omf86Kind::ReData | Omf86Kind::PeData => enumerated(d, kind == Omf86Kind::PeData),
        Omf86Kind::RiData | Omf86Kind::PiData => {
            let address = if kind == Omf86Kind::PiData {
                let frame = d.cur.u16()?;
                d.raw(&format!("Frame:{frame:04X}"));
                d.cur.u8()?.into()
            } else {
                let text = base(d)?;
                d.raw(&text);
                d.cur.u16()?.into()
            };
            iterated(d, address)
        }
        Omf86Kind::OvlDef => ovl_def(d),
        Omf86Kind::EndRec => {
            let kind = d.cur.u8()?;
            d.raw(match kind {
                0 => "Overlay",
                1 => "Block",
                _ => "(Illegal)",
            });
            Ok(())
        }
        Omf86Kind::BlkDef => blk_def(d),
        Omf86Kind::BlkEnd => Ok(()),
        Omf86Kind::DebSym => deb_sym(d),
        Omf86Kind::THeadr | Omf86Kind::LHeadr => {
            let name = d.cur.name()?;
            d.raw(&name);
            Ok(())
        }
        Omf86Kind::Coment => coment(d),
        Omf86Kind::ModEnd => mod_end(d),
        Omf86Kind::ExtDef | Omf86Kind::LExtDef => ext_def(d),
        Omf86Kind::TypDef => {
            let name = d.cur.name()?;
            let index = Counters::next(&mut d.ctx.counters.typedef);
            if name.is_empty() {
                d.raw(&format!("#{index} "));
            } else {
                d.raw(&format!("{name} #{index} "));
            }
            intel86::descriptor(&mut d.cur, &mut *d.out)
        }
        Omf86Kind::PubDef | Omf86Kind::LocSym | Omf86Kind::LPubDef => publics(d),
        Omf86Kind::LinNum => lin_num(d),
        Omf86Kind::LNames | Omf86Kind::LLNames => names(d),
        Omf86Kind::SegDef => seg_def(d),
        Omf86Kind::GrpDef => grp_def(d),
        Omf86Kind::Fixupp => fixupp(d),
        Omf86Kind::LeData => {
            let index = d.cur.index()?;
            let seg = d.seg(index);
            d.raw(&seg);
            let address = d.cur.word(d.is32())?;
            let show = d.followed_by(&FIXUPP);
            d.hex_rest(address, show);
            Ok(())
        }
        Omf86Kind::LiData => {
            let index = d.cur.index()?;
            let seg = d.seg(index);
            d.raw(&seg);
            let address = d.cur.word(d.is32())?;
            iterated(d, address)
        }
        Omf86Kind::LibHed => library::lib_hdr(d),
        Omf86Kind::LibNam => library::lib_nam(d),
        Omf86Kind::LibLoc => library::lib_loc(d),
        Omf86Kind::LibDic => library::lib_dic(d),
        Omf86Kind::ComDef | Omf86Kind::LComDef => com_def(d),
        Omf86Kind::BakPat => bak_pat(d),
        Omf86Kind::CExtDef => c_ext_def(d),
        Omf86Kind::ComDat => com_dat(d),
        Omf86Kind::LinSym => lin_sym(d),
        Omf86Kind::Alias => {
            let cols = d.table(&[
                Column::new("Alias", width::NAME),
                Column::new("Substitute", width::NAME),
            ]);
            while !d.cur.at_end() {
                d.row(cols);
                let alias = d.cur.name()?;
                d.field(&alias);
                let substitute = d.cur.name()?;
                d.field(&substitute);
            }
            Ok(())
        }
        Omf86Kind::NBkPat => nbk_pat(d),
        Omf86Kind::VerNum => {
            let version = d.cur.name()?;
            d.raw(&format!("v{version}"));
            Ok(())
        }
        Omf86Kind::VendExt => {
            let vendor = d.cur.u8()?;
            d.raw(&format!("vendor {vendor} Extension Info:"));
            d.hex_rest(0, false);
            Ok(())
        }
    }
}

/// The group, segment and frame leading many records.
fn base(d: &mut RecordDecoder) -> Result<String> {
    let group = d.cur.index()?;
    let seg = d.cur.index()?;
    Ok(if group != 0 {
        let group = d.group(group);
        let seg = d.seg(seg);
        format!("Grp[{group}].Seg[{seg}]")
    } else if seg != 0 {
        format!("Seg[{}]", d.seg(seg))
    } else {
        format!("Frame: {:04X}", d.cur.u16()?)
    })
}

fn r_headr(d: &mut RecordDecoder) -> Result<()> {
    let name = d.cur.name()?;
    let module_type = d.cur.u8()?;
    d.raw(&format!("{name} - {}", MODULE_TYPES[usize::from(module_type & 3)]));
    let segments = d.cur.u16()?;
    let groups = d.cur.u16()?;
    let overlays = d.cur.u16()?;
    let overlay_at = d.cur.u32()?;
    let size = d.cur.u32()?;
    let max_size = d.cur.u32()?;
    let dynamic = d.cur.u32()?;
    let max_dynamic = d.cur.u32()?;

    d.fixed(&[
        Column::new("Segments", 9),
        Column::new("Groups", 7),
        Column::new("Overlays", 14),
        Column::new("Static Size", 18),
        Column::label("Dynamic Size"),
    ]);
    d.row(1);
    d.field(&format!("#{segments}"));
    d.field(&format!("#{groups}"));
    if overlays != 0 {
        d.field(&format!(
            "#{overlays} @{:04X}:{:02X}",
            overlay_at / 128,
            overlay_at % 128
        ));
    } else {
        d.field(&format!("#{overlays}"));
    }
    d.field(&range(size, max_size));
    d.field(&range(dynamic, max_dynamic));
    Ok(())
}

fn range(low: u32, high: u32) -> String {
    if low == high {
        format!("{low:X}")
    } else {
        format!("{low:X}-{high:X}")
    }
}

fn reg_int(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[Column::new("Reg", 5), Column::new("Value", width::NAME)]);
    while !d.cur.at_end() {
        d.row(cols);
        let reg_type = d.cur.u8()?;
        let reg = reg_type >> 6;
        d.field(REGISTERS[usize::from(reg)]);
        let value = if reg_type & FIXUP_START != 0 {
            fix_dat(d)?
        } else {
            let mut text = base(d)?;
            if reg <= 1 {
                text.push_str(&format!(",{:04X}", d.cur.u16()?));
            }
            text
        };
        d.field(&value);
    }
    Ok(())
}

/// Frame and target of a start address given as a fixup.
fn fix_dat(d: &mut RecordDecoder) -> Result<String> {
    let wide = d.is32();
    let fixdat = FixDat::decode(&mut d.cur, &d.ctx.threads, wide)?;
    let frame = fixdat.frame_text(&mut d.ctx.names);
    let target = fixdat.target_text(&mut d.ctx.names);
    Ok(format!("{frame} {target}"))
}

/// REDATA and PEDATA.
fn enumerated(d: &mut RecordDecoder, physical: bool) -> Result<()> {
    let address = if physical {
        let frame = d.cur.u16()?;
        d.raw(&format!("Frame:{frame:04X}"));
        d.cur.u8()?.into()
    } else {
        let text = base(d)?;
        d.raw(&text);
        d.cur.u16()?.into()
    };
    let show = d.followed_by(&FIXUPP);
    d.hex_rest(address, show);
    Ok(())
}

/// Iterated data: a list of blocks, followed by the address after the
/// last of them.
fn iterated(d: &mut RecordDecoder, address: u32) -> Result<()> {
    let mut address = address;
    while !d.cur.at_end() {
        let size = blocks(d, address, 1, 1)?;
        address = address.wrapping_add(size);
    }
    d.row(1);
    d.field(&format!("{address:04X}"));
    Ok(())
}

/// Decodes `count` blocks at nesting `depth`. Returns the bytes they
/// expand to.
fn blocks(d: &mut RecordDecoder, address: u32, count: u16, depth: usize) -> Result<u32> {
    if depth > MAX_BLOCK_DEPTH {
        return Err(DecodeError::invalid("iterated data nested too deeply"));
    }
    let mut delta = 0u32;
    for i in 1..=count {
        let at = address.wrapping_add(delta);
        d.row(1);
        d.field(&format!("{at:04X}"));
        if depth > 1 {
            d.field(&format!("{}{i}.", "  ".repeat(depth - 2)));
        }
        let repeat = d.cur.word(d.is32())?;
        if repeat > 1 {
            d.field(&format!("{repeat} x"));
        }
        let nested = d.cur.u16()?;
        let size = if nested != 0 {
            blocks(d, at, nested, depth + 1)?
        } else {
            content(d, at)?
        };
        delta = delta.wrapping_add(repeat.wrapping_mul(size));
    }
    Ok(delta)
}

fn content(d: &mut RecordDecoder, address: u32) -> Result<u32> {
    let len = d.cur.u8()?;
    let data = d.cur.bytes(len.into())?;
    for (n, chunk) in data.chunks(CONTENT_ROW).enumerate() {
        if n > 0 {
            d.row(1);
            d.field(&format!("{:04X}", address.wrapping_add((n * CONTENT_ROW) as u32)));
        }
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02X}")).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| if (0x20..0x7f).contains(&b) { b as char } else { '.' })
            .collect();
        d.field(&format!("{} |{ascii}|", hex.join(" ")));
    }
    Ok(len.into())
}

fn ovl_def(d: &mut RecordDecoder) -> Result<()> {
    let name = d.cur.name()?;
    let location = d.cur.u32()?;
    let attributes = d.cur.u8()?;
    let index = Counters::next(&mut d.ctx.counters.overlay);
    d.ctx.names.set(Category::Overlay, index, &name);
    d.raw(&format!("{name} @{:04X}:{:02X}", location / 128, location % 128));
    if attributes & OVERLAY_SHARED != 0 {
        let shared = d.cur.index()?;
        let shared = d.overlay(shared);
        d.raw(&format!(" Shared({shared})"));
    }
    if attributes & OVERLAY_ADJACENT != 0 {
        let adjacent = d.cur.index()?;
        let adjacent = d.overlay(adjacent);
        d.raw(&format!(" Adjacent({adjacent})"));
    }
    Ok(())
}

fn blk_def(d: &mut RecordDecoder) -> Result<()> {
    d.fixed(&[
        Column::new("Id", 4),
        Column::new("Base", 39),
        Column::new("Name", width::NAME),
        Column::new("BlkTyp", 10),
        Column::new("Offset", 6),
        Column::new("Len", 4),
        Column::new("RetAddr", 8),
        Column::label("Type"),
    ]);
    d.row(1);
    let index = Counters::next(&mut d.ctx.counters.block);
    d.field(&format!("#{index}"));
    let base = base(d)?;
    d.field(&base);
    let name = d.cur.name()?;
    let offset = d.cur.u16()?;
    let len = d.cur.u16()?;
    let info = d.cur.u8()?;
    let shown = if name.is_empty() { "*NoName*" } else { &name };
    d.ctx.names.set(Category::Block, index, shown);
    d.field(shown);

    let proc = info & PROC_BLOCK != 0;
    d.field(match (proc, info & FAR_PROC != 0) {
        (true, true) => "FAR PROC",
        (true, false) => "NEAR PROC",
        _ => "DO",
    });
    d.field(&format!("{offset:04X}"));
    d.field(&format!("{len:04X}"));
    if proc {
        let ret = d.cur.u16()?;
        d.field(&format!("[BP+{ret:X}]"));
    } else {
        d.field("");
    }
    if !name.is_empty() {
        let type_index = d.cur.index()?;
        d.field(&format!("#{type_index}"));
    }
    Ok(())
}

fn deb_sym(d: &mut RecordDecoder) -> Result<()> {
    let frame_info = d.cur.u8()?;
    if frame_info & BASED_POINTER != 0 {
        let bits = if frame_info & BASED_32 != 0 { 32 } else { 16 };
        d.raw(&format!("BASED POINTER{bits} "));
    }
    let method = frame_info & 7;
    match method {
        0 => {
            let text = base(d)?;
            d.raw(&text);
        }
        1 => {
            let index = d.cur.index()?;
            let ext = d.ext(index);
            d.raw(&format!("EI[{ext}]"));
        }
        2 => {
            let index = d.cur.index()?;
            let block = d.block(index);
            d.raw(&format!("BI[{block}<#{index}>]"));
        }
        _ => return Err(DecodeError::invalid(format!("Invalid Datum Method ({method})"))),
    }

    let cols = d.table(&[
        Column::new("Name", width::NAME_86),
        Column::label("Offset"),
        Column::label("Type"),
    ]);
    while !d.cur.at_end() {
        d.row(cols);
        let name = d.cur.name()?;
        d.field(&name);
        let offset = d.cur.u16()?;
        d.field(&match method {
            0 => format!("{offset:04X}"),
            1 => format!("{:+}", offset as i16),
            _ => format!("[BP{:+}]", offset as i16),
        });
        let type_index = d.cur.index()?;
        d.field(&format!("@{type_index}"));
    }
    Ok(())
}

fn coment(d: &mut RecordDecoder) -> Result<()> {
    let comment_type = d.cur.u8()?;
    let class = d.cur.u8()?;
    if comment_type & 0x80 != 0 {
        d.raw("No Purge ");
    }
    if comment_type & 0x40 != 0 {
        d.raw("No List ");
    }
    d.raw(&format!("Comment Class({class:02X}) "));
    match class {
        0x00 => d.raw("Translator"),
        0x80 => d.raw("Translator & Build"),
        0x01 => d.raw("Intel Copyright"),
        0x9c => d.raw("MS-DOS Version"),
        0x9d => {
            d.raw("Memory Model");
            memory_model(d)?;
        }
        0x9e => d.raw("DOSSEG"),
        0x81 | 0x9f => d.raw("Default Library Search Name"),
        0xa0 => omf_extension(d)?,
        0xa1 => d.raw("New OMF Extension"),
        0xa2 => match d.cur.u8()? {
            1 => d.raw("Link Pass Separator - Start Pass 2"),
            pass => d.raw(&format!("Link Pass Separator {pass}")),
        },
        0xa3 => {
            let module = d.cur.name()?;
            d.raw(&format!("Library Module Comment Record Module: '{module}'"));
        }
        0xa4 => d.raw("EXESTR: Executable String Record"),
        0xa6 => d.raw("INCERR: Incremental Compilation Error"),
        0xa7 => {
            d.raw("NOPAD: No Segment Padding");
            let cols = d.table(&[Column::new("Segment", width::NAME)]);
            while !d.cur.at_end() {
                d.row(cols);
                let index = d.cur.index()?;
                let seg = d.seg(index);
                d.field(&seg);
            }
        }
        0xa8 | 0xa9 => {
            let (title, label) = if class == 0xa8 {
                ("WKEXT: Weak Extern Record", "Weak Ext")
            } else {
                ("LZEXT: Lazy Extern Record", "Lazy Ext")
            };
            d.raw(title);
            let cols = d.table(&[
                Column::new(label, width::NAME),
                Column::new("Default Ext", width::NAME),
            ]);
            while !d.cur.at_end() {
                d.row(cols);
                for _ in 0..2 {
                    let index = d.cur.index()?;
                    let ext = d.ext(index);
                    d.field(&ext);
                }
            }
        }
        0xaa => {
            d.raw("Easy OMF");
            if d.cur.remaining().starts_with(b"80386") && d.ctx.pin_flavour(Flavour::PharLap) {
                debug!("Easy OMF-386 comment implies PharLap");
            }
        }
        0xda => d.raw("Random Comment"),
        0xdb => d.raw("Pragma Comment(compiler version)"),
        0xdc => d.raw("Pragma Comment(date stamp)"),
        0xdd => d.raw("Pragma Comment(timestamp)"),
        0xdf => d.raw("Pragma Comment(user)"),
        0xe9 => d.raw("Borland Dependency File"),
        0xff => d.raw("QuickC Command Line"),
        _ => d.raw("Reserved"),
    }
    comment_text(d);
    Ok(())
}

fn memory_model(d: &mut RecordDecoder) -> Result<()> {
    d.row(1);
    while !d.cur.at_end() {
        let item = d.cur.u8()?;
        match MEMORY_MODELS.iter().find(|(c, _)| *c == item) {
            Some((_, model)) => d.raw(&format!("{model} ")),
            None => d.raw(&format!("Unknown item {item:02X} ")),
        }
    }
    Ok(())
}

/// Class A0 comments carry a subtype byte.
fn omf_extension(d: &mut RecordDecoder) -> Result<()> {
    let subtype = d.cur.u8()?;
    d.raw(&format!("Subtype({subtype:02X}) "));
    match subtype {
        1 => {
            d.raw("IMPDEF: Import Definition Record");
            d.fixed(&[
                Column::new("Internal Name", width::NAME),
                Column::new("Module Name", width::NAME),
                Column::label("Entry Ident"),
            ]);
            d.row(1);
            let by_ordinal = d.cur.u8()? != 0;
            let internal = d.cur.name()?;
            d.field(&internal);
            let module = d.cur.name()?;
            d.field(&module);
            if by_ordinal {
                let ordinal = d.cur.u16()?;
                d.field(&format!("#{ordinal}"));
            } else {
                let entry = d.cur.name()?;
                d.field(if entry.is_empty() { &internal } else { &entry });
            }
        }
        2 => {
            d.raw("EXPDEF: Export Definition Record");
            d.fixed(&[
                Column::new("Exported Name", width::NAME),
                Column::new("Internal Name", width::NAME),
                Column::new("Ordinal", 7),
                Column::label("Attributes"),
            ]);
            d.row(1);
            let flags = d.cur.u8()?;
            let exported = d.cur.name()?;
            d.field(&exported);
            let internal = d.cur.name()?;
            d.field(&internal);
            if flags & 0x80 != 0 {
                let ordinal = d.cur.u16()?;
                d.field(&format!("#{ordinal}"));
            } else {
                d.field("");
            }
            let mut attributes = String::new();
            if flags & 0x40 != 0 {
                attributes.push_str("Resident Name ");
            }
            if flags & 0x20 != 0 {
                attributes.push_str("No Data ");
            }
            attributes.push_str(&format!("Parm Count: #{}", flags & 0x1f));
            d.field(&attributes);
        }
        3 => {
            d.raw("INCDEF: Incremental Compilation Record");
            let ext_delta = d.cur.i16()?;
            let lin_delta = d.cur.i16()?;
            d.raw(&format!("  ExtDef Delta: #{ext_delta}  LinNum Delta: #{lin_delta}"));
            d.cur.take_rest();
        }
        4 => d.raw("Protected Memory Library"),
        5 => {
            d.raw("LNKDIR: Microsoft C++ Directives Record");
            let flags = d.cur.u8()?;
            for (bit, text) in [(1, "  New .EXE "), (2, "  No $PUBLICS "), (4, "  Run MPC ")] {
                if flags & bit != 0 {
                    d.raw(text);
                }
            }
            let pseudo = d.cur.u8()?;
            let codeview = d.cur.u8()?;
            d.raw(&format!("  PseudoCode v{pseudo:02X}   CodeView v{codeview:02X}"));
        }
        6 => d.raw("Big-endian"),
        7 => d.raw("PRECOMP"),
        _ => d.raw("Reserved"),
    }
    Ok(())
}

/// Whatever a comment has left, with unprintable bytes escaped.
fn comment_text(d: &mut RecordDecoder) {
    if d.cur.at_end() {
        return;
    }
    let text: String = d
        .cur
        .take_rest()
        .iter()
        .map(|&b| {
            if (0x20..=0x7e).contains(&b) {
                char::from(b).to_string()
            } else {
                format!("\\{b:02x}")
            }
        })
        .collect();
    d.row(1);
    d.raw(&text);
}

fn mod_end(d: &mut RecordDecoder) -> Result<()> {
    let module_type = d.cur.u8()?;
    if module_type & MAIN_MODULE != 0 {
        d.raw("Main Module");
    }
    if module_type & START_ADDRESS != 0 {
        let ip = if d.is32() { "EIP" } else { "IP" };
        d.raw(&format!(" CS,{ip} = "));
        let start = if module_type & FIXUP_START != 0 {
            fix_dat(d)?
        } else {
            let frame = d.cur.u16()?;
            let offset = d.cur.u16()?;
            format!("{frame:04X},{offset:04X}")
        };
        d.raw(&start);
    }
    Ok(())
}

fn ext_def(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[
        Column::new("Id", 4),
        Column::new("Name", width::NAME),
        Column::label("Type"),
    ]);
    while !d.cur.at_end() {
        d.row(cols);
        let name = d.cur.name()?;
        let index = Counters::next(&mut d.ctx.counters.external);
        d.ctx.names.set(Category::External, index, &name);
        let type_index = d.cur.index()?;
        d.field(&format!("@{index}"));
        d.field(&name);
        d.field(&format!("@{type_index}"));
    }
    Ok(())
}

fn publics(d: &mut RecordDecoder) -> Result<()> {
    let text = base(d)?;
    d.raw(&text);
    let cols = d.table(&[
        Column::label("Offset"),
        Column::label("Type"),
        Column::new("Name", width::NAME),
    ]);
    while !d.cur.at_end() {
        d.row(cols);
        let name = d.cur.name()?;
        let offset = d.cur.word(d.is32())?;
        let type_index = d.cur.index()?;
        d.field(&format!("{offset:04X}"));
        d.field(&format!("@{type_index}"));
        d.field(&name);
    }
    Ok(())
}

fn lin_num(d: &mut RecordDecoder) -> Result<()> {
    let text = base(d)?;
    d.raw(&text);
    let cols = d.table(&[Column::label("Offset"), Column::new("Line", 5)]);
    while !d.cur.at_end() {
        d.row(cols);
        let line = d.cur.u16()?;
        let offset = d.cur.word(d.is32())?;
        d.field(&format!("{offset:04X}"));
        d.field(&format!("#{line}"));
    }
    Ok(())
}

fn names(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[Column::new("Id", 4), Column::new("Name", width::NAME)]);
    while !d.cur.at_end() {
        d.row(cols);
        let name = d.cur.name()?;
        let index = Counters::next(&mut d.ctx.counters.name);
        d.ctx.names.set(Category::Name, index, &name);
        d.field(&format!("@{index}"));
        d.field(if name.is_empty() { "*blank*" } else { &name });
    }
    Ok(())
}

fn seg_def(d: &mut RecordDecoder) -> Result<()> {
    let attributes = d.cur.u8()?;
    let align = attributes >> 5;
    let combine = (attributes >> 2) & 7;
    if (align == ALIGN_LTL || combine == 1 || combine == 3) && d.ctx.pin_flavour(Flavour::Intel) {
        debug!("SEGDEF attributes {attributes:02X} imply Intel OMF");
    }
    let intel = d.ctx.flavour().is_intel();

    let mut frame = None;
    let mut ltl = 0u8;
    let mut max_len = 0u32;
    let mut group_offset = 0u16;
    if align == ALIGN_ABS || (align == ALIGN_PAGE_DWORD && intel) {
        let number = d.cur.u16()?;
        let offset = d.cur.u8()?;
        frame = Some((number, offset));
    } else if align == ALIGN_LTL {
        ltl = d.cur.u8()?;
        max_len = d.cur.u16()?.into();
        group_offset = d.cur.u16()?;
        if ltl & LTL_MAX_64K != 0 {
            max_len = 0x10000;
        }
    }

    let mut seg_len = d.cur.word(d.is32())?;
    if attributes & ATTR_BIG != 0 && !d.is32() {
        seg_len = 0x10000;
    }

    let name = if align != ALIGN_PAGE_DWORD || !intel {
        let seg = d.cur.index()?;
        let class = d.cur.index()?;
        let overlay = d.cur.index()?;
        let mut name = d.lname(seg);
        let class = d.lname(class);
        let overlay = d.lname(overlay);
        if !class.is_empty() {
            name.push(':');
            name.push_str(&class);
        }
        if !overlay.is_empty() {
            name.push_str(if class.is_empty() { "::" } else { ":" });
            name.push_str(&overlay);
        }
        name
    } else {
        "*Unnamed*".to_string()
    };

    d.fixed(&[
        Column::new("Id", 4),
        Column::new("Segment:Class:Overlay", 34),
        Column::new("Len", 9),
        Column::new("Align", 17),
        Column::label("Combine"),
    ]);
    d.row(1);
    let index = Counters::next(&mut d.ctx.counters.segment);
    d.ctx.names.set(Category::Segment, index, &name);
    d.field(&format!("#{index}"));
    d.field(&name);

    let mut len = if d.is32() && attributes & ATTR_BIG != 0 {
        "100000000".to_string()
    } else {
        format!("{seg_len:04X}")
    };
    if align == ALIGN_LTL && max_len != seg_len {
        len.push_str(&format!("-{max_len:04X}"));
    }
    d.field(&len);

    let mut alignment = if !intel && align == ALIGN_PAGE_DWORD {
        "DWord".to_string()
    } else {
        ALIGNMENTS[usize::from(align)].to_string()
    };
    if let Some((number, offset)) = frame {
        alignment.push_str(&format!(" {number:04X}:{offset:02X}"));
    } else if align == ALIGN_LTL && ltl & LTL_GROUP != 0 {
        alignment.push_str(&format!(" Group+{group_offset:04X}"));
    }
    d.field(&alignment);

    let mut combination = if !intel && (combine == 4 || combine == 7) {
        "Public".to_string()
    } else {
        COMBINES[usize::from(combine)].to_string()
    };
    if d.ctx.flavour() == Flavour::Ms {
        combination.push_str(if attributes & ATTR_USE32 != 0 { " Use32" } else { " Use16" });
    } else if attributes & ATTR_USE32 != 0 {
        combination.push_str(" InPage");
    }
    d.field(&combination);
    Ok(())
}

fn grp_def(d: &mut RecordDecoder) -> Result<()> {
    let name = d.cur.index()?;
    let name = d.lname(name);
    let index = Counters::next(&mut d.ctx.counters.group);
    d.ctx.names.set(Category::Group, index, &name);
    d.raw(&format!("#{index} {name}"));

    let cols = d.table(&[Column::new("Component", width::NAME)]);
    while !d.cur.at_end() {
        d.row(cols);
        let descriptor = d.cur.u8()?;
        let text = match descriptor {
            0xff => {
                let seg = d.cur.index()?;
                format!("SI {}", d.seg(seg))
            }
            0xfe => {
                let ext = d.cur.index()?;
                format!("EI {}", d.ext(ext))
            }
            0xfd => {
                let seg = d.cur.index()?;
                let class = d.cur.index()?;
                let overlay = d.cur.index()?;
                let seg = d.lname(seg);
                let class = d.lname(class);
                let overlay = d.lname(overlay);
                format!("SCO {seg}:{class}:{overlay}")
            }
            0xfb => {
                let ltl = d.cur.u8()?;
                let mut max_len = u32::from(d.cur.u16()?);
                let mut len = u32::from(d.cur.u16()?);
                if ltl & 1 != 0 {
                    max_len = 0x10000;
                }
                if ltl & 2 != 0 {
                    len = 0x10000;
                }
                if len == max_len {
                    format!("LTL {len:04X}")
                } else {
                    format!("LTL {len:04X}-{max_len:04X}")
                }
            }
            0xfa => {
                let frame = d.cur.u16()?;
                let offset = d.cur.u8()?;
                format!("ABS {frame:04X}:{offset:02X}")
            }
            _ => {
                return Err(DecodeError::invalid(format!(
                    "group component descriptor {descriptor:02X}"
                )))
            }
        };
        d.field(&text);
    }
    Ok(())
}

fn fixupp(d: &mut RecordDecoder) -> Result<()> {
    if d.cur.at_end() {
        return Ok(());
    }
    d.fixed(&[
        Column::new("Locat", 5),
        Column::new("Mode", 12),
        Column::new("Method", 11),
        Column::new("Frame", 16),
        Column::label("Target(,displacement)"),
    ]);
    let wide = d.is32();
    while !d.cur.at_end() {
        d.row(1);
        match FixupDecoder::decode_entry(&mut d.cur, d.ctx, wide)? {
            FixupEntry::Fixup(spec) => {
                d.field(&format!("{:03X}>", spec.location_offset));
                d.field(if spec.self_relative { "Self" } else { "Seg" });
                d.field(spec.location_name());
                let frame = spec.fixdat.frame_text(&mut d.ctx.names);
                let target = spec.fixdat.target_text(&mut d.ctx.names);
                d.field(&frame);
                d.field(&target);
            }
            FixupEntry::Thread(ThreadDef::Frame { slot, frame }) => {
                let frame = frame.render(&mut d.ctx.names);
                d.field(&format!("Thread FRAME({slot})  = {frame}"));
            }
            FixupEntry::Thread(ThreadDef::Target { slot, target }) => {
                let target = target.render(&mut d.ctx.names);
                d.field(&format!("Thread TARGET({slot}) = {target}"));
            }
        }
    }
    Ok(())
}

fn com_def(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[
        Column::new("Communal Name", width::NAME),
        Column::label("Type"),
        Column::label("Length"),
    ]);
    while !d.cur.at_end() {
        d.row(cols);
        let name = d.cur.name()?;
        d.field(&name);
        let type_index = d.cur.index()?;
        d.field(&format!("@{type_index}"));
        let data_type = d.cur.u8()?;
        let length = match data_type {
            0x01..=0x5f => format!("Borland[@{data_type}]"),
            0x61 => {
                let count = communal_length(d)?;
                let size = communal_length(d)?;
                format!("{count:+} x {size:+}")
            }
            0x62 => format!("{:+}", communal_length(d)?),
            _ => {
                return Err(DecodeError::invalid(format!(
                    "Invalid Communal Length Field {data_type:02X}"
                )))
            }
        };
        d.field(&length);
        let index = Counters::next(&mut d.ctx.counters.external);
        d.ctx.names.set(Category::External, index, &name);
    }
    Ok(())
}

fn communal_length(d: &mut RecordDecoder) -> Result<i64> {
    let lead = d.cur.u8()?;
    Ok(match lead {
        0..=0x80 => lead.into(),
        0x81 => d.cur.u16()?.into(),
        0x84 => d.cur.u32()?.into(),
        0x88 => d.cur.i32()?.into(),
        _ => {
            return Err(DecodeError::invalid(format!(
                "Invalid Communal Length Component {lead:02X}"
            )))
        }
    })
}

fn patch_size(d: &RecordDecoder, location: u8) -> &'static str {
    match location {
        0 | 1 => BACKPATCH_SIZES[usize::from(location)],
        2 if d.is32() => BACKPATCH_SIZES[2],
        _ => "???",
    }
}

fn patches(d: &mut RecordDecoder) -> Result<()> {
    let wide = d.is32();
    let cols = d.table(&[Column::label("Offset"), Column::label("Value")]);
    while !d.cur.at_end() {
        d.row(cols);
        let offset = d.cur.word(wide)?;
        let value = d.cur.word(wide)?;
        d.field(&format!("{offset:04X}"));
        d.field(&format!("{value:04X}"));
    }
    Ok(())
}

fn bak_pat(d: &mut RecordDecoder) -> Result<()> {
    let seg = d.cur.index()?;
    let seg = d.seg(seg);
    let location = d.cur.u8()?;
    let size = patch_size(d, location);
    d.raw(&format!("Seg[{seg}] {size}"));
    patches(d)
}

fn nbk_pat(d: &mut RecordDecoder) -> Result<()> {
    let location = d.cur.u8()?;
    let size = patch_size(d, location);
    let name = if d.ctx.flavour() == Flavour::Ibm {
        d.cur.name()?
    } else {
        let index = d.cur.index()?;
        d.lname(index)
    };
    d.raw(&format!("{size} {name}"));
    patches(d)
}

fn c_ext_def(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[
        Column::new("Id", 4),
        Column::label("Type"),
        Column::new("Name", width::NAME),
    ]);
    while !d.cur.at_end() {
        d.row(cols);
        let name = d.cur.index()?;
        let name = d.lname(name);
        let type_index = d.cur.index()?;
        let index = Counters::next(&mut d.ctx.counters.external);
        d.ctx.names.set(Category::External, index, &name);
        d.field(&format!("@{index}"));
        d.field(&format!("@{type_index}"));
        d.field(&name);
    }
    Ok(())
}

fn com_dat(d: &mut RecordDecoder) -> Result<()> {
    let flags = d.cur.u8()?;
    let attributes = d.cur.u8()?;
    let align = d.cur.u8()?;
    let offset = d.cur.word(d.is32())?;
    let _type_index = d.cur.index()?;
    let allocation = attributes & 0x0f;
    let placement = if allocation == 0 { Some(base(d)?) } else { None };
    let name = d.cur.index()?;
    let name = d.lname(name);

    let mut text = name;
    if flags & COMDAT_CONTINUED != 0 {
        text.push_str(" continued");
    }
    if flags & COMDAT_LOCAL != 0 {
        text.push_str(" local");
    }
    let selection = COMDAT_SELECTIONS
        .get(usize::from(attributes >> 4))
        .copied()
        .unwrap_or("???");
    let allocation = COMDAT_ALLOCATIONS
        .get(usize::from(allocation))
        .copied()
        .unwrap_or("???");
    text.push_str(&format!(" {selection} {allocation}"));
    if let Some(placement) = placement {
        text.push_str(&format!(" {placement}"));
    }
    let align = COMDAT_ALIGNMENTS
        .get(usize::from(align))
        .copied()
        .unwrap_or("???");
    text.push_str(&format!(" Align({align})"));
    d.raw(&text);

    if flags & COMDAT_ITERATED != 0 {
        iterated(d, offset)
    } else {
        let show = d.followed_by(&FIXUPP);
        d.hex_rest(offset, show);
        Ok(())
    }
}

fn lin_sym(d: &mut RecordDecoder) -> Result<()> {
    let flags = d.cur.u8()?;
    let name = if d.ctx.flavour() == Flavour::Ibm {
        d.cur.name()?
    } else {
        let index = d.cur.index()?;
        d.lname(index)
    };
    d.raw(&format!(
        "{name}{}",
        if flags & COMDAT_CONTINUED != 0 { " continued" } else { "" }
    ));
    let cols = d.table(&[Column::label("Offset"), Column::new("Line", 5)]);
    while !d.cur.at_end() {
        d.row(cols);
        let line = d.cur.u16()?;
        let offset = d.cur.word(d.is32())?;
        d.field(&format!("{offset:04X}"));
        d.field(&format!("+{line}"));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::DecoderContext;
    use crate::detect::Variant;
    use crate::omf::testing::run;

    fn context() -> DecoderContext {
        DecoderContext::new(Variant::Omf86, Flavour::Any)
    }

    #[test]
    fn test_names_then_segment() {
        let mut ctx = context();
        let (malformed, out) = run(&mut ctx, 0x96, b"\x00\x05_TEXT\x04CODE", None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["@1 *blank*", "@2 _TEXT", "@3 CODE"]);

        // byte aligned, public, length 0x20, names 2 and 3
        let (malformed, out) = run(&mut ctx, 0x98, &[0x28, 0x20, 0x00, 2, 3, 1], None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["#1 _TEXT:CODE 0020 Byte Public"]);
        assert_eq!(ctx.names.get(Category::Segment, 1), "_TEXT:CODE");
    }

    #[test]
    fn test_segdef_memory_combine_pins_intel() {
        let mut ctx = context();
        // word aligned, memory combine
        let (malformed, _) = run(&mut ctx, 0x98, &[0x44, 0x10, 0x00, 1, 1, 1], None);
        assert!(!malformed);
        assert_eq!(ctx.flavour(), Flavour::Intel);
    }

    #[test]
    fn test_segdef_absolute_frame() {
        let mut ctx = context();
        let (malformed, out) = run(&mut ctx, 0x98, &[0x00, 0x00, 0xb8, 0x00, 0x00, 0x10, 0, 0, 0], None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["#1 1000 Abs B800:00 Private"]);
    }

    #[test]
    fn test_group_components() {
        let mut ctx = context();
        run(&mut ctx, 0x96, b"\x06DGROUP", None);
        ctx.names.set(Category::Segment, 1, "_DATA");
        let (malformed, out) = run(&mut ctx, 0x9a, &[1, 0xff, 1, 0xfa, 0x00, 0x10, 0x02], None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["#1 DGROUP", "SI _DATA", "ABS 1000:02"]);
        assert_eq!(ctx.names.get(Category::Group, 1), "DGROUP");
    }

    #[test]
    fn test_truncated_group_component_is_malformed() {
        let mut ctx = context();
        let (malformed, out) = run(&mut ctx, 0x9a, &[1, 0xff, 1, 0xfb, 0x00], None);
        assert!(malformed);
        assert_eq!(out.diagnostics(), vec!["-- Malformed record --"]);
        assert_eq!(out.hex_dumps(), vec![&[0xfb, 0x00][..]]);
    }

    #[test]
    fn test_unknown_group_component_is_malformed() {
        let mut ctx = context();
        let (malformed, _) = run(&mut ctx, 0x9a, &[1, 0xf0], None);
        assert!(malformed);
    }

    #[test]
    fn test_externals_and_publics() {
        let mut ctx = context();
        let (malformed, out) = run(&mut ctx, 0x8c, b"\x04puts\x00\x04exit\x00", None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["@1 puts @0", "@2 exit @0"]);
        assert_eq!(ctx.names.get(Category::External, 2), "exit");

        ctx.names.set(Category::Segment, 1, "_TEXT");
        let (malformed, out) = run(&mut ctx, 0x90, b"\x00\x01\x05_main\x10\x00\x00", None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["Seg[_TEXT]", "0010 @0 _main"]);
    }

    #[test]
    fn test_wide_public_offsets() {
        let mut ctx = context();
        let (malformed, out) = run(&mut ctx, 0x91, b"\x00\x01\x01A\x00\x00\x01\x00\x00", None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["Seg[@1]", "10000 @0 A"]);
    }

    #[test]
    fn test_absolute_base_frame() {
        let mut ctx = context();
        let (malformed, out) = run(&mut ctx, 0x90, &[0, 0, 0x40, 0x00], None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["Frame: 0040"]);
    }

    #[test]
    fn test_ledata_offsets_before_fixupp() {
        let mut ctx = context();
        let (malformed, out) = run(&mut ctx, 0xa0, &[1, 0x00, 0x01, 0xb8, 0x00], Some(0x9c));
        assert!(!malformed);
        assert!(out.events().iter().any(|e| matches!(
            e,
            crate::report::Event::HexDump { base: 0x100, show_offsets: true, .. }
        )));
    }

    #[test]
    fn test_iterated_data() {
        let mut ctx = context();
        // 3 x "AB" at 0x10
        let payload = [1, 0x10, 0x00, 3, 0, 0, 0, 2, b'A', b'B'];
        let (malformed, out) = run(&mut ctx, 0xa2, &payload, None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["@1", "0010 3 x 41 42 |AB|", "0016"]);
    }

    #[test]
    fn test_nested_iterated_data() {
        let mut ctx = context();
        // 2 x { 2 x "Z" }
        let payload = [1, 0, 0, 2, 0, 1, 0, 2, 0, 0, 0, 1, b'Z'];
        let (malformed, out) = run(&mut ctx, 0xa2, &payload, None);
        assert!(!malformed);
        assert_eq!(
            out.lines(),
            vec!["@1", "0000 2 x", "0000 1. 2 x 5A |Z|", "0004"]
        );
    }

    #[test]
    fn test_deep_iterated_data_is_malformed() {
        let mut ctx = context();
        let mut payload = vec![1, 0, 0];
        for _ in 0..40 {
            payload.extend_from_slice(&[1, 0, 1, 0]);
        }
        payload.extend_from_slice(&[1, 0, 0, 0, 1, 0]);
        let (malformed, out) = run(&mut ctx, 0xa2, &payload, None);
        assert!(malformed);
        assert_eq!(out.diagnostics(), vec!["-- Malformed record --"]);
    }

    #[test]
    fn test_fixupp_thread_then_fixup() {
        let mut ctx = context();
        ctx.names.set(Category::Segment, 1, "_TEXT");
        // target thread 0 = segment 1, then an Offset16 fixup using it
        let payload = [0x00, 0x01, 0xc4, 0x05, 0x58, 0x00, 0x00];
        let (malformed, out) = run(&mut ctx, 0x9c, &payload, None);
        assert!(!malformed);
        assert_eq!(
            out.lines(),
            vec![
                "Thread TARGET(0) = Seg[_TEXT]",
                "005> Self Offset16 TARGET THREAD(0),0000",
            ]
        );
    }

    #[test]
    fn test_fixupp_unbound_thread_is_malformed() {
        let mut ctx = context();
        let (malformed, _) = run(&mut ctx, 0x9c, &[0xc4, 0x05, 0x58, 0x00, 0x00], None);
        assert!(malformed);
    }

    #[test]
    fn test_coment_translator_text() {
        let mut ctx = context();
        let (malformed, out) = run(&mut ctx, 0x88, b"\x00\x00TC86\x01", None);
        assert!(!malformed);
        assert_eq!(
            out.lines(),
            vec!["Comment Class(00) Translator", "TC86\\01"]
        );
    }

    #[test]
    fn test_coment_memory_model() {
        let mut ctx = context();
        let (_, out) = run(&mut ctx, 0x88, b"\x40\x9d3l", None);
        assert_eq!(
            out.lines(),
            vec!["No List Comment Class(9D) Memory Model", "80386 Large"]
        );
    }

    #[test]
    fn test_coment_easy_omf_pins_pharlap() {
        let mut ctx = context();
        let (_, out) = run(&mut ctx, 0x88, b"\x80\xaa80386", None);
        assert_eq!(ctx.flavour(), Flavour::PharLap);
        assert_eq!(
            out.lines(),
            vec!["No Purge Comment Class(AA) Easy OMF", "80386"]
        );
    }

    #[test]
    fn test_coment_weak_externs() {
        let mut ctx = context();
        ctx.names.set(Category::External, 1, "weak");
        ctx.names.set(Category::External, 2, "strong");
        let (malformed, out) = run(&mut ctx, 0x88, &[0, 0xa8, 1, 2], None);
        assert!(!malformed);
        assert_eq!(
            out.lines(),
            vec!["Comment Class(A8) WKEXT: Weak Extern Record", "weak strong"]
        );
    }

    #[test]
    fn test_coment_impdef_by_name() {
        let mut ctx = context();
        let (malformed, out) = run(&mut ctx, 0x88, b"\x00\xa0\x01\x00\x03foo\x03DLL\x00", None);
        assert!(!malformed);
        assert_eq!(
            out.lines(),
            vec![
                "Comment Class(A0) Subtype(01) IMPDEF: Import Definition Record",
                "foo DLL foo"
            ]
        );
    }

    #[test]
    fn test_modend_start_address() {
        let mut ctx = context();
        let (malformed, out) = run(&mut ctx, 0x8a, &[0xc0, 0x00, 0x10, 0x34, 0x12], None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["Main Module CS,IP = 1000,1234"]);
    }

    #[test]
    fn test_modend_fixup_start() {
        let mut ctx = context();
        ctx.names.set(Category::Segment, 1, "_TEXT");
        // frame from target, target segment 1, displacement 0x20
        let (malformed, out) = run(&mut ctx, 0x8a, &[0xc1, 0x50, 0x01, 0x20, 0x00], None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["Main Module CS,IP = TARGET Seg[_TEXT],0020"]);
    }

    #[test]
    fn test_communal_lengths() {
        let mut ctx = context();
        let payload = b"\x03buf\x00\x61\x0a\x81\x00\x01\x03one\x00\x62\x84\x00\x00\x01\x00";
        let (malformed, out) = run(&mut ctx, 0xb0, payload, None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["buf @0 +10 x +256", "one @0 +65536"]);
    }

    #[test]
    fn test_bad_communal_length_is_malformed() {
        let mut ctx = context();
        let (malformed, _) = run(&mut ctx, 0xb0, b"\x03buf\x00\x62\x83", None);
        assert!(malformed);
    }

    #[test]
    fn test_debsym_block_offsets() {
        let mut ctx = context();
        ctx.names.set(Category::Block, 2, "main");
        let (malformed, out) = run(&mut ctx, 0x7e, b"\x02\x02\x01i\xfc\xff\x00", None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["BI[main<#2>]", "i [BP-4] @0"]);
    }

    #[test]
    fn test_debsym_bad_method() {
        let mut ctx = context();
        let (malformed, _) = run(&mut ctx, 0x7e, &[0x05], None);
        assert!(malformed);
    }

    #[test]
    fn test_typdef_numbering() {
        let mut ctx = context();
        let (_, out) = run(&mut ctx, 0x8e, b"\x00\x00", None);
        assert_eq!(out.lines(), vec!["#1"]);
        assert_eq!(ctx.counters.typedef, 2);
    }

    #[test]
    fn test_bakpat() {
        let mut ctx = context();
        ctx.names.set(Category::Segment, 1, "_TEXT");
        let (malformed, out) = run(&mut ctx, 0xb2, &[1, 1, 0x10, 0, 0x04, 0], None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["Seg[_TEXT] Word", "0010 0004"]);
    }

    #[test]
    fn test_linnum_line_before_offset() {
        let mut ctx = context();
        let (malformed, out) = run(&mut ctx, 0x94, &[0, 1, 7, 0, 0x20, 0], None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["Seg[@1]", "0020 #7"]);
    }

    #[test]
    fn test_overlay_definition() {
        let mut ctx = context();
        let (malformed, out) = run(&mut ctx, 0x76, b"\x03OV1\x81\x00\x00\x00\x00", None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["OV1 @0001:01"]);
        assert_eq!(ctx.names.get(Category::Overlay, 1), "OV1");
    }

    #[test]
    fn test_vendor_extension() {
        let mut ctx = context();
        let (malformed, out) = run(&mut ctx, 0xce, &[3, 0xaa, 0xbb], None);
        assert!(!malformed);
        assert_eq!(out.lines(), vec!["vendor 3 Extension Info:"]);
        assert_eq!(out.hex_dumps(), vec![&[0xaa, 0xbb][..]]);
    }
}
