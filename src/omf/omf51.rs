// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! 8051 object modules, including the records added by Keil.
//!
//! The Keil toolchain reuses the odd record types as forms of `CONTENT`,
//! `FIXUP`, `SEGDEF`, `PUBLICS` and `EXTDEF` whose segment and external
//! ids are 16 bits wide.

use super::{library, width, Omf51Kind, RecordDecoder};
use crate::context::{Counters, MAX_NAME};
use crate::error::{DecodeError, Result};
use crate::hex_str;
use crate::index::Category;
use crate::leaf::keil51;
use crate::report::Column;

const FIXUP: u8 = 0x08;
const KEIL_FIXUP: u8 = 0x09;

const TRANSLATORS: [&str; 3] = ["ASM51", "PL/M-51", "RL51"];
const FIXUP_OPS: [&str; 8] = [
    "Low", "Byte", "Relative", "High", "Word", "Inblock", "Bit", "Conv",
];
const RELOCATIONS: [&str; 6] = ["ABS", "UNIT", "BITADDRESSABLE", "INPAGE", "INBLOCK", "PAGE"];
const SCOPES: [&str; 6] = [
    "MODULE",
    "DO",
    "PROCEDURE",
    "MODULE END",
    "DO END",
    "PROCEDURE END",
];
const DEBUG_ITEMS: [&str; 4] = ["Locals", "Publics", "Segments", "Line Numbers"];
const SEGMENT_TYPES: [&str; 8] = [
    "CODE", "XDATA", "DATA", "IDATA", "BIT", "STYP5", "STYP6", "STYP7",
];
const SYMBOL_USAGE: [&str; 8] = [
    "CODE", "XDATA", "DATA", "IDATA", "BIT", "NUMBER", "INFO6", "INFO7",
];

/// Register allocation mask bits, least significant first.
const REGISTERS: [&str; 16] = [
    "R0", "R1", "R2", "R3", "R4", "R5", "R6", "R7", "A", "B", "DPL", "DPH", "PSW", "DPX", "F0",
    "CY",
];
const ALL_REGISTERS: u16 = 0xffff;

pub fn decode(d: &mut RecordDecoder, kind: Omf51Kind) -> Result<()> {
    match kind {
        Omf51Kind::ModHdr => mod_hdr(d),
        Omf51Kind::ModEnd => mod_end(d),
        Omf51Kind::Content => content(d),
        Omf51Kind::Fixup => fixup(d),
        Omf51Kind::SegDef => seg_def(d),
        Omf51Kind::ScopeDef => scope_def(d),
        Omf51Kind::DbgItem => dbg_item(d),
        Omf51Kind::Publics => publics(d),
        Omf51Kind::ExtDef => ext_def(d),
        Omf51Kind::LibLoc => library::lib_loc(d),
        Omf51Kind::LibNam => library::lib_nam(d),
        Omf51Kind::LibDic => library::lib_dic(d),
        Omf51Kind::LibHdr => library::lib_hdr(d),
        Omf51Kind::TypeDef => type_def(d),
        Omf51Kind::SymInfo => sym_info(d),
        Omf51Kind::Depend => depend(d),
        Omf51Kind::RegMsk => reg_msk(d),
        Omf51Kind::SrcName => {
            let name = d.cur.name()?;
            d.raw(&name);
            Ok(())
        }
    }
}

/// Reads a segment or external id, 16 bits wide in the odd Keil forms.
fn id(d: &mut RecordDecoder) -> Result<u16> {
    if d.is32() {
        d.cur.u16()
    } else {
        d.cur.u8().map(u16::from)
    }
}

fn segment_info(d: &mut RecordDecoder, info: u8) {
    d.field(SEGMENT_TYPES[usize::from(info & 7)]);
    if info & 0x80 != 0 {
        d.raw(" Empty");
    }
    let bank = (info >> 3) & 3;
    if info & 0x20 != 0 {
        d.raw(&format!(" Ovl bank {bank}"));
    } else if bank != 0 {
        d.diag(&format!("Non-zero bank({bank}) for nonoverlayable segment"));
    }
}

fn symbol_info(d: &mut RecordDecoder, info: u8) {
    d.field(SYMBOL_USAGE[usize::from(info & 7)]);
    if info & 0x40 != 0 {
        d.raw(" VAR");
        return;
    }
    d.raw(" PROC");
    if info & 0x80 != 0 {
        d.raw(" IND");
    }
    if info & 0x10 != 0 {
        d.raw(&format!(" bank {}", (info >> 3) & 3));
    }
}

fn mod_hdr(d: &mut RecordDecoder) -> Result<()> {
    let name = d.cur.name()?;
    let trn = d.cur.u8()?;
    d.cur.u8()?;
    let trn = trn
        .checked_sub(0xfd)
        .and_then(|i| TRANSLATORS.get(usize::from(i)))
        .unwrap_or(&"Bad TRN");
    d.raw(&format!("{name} - {trn}"));
    Ok(())
}

fn mod_end(d: &mut RecordDecoder) -> Result<()> {
    let name = d.cur.name()?;
    d.cur.u16()?;
    let banks = d.cur.u8()?;
    d.cur.u8()?;
    d.raw(&name);
    if banks & 0xf != 0 {
        let used: Vec<String> = (0..4)
            .filter(|bank| banks & (1 << *bank) != 0)
            .map(|bank| bank.to_string())
            .collect();
        d.raw(&format!(" Uses banks {}", used.join(", ")));
    }
    Ok(())
}

fn content(d: &mut RecordDecoder) -> Result<()> {
    let seg = id(d)?;
    let seg = d.seg(seg);
    d.raw(&format!("Seg[{seg}]"));
    let address = d.cur.u16()?;
    let show = d.followed_by(&[FIXUP, KEIL_FIXUP]);
    d.hex_rest(address.into(), show);
    Ok(())
}

fn fixup(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[Column::new("Loc", 4), Column::new("FixupOp(Target)", width::FIXUP_51)]);
    while !d.cur.at_end() {
        d.row(cols);
        let location = d.cur.u16()?;
        d.field(&format!("{location:04X}"));
        let op = d.cur.u8()? & 7;
        d.field(&format!("{}(", FIXUP_OPS[usize::from(op)]));
        let block = d.cur.u8()?;
        let target = id(d)?;
        let offset = d.cur.u16()?;

        let bit = op == 7;
        if bit {
            d.raw("(");
        }
        let target = match block {
            0 => format!("Seg[{}]", d.seg(target)),
            1 => format!("PSeg[{}]", d.seg(target)),
            2 => d.ext(target),
            _ => format!("ID{block}"),
        };
        d.raw(&target);
        if bit {
            d.raw("-20H)*8");
        }
        if offset >= 0x8000 {
            d.raw(&format!(" - {}", hex_str(0x10000 - u32::from(offset))));
        } else if offset != 0 {
            d.raw(&format!(" + {}", hex_str(offset.into())));
        }
        d.raw(")");
    }
    Ok(())
}

fn seg_def(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[
        Column::new("Id", 4),
        Column::new("Name", width::NAME),
        Column::label("Base:Size"),
        Column::new("RelTyp", 14),
        Column::new("SegInfo", width::INFO_51),
    ]);
    while !d.cur.at_end() {
        d.row(cols);
        let seg = id(d)?;
        if seg != 0 {
            d.ctx.counters.segment = d.ctx.counters.segment.wrapping_add(1);
            let expected = d.ctx.counters.segment;
            if seg != expected {
                d.diag(&format!(
                    "Unexpected Segment Definition {seg} - expected {expected}"
                ));
                d.ctx.counters.segment = seg;
            }
        }
        let info = d.cur.u8()?;
        let relocation = d.cur.u8()?;
        d.cur.u8()?;
        let base = d.cur.u16()?;
        let size = d.cur.u16()?;
        let name = d.cur.name()?;

        if seg != 0 {
            d.ctx.names.set(Category::Segment, seg, &name);
        }
        d.field(&format!("@{seg}"));
        d.field(if name.is_empty() { "*Unnamed*" } else { &name });
        d.field(&format!("{base:04X}:{size:04X}"));
        match RELOCATIONS.get(usize::from(relocation)) {
            Some(relocation) => d.field(relocation),
            None => d.field(&format!("Rel_{relocation}")),
        }
        segment_info(d, info);
    }
    Ok(())
}

fn scope_def(d: &mut RecordDecoder) -> Result<()> {
    let block = d.cur.u8()?;
    let name = d.cur.name()?;
    d.raw(&format!("{name}: "));
    match SCOPES.get(usize::from(block)) {
        Some(scope) => d.raw(scope),
        None => d.raw(&format!("Scope@{block}")),
    }
    Ok(())
}

/// Emits `segment:offset` for a symbol row.
fn located(d: &mut RecordDecoder, seg: u8, offset: u16) {
    let seg = d.seg(seg.into());
    d.field(&format!("{seg}:{offset:04X}"));
}

fn dbg_item(d: &mut RecordDecoder) -> Result<()> {
    let def_type = d.cur.u8()?;
    let Some(items) = DEBUG_ITEMS.get(usize::from(def_type)) else {
        return Err(DecodeError::invalid(format!("debug item type {def_type}")));
    };
    d.raw(items);

    if def_type == 3 {
        let cols = d.table(&[Column::new("Segment:Offset", width::SEG_OFFSET), Column::new("Line", 5)]);
        while !d.cur.at_end() {
            d.row(cols);
            let seg = d.cur.u8()?;
            let offset = d.cur.u16()?;
            located(d, seg, offset);
            let line = d.cur.u16()?;
            d.field(&format!("#{line}"));
        }
        return Ok(());
    }

    let cols = d.table(&[
        Column::new("Name", width::NAME),
        Column::new("Segment:Offset", width::SEG_OFFSET),
        Column::new("Info", width::INFO_51),
    ]);
    while !d.cur.at_end() {
        d.row(cols);
        let seg = d.cur.u8()?;
        let info = d.cur.u8()?;
        let offset = d.cur.u16()?;
        d.cur.u8()?;
        let name = d.cur.name()?;
        d.field(&name);
        located(d, seg, offset);
        if def_type < 2 {
            symbol_info(d, info);
        } else {
            segment_info(d, info);
        }
    }
    Ok(())
}

fn publics(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[
        Column::new("Name", width::NAME),
        Column::new("Segment:Offset", width::SEG_OFFSET),
        Column::new("SymInfo", width::INFO_51),
    ]);
    while !d.cur.at_end() {
        d.row(cols);
        let seg = id(d)?;
        let info = d.cur.u8()?;
        let offset = d.cur.u16()?;
        d.cur.u8()?;
        let name = d.cur.name()?;
        d.field(&name);
        let seg = d.seg(seg);
        d.field(&format!("{seg}:{offset:04X}"));
        symbol_info(d, info);
    }
    Ok(())
}

fn ext_def(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[
        Column::new("Id", 4),
        Column::new("Name", width::NAME),
        Column::new("SymInfo", width::INFO_51),
    ]);
    while !d.cur.at_end() {
        d.row(cols);
        // id block, always 2
        d.cur.u8()?;
        let ext = id(d)?;
        let info = d.cur.u8()?;
        d.cur.u8()?;
        let name = d.cur.name()?;
        let expected = d.ctx.counters.external;
        if ext != expected {
            d.diag(&format!("Unexpected External {ext} - expected {expected}"));
            d.ctx.counters.external = ext;
        }
        let index = Counters::next(&mut d.ctx.counters.external);
        d.ctx.names.set(Category::External, index, &name);
        d.field(&format!("@{ext}"));
        d.field(&name);
        symbol_info(d, info);
    }
    Ok(())
}

fn type_def(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[Column::label("Index"), Column::new("Definition", width::TYPEDEF_96)]);
    while !d.cur.at_end() {
        d.row(cols);
        let index = Counters::next(&mut d.ctx.counters.typedef);
        d.field(&format!("@{index}"));
        keil51::descriptor(&mut d.cur, &mut *d.out)?;
    }
    Ok(())
}

fn sym_info(d: &mut RecordDecoder) -> Result<()> {
    let def_type = d.cur.u8()?;
    match DEBUG_ITEMS.get(usize::from(def_type)) {
        Some(items) if def_type < 3 => d.raw(items),
        _ => return Err(DecodeError::invalid(format!("symbol info type {def_type}"))),
    }
    let cols = d.table(&[
        Column::new("Name", width::NAME),
        Column::new("Segment:Offset", width::SEG_OFFSET),
        Column::new("Info", width::INFO_51),
        Column::new("Type", 8),
    ]);
    while !d.cur.at_end() {
        d.row(cols);
        let seg = d.cur.u8()?;
        let info = d.cur.u8()?;
        let offset = d.cur.u16()?;
        let type_index = d.cur.index()?;
        let name = d.cur.name()?;
        d.field(&name);
        located(d, seg, offset);
        if def_type < 2 {
            symbol_info(d, info);
        } else {
            segment_info(d, info);
        }
        d.field(&keil51::type_ref(type_index));
    }
    Ok(())
}

fn depend(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[Column::new("Timestamp", 8), Column::new("File", width::NAME)]);
    while !d.cur.at_end() {
        d.row(cols);
        let time = d.cur.u32()?;
        let name = d.cur.name()?;
        d.field(&format!("{time:08X}"));
        d.field(&name);
    }
    Ok(())
}

fn registers(mask: u16) -> String {
    if mask == ALL_REGISTERS {
        return "ALL".to_string();
    }
    let used: Vec<&str> = REGISTERS
        .iter()
        .enumerate()
        .filter(|(bit, _)| mask & (1 << *bit) != 0)
        .map(|(_, name)| *name)
        .collect();
    if used.is_empty() {
        "NONE".to_string()
    } else {
        used.join(" ")
    }
}

fn reg_msk(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[
        Column::new("Function", MAX_NAME),
        Column::new("Registers", width::NAME),
    ]);
    while !d.cur.at_end() {
        d.row(cols);
        let name = d.cur.name()?;
        let mask = d.cur.u16()?;
        d.field(&name);
        d.field(&registers(mask));
    }
    Ok(())
}
