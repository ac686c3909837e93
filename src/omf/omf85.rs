// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! 8080/8085 object modules and ISIS-II libraries.

use std::io::{Read, Seek};

use log::debug;

use super::{library, width, Omf85Kind, RecordDecoder};
use crate::context::DecoderContext;
use crate::error::Result;
use crate::index::Category;
use crate::record::{RecordReader, RecordStatus};
use crate::report::Column;

const COMNAM: u8 = 0x2e;
const FIXUP_TYPES: [u8; 3] = [0x20, 0x22, 0x24];

const TRANSLATORS: [&str; 3] = ["UKN80", "PL/M-80", "FORT80"];
const ALIGNMENTS: [&str; 4] = ["Absolute", "InPage", "Page", "Byte"];
const FIXUP_BYTES: [&str; 4] = ["Unknown", "Low", "High", "Both"];

pub fn decode(d: &mut RecordDecoder, kind: Omf85Kind) -> Result<()> {
    match kind {
        Omf85Kind::ModHdr => mod_hdr(d),
        Omf85Kind::ModEnd => mod_end(d),
        Omf85Kind::Content => content(d),
        Omf85Kind::LinNum => {
            segment_prefix(d)?;
            library::line_numbers(d)
        }
        Omf85Kind::Eof => Ok(()),
        Omf85Kind::Ancestor => {
            let name = d.cur.name()?;
            d.raw(&name);
            Ok(())
        }
        Omf85Kind::Locals | Omf85Kind::Publics => symbols(d),
        Omf85Kind::ExtDef => ext_def(d),
        Omf85Kind::ExtFix => ext_fix(d),
        Omf85Kind::Fixup => fixup(d, false),
        Omf85Kind::SegFix => fixup(d, true),
        Omf85Kind::LibLoc => library::lib_loc(d),
        Omf85Kind::LibNam => library::lib_nam(d),
        Omf85Kind::LibDic => library::lib_dic(d),
        Omf85Kind::LibHdr => library::lib_hdr(d),
        Omf85Kind::ComNam => com_nam(d),
    }
}

/// Registers the names of the common blocks of the module about to be
/// decoded.
///
/// `COMNAM` records follow the `MODHDR` that refers to them, so they are
/// read ahead and the stream is put back where it was.
pub fn prefetch_common_names<R: Read + Seek>(
    reader: &mut RecordReader<R>,
    ctx: &mut DecoderContext,
) -> anyhow::Result<()> {
    if reader.peek_next_type()? != Some(COMNAM) {
        return Ok(());
    }
    debug!("reading ahead for common block names");
    reader.lookahead(|reader| {
        while let RecordStatus::Ok(record) | RecordStatus::BadCrc(record) = reader.next_record()? {
            if record.rec_type() != COMNAM {
                break;
            }
            let mut cursor = record.cursor();
            while !cursor.at_end() {
                let (Ok(id), Ok(name)) = (cursor.u8(), cursor.name()) else {
                    return Ok(());
                };
                ctx.names.set(Category::Segment, id.into(), &name);
            }
        }
        Ok(())
    })
}

fn segment_prefix(d: &mut RecordDecoder) -> Result<()> {
    let id = d.cur.u8()?;
    let seg = d.seg(id.into());
    d.raw(&format!("Seg[{seg}] "));
    Ok(())
}

fn mod_hdr(d: &mut RecordDecoder) -> Result<()> {
    let name = d.cur.name()?;
    d.raw(&name);
    let trn = d.cur.u8()?;
    let trn = TRANSLATORS.get(usize::from(trn)).unwrap_or(&"Bad TRN");
    d.raw(&format!(" - {trn}"));
    let ver = d.cur.u8()?;
    if ver != 0 {
        d.raw(&format!(" v{}.{}", ver / 16, ver % 16));
    }

    let cols = d.table(&[
        Column::new("Segment", width::NAME),
        Column::new("Size", 4),
        Column::new("Align", 8),
    ]);
    while !d.cur.at_end() {
        d.row(cols);
        let id = d.cur.u8()?;
        let seg = d.seg(id.into());
        d.field(&seg);
        let size = d.cur.u16()?;
        d.field(&format!("{size:04X}"));
        let align = d.cur.u8()?;
        d.field(ALIGNMENTS[usize::from(align & 3)]);
    }
    Ok(())
}

fn mod_end(d: &mut RecordDecoder) -> Result<()> {
    let mod_type = d.cur.u8()?;
    let id = d.cur.u8()?;
    let offset = d.cur.u16()?;
    if mod_type != 0 {
        let seg = d.seg(id.into());
        d.raw(&format!("Main Entry {seg}:{offset:04X}"));
    }
    if !d.cur.at_end() {
        d.raw(" Optional Info:");
        let at = d.position() as u32;
        d.hex_rest(at, false);
    }
    Ok(())
}

fn content(d: &mut RecordDecoder) -> Result<()> {
    segment_prefix(d)?;
    let address = d.cur.u16()?;
    let show = d.followed_by(&FIXUP_TYPES);
    d.hex_rest(address.into(), show);
    Ok(())
}

fn symbols(d: &mut RecordDecoder) -> Result<()> {
    let id = d.cur.u8()?;
    let seg = d.seg(id.into());
    d.raw(&format!("Seg[{seg}]"));
    let cols = d.table(&[Column::label("Offset"), Column::new("Name", width::NAME)]);
    while !d.cur.at_end() {
        d.row(cols);
        let offset = d.cur.u16()?;
        d.field(&format!("{offset:04X}"));
        let name = d.cur.name()?;
        d.field(&name);
        d.cur.u8()?;
    }
    Ok(())
}

fn ext_def(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[Column::label("Index"), Column::new("Name", width::NAME)]);
    while !d.cur.at_end() {
        d.row(cols);
        let name = d.cur.name()?;
        let index = crate::context::Counters::next(&mut d.ctx.counters.external);
        d.ctx.names.set(Category::External, index, &name);
        d.field(&format!("@{index}"));
        d.field(&name);
        d.cur.u8()?;
    }
    Ok(())
}

fn ext_fix(d: &mut RecordDecoder) -> Result<()> {
    let hilo = d.cur.u8()?;
    d.raw(&format!("Fixup: {}", FIXUP_BYTES[usize::from(hilo & 3)]));
    let cols = d.table(&[Column::label("Offset"), Column::new("Name", width::NAME)]);
    while !d.cur.at_end() {
        d.row(cols);
        let index = d.cur.u16()?;
        let offset = d.cur.u16()?;
        d.field(&format!("{offset:04X}"));
        let ext = d.ext(index);
        d.field(&ext);
    }
    Ok(())
}

fn fixup(d: &mut RecordDecoder, segmented: bool) -> Result<()> {
    if segmented {
        segment_prefix(d)?;
    }
    let hilo = d.cur.u8()?;
    d.raw(&format!("Fixup: {}", FIXUP_BYTES[usize::from(hilo & 3)]));
    let cols = d.table(&[Column::label("Offset")]);
    while !d.cur.at_end() {
        d.row(cols);
        let offset = d.cur.u16()?;
        d.field(&format!("{offset:04X}"));
    }
    Ok(())
}

fn com_nam(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[Column::new("Id", 4), Column::new("Name", width::NAME)]);
    while !d.cur.at_end() {
        d.row(cols);
        let id = d.cur.u8()?;
        d.field(&format!("@{id}"));
        let name = d.cur.name()?;
        d.field(&name);
    }
    Ok(())
}
