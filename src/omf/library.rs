// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! Records shared by the OMF85, OMF51 and OMF96 decoders.
//!
//! The library records number their entries `$1`, `$2` and so on. The
//! numbering restarts at each `LIBHDR`.

use super::{width, RecordDecoder};
use crate::error::{DecodeError, Result};
use crate::report::Column;

/// `LIBLOC`: the block and byte of each module in the library.
pub fn lib_loc(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[Column::label("Module"), Column::label("Block:Byte")]);
    while !d.cur.at_end() {
        d.row(cols);
        let block = d.cur.u16()?;
        let byte = d.cur.u16()?;
        d.ctx.library.locations += 1;
        d.field(&format!("${}", d.ctx.library.locations));
        d.field(&format!("{block:04X}:{byte:02X}"));
    }
    Ok(())
}

/// `LIBNAM`: module names in library order.
pub fn lib_nam(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[Column::new("Mod", 5), Column::new("Name", width::NAME)]);
    while !d.cur.at_end() {
        d.row(cols);
        d.ctx.library.names += 1;
        d.field(&format!("${}", d.ctx.library.names));
        let name = d.cur.name()?;
        d.field(&name);
    }
    Ok(())
}

/// `LIBDIC`: for each module, the public names it defines, closed by an
/// empty name.
pub fn lib_dic(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[Column::new("Mod", 5), Column::new("Name", width::NAME)]);
    let mut start = true;
    while !d.cur.at_end() {
        let name = d.cur.name()?;
        if start {
            d.row(cols);
            d.ctx.library.dictionary += 1;
            d.field(&format!("${}", d.ctx.library.dictionary));
            d.field(if name.is_empty() { "*None*" } else { &name });
            start = name.is_empty();
        } else if !name.is_empty() {
            d.row(cols);
            d.field("");
            d.field(&name);
        } else {
            start = true;
        }
    }
    if start {
        Ok(())
    } else {
        Err(DecodeError::invalid("dictionary entry not terminated"))
    }
}

pub fn lib_hdr(d: &mut RecordDecoder) -> Result<()> {
    let modules = d.cur.u16()?;
    let block = d.cur.u16()?;
    let byte = d.cur.u16()?;
    d.raw(&format!(
        "+{modules} Modules Dictionary at {block:04X}:{byte:02X}"
    ));
    d.ctx.library = Default::default();
    Ok(())
}

/// Line number pairs of `{offset u16, line u16}`.
pub fn line_numbers(d: &mut RecordDecoder) -> Result<()> {
    let cols = d.table(&[Column::label("Offset"), Column::new("Line", 5)]);
    while !d.cur.at_end() {
        d.row(cols);
        let offset = d.cur.u16()?;
        let line = d.cur.u16()?;
        d.field(&format!("{offset:04X}"));
        d.field(&format!("#{line}"));
    }
    Ok(())
}
