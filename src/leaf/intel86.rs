// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! OMF86 `TYPDEF` descriptors.
//!
//! Leaves come in runs of up to eight, each run preceded by an "easy/nice"
//! byte whose bits mark the leaves that follow it, most significant first.

use super::{Labels, Pattern};
use crate::cursor::FieldCursor;
use crate::error::Result;
use crate::report::Reporter;

const FAR: u8 = 97;
const LABEL: u8 = 113;
const PROCEDURE: u8 = 116;
const PARAMETER: u8 = 117;
const ARRAY: u8 = 119;
const STRUCTURE: u8 = 121;
const SCALAR: u8 = 123;
const LIST: u8 = 127;

const NAMES: [&str; 31] = [
    "FAR",
    "NEAR",
    "INTERRUPT",
    "TFILE",
    "PACKED",
    "UNPACKED",
    "SET",
    "#104",
    "CHAMELEON",
    "BOOLEAN ",
    "TRUE",
    "FALSE",
    "CHAR",
    "INTEGER",
    "CONST",
    "#112",
    "LABEL",
    "LONG",
    "SHORT",
    "PROCEDURE",
    "PARAMETER",
    "DIMENSION",
    "ARRAY",
    "#120",
    "STRUCTURE",
    "POINTER",
    "SCALAR",
    "UNSIGNED_INTEGER",
    "SIGNED_INTEGER",
    "REAL",
    "LIST",
];

const PROC_LABELS: &[&str] = &["", "retType: ", " ret: ", " params: ", " types: "];
const LABEL_LABELS: &[&str] = &["", "jmp: "];
const PARAM_LABELS: &[&str] = &["type: "];
const SCALAR_LABELS: &[&str] = &["bits: ", " type: "];
const STRUCT_LABELS: &[&str] = &["bits: ", " members: ", " types: ", " names: "];
const ARRAY_LABELS: &[&str] = &["bits: ", " type: "];

//  116  PROCEDURE ... n .   0001
//  119  ARRAY n .           1000
//  121  STRUCTURE n n .     1100
//  123  SCALAR  n .         1000
fn leading(leaf: u8) -> (u8, Labels) {
    match leaf {
        PROCEDURE => (0x01, Labels::new(PROC_LABELS)),
        ARRAY => (0x08, Labels::new(ARRAY_LABELS)),
        SCALAR => (0x08, Labels::new(SCALAR_LABELS)),
        STRUCTURE => (0x0c, Labels::new(STRUCT_LABELS)),
        PARAMETER => (0, Labels::new(PARAM_LABELS)),
        LABEL => (0, Labels::new(LABEL_LABELS)),
        _ => (0, Labels::NONE),
    }
}

/// Decodes one descriptor, running to the end of the record.
pub fn descriptor(cursor: &mut FieldCursor, out: &mut dyn Reporter) -> Result<()> {
    let mut labels = Labels::NONE;
    let mut pattern = Pattern::new(0, 0);
    let mut first = true;
    let mut nice = 0u8;
    let mut mask = 0u8;

    while !cursor.at_end() {
        if mask == 0 {
            nice = cursor.u8()?;
            if cursor.at_end() {
                return Ok(());
            }
            mask = 0x80;
        }
        if let Some(label) = labels.next_label() {
            out.emit_raw(label);
        }
        if nice & mask != 0 {
            out.emit_raw("'");
        }
        mask >>= 1;

        let leaf = cursor.u8()?;
        if first {
            first = false;
            let (bits, leaf_labels) = leading(leaf);
            pattern = Pattern::new(bits, 0x10);
            labels = leaf_labels;
        }

        let text = match leaf {
            FAR..=LIST if !pattern.numeric() => NAMES[usize::from(leaf - FAR)].to_string(),
            0..=127 => leaf.to_string(),
            128 => "nil".to_string(),
            129 => cursor.u16()?.to_string(),
            130 => format!("'{}'", cursor.name()?),
            131 => format!("@{}", cursor.index()?),
            132 => cursor.u24()?.to_string(),
            133 => "*".to_string(),
            134 => cursor.i8()?.to_string(),
            135 => cursor.i16()?.to_string(),
            136 => cursor.i32()?.to_string(),
            _ => format!("leaf {leaf}"),
        };
        out.emit_raw(&text);
        out.emit_raw(" ");
        pattern.advance();
    }
    Ok(())
}
