// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! Keil 8051 `TYPEDEF` descriptors.
//!
//! | Tag         | Leaf                                                   |
//! |-------------|--------------------------------------------------------|
//! | `00..=2F`   | small number                                           |
//! | `30..=3F`   | type constructor, or a number where the pattern says so |
//! | `40`        | nil                                                    |
//! | `41`        | `u16` number                                           |
//! | `42`        | `u32` number                                           |
//! | `43`        | name                                                   |
//! | `44`        | type index                                             |
//! | `45`        | end of descriptor                                      |

use super::{Labels, Pattern};
use crate::cursor::FieldCursor;
use crate::error::Result;
use crate::report::Reporter;

/// User types are numbered from here; lower indices are predefined.
pub const FIRST_TYPE_INDEX: u16 = 0x20;

const FIRST_SYMBOL: u8 = 0x30;
const LAST_SYMBOL: u8 = 0x3f;
const NIL: u8 = 0x40;
const WORD: u8 = 0x41;
const DWORD: u8 = 0x42;
const NAME: u8 = 0x43;
const INDEX: u8 = 0x44;
const END: u8 = 0x45;

const POINTER: u8 = 0x39;
const SPACED_POINTER: u8 = 0x3a;
const ARRAY: u8 = 0x3b;
const STRUCT: u8 = 0x3c;
const UNION: u8 = 0x3d;
const FUNCTION: u8 = 0x3e;
const ENUM: u8 = 0x3f;

const SYMBOLS: [&str; 16] = [
    "BIT",
    "CHAR",
    "INT",
    "LONG",
    "FLOAT",
    "VOID",
    "SBIT",
    "SFR",
    "SFR16",
    "POINTER",
    "SPACED_POINTER",
    "ARRAY",
    "STRUCT",
    "UNION",
    "FUNCTION",
    "ENUM",
];

const PREDEFINED: [&str; 9] = [
    "VOID", "BIT", "CHAR", "UCHAR", "INT", "UINT", "LONG", "ULONG", "FLOAT",
];

const FUNCTION_LABELS: &[&str] = &["ret: ", "bank: ", "params: ", "types: "];
const ARRAY_LABELS: &[&str] = &["count: ", "type: "];
const STRUCT_LABELS: &[&str] = &["size: ", "members: ", "types: ", "names: "];
const POINTER_LABELS: &[&str] = &["to: "];
const SPACED_POINTER_LABELS: &[&str] = &["space: ", "to: "];
const ENUM_LABELS: &[&str] = &["count: ", "names: "];

//  ARRAY n .               10 0000
//  STRUCT n n . .          11 0000
//  UNION n n . .           11 0000
//  FUNCTION . n n .        01 1000
//  ENUM n .                10 0000
//  SPACED_POINTER n .      10 0000
fn leading(leaf: u8) -> (u8, Labels) {
    match leaf {
        ARRAY => (0x20, Labels::new(ARRAY_LABELS)),
        STRUCT | UNION => (0x30, Labels::new(STRUCT_LABELS)),
        FUNCTION => (0x18, Labels::new(FUNCTION_LABELS)),
        ENUM => (0x20, Labels::new(ENUM_LABELS)),
        SPACED_POINTER => (0x20, Labels::new(SPACED_POINTER_LABELS)),
        POINTER => (0, Labels::new(POINTER_LABELS)),
        _ => (0, Labels::NONE),
    }
}

/// A type reference: one of the predefined names or `@index`.
pub fn type_ref(index: u16) -> String {
    PREDEFINED
        .get(usize::from(index))
        .map_or_else(|| format!("@{index}"), |name| name.to_string())
}

/// Decodes one descriptor, up to and including its end leaf.
pub fn descriptor(cursor: &mut FieldCursor, out: &mut dyn Reporter) -> Result<()> {
    let mut pattern = Pattern::new(0, 0);
    let mut labels = Labels::NONE;
    let mut first = true;
    out.emit_field("");

    while !cursor.at_end() {
        let leaf = cursor.u8()?;
        if leaf == END {
            return Ok(());
        }
        if first {
            let (bits, leaf_labels) = leading(leaf);
            pattern = Pattern::new(bits, 0x40);
            labels = leaf_labels;
            first = false;
        } else {
            pattern.advance();
            out.emit_raw(" ");
            if let Some(label) = labels.next_label() {
                out.emit_raw(label);
            }
        }

        let text = match leaf {
            FIRST_SYMBOL..=LAST_SYMBOL if !pattern.numeric() => {
                SYMBOLS[usize::from(leaf - FIRST_SYMBOL)].to_string()
            }
            0..=LAST_SYMBOL => leaf.to_string(),
            NIL => "nil".to_string(),
            WORD => cursor.u16()?.to_string(),
            DWORD => cursor.u32()?.to_string(),
            NAME => format!("'{}'", cursor.name()?),
            INDEX => type_ref(cursor.index()?),
            _ => format!("Leaf{leaf}"),
        };
        out.emit_raw(&text);
    }
    Ok(())
}
