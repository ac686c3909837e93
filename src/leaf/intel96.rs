// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! OMF96 `TYPEDEF` descriptors.
//!
//! Unlike the 8086 form each descriptor ends with an end-of-branch leaf,
//! and the "nice" marker is the top bit of each leaf byte.

use super::Pattern;
use crate::cursor::FieldCursor;
use crate::error::Result;
use crate::report::Reporter;

const NICE: u8 = 0x80;
const LEAF_MASK: u8 = 0x7f;

const MAX_ONE_BYTE_INT: u8 = 99;
const TWO_BYTE_INT: u8 = 101;
const FOUR_BYTE_INT: u8 = 102;
const STRING: u8 = 103;
const INDEX: u8 = 104;
const END_OF_BRANCH: u8 = 106;

const WHOLE: u8 = 89;
const POINTER: u8 = 110;

const LEAF_NAMES: [&str; 22] = [
    "Whole",
    "Label",
    "Procedure",
    "List",
    "Structure",
    "Array",
    "SgnInt",
    "UnsInt",
    "Entry",
    "Real",
    "Scalar",
    "Nil",
    "Int",
    "Long",
    "String",
    "Index",
    "Repeat",
    "EoB",
    "Union",
    "Enum",
    "Bit",
    "Pointer",
];

/// Names of the predefined type indices 0..=12.
pub const PREDEFINED: [&str; 13] = [
    "NULL", "BYTE", "WORD", "LONG", "ENTRY", "INT8", "INT16", "INT32", "REAL", "UINT8", "UINT16",
    "UINT32", "LABEL",
];

//  92  LIST ...            00 0000
//  93  STRUCTURE n n ...   11 0000
//  94  ARRAY n .           10 0000
//  97  ENTRY . . . n .     00 0100
//  99  SCALAR  n   ...     10 0000
//  107 UNION n n ...       11 0000
//  108 ENUM n . . . . n    10 0001
//  109 BIT n n             11 0000
const FIRSTS: [(u8, u8); 7] = [
    (93, 0x30),
    (94, 0x20),
    (97, 0x04),
    (99, 0x20),
    (107, 0x30),
    (108, 0x21),
    (109, 0x30),
];

/// A type reference: one of the predefined names or `@index`.
pub fn type_ref(index: u16) -> String {
    PREDEFINED
        .get(usize::from(index))
        .map_or_else(|| format!("@{index}"), |name| name.to_string())
}

/// Decodes one descriptor, up to and including its end-of-branch leaf.
pub fn descriptor(cursor: &mut FieldCursor, out: &mut dyn Reporter) -> Result<()> {
    let mut pattern = Pattern::new(0, 0);
    let mut first = true;
    out.emit_field("");

    while !cursor.at_end() {
        let byte = cursor.u8()?;
        if byte & LEAF_MASK == END_OF_BRANCH {
            return Ok(());
        }
        if first {
            let bits = FIRSTS
                .iter()
                .find(|(leaf, _)| *leaf == byte)
                .map_or(0, |(_, bits)| *bits);
            pattern = Pattern::new(bits, 0x40);
            first = false;
        } else {
            pattern.advance();
            out.emit_raw(" ");
        }
        if byte & NICE != 0 {
            out.emit_raw("'");
        }

        let leaf = byte & LEAF_MASK;
        let text = match leaf {
            0..=MAX_ONE_BYTE_INT if pattern.numeric() => leaf.to_string(),
            TWO_BYTE_INT => format!("{:+}", cursor.i16()?),
            FOUR_BYTE_INT => format!("{:+}", cursor.i32()?),
            STRING => cursor.name()?,
            INDEX => type_ref(cursor.index()?),
            WHOLE..=POINTER => LEAF_NAMES[usize::from(leaf - WHOLE)].to_string(),
            _ => format!("Leaf{leaf}"),
        };
        out.emit_raw(&text);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::report::Recorder;

    fn decode(data: &[u8]) -> (Result<()>, usize, Vec<String>) {
        let mut cursor = FieldCursor::new(data);
        let mut out = Recorder::new();
        let result = descriptor(&mut cursor, &mut out);
        (result, cursor.position(), out.lines())
    }

    #[test]
    fn test_array_count_is_numeric() {
        // ARRAY 10 of SCALAR, ended by EoB
        let (result, used, lines) = decode(&[94, 10, 99, 106, 0xff]);
        assert_eq!(result, Ok(()));
        assert_eq!(used, 4);
        assert_eq!(lines, vec!["Array 10 Scalar"]);
    }

    #[test]
    fn test_structure_and_nice_marker() {
        let (_, _, lines) = decode(&[93, 4, 2, 0x80 | 104, 7, 103, 1, b'X', 106]);
        assert_eq!(lines, vec!["Structure 4 2 'INT32 X"]);
    }

    #[test]
    fn test_signed_literals_and_indices() {
        let (_, _, lines) = decode(&[92, 101, 0xfe, 0xff, 102, 5, 0, 0, 0, 104, 40, 106]);
        assert_eq!(lines, vec!["List -2 +5 @40"]);
    }

    #[test]
    fn test_unknown_leaf() {
        let (_, _, lines) = decode(&[92, 7, 106]);
        assert_eq!(lines, vec!["List Leaf7"]);
    }

    #[test]
    fn test_type_ref() {
        assert_eq!(type_ref(0), "NULL");
        assert_eq!(type_ref(12), "LABEL");
        assert_eq!(type_ref(13), "@13");
    }
}
