// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! OMF86 relocation addressing.
//!
//! A `FIXUPP` record is a sequence of subrecords. The high bit of the first
//! byte separates explicit fixups from thread definitions:
//!
//! ```text
//!  explicit:  1 M LLLL OO  oooooooo  fixdat  [frame datum] [target datum] [displacement]
//!  thread:    0 D 0 MMM TT           [index | frame number]
//! ```
//!
//! `fixdat` is `F FFF T P TT`. With `F` set the frame comes from a frame
//! thread, with `T` set the target comes from a target thread, and `P`
//! suppresses the displacement.

use std::fmt;

use log::debug;

use crate::context::DecoderContext;
use crate::cursor::FieldCursor;
use crate::detect::Flavour;
use crate::error::{DecodeError, Result};
use crate::index::{Category, IndexTable};

const FIXUP_EXPLICIT: u8 = 0x80;
const FIXUP_SELF_RELATIVE: u8 = 0x40;
const THREAD_FRAME: u8 = 0x40;
const FIXDAT_FRAME_THREAD: u8 = 0x80;
const FIXDAT_TARGET_THREAD: u8 = 0x08;
const FIXDAT_NO_DISPLACEMENT: u8 = 0x04;

const LOCATION_MS_LINK_OFFSET: u8 = 5;
const LOCATION_OFFSET_32: u8 = 9;

const LOCATIONS: [&str; 16] = [
    "LoByte",
    "Offset16",
    "Base",
    "Pointer32",
    "HiByte",
    "LrOffset16",
    "Pointer48",
    "Undefined7",
    "Undefined8",
    "Offset32",
    "Undefined10",
    "Pointer48",
    "Undefined12",
    "rOffset32",
    "Undefined14",
    "Undefined15",
];

/// How the frame of a fixup is determined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    Segment(u16),
    Group(u16),
    External(u16),
    /// An absolute frame number.
    Absolute(u16),
    /// The frame containing the location being fixed up.
    Location,
    /// The frame of the target.
    Target,
    None,
}

impl FrameKind {
    fn read(method: u8, cursor: &mut FieldCursor) -> Result<Self> {
        Ok(match method {
            0 => Self::Segment(cursor.index()?),
            1 => Self::Group(cursor.index()?),
            2 => Self::External(cursor.index()?),
            3 => Self::Absolute(cursor.u16()?),
            4 => Self::Location,
            5 => Self::Target,
            6 => Self::None,
            _ => return Err(DecodeError::invalid(format!("frame method {method}"))),
        })
    }

    pub fn render(&self, names: &mut IndexTable) -> String {
        match self {
            Self::Segment(i) => format!("SI[{}]", names.get(Category::Segment, *i)),
            Self::Group(i) => format!("GI[{}]", names.get(Category::Group, *i)),
            Self::External(i) => format!("EI[{}]", names.get(Category::External, *i)),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Segment(i) => write!(f, "SI[@{i}]"),
            Self::Group(i) => write!(f, "GI[@{i}]"),
            Self::External(i) => write!(f, "EI[@{i}]"),
            Self::Absolute(frame) => write!(f, "{frame:04X}"),
            Self::Location => f.write_str("LOCATION"),
            Self::Target => f.write_str("TARGET"),
            Self::None => f.write_str("NONE"),
        }
    }
}

/// What a fixup refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetKind {
    Segment(u16),
    Group(u16),
    External(u16),
    Absolute(u16),
}

impl TargetKind {
    fn read(method: u8, cursor: &mut FieldCursor) -> Result<Self> {
        Ok(match method & 3 {
            0 => Self::Segment(cursor.index()?),
            1 => Self::Group(cursor.index()?),
            2 => Self::External(cursor.index()?),
            _ => Self::Absolute(cursor.u16()?),
        })
    }

    pub fn render(&self, names: &mut IndexTable) -> String {
        match self {
            Self::Segment(i) => format!("Seg[{}]", names.get(Category::Segment, *i)),
            Self::Group(i) => format!("Grp[{}]", names.get(Category::Group, *i)),
            Self::External(i) => format!("Ext[{}]", names.get(Category::External, *i)),
            Self::Absolute(_) => self.to_string(),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Segment(i) => write!(f, "Seg[@{i}]"),
            Self::Group(i) => write!(f, "Grp[@{i}]"),
            Self::External(i) => write!(f, "Ext[@{i}]"),
            Self::Absolute(frame) => write!(f, "Frame {frame:04X}"),
        }
    }
}

/// Whether a frame or target was given in place or through a thread slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Addressing {
    Explicit,
    Thread(u8),
}

/// Frame and target thread bindings.
///
/// Threads bound by one `FIXUPP` record stay in force for later records
/// of the same module.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThreadTable {
    frames: [Option<FrameKind>; 4],
    targets: [Option<TargetKind>; 4],
}

impl ThreadTable {
    pub fn frame(&self, slot: u8) -> Option<FrameKind> {
        self.frames.get(usize::from(slot)).copied().flatten()
    }

    pub fn target(&self, slot: u8) -> Option<TargetKind> {
        self.targets.get(usize::from(slot)).copied().flatten()
    }

    fn bind_frame(&mut self, slot: u8, frame: FrameKind) {
        if let Some(entry) = self.frames.get_mut(usize::from(slot)) {
            *entry = Some(frame);
        }
    }

    fn bind_target(&mut self, slot: u8, target: TargetKind) {
        if let Some(entry) = self.targets.get_mut(usize::from(slot)) {
            *entry = Some(target);
        }
    }
}

/// The frame, target and displacement part of a fixup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixDat {
    pub frame: FrameKind,
    pub frame_mode: Addressing,
    pub target: TargetKind,
    pub target_mode: Addressing,
    pub displacement: Option<u32>,
}

impl FixDat {
    /// Reads a fixdat byte and the datums it calls for. `wide` selects
    /// 32-bit displacements.
    pub fn decode(cursor: &mut FieldCursor, threads: &ThreadTable, wide: bool) -> Result<Self> {
        let fixdat = cursor.u8()?;
        let frame_method = (fixdat >> 4) & 7;

        let (frame, frame_mode) = if fixdat & FIXDAT_FRAME_THREAD != 0 {
            let slot = frame_method & 3;
            let frame = threads
                .frame(slot)
                .ok_or_else(|| DecodeError::invalid(format!("frame thread {slot} unbound")))?;
            (frame, Addressing::Thread(slot))
        } else {
            (FrameKind::read(frame_method, cursor)?, Addressing::Explicit)
        };

        let (target, target_mode) = if fixdat & FIXDAT_TARGET_THREAD != 0 {
            let slot = fixdat & 3;
            let target = threads
                .target(slot)
                .ok_or_else(|| DecodeError::invalid(format!("target thread {slot} unbound")))?;
            (target, Addressing::Thread(slot))
        } else {
            (TargetKind::read(fixdat & 3, cursor)?, Addressing::Explicit)
        };

        let displacement = if fixdat & FIXDAT_NO_DISPLACEMENT == 0 {
            Some(cursor.word(wide)?)
        } else {
            None
        };

        Ok(Self {
            frame,
            frame_mode,
            target,
            target_mode,
            displacement,
        })
    }

    /// Frame column text.
    pub fn frame_text(&self, names: &mut IndexTable) -> String {
        match self.frame_mode {
            Addressing::Thread(slot) => format!("THREAD({slot})"),
            Addressing::Explicit => self.frame.render(names),
        }
    }

    /// Target column text, with the displacement appended when present.
    pub fn target_text(&self, names: &mut IndexTable) -> String {
        let mut text = match self.target_mode {
            Addressing::Thread(slot) => format!("THREAD({slot})"),
            Addressing::Explicit => self.target.render(names),
        };
        if let Some(displacement) = self.displacement {
            text.push_str(&format!(",{displacement:04X}"));
        }
        text
    }
}

/// One explicit fixup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixupSpec {
    /// Offset of the location within the preceding data record.
    pub location_offset: u16,
    pub self_relative: bool,
    /// Location type code, after any flavour mapping.
    pub location: u8,
    pub fixdat: FixDat,
}

impl FixupSpec {
    pub fn location_name(&self) -> &'static str {
        LOCATIONS
            .get(usize::from(self.location))
            .copied()
            .unwrap_or("Undefined")
    }
}

/// A thread definition subrecord.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadDef {
    Frame { slot: u8, frame: FrameKind },
    Target { slot: u8, target: TargetKind },
}

/// One `FIXUPP` subrecord.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixupEntry {
    Fixup(FixupSpec),
    Thread(ThreadDef),
}

/// Decodes `FIXUPP` subrecords against the session's thread bindings.
pub struct FixupDecoder;

impl FixupDecoder {
    /// Reads one subrecord. Thread definitions are bound in `ctx` as they
    /// are read; the location type of an explicit fixup may pin the flavour.
    pub fn decode_entry(
        cursor: &mut FieldCursor,
        ctx: &mut DecoderContext,
        wide: bool,
    ) -> Result<FixupEntry> {
        let first = cursor.u8()?;
        if first & FIXUP_EXPLICIT == 0 {
            return Self::decode_thread(first, cursor, ctx).map(FixupEntry::Thread);
        }

        let location_offset = (u16::from(first & 3) << 8) | u16::from(cursor.u8()?);
        let mut location = (first >> 2) & 0x0f;
        if location >= LOCATION_MS_LINK_OFFSET && ctx.pin_flavour(Flavour::Ms) {
            debug!("fixup location {location} implies Microsoft OMF");
        } else if ctx.flavour() == Flavour::PharLap && location == LOCATION_MS_LINK_OFFSET {
            location = LOCATION_OFFSET_32;
        }

        let fixdat = FixDat::decode(cursor, &ctx.threads, wide)?;
        Ok(FixupEntry::Fixup(FixupSpec {
            location_offset,
            self_relative: first & FIXUP_SELF_RELATIVE != 0,
            location,
            fixdat,
        }))
    }

    fn decode_thread(
        first: u8,
        cursor: &mut FieldCursor,
        ctx: &mut DecoderContext,
    ) -> Result<ThreadDef> {
        let slot = first & 3;
        let method = (first >> 2) & 7;
        Ok(if first & THREAD_FRAME != 0 {
            let frame = FrameKind::read(method, cursor)?;
            ctx.threads.bind_frame(slot, frame);
            ThreadDef::Frame { slot, frame }
        } else {
            let target = TargetKind::read(method, cursor)?;
            ctx.threads.bind_target(slot, target);
            ThreadDef::Target { slot, target }
        })
    }
}
