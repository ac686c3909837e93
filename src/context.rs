// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! Per-session decoder state.

use log::debug;

use crate::detect::{Flavour, Variant};
use crate::fixup::ThreadTable;
use crate::index::{Category, IndexTable};

/// Longest name kept in the index tables for OMF85/51/96.
pub const MAX_NAME: usize = 20;
/// Longest name kept in the index tables for OMF86.
pub const MAX_NAME_86: usize = 25;

/// Running entry counts of the library records, reset by each library header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LibraryCounters {
    pub locations: u16,
    pub names: u16,
    pub dictionary: u16,
}

/// Next-index counters for definition records that number their entries
/// implicitly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    pub segment: u16,
    pub external: u16,
    pub name: u16,
    pub group: u16,
    pub overlay: u16,
    pub block: u16,
    pub typedef: u16,
}

impl Counters {
    /// Returns the current value of `counter` and advances it.
    pub fn next(counter: &mut u16) -> u16 {
        let n = *counter;
        *counter = counter.wrapping_add(1);
        n
    }
}

/// Everything a decode session learns as it reads a stream.
///
/// One context is owned by one dump. The index tables and counters are
/// reset when a module header is seen; the flavour persists for the whole
/// stream once pinned.
#[derive(Clone, Debug)]
pub struct DecoderContext {
    variant: Variant,
    flavour: Flavour,
    pub names: IndexTable,
    pub counters: Counters,
    pub library: LibraryCounters,
    pub threads: ThreadTable,
}

impl DecoderContext {
    pub fn new(variant: Variant, flavour: Flavour) -> Self {
        let mut context = Self {
            variant,
            flavour,
            names: IndexTable::new(Self::max_name(variant)),
            counters: Counters::default(),
            library: LibraryCounters::default(),
            threads: ThreadTable::default(),
        };
        context.reset();
        context
    }

    fn max_name(variant: Variant) -> usize {
        match variant {
            Variant::Omf86 => MAX_NAME_86,
            _ => MAX_NAME,
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn flavour(&self) -> Flavour {
        self.flavour
    }

    /// Fixes the OMF86 flavour if it is still undecided. Returns whether
    /// the flavour changed.
    pub fn pin_flavour(&mut self, flavour: Flavour) -> bool {
        if self.flavour != Flavour::Any || flavour == Flavour::Any {
            return false;
        }
        debug!("OMF86 flavour pinned to {flavour}");
        self.flavour = flavour;
        true
    }

    /// Switches a plain OMF51 session to the Keil record set.
    pub fn promote_keil(&mut self) {
        if self.variant == Variant::Omf51 {
            debug!("Keil extension record seen, decoding as {}", Variant::Omf51K);
            self.variant = Variant::Omf51K;
        }
    }

    /// Starts a new module: clears the index tables and seeds the entries
    /// each variant predefines.
    pub fn reset(&mut self) {
        self.names.clear();
        self.threads = ThreadTable::default();
        self.counters = Counters::default();

        let segments: &[(u16, &str)] = match self.variant {
            Variant::Omf85 => &[
                (0, "ABS"),
                (1, "CODE"),
                (2, "DATA"),
                (3, "STACK"),
                (4, "MEMORY"),
                (5, "RESERVED"),
                (255, "COMMON"),
            ],
            Variant::Omf51 | Variant::Omf51K => &[(0, "ABS")],
            Variant::Omf96 => &[
                (0, "CODE"),
                (1, "DATA"),
                (2, "REGISTER"),
                (3, "OVERLAY"),
                (4, "STACK"),
                (5, "DYNAMIC"),
                (6, "SEG_NULL"),
            ],
            Variant::Omf86 => &[(0, "Unnamed Abs")],
            Variant::Unknown => &[],
        };
        for (index, name) in segments {
            self.names.set(Category::Segment, *index, name);
        }

        match self.variant {
            Variant::Omf96 => self.counters.typedef = 32,
            Variant::Omf51 | Variant::Omf51K => {
                self.counters.typedef = crate::leaf::keil51::FIRST_TYPE_INDEX
            }
            Variant::Omf86 => {
                for category in [
                    Category::Name,
                    Category::Type,
                    Category::Overlay,
                    Category::Group,
                    Category::Block,
                    Category::Comdat,
                ] {
                    self.names.set(category, 0, "");
                }
                self.counters = Counters {
                    segment: 1,
                    external: 1,
                    name: 1,
                    group: 1,
                    overlay: 1,
                    block: 1,
                    typedef: 1,
                };
            }
            _ => {}
        }
    }
}
