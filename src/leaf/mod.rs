// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! Type descriptor ("leaf") grammars.
//!
//! Each grammar reads a stream of tagged leaves from the current record
//! and emits it token by token. Small integer leaves overlap the symbolic
//! codes, so each grammar carries a bit pattern per leading symbol that
//! says which of the following positions hold plain numbers. A set bit
//! means a number; bits are consumed from the most significant end, one
//! per leaf.

pub mod intel86;
pub mod intel96;
pub mod keil51;

/// The next bit of a leading-symbol pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Pattern {
    bits: u8,
    bit: u8,
}

impl Pattern {
    pub(crate) const fn new(bits: u8, first: u8) -> Self {
        Self { bits, bit: first }
    }

    /// Whether the current position holds a number.
    pub(crate) fn numeric(&self) -> bool {
        self.bits & self.bit != 0
    }

    pub(crate) fn advance(&mut self) {
        self.bit >>= 1;
    }
}

/// Positional labels placed in front of successive leaves.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Labels {
    labels: &'static [&'static str],
    next: usize,
}

impl Labels {
    pub(crate) const NONE: Self = Self::new(&[]);

    pub(crate) const fn new(labels: &'static [&'static str]) -> Self {
        Self { labels, next: 0 }
    }

    pub(crate) fn next_label(&mut self) -> Option<&'static str> {
        let label = self.labels.get(self.next).copied();
        if label.is_some() {
            self.next += 1;
        }
        label
    }
}
