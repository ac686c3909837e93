// SPDX-FileCopyrightText: © 2025 TTKB, LLC
// SPDX-License-Identifier: BSD-3-CLAUSE

//! Index to name resolution.

use std::collections::HashMap;

use unicode_segmentation::UnicodeSegmentation;

/// The kinds of index an object module may refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Segment,
    External,
    Name,
    Type,
    Overlay,
    Group,
    Block,
    Comdat,
}

/// Names registered by definition records, looked up by later references.
///
/// Unknown indices resolve to `@index`, which is cached so that repeated
/// lookups agree with one another.
#[derive(Clone, Debug)]
pub struct IndexTable {
    max_name: usize,
    names: HashMap<(Category, u16), String>,
}

impl IndexTable {
    pub fn new(max_name: usize) -> Self {
        Self {
            max_name,
            names: HashMap::new(),
        }
    }

    pub fn max_name(&self) -> usize {
        self.max_name
    }

    /// Stores `name` for `index`.
    ///
    /// Names longer than the table maximum are cut back and end in
    /// `..@index`, keeping the total within the maximum.
    pub fn set(&mut self, category: Category, index: u16, name: &str) {
        let stored = if name.chars().count() <= self.max_name {
            name.to_string()
        } else {
            let suffix = format!("..@{index}");
            let keep = self.max_name.saturating_sub(suffix.len());
            let mut prefix = String::new();
            for g in name.graphemes(true) {
                if prefix.chars().count() + g.chars().count() > keep {
                    break;
                }
                prefix.push_str(g);
            }
            prefix + &suffix
        };
        self.names.insert((category, index), stored);
    }

    pub fn get(&mut self, category: Category, index: u16) -> String {
        self.names
            .entry((category, index))
            .or_insert_with(|| format!("@{index}"))
            .clone()
    }

    pub fn contains(&self, category: Category, index: u16) -> bool {
        self.names.contains_key(&(category, index))
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_placeholder_is_cached() {
        let mut table = IndexTable::new(20);
        assert!(!table.contains(Category::Segment, 7));
        assert_eq!(table.get(Category::Segment, 7), "@7");
        assert!(table.contains(Category::Segment, 7));
        assert_eq!(table.get(Category::Segment, 7), "@7");
        assert_eq!(table.get(Category::External, 7), "@7");
    }

    #[test]
    fn test_set_and_get() {
        let mut table = IndexTable::new(20);
        table.set(Category::External, 3, "PRINTF");
        assert_eq!(table.get(Category::External, 3), "PRINTF");
        assert_eq!(table.get(Category::Segment, 3), "@3");
    }

    #[test]
    fn test_long_names_are_truncated() {
        let mut table = IndexTable::new(20);
        table.set(Category::Name, 12, "A_VERY_LONG_IDENTIFIER_NAME");
        let name = table.get(Category::Name, 12);
        assert_eq!(name, "A_VERY_LONG_IDE..@12");
        assert_eq!(name.len(), 20);

        table.set(Category::Name, 13, "EXACTLY_TWENTY_CHARS");
        assert_eq!(table.get(Category::Name, 13), "EXACTLY_TWENTY_CHARS");
    }

    #[test]
    fn test_clear() {
        let mut table = IndexTable::new(20);
        table.set(Category::Group, 1, "DGROUP");
        table.clear();
        assert_eq!(table.get(Category::Group, 1), "@1");
    }
}
