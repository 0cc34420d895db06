// SPDX-FileCopyrightText: 2025 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

use itertools::Itertools;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

const PAGE_BITS: u32 = 9;
const PAGE: usize = 1 << PAGE_BITS;
/// Number of cells shown per row in the [Debug](fmt::Debug) output
const ROW: usize = 16;

static EMPTY: [i64; PAGE] = [0; PAGE];

/// Split an address into its page number and the index within that page
#[allow(clippy::cast_possible_truncation, reason = "masked down anyway")]
const fn split(address: u64) -> (u64, usize) {
    (address >> PAGE_BITS, (address & (PAGE as u64 - 1)) as usize)
}

/// Zero-initialized memory, stored as 512-cell pages that are only allocated once touched.
///
/// Its length is one past the highest address ever accessed through [Memory::cell], so it grows
/// upward on demand and never shrinks, however far away that address is.
#[derive(Clone, Default)]
pub(crate) struct Memory {
    pages: HashMap<u64, Box<[i64; PAGE]>>,
    len: u64,
}

impl Memory {
    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    fn page(&self, page_num: u64) -> &[i64; PAGE] {
        self.pages.get(&page_num).map_or(&EMPTY, |p| p.as_ref())
    }

    /// Access the cell at `address`, growing memory first if needed.
    ///
    /// Both reads and writes made by executing instructions go through this, so any access past
    /// the end extends memory.
    pub(crate) fn cell(&mut self, address: u64) -> &mut i64 {
        self.len = self.len.max(address.saturating_add(1));
        let (page_num, index) = split(address);
        &mut self
            .pages
            .entry(page_num)
            .or_insert_with(|| Box::new([0; PAGE]))[index]
    }

    /// Read the cell at `address` without growing memory. Cells past the end read as `0`.
    pub(crate) fn peek(&self, address: u64) -> i64 {
        let (page_num, index) = split(address);
        self.page(page_num)[index]
    }

    /// Copy out the cells in `range`, with cells past the end reading as `0`
    pub(crate) fn get_range(&self, range: Range<u64>) -> Vec<i64> {
        range.map(|i| self.peek(i)).collect()
    }
}

// pages that were touched but are still all zero are equal to missing ones
impl PartialEq for Memory {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
            && self
                .pages
                .keys()
                .chain(other.pages.keys())
                .all(|&p| self.page(p) == other.page(p))
    }
}

impl Eq for Memory {}

impl FromIterator<i64> for Memory {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        let mut mem = Self::default();
        let chunks = iter.into_iter().chunks(PAGE);
        for (page_num, chunk) in (&chunks).into_iter().enumerate() {
            let mut page = Box::new([0; PAGE]);
            for (cell, value) in page.iter_mut().zip(chunk) {
                *cell = value;
                mem.len += 1;
            }
            mem.pages.insert(page_num as u64, page);
        }
        mem
    }
}

impl std::ops::Index<u64> for Memory {
    type Output = i64;
    fn index(&self, address: u64) -> &i64 {
        let (page_num, index) = split(address);
        &self.page(page_num)[index]
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = fmt.debug_map();
        for (&page_num, page) in self.pages.iter().sorted_by_key(|&(&p, _)| p) {
            for (row, chunk) in page.chunks(ROW).enumerate() {
                // all-zero rows are noise in a mostly-empty grown memory
                if chunk.iter().all(|&c| c == 0) {
                    continue;
                }
                let address = (page_num << PAGE_BITS) + (row * ROW) as u64;
                map.entry(
                    &format_args!("{{ 0x{address:04x} }}"),
                    &format_args!("[{}]", chunk.iter().format(", ")),
                );
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_does_not_grow() {
        let mem: Memory = [1, 2, 3].into_iter().collect();
        assert_eq!(mem.peek(1), 2);
        assert_eq!(mem.peek(1000), 0);
        assert_eq!(mem[1000], 0);
        assert_eq!(mem.len(), 3);
    }

    #[test]
    fn cell_grows_with_zeroes() {
        let mut mem: Memory = [1, 2, 3].into_iter().collect();
        *mem.cell(9) = 7;
        assert_eq!(mem.len(), 10);
        assert_eq!(mem.get_range(0..10), [1, 2, 3, 0, 0, 0, 0, 0, 0, 7]);

        // reading through `cell` grows too
        assert_eq!(*mem.cell(20), 0);
        assert_eq!(mem.len(), 21);
    }

    #[test]
    fn never_shrinks() {
        let mut mem: Memory = std::iter::empty().collect();
        *mem.cell(100) = 1;
        *mem.cell(5) = 2;
        assert_eq!(mem.len(), 101);
        assert_eq!(mem.get_range(99..103), vec![0, 1, 0, 0]);
    }

    #[test]
    fn far_addresses() {
        let mut mem: Memory = (0..1000).collect();
        *mem.cell(1 << 60) = 9;
        *mem.cell(u64::MAX) = 10;
        assert_eq!(mem.len(), u64::MAX);
        assert_eq!(mem.peek(1 << 60), 9);
        assert_eq!(mem.peek(u64::MAX), 10);
        assert_eq!(mem.peek(999), 999);
        assert_eq!(mem.pages.len(), 4);
    }

    #[test]
    fn zero_pages_compare_equal() {
        let mut a: Memory = [1, 2, 3].into_iter().collect();
        let mut b = a.clone();
        // touching reads allocate a zeroed page in `a` only
        assert_eq!(*a.cell(2000), 0);
        *b.cell(2000) = 0;
        b.pages.remove(&split(2000).0);
        assert_eq!(a, b);
        *a.cell(2000) = 1;
        assert_ne!(a, b);
    }
}
