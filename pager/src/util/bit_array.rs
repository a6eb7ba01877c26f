/*
 *  Copyright (C) 2026  The pager developers
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use crate::util::div_ceil;

/// Fixed-size array of bits, all zero initially.
pub(crate) struct BitArray {
    arr: Vec<u8>,
    len: usize,
}

impl BitArray {
    pub(crate) fn new(len: usize) -> Self {
        BitArray {
            arr: vec![0u8; div_ceil(len, 8)],
            len,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn set(&mut self, index: usize, value: bool) {
        debug_assert!(index < self.len);
        let arr_index = index / 8;
        let internal_index = index % 8;

        let item = &mut self.arr[arr_index];
        if value {
            *item |= 1u8 << internal_index;
        } else {
            *item &= !(1u8 << internal_index);
        }
    }

    pub(crate) fn is_set(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        let arr_index = index / 8;
        let internal_index = index % 8;

        let item = self.arr[arr_index];
        (item & (1u8 << internal_index)) != 0
    }

    /// Are all of the `count` bits starting at `start` set?
    pub(crate) fn all_set(&self, start: usize, count: usize) -> bool {
        (start..start + count).all(|i| self.is_set(i))
    }

    /// Are all of the `count` bits starting at `start` clear?
    pub(crate) fn none_set(&self, start: usize, count: usize) -> bool {
        (start..start + count).all(|i| !self.is_set(i))
    }

    pub(crate) fn set_range(&mut self, start: usize, count: usize, value: bool) {
        for i in start..start + count {
            self.set(i, value);
        }
    }
}

#[cfg(test)]
mod test {
    use super::BitArray;

    #[test]
    fn test_set_and_clear() {
        let mut bits = BitArray::new(19);
        assert_eq!(bits.len(), 19);

        for i in 0..19 {
            assert!(!bits.is_set(i));
        }

        bits.set(0, true);
        bits.set(7, true);
        bits.set(8, true);
        bits.set(18, true);
        assert!(bits.is_set(0));
        assert!(bits.is_set(7));
        assert!(bits.is_set(8));
        assert!(bits.is_set(18));
        assert!(!bits.is_set(1));
        assert!(!bits.is_set(9));

        bits.set(8, false);
        assert!(!bits.is_set(8));
        // neighbors untouched
        assert!(bits.is_set(7));
        assert!(!bits.is_set(9));
    }

    #[test]
    fn test_ranges() {
        let mut bits = BitArray::new(64);

        assert!(bits.none_set(0, 64));
        bits.set_range(8, 16, true);
        assert!(bits.all_set(8, 16));
        assert!(!bits.all_set(7, 17));
        assert!(bits.none_set(0, 8));
        assert!(bits.none_set(24, 40));

        bits.set_range(8, 16, false);
        assert!(bits.none_set(0, 64));
    }
}
