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

pub(crate) mod bit_array;

use crate::PAGE_SIZE;

#[inline]
pub(crate) const fn div_ceil(num: usize, div: usize) -> usize {
    (num + div - 1) / div
}

/// Round `vaddr` down to the base of its page.
#[inline]
pub(crate) const fn page_base(vaddr: usize) -> usize {
    vaddr & !(PAGE_SIZE - 1)
}

/// Offset of `vaddr` within its page.
#[inline]
pub(crate) const fn page_offset(vaddr: usize) -> usize {
    vaddr & (PAGE_SIZE - 1)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_page_math() {
        assert_eq!(page_base(0), 0);
        assert_eq!(page_base(PAGE_SIZE - 1), 0);
        assert_eq!(page_base(PAGE_SIZE), PAGE_SIZE);
        assert_eq!(page_base(3 * PAGE_SIZE + 17), 3 * PAGE_SIZE);
        assert_eq!(page_offset(3 * PAGE_SIZE + 17), 17);
        assert_eq!(div_ceil(0, 8), 0);
        assert_eq!(div_ceil(1, 8), 1);
        assert_eq!(div_ceil(8, 8), 1);
        assert_eq!(div_ceil(9, 8), 2);
    }
}
