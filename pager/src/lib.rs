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

mod frame_table;
mod page_table;
mod swap;
mod user_access;
mod util;
mod vm;
mod vm_config;

#[cfg(test)]
mod test;

pub mod modules;

pub use crate::frame_table::FrameTable;
pub use crate::page_table::{PageKind, PageRef, SuppPageTable};
pub use crate::swap::{SwapSlot, SwapStore};
pub use crate::user_access::PinnedPages;
pub use crate::vm::{Vm, VmError};
pub use crate::vm_config::VmConfig;

use static_assertions::const_assert;

pub type Pid = u32;

pub const PAGE_SIZE: usize = 4096;
pub const SECTOR_SIZE: usize = 512;
pub const SECTORS_PER_PAGE: usize = PAGE_SIZE / SECTOR_SIZE;

/// First address of the kernel's reserved range; user pointers must lie
/// below it.
pub const USER_LIMIT: usize = 0xc000_0000;

const_assert!(PAGE_SIZE % SECTOR_SIZE == 0);
const_assert!(PAGE_SIZE.is_power_of_two());
const_assert!(USER_LIMIT % PAGE_SIZE == 0);
