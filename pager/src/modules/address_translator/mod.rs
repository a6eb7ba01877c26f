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

mod soft;

pub use soft::SoftAddressTranslator;

use crate::Pid;

/// The hardware page-table seam: install and clear per-process
/// virtual-to-frame mappings and inspect the accessed/dirty bits the MMU
/// maintains for them.
///
/// `vaddr` arguments are always page-aligned.
pub trait AddressTranslatorModule {
    /// Installs `(pid, vaddr) -> frame`. The page must not currently be mapped.
    fn map(&mut self, pid: Pid, vaddr: usize, frame: usize, writable: bool) -> Result<(), ()>;

    /// Clears the mapping so the next access faults. Clearing an absent
    /// mapping is a no-op.
    fn unmap(&mut self, pid: Pid, vaddr: usize);

    fn translate(&self, pid: Pid, vaddr: usize) -> Option<usize>;

    /// Accessed bit of the page; false for unmapped pages.
    fn is_accessed(&self, pid: Pid, vaddr: usize) -> bool;

    fn clear_accessed(&mut self, pid: Pid, vaddr: usize);

    /// Dirty bit of the page; false for unmapped pages.
    fn is_dirty(&self, pid: Pid, vaddr: usize) -> bool;

    /// Records an access the way the MMU would: sets the accessed bit, and
    /// the dirty bit too when `write` is set.
    fn mark_access(&mut self, pid: Pid, vaddr: usize, write: bool);

    /// Drops every mapping owned by `pid` (process teardown).
    fn clear_process(&mut self, pid: Pid);
}
