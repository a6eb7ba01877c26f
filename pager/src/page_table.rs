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

use std::collections::HashMap;
use std::sync::Mutex;

use log::{debug, trace};

use crate::modules::block_device::BlockDeviceModule;
use crate::modules::file_store::FileHandle;
use crate::swap::SwapStore;
use crate::util::page_offset;
use crate::{Pid, PAGE_SIZE};

/// Where a page's content lives (or comes from) while it is not resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Resident anonymous page; its only copy is the frame backing it.
    Anonymous,
    /// Populated from a byte range of a file on fault.
    FileBacked,
    /// Evicted to a swap slot.
    Swapped,
    /// Never-written zero page; materialized as a zeroed frame on fault.
    ZeroFill,
}

/// The backing reference that goes with a [`PageKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRef {
    None,
    File { handle: FileHandle, offset: usize },
    Swap(crate::swap::SwapSlot),
}

struct VirtualPageRecord {
    kind: PageKind,
    page_ref: PageRef,
    writable: bool,
    /// Valid-byte count used when flushing a partial tail page of a
    /// memory-mapped file back to the file.
    saved_file_pos: usize,
}

/// Supplemental page table: per (process, virtual page) backing-store state
/// that survives eviction and reload.
///
/// One mutex guards the whole mapping; every operation is short. The one
/// exception is [`SuppPageTable::free_process`], which performs swap I/O
/// under the lock to retire slots — a deliberate simplification that
/// serializes unrelated lookups for the duration of teardown.
pub struct SuppPageTable {
    entries: Mutex<HashMap<(Pid, usize), VirtualPageRecord>>,
}

impl SuppPageTable {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts or overwrites the record for `(pid, vaddr)`.
    pub fn set(&self, pid: Pid, vaddr: usize, page_ref: PageRef, kind: PageKind, writable: bool) {
        debug_assert_eq!(page_offset(vaddr), 0);
        debug_assert!(vaddr != 0);

        trace!(
            "spt: set pid {} vaddr {:#x} kind {:?} writable {}",
            pid,
            vaddr,
            kind,
            writable
        );

        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            (pid, vaddr),
            VirtualPageRecord {
                kind,
                page_ref,
                writable,
                saved_file_pos: PAGE_SIZE,
            },
        );
    }

    /// Rewrites the backing reference and kind of an existing record,
    /// keeping its writability and saved file position. Used when a page
    /// moves to or from swap.
    pub fn update_backing(&self, pid: Pid, vaddr: usize, page_ref: PageRef, kind: PageKind) {
        debug_assert_eq!(page_offset(vaddr), 0);

        trace!("spt: rebind pid {} vaddr {:#x} kind {:?}", pid, vaddr, kind);

        let mut entries = self.entries.lock().unwrap();
        let record = entries
            .get_mut(&(pid, vaddr))
            .unwrap_or_else(|| panic!("spt: rebind of untracked page pid {} vaddr {:#x}", pid, vaddr));
        record.page_ref = page_ref;
        record.kind = kind;
    }

    pub fn get_ref(&self, pid: Pid, vaddr: usize) -> Option<PageRef> {
        debug_assert_eq!(page_offset(vaddr), 0);
        let entries = self.entries.lock().unwrap();
        entries.get(&(pid, vaddr)).map(|record| record.page_ref)
    }

    pub fn get_kind(&self, pid: Pid, vaddr: usize) -> Option<PageKind> {
        debug_assert_eq!(page_offset(vaddr), 0);
        let entries = self.entries.lock().unwrap();
        entries.get(&(pid, vaddr)).map(|record| record.kind)
    }

    pub fn get_writable(&self, pid: Pid, vaddr: usize) -> Option<bool> {
        debug_assert_eq!(page_offset(vaddr), 0);
        let entries = self.entries.lock().unwrap();
        entries.get(&(pid, vaddr)).map(|record| record.writable)
    }

    /// Deletes the record and hands its reference back; the caller releases
    /// whatever resource the reference names (e.g. a swap slot).
    pub fn remove(&self, pid: Pid, vaddr: usize) -> Option<PageRef> {
        debug_assert_eq!(page_offset(vaddr), 0);
        let mut entries = self.entries.lock().unwrap();
        entries.remove(&(pid, vaddr)).map(|record| record.page_ref)
    }

    /// Saves the valid-byte position for a partial tail page of a mapped file.
    ///
    /// The record must exist; calling this for an untracked page is a bug.
    pub fn set_file_seek(&self, pid: Pid, vaddr: usize, pos: usize) {
        debug_assert_eq!(page_offset(vaddr), 0);
        debug_assert!(pos <= PAGE_SIZE);

        let mut entries = self.entries.lock().unwrap();
        let record = entries
            .get_mut(&(pid, vaddr))
            .unwrap_or_else(|| panic!("spt: file seek on untracked page pid {} vaddr {:#x}", pid, vaddr));
        record.saved_file_pos = pos;
    }

    /// See [`SuppPageTable::set_file_seek`]. The record must exist.
    pub fn get_file_seek(&self, pid: Pid, vaddr: usize) -> usize {
        debug_assert_eq!(page_offset(vaddr), 0);

        let entries = self.entries.lock().unwrap();
        entries
            .get(&(pid, vaddr))
            .unwrap_or_else(|| panic!("spt: file seek on untracked page pid {} vaddr {:#x}", pid, vaddr))
            .saved_file_pos
    }

    /// Removes every record owned by `pid` in one critical section.
    ///
    /// Swapped records are first read back into a scratch page that is
    /// thrown away; the read-back is purely how a slot is retired, the
    /// content is not preserved. Anonymous, file-backed and zero-fill
    /// records are dropped without I/O.
    pub fn free_process<D: BlockDeviceModule>(&self, pid: Pid, swap: &SwapStore<D>) {
        let mut entries = self.entries.lock().unwrap();
        let mut scratch = vec![0u8; PAGE_SIZE];
        let mut released = 0usize;

        entries.retain(|(owner, vaddr), record| {
            if *owner != pid {
                return true;
            }

            if let PageKind::Swapped = record.kind {
                let PageRef::Swap(slot) = record.page_ref else {
                    panic!("spt: swapped page without slot, pid {} vaddr {:#x}", pid, vaddr);
                };
                // discard the content, this only retires the slot
                swap.read_slot(slot, &mut scratch);
                swap.free_slot(slot);
            }
            released += 1;
            false
        });

        debug!("spt: released {} records for pid {}", released, pid);
    }
}

impl Default for SuppPageTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::modules::block_device::MemBlockDevice;
    use crate::SwapSlot;
    use crate::SECTORS_PER_PAGE;

    fn get_test_swap(slots: usize) -> SwapStore<MemBlockDevice> {
        SwapStore::new(MemBlockDevice::new(slots * SECTORS_PER_PAGE))
    }

    #[test]
    fn test_set_get_until_next_change() {
        let spt = SuppPageTable::new();
        let vaddr = 4 * PAGE_SIZE;

        assert_eq!(spt.get_kind(1, vaddr), None);
        assert_eq!(spt.get_ref(1, vaddr), None);
        assert_eq!(spt.get_writable(1, vaddr), None);

        spt.set(1, vaddr, PageRef::None, PageKind::ZeroFill, true);
        assert_eq!(spt.get_kind(1, vaddr), Some(PageKind::ZeroFill));
        assert_eq!(spt.get_ref(1, vaddr), Some(PageRef::None));
        assert_eq!(spt.get_writable(1, vaddr), Some(true));

        // stable until overwritten
        assert_eq!(spt.get_kind(1, vaddr), Some(PageKind::ZeroFill));

        spt.set(
            1,
            vaddr,
            PageRef::File { handle: 7, offset: 0 },
            PageKind::FileBacked,
            false,
        );
        assert_eq!(spt.get_kind(1, vaddr), Some(PageKind::FileBacked));
        assert_eq!(spt.get_writable(1, vaddr), Some(false));

        // other keys unaffected
        assert_eq!(spt.get_kind(2, vaddr), None);
        assert_eq!(spt.get_kind(1, vaddr + PAGE_SIZE), None);
    }

    #[test]
    fn test_remove_returns_reference() {
        let spt = SuppPageTable::new();
        let vaddr = PAGE_SIZE;

        spt.set(
            3,
            vaddr,
            PageRef::File { handle: 9, offset: 512 },
            PageKind::FileBacked,
            true,
        );
        assert_eq!(
            spt.remove(3, vaddr),
            Some(PageRef::File { handle: 9, offset: 512 })
        );
        assert_eq!(spt.get_kind(3, vaddr), None);
        assert_eq!(spt.remove(3, vaddr), None);
    }

    #[test]
    fn test_file_seek_round_trip() {
        let spt = SuppPageTable::new();
        let vaddr = 2 * PAGE_SIZE;

        spt.set(1, vaddr, PageRef::None, PageKind::ZeroFill, true);
        assert_eq!(spt.get_file_seek(1, vaddr), PAGE_SIZE);
        spt.set_file_seek(1, vaddr, 10);
        assert_eq!(spt.get_file_seek(1, vaddr), 10);
    }

    #[test]
    fn test_rebind_keeps_writability_and_seek() {
        let spt = SuppPageTable::new();
        let vaddr = 3 * PAGE_SIZE;

        spt.set(
            1,
            vaddr,
            PageRef::File { handle: 4, offset: 0 },
            PageKind::FileBacked,
            true,
        );
        spt.set_file_seek(1, vaddr, 100);

        spt.update_backing(1, vaddr, PageRef::Swap(SwapSlot::new(2)), PageKind::Swapped);
        assert_eq!(spt.get_kind(1, vaddr), Some(PageKind::Swapped));
        assert_eq!(spt.get_writable(1, vaddr), Some(true));
        assert_eq!(spt.get_file_seek(1, vaddr), 100);

        spt.update_backing(1, vaddr, PageRef::None, PageKind::Anonymous);
        assert_eq!(spt.get_file_seek(1, vaddr), 100);
    }

    #[test]
    #[should_panic]
    fn test_file_seek_untracked_page_panics() {
        let spt = SuppPageTable::new();
        spt.get_file_seek(1, PAGE_SIZE);
    }

    #[test]
    fn test_free_process_retires_swap_slots() {
        let spt = SuppPageTable::new();
        let swap = get_test_swap(4);

        let slot_a = swap.allocate_slot().unwrap();
        let slot_b = swap.allocate_slot().unwrap();
        assert_eq!(swap.free_slots(), 2);

        spt.set(1, PAGE_SIZE, PageRef::Swap(slot_a), PageKind::Swapped, true);
        spt.set(1, 2 * PAGE_SIZE, PageRef::Swap(slot_b), PageKind::Swapped, true);
        spt.set(1, 3 * PAGE_SIZE, PageRef::None, PageKind::ZeroFill, true);
        spt.set(2, PAGE_SIZE, PageRef::None, PageKind::ZeroFill, true);

        spt.free_process(1, &swap);

        // both slots came back, no record of pid 1 left, pid 2 untouched
        assert_eq!(swap.free_slots(), 4);
        assert_eq!(spt.get_kind(1, PAGE_SIZE), None);
        assert_eq!(spt.get_kind(1, 2 * PAGE_SIZE), None);
        assert_eq!(spt.get_kind(1, 3 * PAGE_SIZE), None);
        assert_eq!(spt.get_kind(2, PAGE_SIZE), Some(PageKind::ZeroFill));
    }
}
