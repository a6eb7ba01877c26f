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

//! The VM context: one object owning the frame table, the supplemental page
//! table and the swap store, plus the fault, eviction and teardown paths
//! that tie them together.
//!
//! Lock order. Fault resolution and teardown serialize on `faults`; inside
//! it, the frame-table mutex is outermost, and the page-table, translator,
//! swap and file locks are only ever taken below it (the page-table lock
//! additionally nests the swap lock inside `free_process`). No path takes
//! them in any other relative order.

use std::fmt;
use std::sync::Mutex;

use log::{debug, error, trace};

use crate::frame_table::FrameTable;
use crate::modules::address_translator::AddressTranslatorModule;
use crate::modules::block_device::BlockDeviceModule;
use crate::modules::file_store::{FileHandle, FileStoreModule};
use crate::page_table::{PageKind, PageRef, SuppPageTable};
use crate::swap::{SwapSlot, SwapStore};
use crate::util::{page_base, page_offset};
use crate::vm_config::VmConfig;
use crate::{Pid, PAGE_SIZE, USER_LIMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmError {
    /// The eviction sweep exhausted its bound without an unpinned victim.
    OutOfPhysicalMemory,
    /// No free slot on the swap device.
    SwapExhausted,
    /// Null, kernel-range or unmapped address from a syscall argument.
    /// Recoverable: terminate the offending process, not the kernel.
    InvalidUserPointer(usize),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::OutOfPhysicalMemory => {
                write!(f, "out of physical memory: eviction found no victim")
            }
            VmError::SwapExhausted => write!(f, "swap device full"),
            VmError::InvalidUserPointer(addr) => {
                write!(f, "invalid user pointer {:#x}", addr)
            }
        }
    }
}

impl std::error::Error for VmError {}

/// The virtual-memory resource manager. See the module docs for locking.
pub struct Vm<T: AddressTranslatorModule, D: BlockDeviceModule, F: FileStoreModule> {
    frames: Mutex<FrameTable>,
    page_table: SuppPageTable,
    swap: SwapStore<D>,
    translator: Mutex<T>,
    files: Mutex<F>,
    /// Serializes fault resolution and teardown against each other.
    faults: Mutex<()>,
    config: VmConfig,
}

impl<T, D, F> Vm<T, D, F>
where
    T: AddressTranslatorModule,
    D: BlockDeviceModule,
    F: FileStoreModule,
{
    pub fn new(translator: T, swap_device: D, files: F, total_frames: usize, config: VmConfig) -> Self {
        debug!(
            "vm: {} frames, {} swap sectors, pipelined eviction: {}",
            total_frames,
            swap_device.sector_count(),
            config.pipelined_eviction_io
        );

        Self {
            frames: Mutex::new(FrameTable::new(total_frames)),
            page_table: SuppPageTable::new(),
            swap: SwapStore::new(swap_device),
            translator: Mutex::new(translator),
            files: Mutex::new(files),
            faults: Mutex::new(()),
            config,
        }
    }

    pub fn page_table(&self) -> &SuppPageTable {
        &self.page_table
    }

    pub fn swap(&self) -> &SwapStore<D> {
        &self.swap
    }

    pub fn translator(&self) -> &Mutex<T> {
        &self.translator
    }

    pub fn files(&self) -> &Mutex<F> {
        &self.files
    }

    pub fn total_frames(&self) -> usize {
        self.frames.lock().unwrap().total_frames()
    }

    pub fn free_frames(&self) -> usize {
        self.frames.lock().unwrap().free_frames()
    }

    pub(crate) fn frames(&self) -> &Mutex<FrameTable> {
        &self.frames
    }

    /// Registers a zero-fill page for `(pid, vaddr)`. Nothing is allocated
    /// until the first fault.
    pub fn map_zero(&self, pid: Pid, vaddr: usize, writable: bool) {
        debug_assert_eq!(page_offset(vaddr), 0);
        assert!(vaddr != 0 && vaddr < USER_LIMIT);
        self.page_table
            .set(pid, vaddr, PageRef::None, PageKind::ZeroFill, writable);
    }

    /// Registers a file-backed page for `(pid, vaddr)`, populated from
    /// `handle` at `offset` on fault (memory-mapped file).
    pub fn map_file(
        &self,
        pid: Pid,
        vaddr: usize,
        handle: FileHandle,
        offset: usize,
        writable: bool,
    ) {
        debug_assert_eq!(page_offset(vaddr), 0);
        assert!(vaddr != 0 && vaddr < USER_LIMIT);
        self.page_table.set(
            pid,
            vaddr,
            PageRef::File { handle, offset },
            PageKind::FileBacked,
            writable,
        );
    }

    /// Resolves a page fault at `vaddr` for `pid` and returns the frame now
    /// backing the page.
    ///
    /// Faulting on a page with no record is an invalid access, reported as
    /// [`VmError::InvalidUserPointer`]; the caller decides what that means
    /// for the process.
    pub fn handle_fault(&self, pid: Pid, vaddr: usize) -> Result<usize, VmError> {
        let vaddr = page_base(vaddr);
        if vaddr == 0 || vaddr >= USER_LIMIT {
            return Err(VmError::InvalidUserPointer(vaddr));
        }

        let _faults = self.faults.lock().unwrap();

        // another thread may have resolved this fault first
        if let Some(frame) = self.translator.lock().unwrap().translate(pid, vaddr) {
            return Ok(frame);
        }

        let kind = self
            .page_table
            .get_kind(pid, vaddr)
            .ok_or(VmError::InvalidUserPointer(vaddr))?;
        let writable = self
            .page_table
            .get_writable(pid, vaddr)
            .unwrap_or_else(|| panic!("spt: record vanished, pid {} vaddr {:#x}", pid, vaddr));

        trace!("fault: pid {} vaddr {:#x} kind {:?}", pid, vaddr, kind);

        let frame = match kind {
            PageKind::Anonymous => {
                // anonymous records are only written together with a mapping
                panic!(
                    "fault on resident anonymous page: pid {} vaddr {:#x}",
                    pid, vaddr
                );
            }
            PageKind::ZeroFill => self.acquire_frame(true, pid, vaddr)?,
            PageKind::FileBacked => {
                let Some(PageRef::File { handle, offset }) = self.page_table.get_ref(pid, vaddr)
                else {
                    panic!(
                        "file-backed page without file reference: pid {} vaddr {:#x}",
                        pid, vaddr
                    );
                };

                let frame = self.acquire_frame(false, pid, vaddr)?;

                let mut buf = vec![0u8; PAGE_SIZE];
                let read = self
                    .files
                    .lock()
                    .unwrap()
                    .read_at(handle, offset, &mut buf)
                    .unwrap_or_else(|_| {
                        panic!("file read failed: handle {} offset {}", handle, offset)
                    });
                debug_assert!(read <= PAGE_SIZE);
                // a short read is the file tail; the rest of the page stays zero

                self.frames
                    .lock()
                    .unwrap()
                    .frame_data_mut(frame)
                    .copy_from_slice(&buf);
                frame
            }
            PageKind::Swapped => {
                let Some(PageRef::Swap(slot)) = self.page_table.get_ref(pid, vaddr) else {
                    panic!("swapped page without slot: pid {} vaddr {:#x}", pid, vaddr);
                };

                let frame = self.acquire_frame(false, pid, vaddr)?;

                let mut buf = vec![0u8; PAGE_SIZE];
                if !self.swap.read_slot(slot, &mut buf) {
                    panic!(
                        "swap slot {} unreadable during swap-in, pid {} vaddr {:#x}",
                        slot.index(),
                        pid,
                        vaddr
                    );
                }
                self.swap.free_slot(slot);
                // the frame is the only copy again
                self.page_table
                    .update_backing(pid, vaddr, PageRef::None, PageKind::Anonymous);

                self.frames
                    .lock()
                    .unwrap()
                    .frame_data_mut(frame)
                    .copy_from_slice(&buf);
                frame
            }
        };

        self.frames.lock().unwrap().set_owner(frame, pid, vaddr);
        {
            let mut translator = self.translator.lock().unwrap();
            translator
                .map(pid, vaddr, frame, writable)
                .unwrap_or_else(|_| {
                    panic!(
                        "translator rejected mapping pid {} vaddr {:#x} -> frame {}",
                        pid, vaddr, frame
                    )
                });
            // the retried access that faulted touches the page
            translator.mark_access(pid, vaddr, false);
        }

        Ok(frame)
    }

    /// Hands out a frame, evicting if the free pool is empty. The returned
    /// frame is claimed: not free, not yet present.
    fn acquire_frame(&self, zero_fill: bool, pid: Pid, vaddr: usize) -> Result<usize, VmError> {
        let mut ft = self.frames.lock().unwrap();

        if let Some(frame) = ft.take_free() {
            if zero_fill {
                ft.zero_frame(frame);
            }
            return Ok(frame);
        }

        // second-chance sweep, bounded at two full cycles
        let total = ft.total_frames();
        let mut swept = 0usize;
        let victim = loop {
            if swept >= 2 * total {
                error!(
                    "{}: no evictable frame for pid {} vaddr {:#x} after {} steps",
                    VmError::OutOfPhysicalMemory,
                    pid,
                    vaddr,
                    swept
                );
                return Err(VmError::OutOfPhysicalMemory);
            }

            let idx = ft.cursor();
            if let Some((owner_pid, owner_vaddr)) = ft.owner(idx) {
                let mut translator = self.translator.lock().unwrap();
                if translator.is_accessed(owner_pid, owner_vaddr) {
                    // one more cycle of life
                    translator.clear_accessed(owner_pid, owner_vaddr);
                } else if !ft.is_pinned(idx) {
                    break idx;
                }
            }

            ft.advance_cursor();
            swept += 1;
        };

        let write_back = self.evict_bookkeeping(&mut ft, victim);

        if let Some(slot) = write_back {
            if self.config.pipelined_eviction_io {
                // copy out so the device write happens without the lock; the
                // victim stays claimed, nobody can hand it out meanwhile
                let page_copy = ft.frame_data(victim).to_vec();
                drop(ft);
                if self.swap.write_slot(slot, &page_copy).is_err() {
                    panic!("swap write failed during eviction, slot {}", slot.index());
                }
                ft = self.frames.lock().unwrap();
            } else {
                // device I/O under the frame-table lock, serializing all
                // other frame operations for the duration
                if self.swap.write_slot(slot, ft.frame_data(victim)).is_err() {
                    panic!("swap write failed during eviction, slot {}", slot.index());
                }
            }
        }

        if zero_fill {
            ft.zero_frame(victim);
        }
        Ok(victim)
    }

    /// Updates the victim's page record, clears its mapping and invalidates
    /// the frame entry. Returns the slot to write the page to, if its
    /// content must be preserved.
    fn evict_bookkeeping(&self, ft: &mut FrameTable, victim: usize) -> Option<SwapSlot> {
        let (pid, vaddr) = ft
            .owner(victim)
            .unwrap_or_else(|| panic!("eviction victim {} has no owner", victim));
        let kind = self.page_table.get_kind(pid, vaddr).unwrap_or_else(|| {
            panic!("eviction: untracked resident page pid {} vaddr {:#x}", pid, vaddr)
        });

        let slot = match kind {
            PageKind::Swapped => {
                // a resident frame must never be marked swapped
                panic!(
                    "eviction: frame {} is resident but pid {} vaddr {:#x} says swapped",
                    victim, pid, vaddr
                );
            }
            // no backing to fall back to
            PageKind::Anonymous => Some(self.swap_slot_for_eviction(pid, vaddr)),
            PageKind::FileBacked | PageKind::ZeroFill => {
                if self.translator.lock().unwrap().is_dirty(pid, vaddr) {
                    Some(self.swap_slot_for_eviction(pid, vaddr))
                } else {
                    // clean: re-created from the file or re-zeroed on the
                    // next fault
                    None
                }
            }
        };

        if let Some(slot) = slot {
            self.page_table
                .update_backing(pid, vaddr, PageRef::Swap(slot), PageKind::Swapped);
        }

        debug!(
            "evict: frame {} pid {} vaddr {:#x} kind {:?} {}",
            victim,
            pid,
            vaddr,
            kind,
            if slot.is_some() { "swapped out" } else { "dropped" }
        );

        self.translator.lock().unwrap().unmap(pid, vaddr);
        ft.invalidate(victim);

        slot
    }

    fn swap_slot_for_eviction(&self, pid: Pid, vaddr: usize) -> SwapSlot {
        self.swap.allocate_slot().unwrap_or_else(|| {
            panic!(
                "{}: forced swap-out of pid {} vaddr {:#x}",
                VmError::SwapExhausted,
                pid,
                vaddr
            )
        })
    }

    /// Destroys the mapping for one page: frees its frame if resident and
    /// its swap slot if evicted, then drops the record.
    pub fn unmap_page(&self, pid: Pid, vaddr: usize) {
        let vaddr = page_base(vaddr);
        let _faults = self.faults.lock().unwrap();

        {
            let mut ft = self.frames.lock().unwrap();
            let mut translator = self.translator.lock().unwrap();
            if let Some(frame) = translator.translate(pid, vaddr) {
                translator.unmap(pid, vaddr);
                ft.release(frame);
            }
        }

        if let Some(PageRef::Swap(slot)) = self.page_table.remove(pid, vaddr) {
            self.swap.free_slot(slot);
        }
    }

    /// Flushes a dirty memory-mapped page back to its file, honoring the
    /// saved file-seek position for partial tail pages. Returns whether
    /// anything was written.
    ///
    /// The file handle and offset come from the caller's mapping bookkeeping;
    /// a page evicted while dirty sits in swap and no longer carries them.
    pub fn write_back_file_page(
        &self,
        pid: Pid,
        vaddr: usize,
        handle: FileHandle,
        offset: usize,
    ) -> Result<bool, VmError> {
        let vaddr = page_base(vaddr);

        loop {
            let kind = match self.page_table.get_kind(pid, vaddr) {
                Some(kind) => kind,
                None => return Ok(false),
            };
            let was_swapped = kind == PageKind::Swapped;
            if was_swapped {
                // dirty at eviction time, bring the bytes back
                self.handle_fault(pid, vaddr)?;
            }

            let _faults = self.faults.lock().unwrap();
            let dirty = was_swapped || self.translator.lock().unwrap().is_dirty(pid, vaddr);
            if !dirty {
                return Ok(false);
            }

            let frame = match self.translator.lock().unwrap().translate(pid, vaddr) {
                Some(frame) => frame,
                // re-evicted between the fault and here, try again
                None => continue,
            };

            let len = self.page_table.get_file_seek(pid, vaddr);
            let mut page = vec![0u8; PAGE_SIZE];
            page.copy_from_slice(self.frames.lock().unwrap().frame_data(frame));

            self.files
                .lock()
                .unwrap()
                .write_at(handle, offset, &page[..len])
                .unwrap_or_else(|_| {
                    panic!("file write failed: handle {} offset {}", handle, offset)
                });
            return Ok(true);
        }
    }

    /// Tears down everything `pid` owns: frames first (mappings cleared and
    /// frames returned to the pool), then every page record, retiring swap
    /// slots along the way.
    ///
    /// The process-lifecycle collaborator guarantees no thread of `pid`
    /// runs anymore when this is called.
    pub fn teardown_process(&self, pid: Pid) {
        let _faults = self.faults.lock().unwrap();

        {
            let mut ft = self.frames.lock().unwrap();
            let mut translator = self.translator.lock().unwrap();
            for frame in 0..ft.total_frames() {
                if let Some((owner, vaddr)) = ft.owner(frame) {
                    if owner == pid {
                        translator.unmap(pid, vaddr);
                        ft.release(frame);
                    }
                }
            }
            translator.clear_process(pid);
        }

        self.page_table.free_process(pid, &self.swap);
        debug!("teardown: pid {} released", pid);
    }

    /// Faults `vaddr` in if needed and pins its frame, retrying when an
    /// eviction wins the race between fault-in and pin.
    pub(crate) fn fault_and_pin(&self, pid: Pid, vaddr: usize) -> Result<usize, VmError> {
        debug_assert_eq!(page_offset(vaddr), 0);

        loop {
            let mapped = self.translator.lock().unwrap().translate(pid, vaddr);
            let frame = match mapped {
                Some(frame) => frame,
                None => self.handle_fault(pid, vaddr)?,
            };

            let mut ft = self.frames.lock().unwrap();
            if ft.owner(frame) == Some((pid, vaddr)) {
                ft.pin(frame);
                return Ok(frame);
            }
            // lost the race against the evictor, fault it back in
        }
    }
}
