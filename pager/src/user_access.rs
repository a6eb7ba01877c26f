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

//! Pin/validate protocol for kernel-initiated access to user memory.
//!
//! Before the syscall boundary dereferences a user-supplied pointer it
//! resolves the covering pages, faults them in if needed and pins their
//! frames; the pins hold until the access completes. [`PinnedPages`] is
//! that window: every covered frame is pinned while it lives and all pins
//! drop together.

use crate::modules::address_translator::AddressTranslatorModule;
use crate::modules::block_device::BlockDeviceModule;
use crate::modules::file_store::FileStoreModule;
use crate::util::{page_base, page_offset};
use crate::vm::{Vm, VmError};
use crate::{Pid, PAGE_SIZE, USER_LIMIT};

/// A user-address range whose frames are pinned, i.e. immune to eviction,
/// for the lifetime of this value.
pub struct PinnedPages<'a, T, D, F>
where
    T: AddressTranslatorModule,
    D: BlockDeviceModule,
    F: FileStoreModule,
{
    vm: &'a Vm<T, D, F>,
    pid: Pid,
    /// Start of the validated user range.
    start: usize,
    len: usize,
    /// Pinned frame of each covered page, in ascending page order.
    frames: Vec<usize>,
}

impl<T, D, F> std::fmt::Debug for PinnedPages<'_, T, D, F>
where
    T: AddressTranslatorModule,
    D: BlockDeviceModule,
    F: FileStoreModule,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinnedPages")
            .field("pid", &self.pid)
            .field("start", &self.start)
            .field("len", &self.len)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl<'a, T, D, F> PinnedPages<'a, T, D, F>
where
    T: AddressTranslatorModule,
    D: BlockDeviceModule,
    F: FileStoreModule,
{
    fn empty(vm: &'a Vm<T, D, F>, pid: Pid, start: usize) -> Self {
        Self {
            vm,
            pid,
            start,
            len: 0,
            frames: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn page_count(&self) -> usize {
        self.frames.len()
    }

    /// Copies `dest.len()` bytes out of the pinned range, starting at byte
    /// `offset` of the range.
    pub fn read(&self, offset: usize, dest: &mut [u8]) {
        assert!(offset + dest.len() <= self.len);

        let mut copied = 0usize;
        while copied < dest.len() {
            let addr = self.start + offset + copied;
            let vaddr = page_base(addr);
            let in_page = page_offset(addr);
            let chunk = (PAGE_SIZE - in_page).min(dest.len() - copied);
            let frame = self.frame_for(vaddr);

            {
                let ft = self.vm.frames().lock().unwrap();
                dest[copied..copied + chunk]
                    .copy_from_slice(&ft.frame_data(frame)[in_page..in_page + chunk]);
            }
            self.vm
                .translator()
                .lock()
                .unwrap()
                .mark_access(self.pid, vaddr, false);

            copied += chunk;
        }
    }

    /// Copies `src` into the pinned range, starting at byte `offset` of the
    /// range.
    pub fn write(&self, offset: usize, src: &[u8]) {
        assert!(offset + src.len() <= self.len);

        let mut copied = 0usize;
        while copied < src.len() {
            let addr = self.start + offset + copied;
            let vaddr = page_base(addr);
            let in_page = page_offset(addr);
            let chunk = (PAGE_SIZE - in_page).min(src.len() - copied);
            let frame = self.frame_for(vaddr);

            {
                let mut ft = self.vm.frames().lock().unwrap();
                ft.frame_data_mut(frame)[in_page..in_page + chunk]
                    .copy_from_slice(&src[copied..copied + chunk]);
            }
            self.vm
                .translator()
                .lock()
                .unwrap()
                .mark_access(self.pid, vaddr, true);

            copied += chunk;
        }
    }

    fn frame_for(&self, vaddr: usize) -> usize {
        let index = (vaddr - page_base(self.start)) / PAGE_SIZE;
        self.frames[index]
    }
}

impl<T, D, F> Drop for PinnedPages<'_, T, D, F>
where
    T: AddressTranslatorModule,
    D: BlockDeviceModule,
    F: FileStoreModule,
{
    fn drop(&mut self) {
        // all pins released together
        let mut ft = self.vm.frames().lock().unwrap();
        for frame in &self.frames {
            ft.unpin(*frame);
        }
    }
}

impl<T, D, F> Vm<T, D, F>
where
    T: AddressTranslatorModule,
    D: BlockDeviceModule,
    F: FileStoreModule,
{
    /// Validates the user range `[ptr, ptr + len)` and pins every covering
    /// frame, faulting absent pages in through the regular path. All pages
    /// are pinned before the returned guard grants any access.
    ///
    /// A null pointer or a range reaching into the kernel's address space is
    /// rejected as [`VmError::InvalidUserPointer`] — an error for the
    /// requesting process, never an internal fault.
    pub fn pin_user_range(
        &self,
        pid: Pid,
        ptr: usize,
        len: usize,
    ) -> Result<PinnedPages<'_, T, D, F>, VmError> {
        if ptr == 0 {
            return Err(VmError::InvalidUserPointer(0));
        }
        let end = match ptr.checked_add(len) {
            Some(end) if end <= USER_LIMIT => end,
            _ => return Err(VmError::InvalidUserPointer(ptr)),
        };

        let mut pinned = PinnedPages::empty(self, pid, ptr);
        if len == 0 {
            return Ok(pinned);
        }

        let first = page_base(ptr);
        let last = page_base(end - 1);
        let mut vaddr = first;
        while vaddr <= last {
            // on error the guard drops and unpins what we got so far
            let frame = self.fault_and_pin(pid, vaddr)?;
            pinned.frames.push(frame);
            vaddr += PAGE_SIZE;
        }

        pinned.len = len;
        Ok(pinned)
    }

    /// Reads `len` bytes from user memory, pinning the covered pages for
    /// the duration of the copy.
    pub fn copy_from_user(&self, pid: Pid, ptr: usize, len: usize) -> Result<Vec<u8>, VmError> {
        let pinned = self.pin_user_range(pid, ptr, len)?;
        let mut data = vec![0u8; len];
        pinned.read(0, &mut data);
        Ok(data)
    }

    /// Writes `src` to user memory, pinning the covered pages for the
    /// duration of the copy.
    pub fn copy_to_user(&self, pid: Pid, ptr: usize, src: &[u8]) -> Result<(), VmError> {
        let pinned = self.pin_user_range(pid, ptr, src.len())?;
        pinned.write(0, src);
        Ok(())
    }

    /// Reads a NUL-terminated string from user memory, up to `max_len`
    /// content bytes. Pages are pinned incrementally while scanning; every
    /// page touched stays pinned until the terminator is found, then all
    /// are released together.
    pub fn read_user_cstr(&self, pid: Pid, ptr: usize, max_len: usize) -> Result<Vec<u8>, VmError> {
        if ptr == 0 {
            return Err(VmError::InvalidUserPointer(0));
        }

        let mut pinned = PinnedPages::empty(self, pid, ptr);
        let mut out = Vec::new();
        let mut addr = ptr;

        loop {
            if addr >= USER_LIMIT {
                return Err(VmError::InvalidUserPointer(addr));
            }

            let vaddr = page_base(addr);
            let frame = self.fault_and_pin(pid, vaddr)?;
            pinned.frames.push(frame);

            let in_page = page_offset(addr);
            let mut chunk = vec![0u8; PAGE_SIZE - in_page];
            {
                let ft = self.frames().lock().unwrap();
                chunk.copy_from_slice(&ft.frame_data(frame)[in_page..]);
            }
            self.translator()
                .lock()
                .unwrap()
                .mark_access(pid, vaddr, false);

            if let Some(nul) = chunk.iter().position(|b| *b == 0) {
                out.extend_from_slice(&chunk[..nul]);
                if out.len() > max_len {
                    return Err(VmError::InvalidUserPointer(ptr));
                }
                // guard drops here: all scanned pages release together
                return Ok(out);
            }

            out.extend_from_slice(&chunk);
            if out.len() > max_len {
                return Err(VmError::InvalidUserPointer(ptr));
            }
            addr = vaddr + PAGE_SIZE;
        }
    }
}
