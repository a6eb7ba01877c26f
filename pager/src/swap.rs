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

use std::sync::Mutex;

use log::{error, trace};

use crate::modules::block_device::BlockDeviceModule;
use crate::util::bit_array::BitArray;
use crate::{PAGE_SIZE, SECTORS_PER_PAGE, SECTOR_SIZE};

/// A page-sized slot on the swap device, identified by slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwapSlot(usize);

impl SwapSlot {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }

    fn first_sector(&self) -> usize {
        self.0 * SECTORS_PER_PAGE
    }
}

struct SwapInner<D: BlockDeviceModule> {
    device: D,
    /// One bit per sector; the `SECTORS_PER_PAGE` bits of a slot are only
    /// ever flipped together.
    sectors: BitArray,
    free_slots: usize,
}

/// Allocator and I/O front end for the swap block device. Slots are
/// page-sized groups of sectors, allocated and freed as one unit.
pub struct SwapStore<D: BlockDeviceModule> {
    inner: Mutex<SwapInner<D>>,
    slot_count: usize,
}

impl<D: BlockDeviceModule> SwapStore<D> {
    pub fn new(device: D) -> Self {
        let slot_count = device.sector_count() / SECTORS_PER_PAGE;
        trace!(
            "swap store: {} sectors -> {} page slots",
            device.sector_count(),
            slot_count
        );

        Self {
            inner: Mutex::new(SwapInner {
                device,
                sectors: BitArray::new(slot_count * SECTORS_PER_PAGE),
                free_slots: slot_count,
            }),
            slot_count,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn free_slots(&self) -> usize {
        self.inner.lock().unwrap().free_slots
    }

    /// Claims one slot by flipping all of its sector bits, or `None` if the
    /// device is full.
    pub fn allocate_slot(&self) -> Option<SwapSlot> {
        let mut inner = self.inner.lock().unwrap();

        for slot in 0..self.slot_count {
            let first = slot * SECTORS_PER_PAGE;
            if inner.sectors.none_set(first, SECTORS_PER_PAGE) {
                inner.sectors.set_range(first, SECTORS_PER_PAGE, true);
                inner.free_slots -= 1;
                trace!("swap: allocated slot {}", slot);
                return Some(SwapSlot(slot));
            }
        }

        None
    }

    pub fn free_slot(&self, slot: SwapSlot) {
        let mut inner = self.inner.lock().unwrap();

        debug_assert!(slot.index() < self.slot_count);
        debug_assert!(
            inner.sectors.all_set(slot.first_sector(), SECTORS_PER_PAGE),
            "freeing swap slot {} that is not fully allocated",
            slot.index()
        );

        inner
            .sectors
            .set_range(slot.first_sector(), SECTORS_PER_PAGE, false);
        inner.free_slots += 1;
        trace!("swap: freed slot {}", slot.index());
    }

    /// Reads one page from `slot` into `dest`. Returns false without touching
    /// the device unless every sector of the slot is currently allocated,
    /// which catches use-after-free of slots.
    pub fn read_slot(&self, slot: SwapSlot, dest: &mut [u8]) -> bool {
        debug_assert_eq!(dest.len(), PAGE_SIZE);
        let mut inner = self.inner.lock().unwrap();

        if slot.index() >= self.slot_count
            || !inner.sectors.all_set(slot.first_sector(), SECTORS_PER_PAGE)
        {
            error!("swap: read of unallocated slot {}", slot.index());
            return false;
        }

        for i in 0..SECTORS_PER_PAGE {
            let chunk = &mut dest[i * SECTOR_SIZE..(i + 1) * SECTOR_SIZE];
            if inner
                .device
                .read_sector(slot.first_sector() + i, chunk)
                .is_err()
            {
                error!("swap: device read failed, slot {}", slot.index());
                return false;
            }
        }

        true
    }

    /// Writes one page from `src` into `slot`, unconditionally.
    pub fn write_slot(&self, slot: SwapSlot, src: &[u8]) -> Result<(), ()> {
        debug_assert_eq!(src.len(), PAGE_SIZE);
        debug_assert!(slot.index() < self.slot_count);
        let mut inner = self.inner.lock().unwrap();

        for i in 0..SECTORS_PER_PAGE {
            let chunk = &src[i * SECTOR_SIZE..(i + 1) * SECTOR_SIZE];
            inner.device.write_sector(slot.first_sector() + i, chunk)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::modules::block_device::MemBlockDevice;

    fn get_test_swap(slots: usize) -> SwapStore<MemBlockDevice> {
        SwapStore::new(MemBlockDevice::new(slots * SECTORS_PER_PAGE))
    }

    #[test]
    fn test_capacity_from_device_size() {
        // a trailing partial slot is unusable
        let store = SwapStore::new(MemBlockDevice::new(3 * SECTORS_PER_PAGE + 2));
        assert_eq!(store.slot_count(), 3);
        assert_eq!(store.free_slots(), 3);
    }

    #[test]
    fn test_allocate_until_full() {
        let store = get_test_swap(4);

        let mut slots = Vec::new();
        for _ in 0..4 {
            slots.push(store.allocate_slot().unwrap());
        }
        assert!(store.allocate_slot().is_none());
        assert_eq!(store.free_slots(), 0);

        // distinct slots
        for (i, a) in slots.iter().enumerate() {
            for b in slots.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_no_leak_across_alloc_free_cycles() {
        let store = get_test_swap(4);

        for _ in 0..3 {
            let slots: Vec<_> = (0..4).map(|_| store.allocate_slot().unwrap()).collect();
            assert_eq!(store.free_slots(), 0);
            for slot in slots {
                store.free_slot(slot);
            }
            assert_eq!(store.free_slots(), 4);
        }
    }

    #[test]
    fn test_write_read_round_trip() {
        let store = get_test_swap(2);
        let a = store.allocate_slot().unwrap();
        let b = store.allocate_slot().unwrap();

        let page_a = [0x5au8; PAGE_SIZE];
        let page_b = [0xa5u8; PAGE_SIZE];
        store.write_slot(a, &page_a).unwrap();
        store.write_slot(b, &page_b).unwrap();

        let mut read = [0u8; PAGE_SIZE];
        assert!(store.read_slot(a, &mut read));
        assert_eq!(read, page_a);
        assert!(store.read_slot(b, &mut read));
        assert_eq!(read, page_b);
    }

    #[test]
    fn test_read_after_free_fails() {
        let store = get_test_swap(2);
        let slot = store.allocate_slot().unwrap();
        store.write_slot(slot, &[1u8; PAGE_SIZE]).unwrap();
        store.free_slot(slot);

        let mut read = [0u8; PAGE_SIZE];
        assert!(!store.read_slot(slot, &mut read));
    }
}
