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

use crate::modules::address_translator::SoftAddressTranslator;
use crate::modules::block_device::MemBlockDevice;
use crate::modules::file_store::MemFileStore;
use crate::{Vm, VmConfig, PAGE_SIZE, SECTORS_PER_PAGE};

mod teardown;

pub(crate) type TestVm = Vm<SoftAddressTranslator, MemBlockDevice, MemFileStore>;

pub(crate) fn get_test_vm(frames: usize, swap_slots: usize) -> TestVm {
    get_test_vm_with_config(frames, swap_slots, VmConfig::default())
}

pub(crate) fn get_test_vm_with_config(
    frames: usize,
    swap_slots: usize,
    config: VmConfig,
) -> TestVm {
    let _ = env_logger::builder().is_test(true).try_init();

    Vm::new(
        SoftAddressTranslator::new(),
        MemBlockDevice::new(swap_slots * SECTORS_PER_PAGE),
        MemFileStore::new(),
        frames,
        config,
    )
}

/// Page-aligned user address of test page `n` (page 0 of the address space
/// is left out, null must stay invalid).
pub(crate) fn vaddr(n: usize) -> usize {
    (n + 1) * PAGE_SIZE
}
