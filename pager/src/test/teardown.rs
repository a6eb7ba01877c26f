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

use super::{get_test_vm, vaddr};
use crate::modules::address_translator::AddressTranslatorModule;
use crate::PAGE_SIZE;

#[test]
fn test_teardown_releases_frames_and_swap() {
    let vm = get_test_vm(4, 16);

    // pid 1 dirties four pages, pid 2 two; the pool holds four, so some
    // of pid 1's pages end up in swap
    for i in 0..4 {
        vm.map_zero(1, vaddr(i), true);
        vm.copy_to_user(1, vaddr(i), &[i as u8 + 1; PAGE_SIZE]).unwrap();
    }
    for i in 0..2 {
        vm.map_zero(2, vaddr(i), true);
        vm.copy_to_user(2, vaddr(i), &[0xb0 + i as u8; 64]).unwrap();
    }

    assert_eq!(vm.free_frames(), 0);
    assert!(vm.swap().free_slots() < vm.swap().slot_count());

    vm.teardown_process(1);

    // every record of pid 1 is gone and its swap slots are retired
    for i in 0..4 {
        assert_eq!(vm.page_table().get_kind(1, vaddr(i)), None);
        assert!(vm
            .translator()
            .lock()
            .unwrap()
            .translate(1, vaddr(i))
            .is_none());
    }
    assert_eq!(vm.swap().free_slots(), vm.swap().slot_count());
    assert_eq!(vm.free_frames(), 2);

    // pid 2 is untouched
    for i in 0..2 {
        let data = vm.copy_from_user(2, vaddr(i), 64).unwrap();
        assert_eq!(data, vec![0xb0 + i as u8; 64]);
    }
}

#[test]
fn test_teardown_of_unknown_pid_is_harmless() {
    let vm = get_test_vm(2, 8);
    vm.map_zero(1, vaddr(0), true);
    vm.copy_to_user(1, vaddr(0), &[7; 16]).unwrap();

    vm.teardown_process(99);

    let data = vm.copy_from_user(1, vaddr(0), 16).unwrap();
    assert_eq!(data, vec![7; 16]);
}

#[test]
fn test_teardown_twice_is_idempotent() {
    let vm = get_test_vm(2, 8);
    vm.map_zero(1, vaddr(0), true);
    vm.copy_to_user(1, vaddr(0), &[9; 16]).unwrap();

    vm.teardown_process(1);
    vm.teardown_process(1);

    assert_eq!(vm.free_frames(), 2);
    assert_eq!(vm.page_table().get_kind(1, vaddr(0)), None);
}
