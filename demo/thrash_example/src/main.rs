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

//! Thrashing demo: two processes share a frame pool far smaller than their
//! working set, with swap on a backing file. Run with RUST_LOG=debug to
//! watch the eviction traffic.

use std::thread;

use env_logger::{Builder, Env};
use log::info;

use pager::modules::address_translator::SoftAddressTranslator;
use pager::modules::block_device::FileBlockDevice;
use pager::modules::file_store::MemFileStore;
use pager::{Pid, Vm, VmConfig, PAGE_SIZE, SECTORS_PER_PAGE};

const FRAMES: usize = 8;
const SWAP_SLOTS: usize = 128;
const PAGES_PER_PID: usize = 32;
const ROUNDS: u8 = 8;

type DemoVm = Vm<SoftAddressTranslator, FileBlockDevice, MemFileStore>;

fn main() {
    Builder::from_env(Env::default())
        .format_module_path(false)
        .init();

    let swap_device = FileBlockDevice::new(
        "thrash_swap.data".into(),
        SWAP_SLOTS * SECTORS_PER_PAGE,
    )
    .unwrap();

    let vm = Vm::new(
        SoftAddressTranslator::new(),
        swap_device,
        MemFileStore::new(),
        FRAMES,
        VmConfig {
            pipelined_eviction_io: true,
        },
    );

    info!(
        "{} frames for 2 processes x {} pages each",
        FRAMES, PAGES_PER_PID
    );

    thread::scope(|s| {
        let vm = &vm;
        for pid in 1..=2 {
            s.spawn(move || run_process(vm, pid));
        }
    });

    info!(
        "done: {} of {} frames free, {} of {} swap slots free",
        vm.free_frames(),
        vm.total_frames(),
        vm.swap().free_slots(),
        vm.swap().slot_count()
    );

    assert_eq!(vm.free_frames(), vm.total_frames());
    assert_eq!(vm.swap().free_slots(), vm.swap().slot_count());
    info!("all resources reclaimed");
}

fn run_process(vm: &DemoVm, pid: Pid) {
    for page in 0..PAGES_PER_PID {
        vm.map_zero(pid, page_addr(page), true);
    }

    for round in 0..ROUNDS {
        for page in 0..PAGES_PER_PID {
            let fill = fill_byte(pid, page, round);
            vm.copy_to_user(pid, page_addr(page), &[fill; PAGE_SIZE])
                .unwrap();
        }
        for page in 0..PAGES_PER_PID {
            let fill = fill_byte(pid, page, round);
            let data = vm.copy_from_user(pid, page_addr(page), PAGE_SIZE).unwrap();
            assert!(data.iter().all(|b| *b == fill));
        }
        info!("pid {}: round {} verified", pid, round);
    }

    vm.teardown_process(pid);
}

fn page_addr(page: usize) -> usize {
    (page + 1) * PAGE_SIZE
}

fn fill_byte(pid: Pid, page: usize, round: u8) -> u8 {
    (pid as u8).wrapping_mul(97) ^ (page as u8) ^ round
}
