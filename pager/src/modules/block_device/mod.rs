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

mod file_device;
mod mem_device;

pub use file_device::FileBlockDevice;
pub use mem_device::MemBlockDevice;

use crate::SECTOR_SIZE;

/// A fixed-geometry block device addressed by sector index.
///
/// All calls block until the I/O is complete; there is no queueing and no
/// cancellation. Accessing a sector at or past `sector_count()` is illegal.
pub trait BlockDeviceModule {
    /// Number of `SECTOR_SIZE` sectors this device holds.
    fn sector_count(&self) -> usize;

    /// Reads one sector into `dest`, which must be exactly `SECTOR_SIZE` bytes.
    fn read_sector(&mut self, sector: usize, dest: &mut [u8]) -> Result<(), ()>;

    /// Writes one sector from `src`, which must be exactly `SECTOR_SIZE` bytes.
    fn write_sector(&mut self, sector: usize, src: &[u8]) -> Result<(), ()>;
}
