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

use super::BlockDeviceModule;
use crate::SECTOR_SIZE;

/// In-memory block device, used by tests and the hosted demo.
pub struct MemBlockDevice {
    data: Vec<u8>,
    sector_count: usize,
}

impl MemBlockDevice {
    pub fn new(sector_count: usize) -> Self {
        Self {
            data: vec![0u8; sector_count * SECTOR_SIZE],
            sector_count,
        }
    }
}

impl BlockDeviceModule for MemBlockDevice {
    fn sector_count(&self) -> usize {
        self.sector_count
    }

    fn read_sector(&mut self, sector: usize, dest: &mut [u8]) -> Result<(), ()> {
        debug_assert!(sector < self.sector_count);
        debug_assert_eq!(dest.len(), SECTOR_SIZE);

        let start = sector * SECTOR_SIZE;
        dest.copy_from_slice(&self.data[start..start + SECTOR_SIZE]);
        Ok(())
    }

    fn write_sector(&mut self, sector: usize, src: &[u8]) -> Result<(), ()> {
        debug_assert!(sector < self.sector_count);
        debug_assert_eq!(src.len(), SECTOR_SIZE);

        let start = sector * SECTOR_SIZE;
        self.data[start..start + SECTOR_SIZE].copy_from_slice(src);
        Ok(())
    }
}
