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

use std::{
    fs::{remove_file, File},
    io::{Read, Seek, Write},
    mem::ManuallyDrop,
    path::Path,
};

use super::BlockDeviceModule;
use crate::SECTOR_SIZE;

/// Block device backed by an ordinary file, sector-addressed.
///
/// The backing file is removed again when the device is dropped.
pub struct FileBlockDevice {
    /// underlying file holding the sectors
    file: ManuallyDrop<File>,

    /// path of file, save for deleting file later
    file_path: String,

    sector_count: usize,
}

impl FileBlockDevice {
    pub fn new(filepath: String, sector_count: usize) -> std::io::Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .truncate(true)
            .create(true)
            .open(filepath.clone())?;

        file.set_len((sector_count * SECTOR_SIZE) as u64)?;

        Ok(Self {
            file: ManuallyDrop::new(file),
            file_path: filepath,
            sector_count,
        })
    }
}

impl BlockDeviceModule for FileBlockDevice {
    fn sector_count(&self) -> usize {
        self.sector_count
    }

    fn read_sector(&mut self, sector: usize, dest: &mut [u8]) -> Result<(), ()> {
        debug_assert!(
            sector < self.sector_count,
            "illegal access, sector: {}, sector_count: {}",
            sector,
            self.sector_count
        );
        debug_assert_eq!(dest.len(), SECTOR_SIZE);

        self.file
            .seek(std::io::SeekFrom::Start((sector * SECTOR_SIZE) as u64))
            .map_err(|_| ())?;
        self.file.read_exact(dest).map_err(|_| ())?;

        Ok(())
    }

    fn write_sector(&mut self, sector: usize, src: &[u8]) -> Result<(), ()> {
        debug_assert!(
            sector < self.sector_count,
            "illegal access, sector: {}, sector_count: {}",
            sector,
            self.sector_count
        );
        debug_assert_eq!(src.len(), SECTOR_SIZE);

        self.file
            .seek(std::io::SeekFrom::Start((sector * SECTOR_SIZE) as u64))
            .map_err(|_| ())?;
        self.file.write_all(src).map_err(|_| ())?;

        Ok(())
    }
}

impl Drop for FileBlockDevice {
    fn drop(&mut self) {
        // drop and close file before removing
        // note that after this call, file should never be accessed again...
        unsafe {
            ManuallyDrop::drop(&mut self.file);
        }

        if Path::new(self.file_path.as_str()).exists() {
            let _ = remove_file(self.file_path.as_str());
        }
    }
}
