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

use super::{FileHandle, FileStoreModule};

/// In-memory file store: named byte vectors behind stable handles.
///
/// `close` deliberately keeps the contents around so a later `open` of the
/// same name sees them again, like a real filesystem would.
pub struct MemFileStore {
    names: HashMap<String, FileHandle>,
    contents: HashMap<FileHandle, Vec<u8>>,
    next_handle: FileHandle,
}

impl MemFileStore {
    pub fn new() -> Self {
        Self {
            names: HashMap::new(),
            contents: HashMap::new(),
            next_handle: 1,
        }
    }

    /// Creates (or replaces) a file with the given contents. Test setup helper.
    pub fn create(&mut self, name: &str, contents: &[u8]) -> FileHandle {
        let handle = match self.names.get(name) {
            Some(handle) => *handle,
            None => {
                let handle = self.next_handle;
                self.next_handle += 1;
                self.names.insert(name.to_string(), handle);
                handle
            }
        };
        self.contents.insert(handle, contents.to_vec());
        handle
    }
}

impl Default for MemFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStoreModule for MemFileStore {
    fn open(&mut self, name: &str) -> Result<FileHandle, ()> {
        match self.names.get(name) {
            Some(handle) => Ok(*handle),
            None => {
                let handle = self.create(name, &[]);
                Ok(handle)
            }
        }
    }

    fn close(&mut self, _handle: FileHandle) {}

    fn len(&mut self, handle: FileHandle) -> Result<usize, ()> {
        self.contents.get(&handle).map(|data| data.len()).ok_or(())
    }

    fn read_at(&mut self, handle: FileHandle, offset: usize, dest: &mut [u8]) -> Result<usize, ()> {
        let data = self.contents.get(&handle).ok_or(())?;
        if offset >= data.len() {
            return Ok(0);
        }

        let count = dest.len().min(data.len() - offset);
        dest[..count].copy_from_slice(&data[offset..offset + count]);
        Ok(count)
    }

    fn write_at(&mut self, handle: FileHandle, offset: usize, src: &[u8]) -> Result<(), ()> {
        let data = self.contents.get_mut(&handle).ok_or(())?;
        let end = offset + src.len();
        if end > data.len() {
            data.resize(end, 0);
        }
        data[offset..end].copy_from_slice(src);
        Ok(())
    }
}
