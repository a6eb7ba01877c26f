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

mod mem_store;

pub use mem_store::MemFileStore;

/// Opaque handle to an open file, issued by the file store.
pub type FileHandle = u32;

/// The filesystem collaborator as seen by file-backed pages: handle-based,
/// byte-range reads and writes, no directory semantics.
pub trait FileStoreModule {
    /// Opens `name`, creating an empty file if it does not exist.
    fn open(&mut self, name: &str) -> Result<FileHandle, ()>;

    fn close(&mut self, handle: FileHandle);

    fn len(&mut self, handle: FileHandle) -> Result<usize, ()>;

    /// Reads up to `dest.len()` bytes starting at `offset` and returns the
    /// number of bytes read. A short read past end-of-file is not an error.
    fn read_at(&mut self, handle: FileHandle, offset: usize, dest: &mut [u8]) -> Result<usize, ()>;

    /// Writes all of `src` at `offset`, growing the file if needed.
    fn write_at(&mut self, handle: FileHandle, offset: usize, src: &[u8]) -> Result<(), ()>;
}

#[cfg(test)]
pub(crate) mod test {
    use super::{FileStoreModule, MemFileStore};

    pub(super) fn test_file_store_generic<F: FileStoreModule>(mut store: F) {
        let handle = store.open("pages.bin").unwrap();
        assert_eq!(store.len(handle).unwrap(), 0);

        store.write_at(handle, 0, b"hello world").unwrap();
        assert_eq!(store.len(handle).unwrap(), 11);

        let mut buf = [0u8; 5];
        assert_eq!(store.read_at(handle, 6, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"world");

        // short read at end of file
        let mut buf = [0u8; 16];
        assert_eq!(store.read_at(handle, 6, &mut buf).unwrap(), 5);
        assert_eq!(store.read_at(handle, 11, &mut buf).unwrap(), 0);

        // writing past the end grows the file with a zero gap
        store.write_at(handle, 20, b"!").unwrap();
        assert_eq!(store.len(handle).unwrap(), 21);
        let mut buf = [0xffu8; 4];
        assert_eq!(store.read_at(handle, 11, &mut buf).unwrap(), 4);
        assert_eq!(&buf, &[0, 0, 0, 0]);

        // reopening by name yields the same file
        let again = store.open("pages.bin").unwrap();
        assert_eq!(store.len(again).unwrap(), 21);

        store.close(handle);
        store.close(again);
    }

    #[test]
    fn test_mem_file_store() {
        test_file_store_generic(MemFileStore::new());
    }

    #[test]
    fn test_mem_file_store_separate_files() {
        let mut store = MemFileStore::new();
        let a = store.open("a").unwrap();
        let b = store.open("b").unwrap();
        assert_ne!(a, b);

        store.write_at(a, 0, b"aaaa").unwrap();
        store.write_at(b, 0, b"bb").unwrap();
        assert_eq!(store.len(a).unwrap(), 4);
        assert_eq!(store.len(b).unwrap(), 2);
    }
}
