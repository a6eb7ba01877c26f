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

use super::AddressTranslatorModule;
use crate::{util::page_offset, Pid};

struct SoftMapping {
    frame: usize,
    writable: bool,
    accessed: bool,
    dirty: bool,
}

/// Software stand-in for the MMU: a per-(pid, page) map with accessed and
/// dirty bits maintained through `mark_access`.
pub struct SoftAddressTranslator {
    mappings: HashMap<(Pid, usize), SoftMapping>,
}

impl SoftAddressTranslator {
    pub fn new() -> Self {
        Self {
            mappings: HashMap::new(),
        }
    }
}

impl Default for SoftAddressTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressTranslatorModule for SoftAddressTranslator {
    fn map(&mut self, pid: Pid, vaddr: usize, frame: usize, writable: bool) -> Result<(), ()> {
        debug_assert_eq!(page_offset(vaddr), 0);

        let old = self.mappings.insert(
            (pid, vaddr),
            SoftMapping {
                frame,
                writable,
                accessed: false,
                dirty: false,
            },
        );
        debug_assert!(
            old.is_none(),
            "double mapping: pid {} vaddr {:#x}",
            pid,
            vaddr
        );
        Ok(())
    }

    fn unmap(&mut self, pid: Pid, vaddr: usize) {
        debug_assert_eq!(page_offset(vaddr), 0);
        self.mappings.remove(&(pid, vaddr));
    }

    fn translate(&self, pid: Pid, vaddr: usize) -> Option<usize> {
        self.mappings.get(&(pid, vaddr)).map(|m| m.frame)
    }

    fn is_accessed(&self, pid: Pid, vaddr: usize) -> bool {
        self.mappings
            .get(&(pid, vaddr))
            .map(|m| m.accessed)
            .unwrap_or(false)
    }

    fn clear_accessed(&mut self, pid: Pid, vaddr: usize) {
        if let Some(mapping) = self.mappings.get_mut(&(pid, vaddr)) {
            mapping.accessed = false;
        }
    }

    fn is_dirty(&self, pid: Pid, vaddr: usize) -> bool {
        self.mappings
            .get(&(pid, vaddr))
            .map(|m| m.dirty)
            .unwrap_or(false)
    }

    fn mark_access(&mut self, pid: Pid, vaddr: usize, write: bool) {
        if let Some(mapping) = self.mappings.get_mut(&(pid, vaddr)) {
            debug_assert!(mapping.writable || !write, "write to read-only page");
            mapping.accessed = true;
            if write {
                mapping.dirty = true;
            }
        }
    }

    fn clear_process(&mut self, pid: Pid) {
        self.mappings.retain(|(owner, _), _| *owner != pid);
    }
}
