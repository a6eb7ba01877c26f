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

#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Perform the swap-out write of an eviction after releasing the
    /// frame-table lock, from a copy of the victim page.
    ///
    /// Off by default: writing while holding the lock serializes every
    /// other frame operation for the duration of the device I/O.
    pub pipelined_eviction_io: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            pipelined_eviction_io: false,
        }
    }
}
