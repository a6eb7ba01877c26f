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

use crate::{Pid, PAGE_SIZE};

struct FrameEntry {
    /// Owning (process, virtual page) while present.
    owner: Option<(Pid, usize)>,
    present: bool,
    #[cfg(not(feature = "boolean_pin"))]
    pins: u32,
    #[cfg(feature = "boolean_pin")]
    pinned: bool,
}

impl FrameEntry {
    fn new() -> Self {
        Self {
            owner: None,
            present: false,
            #[cfg(not(feature = "boolean_pin"))]
            pins: 0,
            #[cfg(feature = "boolean_pin")]
            pinned: false,
        }
    }

    fn is_pinned(&self) -> bool {
        #[cfg(not(feature = "boolean_pin"))]
        {
            self.pins > 0
        }
        #[cfg(feature = "boolean_pin")]
        {
            self.pinned
        }
    }
}

/// Bookkeeping for the physical frame pool: which frame backs which
/// (process, virtual page), which frames are free, and the clock hand.
///
/// The table also owns the frame bytes themselves; all lookups go by frame
/// index, never by address arithmetic. The table is not internally
/// synchronized — [`crate::Vm`] wraps it in the frame-table mutex.
///
/// A frame popped via [`FrameTable::take_free`] but not yet handed to
/// [`FrameTable::set_owner`] is *claimed*: it is neither free nor visible
/// to the eviction sweep.
pub struct FrameTable {
    entries: Vec<FrameEntry>,
    data: Box<[u8]>,
    free: Vec<usize>,
    cursor: usize,
}

impl FrameTable {
    pub fn new(total_frames: usize) -> Self {
        assert!(total_frames > 0);

        Self {
            entries: (0..total_frames).map(|_| FrameEntry::new()).collect(),
            data: vec![0u8; total_frames * PAGE_SIZE].into_boxed_slice(),
            // reversed so frame 0 is handed out first
            free: (0..total_frames).rev().collect(),
            cursor: 0,
        }
    }

    pub fn total_frames(&self) -> usize {
        self.entries.len()
    }

    pub fn free_frames(&self) -> usize {
        self.free.len()
    }

    /// Claims a frame from the free pool, if any.
    pub fn take_free(&mut self) -> Option<usize> {
        self.free.pop()
    }

    /// Records `(pid, vaddr)` as the owner and marks the frame present.
    pub fn set_owner(&mut self, frame: usize, pid: Pid, vaddr: usize) {
        let entry = &mut self.entries[frame];
        debug_assert!(!entry.present, "frame {} already present", frame);
        entry.owner = Some((pid, vaddr));
        entry.present = true;
    }

    /// The owning (pid, vaddr) of a present frame; `None` for free or
    /// claimed frames.
    pub fn owner(&self, frame: usize) -> Option<(Pid, usize)> {
        let entry = &self.entries[frame];
        if entry.present {
            entry.owner
        } else {
            None
        }
    }

    /// Clears presence and ownership without returning the frame to the
    /// free pool; the caller is repurposing it (eviction).
    pub fn invalidate(&mut self, frame: usize) {
        let entry = &mut self.entries[frame];
        debug_assert!(entry.present);
        debug_assert!(!entry.is_pinned(), "invalidating pinned frame {}", frame);
        entry.owner = None;
        entry.present = false;
    }

    /// Returns the frame to the free pool. Memory is not zeroed here; stale
    /// bytes are only exposed again through a zero-fill or an explicit fill.
    pub fn release(&mut self, frame: usize) {
        let entry = &mut self.entries[frame];
        debug_assert!(!entry.is_pinned(), "releasing pinned frame {}", frame);
        entry.owner = None;
        entry.present = false;
        debug_assert!(!self.free.contains(&frame));
        self.free.push(frame);
    }

    pub fn pin(&mut self, frame: usize) {
        let entry = &mut self.entries[frame];
        #[cfg(not(feature = "boolean_pin"))]
        {
            entry.pins += 1;
        }
        #[cfg(feature = "boolean_pin")]
        {
            entry.pinned = true;
        }
    }

    pub fn unpin(&mut self, frame: usize) {
        let entry = &mut self.entries[frame];
        #[cfg(not(feature = "boolean_pin"))]
        {
            debug_assert!(entry.pins > 0, "unpin of unpinned frame {}", frame);
            entry.pins -= 1;
        }
        #[cfg(feature = "boolean_pin")]
        {
            entry.pinned = false;
        }
    }

    pub fn is_pinned(&self, frame: usize) -> bool {
        self.entries[frame].is_pinned()
    }

    pub fn frame_data(&self, frame: usize) -> &[u8] {
        &self.data[frame * PAGE_SIZE..(frame + 1) * PAGE_SIZE]
    }

    pub fn frame_data_mut(&mut self, frame: usize) -> &mut [u8] {
        &mut self.data[frame * PAGE_SIZE..(frame + 1) * PAGE_SIZE]
    }

    pub fn zero_frame(&mut self, frame: usize) {
        self.frame_data_mut(frame).fill(0);
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn advance_cursor(&mut self) {
        self.cursor = (self.cursor + 1) % self.entries.len();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_free_pool_bookkeeping() {
        let mut table = FrameTable::new(3);
        assert_eq!(table.total_frames(), 3);
        assert_eq!(table.free_frames(), 3);

        let a = table.take_free().unwrap();
        assert_eq!(a, 0);
        let b = table.take_free().unwrap();
        let c = table.take_free().unwrap();
        assert_eq!(table.free_frames(), 0);
        assert!(table.take_free().is_none());

        // claimed but unowned: invisible to owner()
        assert_eq!(table.owner(a), None);

        table.set_owner(a, 1, PAGE_SIZE);
        assert_eq!(table.owner(a), Some((1, PAGE_SIZE)));

        table.release(b);
        table.release(c);
        assert_eq!(table.free_frames(), 2);
    }

    #[test]
    fn test_invalidate_keeps_frame_out_of_pool() {
        let mut table = FrameTable::new(2);
        let frame = table.take_free().unwrap();
        table.set_owner(frame, 1, PAGE_SIZE);

        table.invalidate(frame);
        assert_eq!(table.owner(frame), None);
        // still claimed, not free
        assert_eq!(table.free_frames(), 1);
    }

    #[test]
    fn test_frame_data_isolation() {
        let mut table = FrameTable::new(2);
        table.frame_data_mut(0).fill(0xaa);
        table.frame_data_mut(1).fill(0xbb);
        assert!(table.frame_data(0).iter().all(|b| *b == 0xaa));
        assert!(table.frame_data(1).iter().all(|b| *b == 0xbb));

        table.zero_frame(0);
        assert!(table.frame_data(0).iter().all(|b| *b == 0));
        assert!(table.frame_data(1).iter().all(|b| *b == 0xbb));
    }

    #[cfg(not(feature = "boolean_pin"))]
    #[test]
    fn test_counted_pins_nest() {
        let mut table = FrameTable::new(1);
        let frame = table.take_free().unwrap();
        table.set_owner(frame, 1, PAGE_SIZE);

        table.pin(frame);
        table.pin(frame);
        table.unpin(frame);
        // still pinned: the outer user has not released it
        assert!(table.is_pinned(frame));
        table.unpin(frame);
        assert!(!table.is_pinned(frame));
    }

    #[cfg(feature = "boolean_pin")]
    #[test]
    fn test_boolean_pin_does_not_nest() {
        let mut table = FrameTable::new(1);
        let frame = table.take_free().unwrap();
        table.set_owner(frame, 1, PAGE_SIZE);

        table.pin(frame);
        table.pin(frame);
        table.unpin(frame);
        // overlap hazard of the flag semantics: one unpin clears every pin
        assert!(!table.is_pinned(frame));
    }

    #[test]
    fn test_cursor_wraps() {
        let mut table = FrameTable::new(3);
        assert_eq!(table.cursor(), 0);
        for _ in 0..3 {
            table.advance_cursor();
        }
        assert_eq!(table.cursor(), 0);
    }
}
