use alloc::vec::Vec;
use memgrant_addresses::PhysicalFrame;
use memgrant_vmem::FrameAlloc;

/// A [`FrameAlloc`] that can also take frames back.
///
/// This is the only memory resource the engine owns outside the page
/// tables themselves: ALLOCATE draws leaf frames (and intermediate-table
/// frames) from here, FREE returns leaf frames here. Intermediate tables
/// are never returned (documented leak at this scope).
pub trait FramePool: FrameAlloc {
    /// Return a frame to the pool.
    ///
    /// The frame must have come out of this pool and must no longer be
    /// referenced by any leaf entry.
    fn free_4k(&mut self, frame: PhysicalFrame);

    /// Frames currently available for allocation.
    fn available(&self) -> usize;
}

/// A pool over a contiguous physical frame range with a recycle stack.
///
/// Fresh frames come from a bump cursor over `[start, end)`; released
/// frames are pushed onto a stack and handed out again first. No
/// coalescing is needed at frame granularity.
pub struct RangeFramePool {
    /// Next never-allocated frame index.
    next: u64,
    /// Exclusive end frame index.
    end: u64,
    /// Released frames, reused LIFO.
    recycled: Vec<PhysicalFrame>,
}

impl RangeFramePool {
    /// Pool over `frames` frames starting at `start`.
    #[must_use]
    pub const fn new(start: PhysicalFrame, frames: u64) -> Self {
        Self {
            next: start.index(),
            end: start.index() + frames,
            recycled: Vec::new(),
        }
    }
}

impl FrameAlloc for RangeFramePool {
    fn alloc_4k(&mut self) -> Option<PhysicalFrame> {
        if let Some(frame) = self.recycled.pop() {
            return Some(frame);
        }
        if self.next >= self.end {
            return None;
        }
        let frame = PhysicalFrame::from_index(self.next);
        self.next += 1;
        Some(frame)
    }
}

impl FramePool for RangeFramePool {
    fn free_4k(&mut self, frame: PhysicalFrame) {
        debug_assert!(
            frame.index() < self.next,
            "frame was never handed out by this pool"
        );
        self.recycled.push(frame);
    }

    fn available(&self) -> usize {
        self.recycled.len() + usize::try_from(self.end - self.next).unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_then_recycle() {
        let mut pool = RangeFramePool::new(PhysicalFrame::from_index(8), 2);
        assert_eq!(pool.available(), 2);

        let a = pool.alloc_4k().unwrap();
        let b = pool.alloc_4k().unwrap();
        assert_eq!(a.index(), 8);
        assert_eq!(b.index(), 9);
        assert!(pool.alloc_4k().is_none());

        pool.free_4k(a);
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.alloc_4k(), Some(a));
    }
}
