//! # Address Space and the Walk
//!
//! An [`AddressSpace`] is an explicit handle to **one** translation
//! hierarchy, rooted at a PML4 frame. Nothing here reaches for ambient
//! state ("the current address space"); every operation names its handle,
//! which is also what makes multiple spaces testable side by side.
//!
//! ## Design
//!
//! - [`walk`](AddressSpace::walk) is the single walk routine. The mode
//!   decides what an absent intermediate level means:
//!   [`WalkMode::Create`] materializes it (zeroed table from the carried
//!   allocator), [`WalkMode::Probe`] stops with
//!   [`WalkError::LevelAbsent`].
//! - The walk returns the **leaf slot**, not a populated mapping: the
//!   slot may well be non-present. Deciding what to put there (or take
//!   out of there) is the engine's job.
//! - New intermediate tables are zeroed **before** being linked, so a
//!   failed create-mode walk never leaves a half-linked path; at worst
//!   some fully-linked empty tables remain, which later walks reuse.
//!
//! ## Safety
//!
//! Mutating entries of the *active* hierarchy requires TLB maintenance
//! (see [`TlbInvalidate`](crate::TlbInvalidate)); the walker itself never
//! touches the TLB.

use crate::entry::PageEntryBits;
use crate::table::Level;
use crate::{FrameAlloc, PhysMapper, table_at};
use memgrant_addresses::{PAGE_SIZE, PhysicalFrame, VirtualPage};

/// How [`AddressSpace::walk`] treats an absent intermediate level.
///
/// `Create` carries the frame allocator it may need; `Probe` is
/// statically unable to allocate, which is the point: the FREE path must
/// prove a level exists before dereferencing into it.
pub enum WalkMode<'a, A: FrameAlloc> {
    /// Materialize absent levels as zeroed tables from this allocator.
    Create(&'a mut A),
    /// Report the first absent level; never allocate, never mutate.
    Probe,
}

/// Failure modes of [`AddressSpace::walk`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalkError {
    /// Create mode could not obtain a frame for a new table at `{0}`.
    #[error("no frame available for a new {0} table")]
    TableAllocFailed(Level),
    /// Probe mode found the path absent at `{0}`; for probing callers
    /// this simply means "nothing mapped down there".
    #[error("translation path absent at {0}")]
    LevelAbsent(Level),
}

/// A [`FrameAlloc`] that never allocates, for probe-only walk call sites.
pub struct NoAlloc;

impl FrameAlloc for NoAlloc {
    fn alloc_4k(&mut self) -> Option<PhysicalFrame> {
        None
    }
}

/// Handle to a single, concrete address space.
///
/// Holds the root (PML4) frame and the [`PhysMapper`] used to view table
/// frames. The hierarchy itself lives in the caller's physical memory;
/// this handle owns none of it.
pub struct AddressSpace<'m, M: PhysMapper> {
    root: PhysicalFrame,
    mapper: &'m M,
}

impl<'m, M: PhysMapper> AddressSpace<'m, M> {
    /// Wrap an existing root frame.
    ///
    /// The frame must already hold a valid (possibly empty) PML4; use
    /// [`zero_frame`](Self::zero_frame) first when bootstrapping a fresh
    /// space.
    #[inline]
    pub const fn from_root(mapper: &'m M, root: PhysicalFrame) -> Self {
        Self { root, mapper }
    }

    /// The PML4 frame of this space.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> PhysicalFrame {
        self.root
    }

    /// Zero-fill one frame through the mapper.
    ///
    /// Used for fresh table frames and for frames handed out to callers
    /// (a granted frame must read as zeros).
    #[inline]
    pub fn zero_frame(&self, frame: PhysicalFrame) {
        // SAFETY: the mapper contract gives us a writable view of the
        // frame; a byte array carries no validity requirements.
        let bytes: &mut [u8; PAGE_SIZE as usize] =
            unsafe { self.mapper.phys_to_mut(frame.base()) };
        bytes.fill(0);
    }

    /// Walk the hierarchy to the leaf slot for `page`.
    ///
    /// Returns a reference to the PT entry, present or not. In
    /// [`WalkMode::Create`], absent intermediate levels are materialized
    /// as zeroed tables; in [`WalkMode::Probe`], the first absent level
    /// aborts the walk with [`WalkError::LevelAbsent`].
    ///
    /// # Errors
    /// - [`WalkError::TableAllocFailed`] (create mode) when the allocator
    ///   cannot supply a table frame. Levels created before the failure
    ///   stay linked and empty.
    /// - [`WalkError::LevelAbsent`] (probe mode) at the first hole.
    pub fn walk<A: FrameAlloc>(
        &self,
        page: VirtualPage,
        mode: WalkMode<'_, A>,
    ) -> Result<&'m mut PageEntryBits, WalkError> {
        let va = page.base();
        let mut create = match mode {
            WalkMode::Create(alloc) => Some(alloc),
            WalkMode::Probe => None,
        };

        let mut table = self.root;
        for level in Level::NON_LEAF {
            // SAFETY: `table` is the root or came out of a present
            // non-leaf entry, both of which name table frames.
            let slot = unsafe { table_at(self.mapper, table) }.entry_mut(level.index_of(va));
            if slot.present() {
                table = slot.frame();
            } else if let Some(alloc) = create.as_mut() {
                let frame = alloc
                    .alloc_4k()
                    .ok_or(WalkError::TableAllocFailed(level))?;
                self.zero_frame(frame);
                *slot = PageEntryBits::new_table(frame);
                log::trace!("materialized {level} table at {frame} for {page}");
                table = frame;
            } else {
                return Err(WalkError::LevelAbsent(level));
            }
        }

        // SAFETY: as above; `table` now names the PT frame.
        Ok(unsafe { table_at(self.mapper, table) }.entry_mut(Level::Pt.index_of(va)))
    }

    /// Probe-mode walk without naming an allocator type at the call site.
    ///
    /// # Errors
    /// [`WalkError::LevelAbsent`] at the first absent level.
    #[inline]
    pub fn probe_slot(&self, page: VirtualPage) -> Result<&'m mut PageEntryBits, WalkError> {
        self.walk::<NoAlloc>(page, WalkMode::Probe)
    }

    /// Whether `page` currently has a present leaf translation.
    ///
    /// Absent intermediate levels count as "not mapped"; this never
    /// creates and never faults.
    #[must_use]
    pub fn is_mapped(&self, page: VirtualPage) -> bool {
        match self.probe_slot(page) {
            Ok(slot) => slot.present(),
            Err(_) => false,
        }
    }

    /// The frame and entry bits `page` translates to, if mapped.
    #[must_use]
    pub fn translate(&self, page: VirtualPage) -> Option<(PhysicalFrame, PageEntryBits)> {
        let slot = self.probe_slot(page).ok()?;
        slot.present().then(|| (slot.frame(), *slot))
    }
}
