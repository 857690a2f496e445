//! # Translation Hierarchy and Page-Table Walker
//!
//! Models the four-level x86-64 translation hierarchy and provides the one
//! walk routine the grant engine is built on.
//!
//! ## What you get
//! - [`PageEntryBits`]: a 64-bit page-table entry as a typed bitfield.
//! - [`PageTable`]: a 4 KiB-aligned array of 512 entries, uniform across
//!   all four levels.
//! - [`Level`]: the four translation levels with per-level virtual-address
//!   index extraction.
//! - [`AddressSpace`]: an explicit handle to one hierarchy (rooted at a
//!   PML4 frame) with [`walk`](AddressSpace::walk), mapping probes, and
//!   translation.
//! - Seams for the environment: [`FrameAlloc`] (table frames) and
//!   [`PhysMapper`] (physical frame → usable pointer), so the same code
//!   runs against real RAM in a kernel and against simulated RAM in tests.
//! - [`TlbInvalidate`]: per-page translation-cache maintenance.
//!
//! ## The walk
//!
//! A 48-bit virtual address splits into four 9-bit table indices plus a
//! 12-bit offset:
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  PML4 |  PDPT |   PD  |   PT  | Offset |
//! ```
//!
//! Each index selects one of 512 entries at its level; a present non-leaf
//! entry names the frame of the next level's table, and the PT entry (the
//! leaf) names the mapped frame itself. A level is *absent* until some
//! create-mode walk first materializes it.
//!
//! Only 4 KiB leaf mappings are modeled. The PS bit exists in
//! [`PageEntryBits`] because the hardware defines it, but nothing here
//! ever sets it: no huge pages.
//!
//! ## Two walk modes
//!
//! [`WalkMode::Create`] materializes absent intermediate levels as zeroed
//! tables allocated from a [`FrameAlloc`]; the ALLOCATE path needs this.
//! [`WalkMode::Probe`] refuses to touch anything and reports the first
//! absent level instead: the FREE path and mapping probes must never
//! conjure levels into existence just to look at them.

#![cfg_attr(not(test), no_std)]
#![allow(unsafe_code, clippy::inline_always)]

mod address_space;
mod entry;
mod table;
mod tlb;

pub use crate::address_space::{AddressSpace, NoAlloc, WalkError, WalkMode};
pub use crate::entry::PageEntryBits;
pub use crate::table::{ENTRIES_PER_TABLE, Level, PageTable};
pub use crate::tlb::TlbInvalidate;
#[cfg(target_arch = "x86_64")]
pub use crate::tlb::{ActiveSpaceTlb, invalidate_tlb_page};

use memgrant_addresses::{PhysicalAddress, PhysicalFrame};

/// Source of **physical** 4 KiB frames for page tables.
///
/// The implementation decides where frames come from (boot pool, bitmap,
/// test fixture). Returned frames must be 4 KiB aligned; `None` means
/// out of memory.
pub trait FrameAlloc {
    /// Allocate one 4 KiB physical frame.
    fn alloc_4k(&mut self) -> Option<PhysicalFrame>;
}

/// Converts physical addresses to *temporarily* usable pointers in the
/// current virtual address space (identity map, higher-half direct map,
/// or a test fixture over owned buffers).
///
/// # Safety
/// - `pa` must be mapped writable in the current page tables for `&mut T`.
/// - Lifetime `'a` is purely borrow-checked; the mapping must remain
///   valid for `'a`.
/// - `T` must match the bytes at `pa` (no aliasing UB).
pub trait PhysMapper {
    /// Convert a physical address to a mutable reference.
    ///
    /// # Safety
    /// See the trait-level contract.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;
}

/// View the 4 KiB frame at `frame` as a page table.
///
/// # Safety
/// - `frame` must hold a (possibly zeroed) page table.
/// - The mapping must be writable.
#[inline]
pub(crate) unsafe fn table_at<'a, M: PhysMapper>(m: &M, frame: PhysicalFrame) -> &'a mut PageTable {
    unsafe { m.phys_to_mut::<PageTable>(frame.base()) }
}
