//! Translation-cache maintenance.
//!
//! Every leaf mutation of an active hierarchy must be followed by a
//! per-page invalidation before the mutating call returns; a stale
//! translation observed after return is a correctness bug, not a
//! performance issue. The engine takes the flusher as a seam so hosted
//! tests can record invalidations instead of executing them.

use memgrant_addresses::VirtualPage;

/// Per-page translation-cache invalidation.
///
/// Implementations must guarantee that after `invalidate_page` returns,
/// no stale translation for `page` survives on the executing CPU.
/// Invalidation is not modeled as fallible: once the entry mutation
/// succeeded, the flush is assumed to succeed.
pub trait TlbInvalidate {
    /// Drop any cached translation for `page`.
    fn invalidate_page(&mut self, page: VirtualPage);
}

/// Invalidate the TLB entry for one page of the **active** address space.
///
/// # Safety
/// - Must run at CPL0.
/// - Only meaningful when the mutated hierarchy is the one loaded in CR3;
///   other address spaces need a CR3 reload on activation instead.
#[cfg(target_arch = "x86_64")]
#[inline]
pub unsafe fn invalidate_tlb_page(page: VirtualPage) {
    unsafe {
        core::arch::asm!(
            "invlpg [{}]",
            in(reg) page.base().as_u64(),
            options(nostack, preserves_flags)
        );
    }
}

/// [`TlbInvalidate`] for the currently active address space, backed by
/// `invlpg`.
#[cfg(target_arch = "x86_64")]
#[derive(Debug, Default, Copy, Clone)]
pub struct ActiveSpaceTlb;

#[cfg(target_arch = "x86_64")]
impl TlbInvalidate for ActiveSpaceTlb {
    fn invalidate_page(&mut self, page: VirtualPage) {
        // SAFETY: the engine mutates the active hierarchy on behalf of
        // its owner at CPL0; see the function-level contract.
        unsafe { invalidate_tlb_page(page) }
    }
}
