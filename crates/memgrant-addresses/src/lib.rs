//! # Address Vocabulary
//!
//! Strongly typed wrappers for the raw addresses handled by the page-grant
//! engine.
//!
//! ## Overview
//!
//! Everything here is a zero-cost newtype over `u64`. The point is to make
//! it impossible to hand a physical address to an API that walks virtual
//! addresses (or vice versa) without an explicit conversion:
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`VirtualAddress`] | An address in a process/kernel address space. |
//! | [`PhysicalAddress`] | A machine bus address. |
//! | [`VirtualPage`] | The page-aligned base of one 4 KiB virtual page. |
//! | [`PhysicalFrame`] | The page-aligned base of one 4 KiB physical frame. |
//!
//! All page-granular types are fixed at 4 KiB ([`PAGE_SIZE`]); the engine
//! does not map huge pages, so there is no page-size type parameter.
//!
//! ## Typical Usage
//!
//! ```rust
//! # use memgrant_addresses::*;
//! let va = VirtualAddress::new(0xFFFF_8000_0000_1234);
//! let page = VirtualPage::containing(va);
//! assert_eq!(page.base().as_u64() & (PAGE_SIZE - 1), 0);
//!
//! // Page-granular stepping for multi-page requests.
//! let next = page.add_pages(1);
//! assert_eq!(next.base().as_u64() - page.base().as_u64(), PAGE_SIZE);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod physical;
mod virtual_addr;

pub use physical::{PhysicalAddress, PhysicalFrame};
pub use virtual_addr::{VirtualAddress, VirtualPage};

/// Size of one page/frame in bytes.
pub const PAGE_SIZE: u64 = 4096;

/// log2([`PAGE_SIZE`]): number of low bits holding the in-page offset.
pub const PAGE_SHIFT: u32 = 12;

/// Align `x` down to the nearest multiple of [`PAGE_SIZE`].
#[inline]
#[must_use]
pub const fn page_align_down(x: u64) -> u64 {
    x & !(PAGE_SIZE - 1)
}

/// Align `x` up to the nearest multiple of [`PAGE_SIZE`].
///
/// Saturates instead of wrapping when `x` is within a page of `u64::MAX`.
#[inline]
#[must_use]
pub const fn page_align_up(x: u64) -> u64 {
    page_align_down(x.saturating_add(PAGE_SIZE - 1))
}

/// Whether `x` sits on a page boundary.
#[inline]
#[must_use]
pub const fn is_page_aligned(x: u64) -> bool {
    x & (PAGE_SIZE - 1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_helpers() {
        assert_eq!(page_align_down(0), 0);
        assert_eq!(page_align_down(4095), 0);
        assert_eq!(page_align_down(4096), 4096);
        assert_eq!(page_align_up(1), 4096);
        assert_eq!(page_align_up(4096), 4096);
        assert!(is_page_aligned(0));
        assert!(is_page_aligned(0x20_0000));
        assert!(!is_page_aligned(0x20_0001));
    }

    #[test]
    fn align_up_saturates() {
        assert_eq!(page_align_up(u64::MAX), page_align_down(u64::MAX));
    }
}
