use crate::{PAGE_SHIFT, PAGE_SIZE, is_page_aligned, page_align_down};
use core::fmt;

/// A **virtual** memory address (process/kernel address space).
///
/// Newtype over `u64` to prevent mixing with physical addresses.
/// No alignment guarantees by itself; see [`VirtualPage`] for the
/// page-aligned form.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(u64);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// In-page offset (low [`PAGE_SHIFT`](crate::PAGE_SHIFT) bits).
    #[inline]
    #[must_use]
    pub const fn page_offset(self) -> u64 {
        self.0 & (PAGE_SIZE - 1)
    }
}

/// The page-aligned base of one 4 KiB virtual page.
///
/// This is the translation key of the grant engine: a leaf page-table
/// entry binds exactly one `VirtualPage` to one physical frame.
///
/// ### Invariants
/// - The low 12 bits of the base are always zero.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualPage(VirtualAddress);

impl VirtualPage {
    /// Page that contains `addr` (aligns down to the page boundary).
    #[inline]
    #[must_use]
    pub const fn containing(addr: VirtualAddress) -> Self {
        Self(VirtualAddress::new(page_align_down(addr.as_u64())))
    }

    /// Build from an address known to be page-aligned.
    ///
    /// Returns `None` if `addr` is not on a page boundary.
    #[inline]
    #[must_use]
    pub const fn from_base(addr: VirtualAddress) -> Option<Self> {
        if is_page_aligned(addr.as_u64()) {
            Some(Self(addr))
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> VirtualAddress {
        self.0
    }

    /// The page `count` pages above this one.
    ///
    /// Panics on address-space overflow (debug and release); a request
    /// walking off the end of the canonical range is a caller bug.
    #[inline]
    #[must_use]
    pub const fn add_pages(self, count: u64) -> Self {
        match self.0.as_u64().checked_add(count << PAGE_SHIFT) {
            Some(base) => Self(VirtualAddress::new(base)),
            None => panic!("virtual page range overflow"),
        }
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtualAddress(0x{:016x})", self.0)
    }
}

impl fmt::Display for VirtualPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for VirtualPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtualPage(0x{:016x})", self.0.as_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_aligns_down() {
        let va = VirtualAddress::new(0xFFFF_8000_0000_1234);
        let page = VirtualPage::containing(va);
        assert_eq!(page.base().as_u64(), 0xFFFF_8000_0000_1000);
        assert_eq!(va.page_offset(), 0x234);
    }

    #[test]
    fn from_base_rejects_unaligned() {
        assert!(VirtualPage::from_base(VirtualAddress::new(0x1000)).is_some());
        assert!(VirtualPage::from_base(VirtualAddress::new(0x1001)).is_none());
    }

    #[test]
    fn add_pages_steps_by_page_size() {
        let page = VirtualPage::containing(VirtualAddress::new(0x4000_0000));
        assert_eq!(page.add_pages(3).base().as_u64(), 0x4000_3000);
    }
}
