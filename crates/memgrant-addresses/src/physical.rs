use crate::{PAGE_SHIFT, is_page_aligned, page_align_down};
use core::fmt;

/// A **physical** memory address (machine bus address).
///
/// Newtype over `u64` to prevent mixing with virtual addresses.
///
/// ### Notes
/// - When stored inside a page-table entry, the low 12 bits must be zero;
///   use [`PhysicalFrame`] for that case.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
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
}

/// The page-aligned base of one 4 KiB physical frame.
///
/// While a frame is bound by a leaf entry it is owned by that entry;
/// releasing it back to the pool happens exactly when the entry is
/// cleared.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalFrame(PhysicalAddress);

impl PhysicalFrame {
    /// Frame that contains `addr` (aligns down to the frame boundary).
    #[inline]
    #[must_use]
    pub const fn containing(addr: PhysicalAddress) -> Self {
        Self(PhysicalAddress::new(page_align_down(addr.as_u64())))
    }

    /// Build from an address known to be frame-aligned.
    ///
    /// Returns `None` if `addr` is not on a frame boundary.
    #[inline]
    #[must_use]
    pub const fn from_base(addr: PhysicalAddress) -> Option<Self> {
        if is_page_aligned(addr.as_u64()) {
            Some(Self(addr))
        } else {
            None
        }
    }

    /// Frame number `index`, i.e. the frame at byte address
    /// `index * PAGE_SIZE`.
    ///
    /// This is the unit the memory-mapping bridge counts in.
    #[inline]
    #[must_use]
    pub const fn from_index(index: u64) -> Self {
        Self(PhysicalAddress::new(index << PAGE_SHIFT))
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        self.0
    }

    /// Frame number (byte base divided by the frame size).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u64 {
        self.0.as_u64() >> PAGE_SHIFT
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalAddress(0x{:016x})", self.0)
    }
}

impl fmt::Display for PhysicalFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for PhysicalFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalFrame(0x{:016x})", self.0.as_u64())
    }
}
