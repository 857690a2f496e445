use crate::entry::PageEntryBits;
use core::fmt;
use memgrant_addresses::VirtualAddress;

/// Entries per table at every level (512 × 8 bytes = 4 KiB).
pub const ENTRIES_PER_TABLE: usize = 512;

/// One page table: 512 entries, 4 KiB-aligned, identical layout at all
/// four levels.
///
/// The uniform shape is what lets the walker be a single loop: a non-leaf
/// entry's frame is reinterpreted as the next level's `PageTable`.
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PageEntryBits; ENTRIES_PER_TABLE],
}

impl PageTable {
    /// A fully zeroed table (all entries non-present).
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PageEntryBits::new(); ENTRIES_PER_TABLE],
        }
    }

    /// Clear every entry in place.
    #[inline]
    pub const fn zero(&mut self) {
        self.entries = [PageEntryBits::new(); ENTRIES_PER_TABLE];
    }

    /// Read the entry at `index`.
    ///
    /// Plain load; implies no TLB synchronization.
    #[inline]
    #[must_use]
    pub const fn entry(&self, index: usize) -> PageEntryBits {
        self.entries[index]
    }

    /// Mutable slot at `index`.
    ///
    /// Writers changing an active mapping own the TLB maintenance.
    #[inline]
    #[must_use]
    pub const fn entry_mut(&mut self, index: usize) -> &mut PageEntryBits {
        &mut self.entries[index]
    }
}

/// The four translation levels, top to leaf.
///
/// Each level consumes nine virtual-address bits; [`index_of`](Self::index_of)
/// extracts the slot a given address selects at that level. Keeping the
/// level a value (not four separate types) lets the walker iterate
/// [`TOP_DOWN`](Self::TOP_DOWN) instead of unrolling four copies of the
/// same absence check.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Level {
    /// Page Map Level 4, the root, referenced by CR3.
    Pml4,
    /// Page Directory Pointer Table.
    Pdpt,
    /// Page Directory.
    Pd,
    /// Page Table, holding the leaf entries.
    Pt,
}

impl Level {
    /// All levels, walk order.
    pub const TOP_DOWN: [Self; 4] = [Self::Pml4, Self::Pdpt, Self::Pd, Self::Pt];

    /// The levels whose entries link a further table.
    pub const NON_LEAF: [Self; 3] = [Self::Pml4, Self::Pdpt, Self::Pd];

    /// Low bit position of this level's index field in a virtual address.
    #[inline]
    #[must_use]
    pub const fn shift(self) -> u32 {
        match self {
            Self::Pml4 => 39,
            Self::Pdpt => 30,
            Self::Pd => 21,
            Self::Pt => 12,
        }
    }

    /// The table index `va` selects at this level (`0..512`).
    #[inline]
    #[must_use]
    pub const fn index_of(self, va: VirtualAddress) -> usize {
        ((va.as_u64() >> self.shift()) & 0x1FF) as usize
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pml4 => "PML4",
            Self::Pdpt => "PDPT",
            Self::Pd => "PD",
            Self::Pt => "PT",
        })
    }
}
