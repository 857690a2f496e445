use bitfield_struct::bitfield;
use memgrant_addresses::{PhysicalAddress, PhysicalFrame};

/// One 64-bit x86-64 page-table entry in its raw bitfield form.
///
/// The layout is the hardware-defined superset shared by all four levels
/// (PML4E, PDPTE, PDE, PTE). A present non-leaf entry stores the frame of
/// the next level's table; a present PT entry stores the mapped frame.
///
/// | Bits  | Name | Meaning |
/// |-------|------|---------|
/// | 0     | `P`  | Present |
/// | 1     | `RW` | Writable |
/// | 2     | `US` | User-mode accessible |
/// | 3     | `PWT`| Write-through caching |
/// | 4     | `PCD`| Caching disabled |
/// | 5     | `A`  | Accessed (set by CPU) |
/// | 6     | `D`  | Dirty (leaf only, set by CPU) |
/// | 7     | `PS` | Large page; always 0 here (no huge pages) |
/// | 8     | `G`  | Global (leaf only) |
/// | 9‒11  | —    | OS-available |
/// | 12‒51 | addr | Physical frame bits [51:12] |
/// | 52‒62 | —    | OS-available / protection key |
/// | 63    | `NX` | No-execute |
///
/// Use the typed constructors ([`new_table`](Self::new_table),
/// [`new_leaf`](Self::new_leaf)) instead of setting bits one by one; a
/// zeroed value (`PageEntryBits::new()`) is the canonical non-present
/// entry.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageEntryBits {
    /// Present (P, bit 0). Clear means the slot translates nothing.
    pub present: bool,

    /// Writable (RW, bit 1). Clear makes the mapping read-only.
    pub writable: bool,

    /// User/Supervisor (US, bit 2). Set to allow user-mode access.
    pub user_access: bool,

    /// Page Write-Through (PWT, bit 3).
    pub write_through: bool,

    /// Page Cache Disable (PCD, bit 4).
    pub cache_disabled: bool,

    /// Accessed (A, bit 5). Set by the CPU on first access.
    pub accessed: bool,

    /// Dirty (D, bit 6), leaf only. Set by the CPU on first write.
    pub dirty: bool,

    /// Page Size (PS, bit 7). Must stay clear: only 4 KiB leaves exist
    /// in this hierarchy.
    pub large_page: bool,

    /// Global (G, bit 8), leaf only. Survives CR3 reloads.
    pub global_translation: bool,

    /// OS-available (bits 9..=11). Hardware does not interpret these.
    #[bits(3)]
    pub os_available_low: u8,

    /// Physical frame bits [51:12] (bits 12..=51).
    ///
    /// The full address is `(bits << 12)`; the low 12 bits are implied
    /// zero by frame alignment.
    #[bits(40)]
    frame_bits_51_12: u64,

    /// OS-available (bits 52..=58).
    #[bits(7)]
    pub os_available_high: u8,

    /// Protection key (bits 59..=62) when PKU is active; OS use otherwise.
    #[bits(4)]
    pub protection_key: u8,

    /// No-Execute (NX, bit 63). Set on every leaf this engine installs.
    pub no_execute: bool,
}

impl PageEntryBits {
    /// Store a frame-aligned physical address (bits [51:12]).
    #[inline]
    pub const fn set_physical_address(&mut self, pa: PhysicalAddress) {
        self.set_frame_bits_51_12(pa.as_u64() >> 12);
    }

    /// Recover the stored physical address.
    #[inline]
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.frame_bits_51_12() << 12)
    }

    /// The frame this entry points at (next-level table or mapped page).
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> PhysicalFrame {
        // The stored address has its low 12 bits implied zero.
        PhysicalFrame::containing(self.physical_address())
    }

    /// A non-leaf entry linking `table` as the next level.
    ///
    /// Present, writable, and user-accessible: intermediate levels never
    /// restrict access, so the leaf's permission tag alone decides.
    #[inline]
    #[must_use]
    pub const fn new_table(table: PhysicalFrame) -> Self {
        let mut e = Self::new()
            .with_present(true)
            .with_writable(true)
            .with_user_access(true);
        e.set_physical_address(table.base());
        e
    }

    /// A leaf entry binding `frame` with the given write permission.
    ///
    /// Always user-accessible and never executable; `writable` selects
    /// read-write vs read-only.
    #[inline]
    #[must_use]
    pub const fn new_leaf(frame: PhysicalFrame, writable: bool) -> Self {
        let mut e = Self::new()
            .with_present(true)
            .with_writable(writable)
            .with_user_access(true)
            .with_no_execute(true);
        e.set_physical_address(frame.base());
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_entry_is_not_present() {
        assert!(!PageEntryBits::new().present());
    }

    #[test]
    fn leaf_round_trips_frame_and_permission() {
        let frame = PhysicalFrame::from_index(0x5555);
        let rw = PageEntryBits::new_leaf(frame, true);
        assert!(rw.present());
        assert!(rw.writable());
        assert!(rw.user_access());
        assert!(rw.no_execute());
        assert!(!rw.large_page());
        assert_eq!(rw.frame(), frame);

        let ro = PageEntryBits::new_leaf(frame, false);
        assert!(ro.present());
        assert!(!ro.writable());
    }

    #[test]
    fn table_link_keeps_low_bits_out_of_address() {
        let table = PhysicalFrame::from_index(7);
        let e = PageEntryBits::new_table(table);
        assert!(e.present() && e.writable() && e.user_access());
        assert_eq!(e.physical_address().as_u64(), 7 << 12);
    }
}
