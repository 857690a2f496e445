//! # ALLOCATE / FREE Orchestration
//!
//! [`GrantEngine`] drives the two state transitions a page can make:
//!
//! ```text
//! Unmapped ── allocate ──► Mapped(ReadWrite | ReadOnly)
//! Mapped   ── free ──────► Unmapped
//! ```
//!
//! ALLOCATE from `Mapped` is an error; FREE from `Unmapped` is a no-op.
//! Each page mutation is followed by a per-page TLB invalidation before
//! the call returns.

use crate::pool::FramePool;
use memgrant_addresses::{PhysicalFrame, VirtualAddress, VirtualPage};
use memgrant_vmem::{AddressSpace, PageEntryBits, PhysMapper, TlbInvalidate, WalkMode};

/// Whether the last page of a `pages`-page range starting at `first`
/// would lie past the top of the 64-bit address space.
fn range_wraps(first: VirtualPage, pages: u64) -> bool {
    match pages.checked_sub(1) {
        Some(last) => last
            .checked_mul(memgrant_addresses::PAGE_SIZE)
            .and_then(|span| first.base().as_u64().checked_add(span))
            .is_none(),
        // Zero pages span nothing.
        None => false,
    }
}

/// Hard per-request page ceiling.
///
/// Bounds the table and frame allocations a single control call can force
/// on the kernel side; requests above it fail before touching any state.
pub const MAX_PAGES_PER_REQUEST: u64 = 4096;

/// An ALLOCATE request: bind `num_pages` fresh zero-filled frames
/// starting at the page containing `vaddr`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AllocateRequest {
    /// Start of the target range; normalized to its containing page.
    pub vaddr: VirtualAddress,
    /// Number of consecutive pages; `0` succeeds trivially.
    pub num_pages: u64,
    /// Read-write when set, read-only otherwise.
    pub writable: bool,
}

/// A FREE request: unbind the single page containing `vaddr`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FreeRequest {
    /// Address inside the page to unbind.
    pub vaddr: VirtualAddress,
}

/// Access kinds checkable against an installed permission tag.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AccessKind {
    Read,
    Write,
}

/// Failure modes of [`GrantEngine::allocate`].
///
/// All are reported synchronously; nothing is retried internally.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrantError {
    /// `num_pages` exceeds [`MAX_PAGES_PER_REQUEST`].
    #[error("request for {requested} pages exceeds the per-request ceiling")]
    TooManyPages {
        /// The rejected page count.
        requested: u64,
    },
    /// A page in the requested range already has a leaf translation.
    #[error("page already mapped at {0}")]
    AlreadyMapped(VirtualPage),
    /// The frame pool could not supply a leaf or table frame.
    #[error("physical frame pool exhausted")]
    FrameExhausted,
}

/// The allocate/free engine over one address space.
///
/// Borrows its frame pool and TLB flusher for the engine's lifetime; the
/// address-space root frame is owned by the caller. The caller must
/// serialize operations per address space; `&mut self` enforces that for
/// a single engine, and aliasing one root through two engines is
/// undefined behavior at the bookkeeping level (not detected).
pub struct GrantEngine<'m, M: PhysMapper, P: FramePool, T: TlbInvalidate> {
    aspace: AddressSpace<'m, M>,
    pool: &'m mut P,
    tlb: &'m mut T,
}

impl<'m, M: PhysMapper, P: FramePool, T: TlbInvalidate> GrantEngine<'m, M, P, T> {
    /// Engine over the hierarchy rooted at `root`.
    #[must_use]
    pub fn new(mapper: &'m M, root: PhysicalFrame, pool: &'m mut P, tlb: &'m mut T) -> Self {
        Self {
            aspace: AddressSpace::from_root(mapper, root),
            pool,
            tlb,
        }
    }

    /// The underlying address-space handle (probing, translation).
    #[inline]
    #[must_use]
    pub const fn address_space(&self) -> &AddressSpace<'m, M> {
        &self.aspace
    }

    /// Frames currently available in the backing pool.
    #[inline]
    #[must_use]
    pub fn available_frames(&self) -> usize {
        self.pool.available()
    }

    /// Bind zero-filled frames over the requested range.
    ///
    /// Per page: reject if already mapped, acquire a frame, zero it,
    /// create-walk to the leaf slot, install the entry with the requested
    /// permission, invalidate the TLB for that page.
    ///
    /// **Not transactional.** If page `k` of an N-page request fails,
    /// pages `0..k` remain mapped and keep their frames; the caller must
    /// re-probe to discover the partial effect. A leaf frame acquired for
    /// the failing page itself is returned to the pool.
    ///
    /// # Errors
    /// - [`GrantError::TooManyPages`] above the ceiling, or when the
    ///   range would wrap past the top of the address space (both checked
    ///   before any state is touched).
    /// - [`GrantError::AlreadyMapped`] if any page in the range is bound;
    ///   no frame is acquired for that page.
    /// - [`GrantError::FrameExhausted`] when the pool runs dry, for leaf
    ///   or intermediate-table frames alike.
    pub fn allocate(&mut self, req: AllocateRequest) -> Result<(), GrantError> {
        if req.num_pages > MAX_PAGES_PER_REQUEST {
            return Err(GrantError::TooManyPages {
                requested: req.num_pages,
            });
        }

        let first = VirtualPage::containing(req.vaddr);
        if range_wraps(first, req.num_pages) {
            return Err(GrantError::TooManyPages {
                requested: req.num_pages,
            });
        }
        log::debug!(
            "allocate: {} page(s) at {first}, writable={}",
            req.num_pages,
            req.writable
        );

        for i in 0..req.num_pages {
            let page = first.add_pages(i);
            if let Err(e) = self.allocate_one(page, req.writable) {
                if i > 0 {
                    log::warn!(
                        "allocate: page {i} of {} failed ({e}); pages 0..{i} remain mapped",
                        req.num_pages
                    );
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// One page of [`allocate`](Self::allocate): `Unmapped → Mapped`.
    fn allocate_one(&mut self, page: VirtualPage, writable: bool) -> Result<(), GrantError> {
        // Probe before acquiring anything, so an occupied page costs no
        // frame.
        if self.aspace.is_mapped(page) {
            return Err(GrantError::AlreadyMapped(page));
        }

        let frame = self.pool.alloc_4k().ok_or(GrantError::FrameExhausted)?;
        self.aspace.zero_frame(frame);

        let slot = match self.aspace.walk(page, WalkMode::Create(&mut *self.pool)) {
            Ok(slot) => slot,
            Err(e) => {
                // Create mode only fails for want of a table frame; the
                // leaf frame was never installed, give it back.
                log::debug!("allocate: walk to {page} failed: {e}");
                self.pool.free_4k(frame);
                return Err(GrantError::FrameExhausted);
            }
        };

        // Create-then-install: the slot goes from non-present to the
        // final entry in one store, never through a partial state.
        *slot = PageEntryBits::new_leaf(frame, writable);
        self.tlb.invalidate_page(page);
        Ok(())
    }

    /// Unbind the page containing `req.vaddr`: `Mapped → Unmapped`.
    ///
    /// Walks in probe mode; an absent intermediate level or a non-present
    /// leaf means there is nothing to free, which is success, not an
    /// error; FREE is idempotent by definition. When a mapping exists,
    /// the entry is cleared and the TLB invalidated for that page, and
    /// only then is the backing frame returned to the pool: ownership
    /// transfers exactly when the entry is cleared. Intermediate tables
    /// are never reclaimed, even when this empties a PT.
    ///
    /// Pages installed by [`map_physical_range`](Self::map_physical_range)
    /// must not be freed here: their frames never came from the pool, and
    /// this would feed a foreign frame into it.
    pub fn free(&mut self, req: FreeRequest) {
        let page = VirtualPage::containing(req.vaddr);
        let Ok(slot) = self.aspace.probe_slot(page) else {
            log::trace!("free: no translation path for {page}; no-op");
            return;
        };
        if !slot.present() {
            log::trace!("free: {page} not mapped; no-op");
            return;
        }

        let frame = slot.frame();
        *slot = PageEntryBits::new();
        self.tlb.invalidate_page(page);
        self.pool.free_4k(frame);
        log::debug!("free: released {frame} from {page}");
    }

    /// Whether `access` would be permitted by the installed leaf entry.
    ///
    /// Unmapped pages permit nothing; read-only mappings deny writes.
    #[must_use]
    pub fn access_allowed(&self, page: VirtualPage, access: AccessKind) -> bool {
        match self.aspace.translate(page) {
            Some((_, bits)) => match access {
                AccessKind::Read => true,
                AccessKind::Write => bits.writable(),
            },
            None => false,
        }
    }

    /// Map `length` bytes of contiguous physical frames, starting at
    /// frame number `first_frame`, into the region beginning at the page
    /// containing `region`.
    ///
    /// This is the raw memory-mapping bridge: an explicit escape hatch
    /// with **no grant bookkeeping**. It does not check whether the
    /// target pages are mapped and will overwrite existing leaf entries;
    /// it must never be pointed at frames the engine still considers
    /// bound elsewhere. Only intermediate-table frames are drawn from the
    /// pool.
    ///
    /// # Errors
    /// [`GrantError::TooManyPages`] when the region would wrap past the
    /// top of the address space; [`GrantError::FrameExhausted`] when a
    /// table frame cannot be allocated (pages mapped before the failure
    /// remain mapped).
    pub fn map_physical_range(
        &mut self,
        region: VirtualAddress,
        first_frame: u64,
        length: u64,
        writable: bool,
    ) -> Result<(), GrantError> {
        let pages = memgrant_addresses::page_align_up(length) >> memgrant_addresses::PAGE_SHIFT;
        let start = VirtualPage::containing(region);
        if range_wraps(start, pages) {
            return Err(GrantError::TooManyPages { requested: pages });
        }
        log::debug!("bridge: {pages} page(s) at {start} onto frames {first_frame}..");

        for i in 0..pages {
            let page = start.add_pages(i);
            let slot = self
                .aspace
                .walk(page, WalkMode::Create(&mut *self.pool))
                .map_err(|_| GrantError::FrameExhausted)?;
            *slot = PageEntryBits::new_leaf(PhysicalFrame::from_index(first_frame + i), writable);
            self.tlb.invalidate_page(page);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::RangeFramePool;
    use memgrant_addresses::{PAGE_SIZE, PhysicalAddress};
    use memgrant_vmem::FrameAlloc;
    use std::cell::{RefCell, UnsafeCell};
    use std::rc::Rc;

    /// A 4 KiB-aligned raw frame; test "physical RAM" backing store. The
    /// cell carries the interior mutability [`PhysMapper`] hands out.
    #[repr(align(4096))]
    struct Aligned4K(UnsafeCell<[u8; 4096]>);

    /// Simulated physical memory: a vector of aligned frames, physical
    /// addresses are byte offsets from 0. Only for tests.
    struct TestPhys {
        frames: Vec<Aligned4K>,
    }

    impl TestPhys {
        fn with_frames(n: usize) -> Self {
            let mut frames = Vec::with_capacity(n);
            for _ in 0..n {
                frames.push(Aligned4K(UnsafeCell::new([0u8; 4096])));
            }
            Self { frames }
        }
    }

    impl PhysMapper for TestPhys {
        unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
            let idx = (pa.as_u64() >> 12) as usize;
            debug_assert_eq!(pa.as_u64() & 0xFFF, 0);
            let ptr = self.frames[idx].0.get().cast::<T>();
            // SAFETY: frames are 4 KiB aligned and the cell permits
            // mutation through `&self`; the caller promises `T` matches
            // the bytes and that views do not alias.
            unsafe { &mut *ptr }
        }
    }

    /// Records invalidations instead of executing them.
    #[derive(Default)]
    struct RecordingTlb {
        flushed: Vec<VirtualPage>,
    }

    impl TlbInvalidate for RecordingTlb {
        fn invalidate_page(&mut self, page: VirtualPage) {
            self.flushed.push(page);
        }
    }

    /// Pool over the fixture's frames with the root already drawn.
    fn pool_with_root(capacity: u64) -> (RangeFramePool, PhysicalFrame) {
        let mut pool = RangeFramePool::new(PhysicalFrame::from_index(0), capacity);
        let root = pool.alloc_4k().unwrap();
        (pool, root)
    }

    fn va(addr: u64) -> VirtualAddress {
        VirtualAddress::new(addr)
    }

    const BASE: u64 = 0x4000_0000;

    #[test]
    fn allocate_then_free_round_trips_to_unmapped() {
        let phys = TestPhys::with_frames(64);
        let (mut pool, root) = pool_with_root(32);
        let mut tlb = RecordingTlb::default();
        let mut engine = GrantEngine::new(&phys, root, &mut pool, &mut tlb);

        engine
            .allocate(AllocateRequest {
                vaddr: va(BASE),
                num_pages: 3,
                writable: true,
            })
            .unwrap();

        let first = VirtualPage::containing(va(BASE));
        for i in 0..3 {
            assert!(engine.address_space().is_mapped(first.add_pages(i)));
        }

        for i in 0..3 {
            engine.free(FreeRequest {
                vaddr: va(BASE + i * PAGE_SIZE),
            });
        }
        for i in 0..3 {
            let page = first.add_pages(i);
            assert!(!engine.address_space().is_mapped(page));
            assert!(engine.address_space().translate(page).is_none());
        }
    }

    #[test]
    fn free_is_idempotent() {
        let phys = TestPhys::with_frames(64);
        let (mut pool, root) = pool_with_root(32);
        let mut tlb = RecordingTlb::default();
        let mut engine = GrantEngine::new(&phys, root, &mut pool, &mut tlb);

        engine
            .allocate(AllocateRequest {
                vaddr: va(BASE),
                num_pages: 1,
                writable: true,
            })
            .unwrap();

        let after_alloc = engine.available_frames();
        engine.free(FreeRequest { vaddr: va(BASE) });
        let after_first_free = engine.available_frames();
        // Exactly the leaf frame came back; tables are not reclaimed.
        assert_eq!(after_first_free, after_alloc + 1);

        engine.free(FreeRequest { vaddr: va(BASE) });
        assert_eq!(engine.available_frames(), after_first_free);
    }

    #[test]
    fn allocate_on_mapped_page_fails_without_acquiring() {
        let phys = TestPhys::with_frames(64);
        let (mut pool, root) = pool_with_root(32);
        let mut tlb = RecordingTlb::default();
        let mut engine = GrantEngine::new(&phys, root, &mut pool, &mut tlb);

        engine
            .allocate(AllocateRequest {
                vaddr: va(BASE),
                num_pages: 1,
                writable: false,
            })
            .unwrap();
        let available = engine.available_frames();

        let err = engine
            .allocate(AllocateRequest {
                vaddr: va(BASE),
                num_pages: 1,
                writable: true,
            })
            .unwrap_err();
        assert_eq!(
            err,
            GrantError::AlreadyMapped(VirtualPage::containing(va(BASE)))
        );
        assert_eq!(engine.available_frames(), available);

        // The prior mapping is untouched, still read-only.
        let page = VirtualPage::containing(va(BASE));
        assert!(!engine.access_allowed(page, AccessKind::Write));
    }

    #[test]
    fn ceiling_is_enforced_before_any_acquisition() {
        let phys = TestPhys::with_frames(64);
        let (mut pool, root) = pool_with_root(32);
        let mut tlb = RecordingTlb::default();
        let mut engine = GrantEngine::new(&phys, root, &mut pool, &mut tlb);
        let available = engine.available_frames();

        let err = engine
            .allocate(AllocateRequest {
                vaddr: va(BASE),
                num_pages: MAX_PAGES_PER_REQUEST + 1,
                writable: true,
            })
            .unwrap_err();
        assert_eq!(
            err,
            GrantError::TooManyPages {
                requested: MAX_PAGES_PER_REQUEST + 1
            }
        );
        assert_eq!(engine.available_frames(), available);
        assert!(tlb.flushed.is_empty());
    }

    #[test]
    fn zero_pages_is_trivially_successful() {
        let phys = TestPhys::with_frames(64);
        let (mut pool, root) = pool_with_root(32);
        let mut tlb = RecordingTlb::default();
        let mut engine = GrantEngine::new(&phys, root, &mut pool, &mut tlb);
        let available = engine.available_frames();

        engine
            .allocate(AllocateRequest {
                vaddr: va(BASE),
                num_pages: 0,
                writable: true,
            })
            .unwrap();
        assert_eq!(engine.available_frames(), available);
    }

    #[test]
    fn permission_tags_gate_writes() {
        let phys = TestPhys::with_frames(64);
        let (mut pool, root) = pool_with_root(32);
        let mut tlb = RecordingTlb::default();
        let mut engine = GrantEngine::new(&phys, root, &mut pool, &mut tlb);

        engine
            .allocate(AllocateRequest {
                vaddr: va(BASE),
                num_pages: 1,
                writable: false,
            })
            .unwrap();
        engine
            .allocate(AllocateRequest {
                vaddr: va(BASE + PAGE_SIZE),
                num_pages: 1,
                writable: true,
            })
            .unwrap();

        let ro = VirtualPage::containing(va(BASE));
        let rw = VirtualPage::containing(va(BASE + PAGE_SIZE));
        assert!(engine.access_allowed(ro, AccessKind::Read));
        assert!(!engine.access_allowed(ro, AccessKind::Write));
        assert!(engine.access_allowed(rw, AccessKind::Read));
        assert!(engine.access_allowed(rw, AccessKind::Write));

        // Unmapped pages permit nothing.
        let unmapped = rw.add_pages(1);
        assert!(!engine.access_allowed(unmapped, AccessKind::Read));
    }

    #[test]
    fn partial_failure_leaves_earlier_pages_mapped() {
        let phys = TestPhys::with_frames(64);
        // Root + 3 intermediate tables + 2 leaf frames: the third leaf
        // acquisition must fail.
        let (mut pool, root) = pool_with_root(6);
        let mut tlb = RecordingTlb::default();
        let mut engine = GrantEngine::new(&phys, root, &mut pool, &mut tlb);

        let err = engine
            .allocate(AllocateRequest {
                vaddr: va(BASE),
                num_pages: 3,
                writable: true,
            })
            .unwrap_err();
        assert_eq!(err, GrantError::FrameExhausted);

        let first = VirtualPage::containing(va(BASE));
        assert!(engine.address_space().is_mapped(first));
        assert!(engine.address_space().is_mapped(first.add_pages(1)));
        assert!(!engine.address_space().is_mapped(first.add_pages(2)));
        assert_eq!(engine.available_frames(), 0);
    }

    #[test]
    fn table_exhaustion_returns_the_leaf_frame() {
        let phys = TestPhys::with_frames(64);
        // Root + 1: the leaf frame can be acquired but the first
        // intermediate table cannot.
        let (mut pool, root) = pool_with_root(2);
        let mut tlb = RecordingTlb::default();
        let mut engine = GrantEngine::new(&phys, root, &mut pool, &mut tlb);

        let err = engine
            .allocate(AllocateRequest {
                vaddr: va(BASE),
                num_pages: 1,
                writable: true,
            })
            .unwrap_err();
        assert_eq!(err, GrantError::FrameExhausted);
        assert!(!engine.address_space().is_mapped(VirtualPage::containing(va(BASE))));
        // The acquired leaf frame was handed back, not leaked.
        assert_eq!(engine.available_frames(), 1);
        assert!(tlb.flushed.is_empty());
    }

    #[test]
    fn free_of_never_allocated_address_is_a_noop() {
        let phys = TestPhys::with_frames(64);
        let (mut pool, root) = pool_with_root(32);
        let mut tlb = RecordingTlb::default();
        {
            let mut engine = GrantEngine::new(&phys, root, &mut pool, &mut tlb);
            let available = engine.available_frames();
            engine.free(FreeRequest {
                vaddr: va(0xDEAD_B000),
            });
            assert_eq!(engine.available_frames(), available);
        }
        assert!(tlb.flushed.is_empty());
    }

    #[test]
    fn tlb_flushed_per_mutated_page_only() {
        let phys = TestPhys::with_frames(64);
        let (mut pool, root) = pool_with_root(32);
        let mut tlb = RecordingTlb::default();
        {
            let mut engine = GrantEngine::new(&phys, root, &mut pool, &mut tlb);
            engine
                .allocate(AllocateRequest {
                    vaddr: va(BASE),
                    num_pages: 2,
                    writable: true,
                })
                .unwrap();
            engine.free(FreeRequest { vaddr: va(BASE) });
        }

        let first = VirtualPage::containing(va(BASE));
        assert_eq!(tlb.flushed, vec![first, first.add_pages(1), first]);
    }

    #[test]
    fn frames_are_zeroed_on_allocation() {
        let phys = TestPhys::with_frames(64);
        let (mut pool, root) = pool_with_root(32);
        let mut tlb = RecordingTlb::default();

        // Dirty the frame the first leaf allocation will receive.
        // Frame layout: root=0, leaf=1, tables=2..=4.
        unsafe {
            let bytes: &mut [u8; 4096] =
                phys.phys_to_mut(PhysicalFrame::from_index(1).base());
            bytes.fill(0xAA);
        }

        let mut engine = GrantEngine::new(&phys, root, &mut pool, &mut tlb);
        engine
            .allocate(AllocateRequest {
                vaddr: va(BASE),
                num_pages: 1,
                writable: true,
            })
            .unwrap();

        let (frame, _) = engine
            .address_space()
            .translate(VirtualPage::containing(va(BASE)))
            .unwrap();
        let bytes: &mut [u8; 4096] = unsafe { phys.phys_to_mut(frame.base()) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn bridge_maps_contiguous_frames_without_pool_leaves() {
        let phys = TestPhys::with_frames(64);
        let (mut pool, root) = pool_with_root(32);
        let mut tlb = RecordingTlb::default();
        let mut engine = GrantEngine::new(&phys, root, &mut pool, &mut tlb);
        let available = engine.available_frames();

        // 2.5 pages of length rounds up to 3 pages.
        engine
            .map_physical_range(va(BASE), 40, 2 * PAGE_SIZE + PAGE_SIZE / 2, true)
            .unwrap();

        let first = VirtualPage::containing(va(BASE));
        for i in 0..3 {
            let (frame, bits) = engine.address_space().translate(first.add_pages(i)).unwrap();
            assert_eq!(frame, PhysicalFrame::from_index(40 + i));
            assert!(bits.writable());
        }
        // Only the three intermediate tables came from the pool.
        assert_eq!(engine.available_frames(), available - 3);
    }

    #[test]
    fn wrapping_ranges_are_rejected_without_panicking() {
        let phys = TestPhys::with_frames(64);
        let (mut pool, root) = pool_with_root(32);
        let mut tlb = RecordingTlb::default();
        let mut engine = GrantEngine::new(&phys, root, &mut pool, &mut tlb);
        let available = engine.available_frames();

        // Second page would lie past the top of the address space.
        let last_page = va(0xFFFF_FFFF_FFFF_F000);
        let err = engine
            .allocate(AllocateRequest {
                vaddr: last_page,
                num_pages: 2,
                writable: true,
            })
            .unwrap_err();
        assert_eq!(err, GrantError::TooManyPages { requested: 2 });
        assert_eq!(engine.available_frames(), available);
        assert!(!engine.address_space().is_mapped(VirtualPage::containing(last_page)));

        assert_eq!(
            engine.map_physical_range(last_page, 40, 2 * PAGE_SIZE, true),
            Err(GrantError::TooManyPages { requested: 2 })
        );

        // The very last page itself is still fair game.
        engine
            .allocate(AllocateRequest {
                vaddr: last_page,
                num_pages: 1,
                writable: true,
            })
            .unwrap();
        assert!(engine.address_space().is_mapped(VirtualPage::containing(last_page)));
    }

    /// Pool that logs every release into a shared event trace.
    struct TracingPool {
        inner: RangeFramePool,
        trace: Rc<RefCell<Vec<&'static str>>>,
    }

    impl FrameAlloc for TracingPool {
        fn alloc_4k(&mut self) -> Option<PhysicalFrame> {
            self.inner.alloc_4k()
        }
    }

    impl FramePool for TracingPool {
        fn free_4k(&mut self, frame: PhysicalFrame) {
            self.trace.borrow_mut().push("release");
            self.inner.free_4k(frame);
        }

        fn available(&self) -> usize {
            self.inner.available()
        }
    }

    /// TLB flusher that logs into the same trace as [`TracingPool`].
    struct TracingTlb {
        trace: Rc<RefCell<Vec<&'static str>>>,
    }

    impl TlbInvalidate for TracingTlb {
        fn invalidate_page(&mut self, _page: VirtualPage) {
            self.trace.borrow_mut().push("flush");
        }
    }

    #[test]
    fn free_releases_the_frame_only_after_unmap_and_flush() {
        let phys = TestPhys::with_frames(64);
        let trace = Rc::new(RefCell::new(Vec::new()));
        let mut inner = RangeFramePool::new(PhysicalFrame::from_index(0), 32);
        let root = inner.alloc_4k().unwrap();
        let mut pool = TracingPool {
            inner,
            trace: Rc::clone(&trace),
        };
        let mut tlb = TracingTlb {
            trace: Rc::clone(&trace),
        };
        let mut engine = GrantEngine::new(&phys, root, &mut pool, &mut tlb);

        engine
            .allocate(AllocateRequest {
                vaddr: va(BASE),
                num_pages: 1,
                writable: true,
            })
            .unwrap();
        trace.borrow_mut().clear();

        engine.free(FreeRequest { vaddr: va(BASE) });
        // The entry is cleared and flushed before ownership of the frame
        // transfers back to the pool.
        assert_eq!(*trace.borrow(), ["flush", "release"]);
    }
}
