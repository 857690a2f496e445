//! # Page-Grant Engine
//!
//! Lets a privileged caller place zero-filled physical frames at chosen
//! virtual addresses in an explicit address space, and release them
//! again, bypassing the demand-paging fault path.
//!
//! ## What you get
//! - [`GrantEngine`]: the ALLOCATE/FREE orchestrator over an
//!   [`AddressSpace`](memgrant_vmem::AddressSpace).
//! - [`FramePool`]: the frame acquire/release seam, plus
//!   [`RangeFramePool`] as a concrete pool for early boot and tests.
//! - [`dispatch`](dispatch::dispatch): the control surface decoding an
//!   opaque `(opcode, payload)` command into a typed request.
//! - [`GrantEngine::map_physical_range`]: the raw memory-mapping bridge
//!   (an explicit escape hatch, not integrated with grant bookkeeping).
//!
//! ## Semantics in brief
//!
//! ALLOCATE maps `num_pages` fresh zero-filled frames starting at the
//! page containing `vaddr`, read-write or read-only, failing on the first
//! page that is already mapped or cannot be backed. The per-page loop is
//! **not transactional**: pages bound before a failure stay bound (see
//! [`GrantEngine::allocate`]). FREE unbinds exactly one page and is a
//! successful no-op when nothing is mapped there.
//!
//! ## Concurrency
//!
//! One call per address space at a time. Every mutating operation takes
//! `&mut self`, so safe Rust already forbids two in-flight calls through
//! one engine; constructing two engines over the same root frame is the
//! caller's correctness hazard, the engine does no internal locking.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod dispatch;
mod engine;
mod pool;

pub use crate::engine::{
    AccessKind, AllocateRequest, FreeRequest, GrantEngine, GrantError, MAX_PAGES_PER_REQUEST,
};
pub use crate::pool::{FramePool, RangeFramePool};
