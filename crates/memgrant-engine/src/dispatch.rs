//! Control-command surface.
//!
//! The engine is driven through an opaque `(opcode, payload)` pair, the
//! shape a character-device control call hands the kernel. This module
//! owns the decode step: validate the opcode, pull the fixed-layout
//! request out of the payload bytes, and forward the typed request to
//! [`GrantEngine`]. Payload words are little-endian `u64`s; a payload
//! shorter than its command's layout is a caller fault, reported as
//! [`DispatchError::BadRequestCopy`] before the engine is touched.

use crate::engine::{AllocateRequest, FreeRequest, GrantEngine, GrantError};
use crate::pool::FramePool;
use memgrant_addresses::VirtualAddress;
use memgrant_vmem::{PhysMapper, TlbInvalidate};

/// ALLOCATE: `{ vaddr: u64, num_pages: u64, writable: u64 }`, 24 bytes.
pub const OP_ALLOCATE: u32 = 0x4D01;
/// FREE: `{ vaddr: u64 }`, 8 bytes.
pub const OP_FREE: u32 = 0x4D02;

const ALLOCATE_LEN: usize = 24;
const FREE_LEN: usize = 8;

/// Failures of [`dispatch`], covering both decode and execution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The payload is shorter than the command's request layout.
    #[error("request payload truncated")]
    BadRequestCopy,
    /// The opcode names no known command.
    #[error("unsupported command {0:#x}")]
    UnsupportedCommand(u32),
    /// The decoded request failed inside the engine.
    #[error(transparent)]
    Grant(#[from] GrantError),
}

/// Little-endian `u64` at word position `idx`. Bounds were checked by the
/// caller against the command layout.
fn word(payload: &[u8], idx: usize) -> u64 {
    let off = idx * 8;
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&payload[off..off + 8]);
    u64::from_le_bytes(bytes)
}

/// Decode one control command and run it against `engine`.
///
/// FREE reports success even when the page was never mapped; the engine
/// treats that as a no-op.
///
/// # Errors
/// [`DispatchError::BadRequestCopy`] on a truncated payload,
/// [`DispatchError::UnsupportedCommand`] on an unknown opcode, and any
/// [`GrantError`] from executing a decoded ALLOCATE.
pub fn dispatch<M, P, T>(
    engine: &mut GrantEngine<'_, M, P, T>,
    opcode: u32,
    payload: &[u8],
) -> Result<(), DispatchError>
where
    M: PhysMapper,
    P: FramePool,
    T: TlbInvalidate,
{
    match opcode {
        OP_ALLOCATE => {
            if payload.len() < ALLOCATE_LEN {
                return Err(DispatchError::BadRequestCopy);
            }
            let req = AllocateRequest {
                vaddr: VirtualAddress::new(word(payload, 0)),
                num_pages: word(payload, 1),
                writable: word(payload, 2) != 0,
            };
            engine.allocate(req)?;
            Ok(())
        }
        OP_FREE => {
            if payload.len() < FREE_LEN {
                return Err(DispatchError::BadRequestCopy);
            }
            engine.free(FreeRequest {
                vaddr: VirtualAddress::new(word(payload, 0)),
            });
            Ok(())
        }
        other => {
            log::debug!("dispatch: unsupported command {other:#x}");
            Err(DispatchError::UnsupportedCommand(other))
        }
    }
}
