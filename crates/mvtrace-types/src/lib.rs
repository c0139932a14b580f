//! Types shared between the tracer and the engine it instruments.
//!
//! The engine commits to this contract: it names each executed instruction
//! with a stable [`Opcode`], identifies sessions with a [`TxnId`] and rows
//! with a [`RowId`]. Nothing here depends on the tracer itself.

use std::fmt;
use std::num::NonZeroU64;

pub mod opcode;

pub use opcode::{Instruction, Opcode, VdbeOp};

/// Identifier of one engine session and, because sessions run one
/// transaction at a time on one thread, of the transaction it produced.
///
/// Domain: `1..=u64::MAX`. Zero is reserved so `Option<TxnId>` stays
/// pointer-sized.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct TxnId(NonZeroU64);

impl TxnId {
    /// Construct a `TxnId`, rejecting zero.
    #[inline]
    pub const fn new(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(nz) => Some(Self(nz)),
            None => None,
        }
    }

    /// Get the raw u64 value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn#{}", self.get())
    }
}

/// RowId / INTEGER PRIMARY KEY key space (signed 64-bit).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct RowId(i64);

impl RowId {
    #[inline]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RowId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}
