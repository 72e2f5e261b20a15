//! Engine Error Types
//!
//! Every fallible operation in the summary engine returns [`EngineError`].
//! Process-level code (startup, argument parsing) wraps these in `anyhow`.

use std::fmt;
use thiserror::Error;

/// The `(M, k, seed)` triple that two filters must share to be combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterShape {
    pub bits: u64,
    pub hashes: u16,
    pub seed: u64,
}

impl fmt::Display for FilterShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m={}, k={}, seed={:#x}", self.bits, self.hashes, self.seed)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Two filters with different shapes were combined.
    #[error("dimension mismatch: ({left}) vs ({right})")]
    DimensionMismatch { left: FilterShape, right: FilterShape },

    /// A direct query named a key that was never created.
    #[error("unknown key: {0}")]
    UnknownKey(String),

    /// The durable store rejected a read or a write.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    /// Bytes loaded from the durable store do not decode to a valid summary.
    #[error("corrupt state: {0}")]
    CorruptState(String),

    #[error("invalid operator: {0:?} (expected AND or OR)")]
    InvalidOperator(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    pub(crate) fn persistence(err: impl fmt::Display) -> Self {
        Self::PersistenceFailure(err.to_string())
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptState(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
