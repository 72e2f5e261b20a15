//! Summary Storage Module
//!
//! Holds the per-key state of the engine and its path to durable storage.
//!
//! ## Core Concepts
//! - **Summary**: one membership filter plus one cardinality estimator per key,
//!   with a dirty flag and a version counter for the flusher.
//! - **SummaryStore**: the concurrency-safe key -> summary map. Keys are created on
//!   first insert and never evicted.
//! - **DurableStore**: the opaque `put`/`get` boundary summaries are flushed to and
//!   restored from at startup.

pub mod durable;
pub mod memory;
pub mod summary;

pub use durable::{DurableStore, MemoryStore, RedbStore};
pub use memory::{SummaryHandle, SummaryStore};
pub use summary::{Summary, SummarySnapshot};
