//! Probabilistic Sketch Module
//!
//! The two per-key primitives of the engine:
//!
//! - **`filter`**: [`BitFilter`], an approximate membership filter (one-sided error,
//!   bitwise AND/OR combination, fill-ratio cardinality estimate).
//! - **`estimator`**: [`CardinalityEstimator`], a HyperLogLog register array for
//!   distinct counts.
//! - **`hash`**: the `wyhash`-based hash family both structures are driven by.
//!
//! Neither type is synchronized; the summary store serializes access per key.

pub mod estimator;
pub mod filter;
pub mod hash;

pub use estimator::CardinalityEstimator;
pub use filter::BitFilter;
