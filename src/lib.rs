//! Hyperbloom Summary Engine Library
//!
//! Keeps, per string key, a probabilistic summary of every value inserted under
//! it: a Bloom filter for membership and a HyperLogLog-style register array for
//! distinct counts. Summaries live in memory and are flushed to a durable store
//! in the background.
//!
//! ## Architecture Modules
//!
//! - **`sketch`**: the two probabilistic structures and the shared hash scheme.
//! - **`storage`**: the per-key `SummaryStore`, the persisted encoding, and the
//!   `DurableStore` backends (in-memory and redb).
//! - **`query`**: multi-key existence (bitwise and chaining) and similarity.
//! - **`flusher`**: the background coordinator that persists dirty summaries and
//!   drains them on shutdown.
//! - **`api`**: the axum HTTP boundary.
//! - **`config`** / **`error`**: runtime parameters and the engine error type.

pub mod api;
pub mod config;
pub mod error;
pub mod flusher;
pub mod query;
pub mod sketch;
pub mod storage;
