//! Durability Module
//!
//! Keeps the durable store in step with the in-memory summaries. The
//! [`FlushCoordinator`] runs as one background task with the lifecycle
//! `Running -> Draining -> Stopped`; the process owns it through a
//! [`FlushHandle`], which delivers the one-shot shutdown signal and waits for
//! the final pass before the durable store is released.

pub mod coordinator;
pub mod types;

pub use coordinator::{FlushCoordinator, FlushHandle};
pub use types::{FlushReport, FlushState};

#[cfg(test)]
mod tests;
