//! Combination Query Module
//!
//! Multi-key questions answered from the per-key filters. Two existence modes
//! take the same inputs (keys, value, operator) but mean different things:
//!
//! - **Bitwise** (`bitwise_exists`): merge the filters' bit arrays with AND/OR,
//!   then test the value once. Structural; OR may amplify false positives.
//! - **Chaining** (`chaining_exists`): test each filter on its own and combine
//!   the booleans, short-circuiting. Logical; each key keeps its own error rate.
//!
//! Plus `similarity`, a Jaccard estimate from intersection/union bit counts.
//! Every query here is in-memory and never awaits.

pub mod engine;
pub mod types;

pub use engine::{bitwise_exists, chaining_exists, similarity};
pub use types::Operator;
