//! HTTP Boundary
//!
//! A thin axum layer over the [`SummaryStore`] and the query functions. Every
//! handler is synchronous work wrapped in an async signature: nothing here
//! touches the durable store.
//!
//! ## Submodules
//! - **`protocol`**: endpoint paths and JSON bodies.
//! - **`handlers`**: one handler per endpoint plus the logging fallback.

pub mod handlers;
pub mod protocol;

use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use std::sync::Arc;

use crate::storage::SummaryStore;
use handlers::*;
use protocol::*;

/// Builds the service router with `store` shared by every handler.
pub fn router(store: Arc<SummaryStore>) -> Router {
    Router::new()
        .route(ENDPOINT_HASH, post(handle_hash))
        .route(ENDPOINT_EXISTS, post(handle_exists))
        .route(ENDPOINT_EXISTS_BITWISE, post(handle_exists_bitwise))
        .route(ENDPOINT_EXISTS_CHAINING, post(handle_exists_chaining))
        .route(ENDPOINT_CARD, get(handle_card))
        .route(ENDPOINT_SIM, post(handle_sim))
        .route(ENDPOINT_STATS, get(handle_stats))
        .fallback(handle_fallback)
        .layer(Extension(store))
}
