use axum::{
    Json,
    extract::{Extension, Query},
    http::{StatusCode, Uri},
};
use std::sync::Arc;

use super::protocol::{
    CardQuery, CardinalityResponse, ExistsResponse, KeyCardinalityResponse, KeyValueRequest,
    MultiExistsRequest, MultiExistsResponse, SimilarityRequest, SimilarityResponse, StatsResponse,
};
use crate::error::EngineError;
use crate::query::{self, Operator};
use crate::storage::SummaryStore;

/// Maps an engine error onto the status code returned to the client.
pub fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::DimensionMismatch { .. } => StatusCode::CONFLICT,
        EngineError::UnknownKey(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidOperator(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn handle_hash(
    Extension(store): Extension<Arc<SummaryStore>>,
    Json(req): Json<KeyValueRequest>,
) -> (StatusCode, Json<CardinalityResponse>) {
    tracing::debug!("[POST] hash key={:?}", req.key);

    let (bloom, hyperloglog) = store.insert_and_count(&req.key, req.value.as_bytes());
    (
        StatusCode::OK,
        Json(CardinalityResponse {
            bloom,
            hyperloglog,
            error: None,
        }),
    )
}

pub async fn handle_exists(
    Extension(store): Extension<Arc<SummaryStore>>,
    Json(req): Json<KeyValueRequest>,
) -> (StatusCode, Json<ExistsResponse>) {
    tracing::debug!("[POST] exists key={:?}", req.key);

    let (status, exists, error) = match store.exists(&req.key, req.value.as_bytes()) {
        Ok(exists) => (StatusCode::OK, exists, None),
        Err(e) => (status_for(&e), false, Some(e.to_string())),
    };
    (
        status,
        Json(ExistsResponse {
            key: req.key,
            value: req.value,
            exists,
            error,
        }),
    )
}

pub async fn handle_card(
    Extension(store): Extension<Arc<SummaryStore>>,
    Query(params): Query<CardQuery>,
) -> (StatusCode, Json<KeyCardinalityResponse>) {
    tracing::debug!("[GET] card key={:?}", params.key);

    if params.key.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(KeyCardinalityResponse {
                key: params.key,
                bloom: 0,
                hyperloglog: 0,
                error: Some("missing query parameter: key".to_string()),
            }),
        );
    }

    match store.cardinality(&params.key) {
        Ok((bloom, hyperloglog)) => (
            StatusCode::OK,
            Json(KeyCardinalityResponse {
                key: params.key,
                bloom,
                hyperloglog,
                error: None,
            }),
        ),
        Err(e) => (
            status_for(&e),
            Json(KeyCardinalityResponse {
                key: params.key,
                bloom: 0,
                hyperloglog: 0,
                error: Some(e.to_string()),
            }),
        ),
    }
}

pub async fn handle_sim(
    Extension(store): Extension<Arc<SummaryStore>>,
    Json(req): Json<SimilarityRequest>,
) -> (StatusCode, Json<SimilarityResponse>) {
    tracing::debug!("[POST] sim {:?} vs {:?}", req.key_1, req.key_2);

    match query::similarity(&store, &req.key_1, &req.key_2) {
        Ok(similarity) => (
            StatusCode::OK,
            Json(SimilarityResponse {
                similarity,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!("Similarity failed: {}", e);
            (
                status_for(&e),
                Json(SimilarityResponse {
                    similarity: 0.0,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

pub async fn handle_exists_bitwise(
    Extension(store): Extension<Arc<SummaryStore>>,
    Json(req): Json<MultiExistsRequest>,
) -> (StatusCode, Json<MultiExistsResponse>) {
    tracing::debug!("[POST] bitwise {} over {} key(s)", req.operator, req.keys.len());

    let result = req.operator.parse::<Operator>().and_then(|op| {
        query::bitwise_exists(&store, &req.keys, req.value.as_bytes(), op).map(|hit| (op, hit))
    });
    multi_exists_response(req.operator, result)
}

pub async fn handle_exists_chaining(
    Extension(store): Extension<Arc<SummaryStore>>,
    Json(req): Json<MultiExistsRequest>,
) -> (StatusCode, Json<MultiExistsResponse>) {
    tracing::debug!("[POST] chaining {} over {} key(s)", req.operator, req.keys.len());

    let result = req
        .operator
        .parse::<Operator>()
        .map(|op| (op, query::chaining_exists(&store, &req.keys, req.value.as_bytes(), op)));
    multi_exists_response(req.operator, result)
}

fn multi_exists_response(
    raw_operator: String,
    result: crate::error::Result<(Operator, bool)>,
) -> (StatusCode, Json<MultiExistsResponse>) {
    match result {
        Ok((op, exists)) => (
            StatusCode::OK,
            Json(MultiExistsResponse {
                operator: op.to_string(),
                exists,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!("Multi-key exists failed: {}", e);
            (
                status_for(&e),
                Json(MultiExistsResponse {
                    operator: raw_operator,
                    exists: false,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

pub async fn handle_stats(
    Extension(store): Extension<Arc<SummaryStore>>,
) -> (StatusCode, Json<StatsResponse>) {
    tracing::debug!("[GET] stats");

    let config = store.config();
    (
        StatusCode::OK,
        Json(StatsResponse {
            keys: store.len(),
            dirty_keys: store.dirty_count(),
            filter_bits: config.filter_bits,
            hash_count: config.hash_count,
            precision: config.precision,
        }),
    )
}

pub async fn handle_fallback(uri: Uri) -> StatusCode {
    tracing::info!("No route for {}", uri.path());
    StatusCode::NOT_FOUND
}
