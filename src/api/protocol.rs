//! HTTP Protocol
//!
//! Endpoint paths and the JSON bodies exchanged with clients. Values and keys
//! are plain strings on the wire; the engine treats them as opaque bytes.
//!
//! Error responses keep the endpoint's usual shape with zeroed payload fields
//! and a populated `error` message.

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Insert a value under a key.
pub const ENDPOINT_HASH: &str = "/hyperbloom/hash";
/// Membership test against a single key.
pub const ENDPOINT_EXISTS: &str = "/hyperbloom/exists";
/// Multi-key membership over combined bit arrays.
pub const ENDPOINT_EXISTS_BITWISE: &str = "/hyperbloom/exists/bitwise";
/// Multi-key membership over individual answers.
pub const ENDPOINT_EXISTS_CHAINING: &str = "/hyperbloom/exists/chaining";
/// Cardinality estimates of a key (`?key=`).
pub const ENDPOINT_CARD: &str = "/hyperbloom/card";
/// Jaccard similarity of two keys.
pub const ENDPOINT_SIM: &str = "/hyperbloom/sim";
/// Store-wide counters and the active sketch parameters.
pub const ENDPOINT_STATS: &str = "/hyperbloom/stats";

// --- Data Transfer Objects ---

/// Body of `hash` and `exists`.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyValueRequest {
    pub key: String,
    pub value: String,
}

/// Both estimates of a key's distinct-value count.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CardinalityResponse {
    /// Estimate derived from the filter's set bits.
    pub bloom: u64,
    /// Register-based estimate.
    pub hyperloglog: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ExistsResponse {
    pub key: String,
    pub value: String,
    /// `false` means definitely absent; `true` means probably present.
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CardQuery {
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct KeyCardinalityResponse {
    pub key: String,
    pub bloom: u64,
    pub hyperloglog: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimilarityRequest {
    pub key_1: String,
    pub key_2: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SimilarityResponse {
    /// Estimated Jaccard index in `[0, 1]`.
    pub similarity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of both multi-key existence endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct MultiExistsRequest {
    pub keys: Vec<String>,
    pub value: String,
    /// `"AND"` or `"OR"`, any case.
    pub operator: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MultiExistsResponse {
    pub operator: String,
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StatsResponse {
    pub keys: usize,
    pub dirty_keys: usize,
    pub filter_bits: u64,
    pub hash_count: u16,
    pub precision: u8,
}
