//! Per-key Summary and its persisted encoding.
//!
//! A [`Summary`] pairs one [`BitFilter`] with one [`CardinalityEstimator`] and
//! tracks durability with a dirty flag plus a version counter. The version is
//! bumped on every insert so a flush can tell whether the state it persisted is
//! still the latest one before clearing the flag.

use crate::config::SketchConfig;
use crate::error::{EngineError, Result};
use crate::sketch::{BitFilter, CardinalityEstimator};
use serde::{Deserialize, Serialize};

/// Leading version byte of the persisted encoding. Version 2 keys both hash
/// streams through `derive_seed`; version 1 summaries hash differently and are
/// rejected.
pub const FORMAT_VERSION: u8 = 2;

#[derive(Debug, Clone)]
pub struct Summary {
    filter: BitFilter,
    estimator: CardinalityEstimator,
    dirty: bool,
    version: u64,
}

impl Summary {
    pub fn new(config: &SketchConfig) -> Self {
        Self {
            filter: BitFilter::new(config.filter_bits, config.hash_count, config.seed),
            estimator: CardinalityEstimator::new(config.precision, config.seed),
            dirty: false,
            version: 0,
        }
    }

    /// Wraps state loaded from the durable store; it starts clean.
    pub fn restored(filter: BitFilter, estimator: CardinalityEstimator) -> Self {
        Self {
            filter,
            estimator,
            dirty: false,
            version: 0,
        }
    }

    /// Swaps in persisted state, leaving the summary clean. The version still
    /// moves forward so a flush that snapshotted the old state cannot clear a
    /// dirty flag set afterwards.
    pub fn replace_with(&mut self, filter: BitFilter, estimator: CardinalityEstimator) {
        self.filter = filter;
        self.estimator = estimator;
        self.dirty = false;
        self.version += 1;
    }

    pub fn insert(&mut self, value: &[u8]) {
        self.filter.insert(value);
        self.estimator.add(value);
        self.dirty = true;
        self.version += 1;
    }

    pub fn test(&self, value: &[u8]) -> bool {
        self.filter.test(value)
    }

    /// `(filter estimate, estimator estimate)`.
    pub fn cardinality(&self) -> (u64, u64) {
        (self.filter.approx_cardinality(), self.estimator.estimate())
    }

    pub fn snapshot(&self) -> SummarySnapshot {
        SummarySnapshot {
            filter: self.filter.clone(),
            estimator: self.estimator.clone(),
            version: self.version,
        }
    }

    /// Clears the dirty flag if no insert happened since `version` was observed.
    pub fn mark_clean(&mut self, version: u64) -> bool {
        if self.version == version {
            self.dirty = false;
            true
        } else {
            false
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn filter(&self) -> &BitFilter {
        &self.filter
    }

    pub fn estimator(&self) -> &CardinalityEstimator {
        &self.estimator
    }
}

/// A consistent copy of a summary's filter and estimator, taken under the
/// summary's lock.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySnapshot {
    pub filter: BitFilter,
    pub estimator: CardinalityEstimator,
    pub version: u64,
}

#[derive(Serialize, Deserialize)]
struct PersistedSummary {
    format: u8,
    filter_bits: u64,
    hash_count: u16,
    filter_seed: u64,
    words: Vec<u64>,
    precision: u8,
    estimator_seed: u64,
    registers: Vec<u8>,
}

impl SummarySnapshot {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let persisted = PersistedSummary {
            format: FORMAT_VERSION,
            filter_bits: self.filter.num_bits(),
            hash_count: self.filter.num_hashes(),
            filter_seed: self.filter.seed(),
            words: self.filter.words().to_vec(),
            precision: self.estimator.precision(),
            estimator_seed: self.estimator.seed(),
            registers: self.estimator.registers().to_vec(),
        };
        bincode::serialize(&persisted).map_err(EngineError::persistence)
    }

    /// Decodes bytes produced by [`Self::encode`]. Malformed input yields
    /// `CorruptState`; the returned snapshot has version 0.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let persisted: PersistedSummary = bincode::deserialize(bytes)
            .map_err(|e| EngineError::corrupt(format!("undecodable summary: {}", e)))?;

        if persisted.format != FORMAT_VERSION {
            return Err(EngineError::corrupt(format!(
                "unsupported summary format {} (expected {})",
                persisted.format, FORMAT_VERSION
            )));
        }

        let filter = BitFilter::from_parts(
            persisted.filter_bits,
            persisted.hash_count,
            persisted.filter_seed,
            persisted.words,
        )?;
        let estimator = CardinalityEstimator::from_parts(
            persisted.precision,
            persisted.estimator_seed,
            persisted.registers,
        )?;

        Ok(Self {
            filter,
            estimator,
            version: 0,
        })
    }
}
