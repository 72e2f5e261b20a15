//! Cardinality Estimator (HyperLogLog)
//!
//! `2^p` one-byte registers. Each value is hashed to 64 bits; the top `p` bits
//! select a register and the rank (leading zeros + 1) of the remaining bits is
//! folded in with `max`, so registers never decrease.
//!
//! Estimation uses the bias-corrected harmonic mean with the three standard
//! regimes:
//! - small range: linear counting while some registers are still zero,
//! - normal range: raw estimate,
//! - large range: correction against the 2^64 hash ceiling, saturating at
//!   `u64::MAX` once the raw estimate reaches the ceiling.

use super::hash::{ESTIMATOR_SALT, derive_seed, hash64};
use crate::config::{MAX_PRECISION, MIN_PRECISION};
use crate::error::{EngineError, Result};

const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardinalityEstimator {
    precision: u8,
    seed: u64,
    registers: Vec<u8>,
}

impl CardinalityEstimator {
    /// Creates all-zero registers. `precision` must lie in
    /// `[MIN_PRECISION, MAX_PRECISION]`.
    pub fn new(precision: u8, seed: u64) -> Self {
        Self {
            precision,
            seed: derive_seed(seed, ESTIMATOR_SALT),
            registers: vec![0; 1 << precision],
        }
    }

    /// Rebuilds an estimator from persisted parts. `seed` is the already-derived
    /// hash key returned by [`Self::seed`].
    pub fn from_parts(precision: u8, seed: u64, registers: Vec<u8>) -> Result<Self> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
            return Err(EngineError::corrupt(format!(
                "estimator precision {} out of range",
                precision
            )));
        }
        if registers.len() != 1 << precision {
            return Err(EngineError::corrupt(format!(
                "estimator precision {} expects {} registers, found {}",
                precision,
                1usize << precision,
                registers.len()
            )));
        }
        let max_rank = Self::max_rank_for(precision);
        if let Some(bad) = registers.iter().find(|&&r| r > max_rank) {
            return Err(EngineError::corrupt(format!(
                "estimator register rank {} exceeds maximum {}",
                bad, max_rank
            )));
        }

        Ok(Self {
            precision,
            seed,
            registers,
        })
    }

    pub fn add(&mut self, value: &[u8]) {
        let hash = hash64(value, self.seed);
        let p = u32::from(self.precision);
        let idx = (hash >> (64 - p)) as usize;
        // the guard bit caps the rank at 64 - p + 1
        let rest = (hash << p) | (1u64 << (p - 1));
        let rank = (rest.leading_zeros() + 1) as u8;

        let register = &mut self.registers[idx];
        if rank > *register {
            *register = rank;
        }
    }

    pub fn estimate(&self) -> u64 {
        let m = self.registers.len() as f64;

        let mut sum = 0.0f64;
        let mut zeros = 0usize;
        for &rank in &self.registers {
            sum += 1.0 / (1u64 << rank) as f64;
            if rank == 0 {
                zeros += 1;
            }
        }

        if zeros == self.registers.len() {
            return 0;
        }

        let raw = alpha(self.registers.len()) * m * m / sum;

        let estimate = if raw <= 2.5 * m {
            if zeros > 0 {
                m * (m / zeros as f64).ln()
            } else {
                raw
            }
        } else if raw <= TWO_POW_64 / 30.0 {
            raw
        } else {
            let ratio = raw / TWO_POW_64;
            if ratio >= 1.0 {
                return u64::MAX;
            }
            -TWO_POW_64 * (1.0 - ratio).ln()
        };

        // `as` saturates at u64::MAX
        estimate.round() as u64
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn registers(&self) -> &[u8] {
        &self.registers
    }

    pub fn is_empty(&self) -> bool {
        self.registers.iter().all(|&r| r == 0)
    }

    fn max_rank_for(precision: u8) -> u8 {
        64 - precision + 1
    }
}

fn alpha(m: usize) -> f64 {
    match m {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / m as f64),
    }
}
