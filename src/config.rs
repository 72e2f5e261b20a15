//! Runtime Configuration
//!
//! Two layers:
//! - [`SketchConfig`] fixes the shape of every newly created summary (filter size,
//!   hash count, estimator precision, hash seed). These constants determine the
//!   false-positive and estimation-error contracts, so they are explicit rather
//!   than hard-coded.
//! - [`Config`] is the process configuration parsed from `--flag value` arguments.

use crate::error::{EngineError, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_EXPECTED_ITEMS: u64 = 10_000;
pub const DEFAULT_FPP: f64 = 0.01;
pub const DEFAULT_PRECISION: u8 = 14;
pub const DEFAULT_SEED: u64 = 0x9E37_79B9_7F4A_7C15;
pub const MIN_PRECISION: u8 = 4;
pub const MAX_PRECISION: u8 = 18;
/// Largest accepted filter (2^32 bits, 512 MiB per key).
pub const MAX_FILTER_BITS: u64 = 1 << 32;

const DEFAULT_BIND: &str = "0.0.0.0:5000";
const DEFAULT_DB_PATH: &str = "hyperbloom.redb";
const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Path value that selects the in-memory durable store.
pub const MEMORY_DB: &str = ":memory:";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SketchConfig {
    /// Filter size in bits (M).
    pub filter_bits: u64,
    /// Number of index functions (k).
    pub hash_count: u16,
    /// Estimator precision; the estimator keeps `2^precision` registers.
    pub precision: u8,
    pub seed: u64,
}

impl SketchConfig {
    /// Sizes the filter for `expected_items` distinct values at a target
    /// false-positive probability.
    pub fn with_accuracy(expected_items: u64, fpp: f64) -> Result<Self> {
        if expected_items == 0 {
            return Err(EngineError::InvalidConfig(
                "expected items must be greater than 0".to_string(),
            ));
        }
        if !(fpp > 0.0 && fpp < 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "false positive probability must be in (0, 1), got {}",
                fpp
            )));
        }

        let n = expected_items as f64;
        let ln2 = std::f64::consts::LN_2;
        let filter_bits = (-n * fpp.ln() / (ln2 * ln2)).ceil() as u64;
        if filter_bits > MAX_FILTER_BITS {
            return Err(EngineError::InvalidConfig(format!(
                "{} items at fpp {} need {} bits, above the maximum of {}",
                expected_items, fpp, filter_bits, MAX_FILTER_BITS
            )));
        }
        let hash_count = ((filter_bits as f64 / n) * ln2).round().max(1.0) as u16;

        Ok(Self {
            filter_bits,
            hash_count,
            precision: DEFAULT_PRECISION,
            seed: DEFAULT_SEED,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.filter_bits == 0 {
            return Err(EngineError::InvalidConfig(
                "filter must have at least one bit".to_string(),
            ));
        }
        if self.filter_bits > MAX_FILTER_BITS {
            return Err(EngineError::InvalidConfig(format!(
                "filter size {} bits exceeds the maximum of {}",
                self.filter_bits, MAX_FILTER_BITS
            )));
        }
        if self.hash_count == 0 {
            return Err(EngineError::InvalidConfig(
                "filter needs at least one hash function".to_string(),
            ));
        }
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&self.precision) {
            return Err(EngineError::InvalidConfig(format!(
                "precision must be in [{}, {}], got {}",
                MIN_PRECISION, MAX_PRECISION, self.precision
            )));
        }
        Ok(())
    }
}

impl Default for SketchConfig {
    fn default() -> Self {
        let ln2 = std::f64::consts::LN_2;
        let n = DEFAULT_EXPECTED_ITEMS as f64;
        let filter_bits = (-n * DEFAULT_FPP.ln() / (ln2 * ln2)).ceil() as u64;
        Self {
            filter_bits,
            hash_count: ((filter_bits as f64 / n) * ln2).round() as u16,
            precision: DEFAULT_PRECISION,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub flush_interval: Duration,
    pub sketch: SketchConfig,
    pub verbose: bool,
}

impl Config {
    /// Parses process arguments (including the program name at index 0).
    ///
    /// Filter sizing comes from `--expected-items`/`--fpp` unless `--filter-bits`
    /// and `--hashes` override it explicitly. Unknown flags are ignored.
    pub fn from_args(args: &[String]) -> anyhow::Result<Self> {
        let mut bind_addr: SocketAddr = DEFAULT_BIND.parse()?;
        let mut db_path = PathBuf::from(DEFAULT_DB_PATH);
        let mut flush_interval = DEFAULT_FLUSH_INTERVAL;
        let mut expected_items = DEFAULT_EXPECTED_ITEMS;
        let mut fpp = DEFAULT_FPP;
        let mut filter_bits: Option<u64> = None;
        let mut hash_count: Option<u16> = None;
        let mut precision = DEFAULT_PRECISION;
        let mut seed = DEFAULT_SEED;
        let mut verbose = false;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--verbose" => {
                    verbose = true;
                    i += 1;
                    continue;
                }
                "--bind" => bind_addr = flag_value(args, i)?.parse()?,
                "--db" => db_path = PathBuf::from(flag_value(args, i)?),
                "--flush-interval-ms" => {
                    flush_interval = Duration::from_millis(flag_value(args, i)?.parse()?)
                }
                "--expected-items" => expected_items = flag_value(args, i)?.parse()?,
                "--fpp" => fpp = flag_value(args, i)?.parse()?,
                "--filter-bits" => filter_bits = Some(flag_value(args, i)?.parse()?),
                "--hashes" => hash_count = Some(flag_value(args, i)?.parse()?),
                "--precision" => precision = flag_value(args, i)?.parse()?,
                "--seed" => seed = flag_value(args, i)?.parse()?,
                _ => {
                    i += 1;
                    continue;
                }
            }
            i += 2;
        }

        if flush_interval.is_zero() {
            anyhow::bail!("--flush-interval-ms must be greater than 0");
        }

        let sized = SketchConfig::with_accuracy(expected_items, fpp)?;
        let sketch = SketchConfig {
            filter_bits: filter_bits.unwrap_or(sized.filter_bits),
            hash_count: hash_count.unwrap_or(sized.hash_count),
            precision,
            seed,
        };
        sketch.validate()?;

        Ok(Self {
            bind_addr,
            db_path,
            flush_interval,
            sketch,
            verbose,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.db_path.as_os_str() == MEMORY_DB
    }
}

fn flag_value(args: &[String], i: usize) -> anyhow::Result<&str> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("{} requires a value", args[i]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("hyperbloom")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_default_sketch_matches_accuracy_sizing() {
        let sized = SketchConfig::with_accuracy(DEFAULT_EXPECTED_ITEMS, DEFAULT_FPP).unwrap();
        let default = SketchConfig::default();

        assert_eq!(default, sized);
        // 10k items at 1% -> ~95.9k bits, 7 hashes
        assert_eq!(default.hash_count, 7);
        assert!(default.filter_bits > 95_000 && default.filter_bits < 96_000);
    }

    #[test]
    fn test_with_accuracy_rejects_bad_input() {
        assert!(SketchConfig::with_accuracy(0, 0.01).is_err());
        assert!(SketchConfig::with_accuracy(100, 0.0).is_err());
        assert!(SketchConfig::with_accuracy(100, 1.0).is_err());
    }

    #[test]
    fn test_oversized_filters_are_rejected() {
        let mut config = SketchConfig::default();
        config.filter_bits = MAX_FILTER_BITS;
        assert!(config.validate().is_ok());

        config.filter_bits = MAX_FILTER_BITS + 1;
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));

        assert!(SketchConfig::with_accuracy(u64::MAX, 0.01).is_err());
        assert!(SketchConfig::with_accuracy(1_000_000_000, 1e-9).is_err());
    }

    #[test]
    fn test_from_args_rejects_filter_too_large_to_allocate() {
        assert!(Config::from_args(&args(&["--filter-bits", "18446744073709551615"])).is_err());
        assert!(Config::from_args(&args(&["--expected-items", "18446744073709551615"])).is_err());
        assert!(Config::from_args(&args(&["--filter-bits", "4294967297"])).is_err());
        assert!(Config::from_args(&args(&["--filter-bits", "4294967296"])).is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_precision() {
        let mut config = SketchConfig::default();
        config.precision = 3;
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));

        config.precision = 19;
        assert!(config.validate().is_err());

        config.precision = 10;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_args_defaults() {
        let config = Config::from_args(&args(&[])).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:5000".parse().unwrap());
        assert_eq!(config.db_path, PathBuf::from("hyperbloom.redb"));
        assert_eq!(config.flush_interval, Duration::from_secs(5));
        assert_eq!(config.sketch, SketchConfig::default());
        assert!(!config.verbose);
        assert!(!config.uses_memory_store());
    }

    #[test]
    fn test_from_args_overrides() {
        let config = Config::from_args(&args(&[
            "--bind",
            "127.0.0.1:7000",
            "--db",
            ":memory:",
            "--flush-interval-ms",
            "250",
            "--filter-bits",
            "4096",
            "--hashes",
            "3",
            "--precision",
            "10",
            "--verbose",
            "--unknown",
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:7000".parse().unwrap());
        assert!(config.uses_memory_store());
        assert_eq!(config.flush_interval, Duration::from_millis(250));
        assert_eq!(config.sketch.filter_bits, 4096);
        assert_eq!(config.sketch.hash_count, 3);
        assert_eq!(config.sketch.precision, 10);
        assert!(config.verbose);
    }

    #[test]
    fn test_from_args_errors() {
        assert!(Config::from_args(&args(&["--bind"])).is_err());
        assert!(Config::from_args(&args(&["--bind", "not-an-addr"])).is_err());
        assert!(Config::from_args(&args(&["--flush-interval-ms", "0"])).is_err());
        assert!(Config::from_args(&args(&["--hashes", "0"])).is_err());
    }
}
