use wyhash::wyhash;

/// Keys the filter's hash stream.
pub const FILTER_SALT: u64 = 0xBF58_476D_1CE4_E5B9;
/// Keys the estimator's hash stream, independent of the filter's even when both
/// are configured with the same seed.
pub const ESTIMATOR_SALT: u64 = 0x94D0_49BB_1331_11EB;

/// Spreads a configured seed over all 64 bits. wyhash multiplies the seed
/// straight into short inputs, so small or structured seeds (0, 1, 42) must
/// never reach it unmixed.
#[inline]
pub fn derive_seed(seed: u64, salt: u64) -> u64 {
    wyhash(&seed.to_le_bytes(), salt)
}

/// Base pair for double hashing: `h0 = H(value, key)`, `h1 = H(value, h0)`,
/// with `key` derived from `seed`.
#[inline]
pub fn hash_pair(value: &[u8], seed: u64) -> (u64, u64) {
    let h0 = wyhash(value, derive_seed(seed, FILTER_SALT));
    let h1 = wyhash(value, h0);
    (h0, h1)
}

/// The `i`-th probe position (1-based) in a filter of `num_bits` bits
/// (Kirsch-Mitzenmacher).
#[inline]
pub fn probe_index(h0: u64, h1: u64, i: u16, num_bits: u64) -> u64 {
    let hash = h0.wrapping_add(u64::from(i).wrapping_mul(h1));
    (hash >> 1) % num_bits
}

/// Hashes with an already-derived key (see [`derive_seed`]).
#[inline]
pub fn hash64(value: &[u8], key: u64) -> u64 {
    wyhash(value, key)
}
