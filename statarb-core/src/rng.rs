//! Deterministic RNG hierarchy.
//!
//! A master seed generates deterministic sub-seeds for each `(stream, iteration)`
//! pair. Sub-seeds are derived via BLAKE3 hashing, independently of the order in
//! which streams are requested, so a simulated dataset is identical whether it
//! is generated alone or as one of many.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Deterministic RNG hierarchy.
///
/// The master seed is expanded into per-(stream, iteration) sub-seeds using
/// BLAKE3. Streams are free-form labels such as `"pair"` or `"sector"`.
#[derive(Debug, Clone)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a deterministic sub-seed for a specific (stream, iteration).
    pub fn sub_seed(&self, stream: &str, iteration: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(stream.as_bytes());
        hasher.update(&iteration.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Create a seeded StdRng for a stream.
    pub fn rng_for(&self, stream: &str, iteration: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(stream, iteration))
    }
}
