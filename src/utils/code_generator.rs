//! Short code generation.
//!
//! Codes are drawn from the 62-character alphanumeric alphabet using the
//! thread-local CSPRNG. The generator knows nothing about collisions; the
//! service retries when the store rejects a code.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Source of candidate short codes.
#[cfg_attr(test, mockall::automock)]
pub trait CodeProvider: Send + Sync {
    /// Returns a code of exactly `length` characters.
    fn get(&self, length: usize) -> String;
}

/// Uniform random alphanumeric codes (`[A-Za-z0-9]`).
///
/// Uses [`rand::rng`], a ChaCha-based CSPRNG reseeded from the operating
/// system, so every call is independent and the provider can be shared across
/// tasks without coordination.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeProvider;

impl CodeProvider for RandomCodeProvider {
    fn get(&self, length: usize) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect()
    }
}
