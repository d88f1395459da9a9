//! Injected randomness for key and IV generation
//!
//! The random source is the only process-wide shared state the crypto core
//! touches. It is modelled as a capability so tests can pin it to a fixed
//! seed while production code reads OS entropy.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};

/// A cryptographically secure byte source.
///
/// Implementations must fail rather than fall back to a weaker source.
pub trait SecureRandomSource: Send + Sync {
    /// Fill `dest` entirely with random bytes.
    fn fill(&self, dest: &mut [u8]) -> CryptoResult<()>;
}

/// Operating-system entropy (`getrandom` under the hood).
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl SecureRandomSource for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> CryptoResult<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| CryptoError::RandomSourceUnavailable(e.to_string()))
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use seeded::SeededRandom;

#[cfg(any(test, feature = "test-util"))]
mod seeded {
    use std::sync::Mutex;

    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    use super::SecureRandomSource;
    use crate::error::{CryptoError, CryptoResult};

    /// Deterministic source seeded from a fixed value.
    ///
    /// Only built with the `test-util` feature. Two instances built from the
    /// same seed produce the same key and IV sequence.
    pub struct SeededRandom {
        rng: Mutex<StdRng>,
    }

    impl SeededRandom {
        pub fn new(seed: u64) -> Self {
            Self {
                rng: Mutex::new(StdRng::seed_from_u64(seed)),
            }
        }
    }

    impl SecureRandomSource for SeededRandom {
        fn fill(&self, dest: &mut [u8]) -> CryptoResult<()> {
            let mut rng = self.rng.lock().map_err(|e| {
                CryptoError::RandomSourceUnavailable(format!("seeded rng poisoned: {e}"))
            })?;
            rng.try_fill_bytes(dest)
                .map_err(|e| CryptoError::RandomSourceUnavailable(e.to_string()))
        }
    }

    impl std::fmt::Debug for SeededRandom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("SeededRandom").finish_non_exhaustive()
        }
    }
}
