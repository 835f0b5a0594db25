//! Production environment using system time and OS randomness.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::env::Environment;

/// Production environment.
///
/// Uses `std::time::Instant::now()` for time and getrandom for randomness.
/// Not reproducible; simulation uses a seeded environment instead.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    #[allow(clippy::disallowed_methods)]
    fn unix_millis(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis() as u64)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn randomness_differs_between_calls() {
        let env = SystemEnv::new();
        assert_ne!(env.random_u64(), env.random_u64());
    }

    #[test]
    fn time_moves_forward() {
        let env = SystemEnv::new();
        let first = env.now();
        assert!(env.now() >= first);
        assert!(env.unix_millis() > 1_600_000_000_000);
    }
}
