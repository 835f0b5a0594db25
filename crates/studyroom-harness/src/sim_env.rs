//! Simulated environment with a seeded RNG and virtual time.
//!
//! Clones share one RNG and one clock, so a whole simulation (server,
//! drivers, clients) replays identically from a single seed. Time only moves
//! when the test calls [`SimEnv::advance`].

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use studyroom_client::Environment;

/// Wall-clock origin of every simulation: 2023-11-14T22:13:20Z.
const UNIX_EPOCH_MILLIS: u64 = 1_700_000_000_000;

struct SimEnvState {
    rng: ChaCha8Rng,
    now: Duration,
}

/// Deterministic environment for simulation.
#[derive(Clone)]
pub struct SimEnv {
    state: Arc<Mutex<SimEnvState>>,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEnv {
    /// Environment seeded with zero.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Environment seeded with `seed`.
    pub fn with_seed(seed: u64) -> Self {
        let state = SimEnvState { rng: ChaCha8Rng::seed_from_u64(seed), now: Duration::ZERO };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, by: Duration) {
        self.lock().now += by;
    }

    /// Time elapsed since the simulation started.
    pub fn elapsed(&self) -> Duration {
        self.lock().now
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimEnvState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Environment for SimEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        self.lock().now
    }

    fn unix_millis(&self) -> u64 {
        UNIX_EPOCH_MILLIS + self.lock().now.as_millis() as u64
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.lock().rng.fill_bytes(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_bytes() {
        let a = SimEnv::with_seed(7);
        let b = SimEnv::with_seed(7);

        assert_eq!(a.random_u64(), b.random_u64());
        assert_eq!(a.random_u64(), b.random_u64());
    }

    #[test]
    fn clones_share_the_rng() {
        let env = SimEnv::with_seed(7);
        let clone = env.clone();
        let reference = SimEnv::with_seed(7);

        let first = env.random_u64();
        let second = clone.random_u64();

        assert_eq!(first, reference.random_u64());
        assert_eq!(second, reference.random_u64());
        assert_ne!(first, second);
    }

    #[test]
    fn clock_moves_only_on_advance() {
        let env = SimEnv::new();
        assert_eq!(env.now(), Duration::ZERO);

        env.advance(Duration::from_secs(3));
        assert_eq!(env.now(), Duration::from_secs(3));
        assert_eq!(env.unix_millis(), UNIX_EPOCH_MILLIS + 3_000);
    }
}
