//! Environment abstraction for deterministic testing.
//!
//! Decouples client logic from system resources (time, randomness). The
//! production environment reads the system clock and OS entropy; the
//! simulation harness substitutes a virtual clock and a seeded RNG so that
//! room ids, connection ids and upload expiry replay exactly.

use std::{fmt, ops::Sub, time::Duration};

/// Abstract environment providing time and randomness.
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - Given the same seed, a simulated environment produces the same bytes
pub trait Environment: Clone + Send + Sync + 'static {
    /// Monotonic instant type.
    ///
    /// Production uses `std::time::Instant`; simulation uses virtual time.
    type Instant: Copy + Ord + Send + Sync + fmt::Debug + Sub<Output = Duration>;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Wall-clock time as milliseconds since the Unix epoch.
    ///
    /// Only used to make generated room ids roughly time ordered.
    fn unix_millis(&self) -> u64;

    /// Fill the buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generate a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
