// crates/scoring-tools/src/clock.rs
// ============================================================================
// Module: Executor Clock
// Description: The one place in this workspace allowed to read the real
//              wall and monotonic clocks.
// Purpose: Give the Decision Executor a `Clock` it can inject, so tests use
//          a fixed clock and production uses the system one, while
//          `scoring-core` itself never samples time directly.
// Dependencies: std::time
// ============================================================================

//! ## Overview
//! `scoring-core`'s evaluation path takes [`scoring_core::Timestamp`] and
//! [`scoring_core::MonotonicInstant`] as plain arguments; something has to
//! produce them. [`Clock`] is that seam: [`SystemClock`] reads
//! `SystemTime`/`Instant` at the executor boundary, and a test-only
//! `FixedClock` (see the `executor` module's tests) replays a constant value
//! so decision records stay reproducible in unit tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use scoring_core::MonotonicInstant;
use scoring_core::Timestamp;

// ============================================================================
// SECTION: Clock Trait
// ============================================================================

/// Source of wall-clock and monotonic time for the executor boundary.
pub trait Clock: Send + Sync {
    /// Returns the current wall-clock instant.
    fn now_wall(&self) -> Timestamp;
    /// Returns the current monotonic instant, for latency measurement only.
    fn now_monotonic(&self) -> MonotonicInstant;
}

// ============================================================================
// SECTION: System Clock
// ============================================================================

/// Reads the real system clocks.
///
/// # Invariants
/// - `now_monotonic` nanosecond values are only meaningful relative to
///   others produced by the same `SystemClock` instance, since they are
///   measured from an arbitrary process-local epoch.
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    /// Constructs a system clock anchored to the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_wall(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| i64::try_from(duration.as_millis()).unwrap_or(i64::MAX));
        Timestamp::from_unix_millis(millis)
    }

    fn now_monotonic(&self) -> MonotonicInstant {
        MonotonicInstant::from_nanos(self.epoch.elapsed().as_nanos())
    }
}
