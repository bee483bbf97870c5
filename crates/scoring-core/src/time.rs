// crates/scoring-core/src/time.rs
// ============================================================================
// Module: Time Model
// Description: Caller-supplied time representations for decisions and signals.
// Purpose: Keep decision evaluation deterministic and replayable.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! The engine never reads the wall clock or a monotonic clock directly from
//! its core logic — callers (the executor's host, the CLI, tests) supply
//! [`Timestamp`] values explicitly. This keeps `Execute` a pure function of
//! its inputs, including the clock, which is what makes the determinism
//! property in the testable-properties section checkable at all: a test can
//! replay the exact same [`Timestamp`] and expect a byte-identical result.
//!
//! Wall-clock time drives calendar effects (fiscal context, signal age).
//! Monotonic time drives latency measurement. The two are never conflated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Wall Clock
// ============================================================================

/// A wall-clock instant expressed as Unix epoch milliseconds.
///
/// # Invariants
/// - Always supplied by the caller; the engine never samples
///   `SystemTime::now()` from evaluation or logging code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Constructs a timestamp from Unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as Unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Parses an RFC 3339 timestamp string.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::Parse`] when `value` is not valid RFC 3339.
    pub fn parse_rfc3339(value: &str) -> Result<Self, TimeError> {
        let parsed = OffsetDateTime::parse(value, &Rfc3339)
            .map_err(|err| TimeError::Parse(err.to_string()))?;
        let millis = i64::try_from(parsed.unix_timestamp_nanos() / 1_000_000)
            .map_err(|_| TimeError::OutOfRange)?;
        Ok(Self(millis))
    }

    /// Formats the timestamp as RFC 3339 with second precision.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::OutOfRange`] when the stored value cannot be
    /// represented as a valid calendar instant.
    pub fn to_rfc3339(self) -> Result<String, TimeError> {
        let nanos = i128::from(self.0) * 1_000_000;
        let instant =
            OffsetDateTime::from_unix_timestamp_nanos(nanos).map_err(|_| TimeError::OutOfRange)?;
        instant
            .format(&Rfc3339)
            .map_err(|err| TimeError::Parse(err.to_string()))
    }

    /// Returns the whole number of days between `self` and `other`,
    /// clamped to zero when `other` (the signal) is in the future relative
    /// to `self` (now).
    ///
    /// Returns `(age_days, was_clamped)` — `was_clamped` is `true` when the
    /// raw difference was negative, matching the "future signal" flag
    /// required by the design notes.
    #[must_use]
    pub const fn whole_days_since(self, earlier: Self) -> (u32, bool) {
        let delta_millis = self.0 - earlier.0;
        if delta_millis < 0 {
            return (0, true);
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "signal ages are bounded well under u32::MAX days in practice"
        )]
        let days = (delta_millis / MILLIS_PER_DAY) as u32;
        (days, false)
    }
}

/// Milliseconds in one day, used for whole-day signal-age rounding.
const MILLIS_PER_DAY: i64 = 86_400_000;

// ============================================================================
// SECTION: Monotonic Clock
// ============================================================================

/// A monotonic instant used exclusively for latency measurement.
///
/// # Invariants
/// - Never compared across process restarts; only differences between two
///   [`MonotonicInstant`] values from the same process are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonotonicInstant(u128);

impl MonotonicInstant {
    /// Constructs a monotonic instant from an opaque nanosecond counter
    /// supplied by the caller (e.g. `tokio::time::Instant`).
    #[must_use]
    pub const fn from_nanos(nanos: u128) -> Self {
        Self(nanos)
    }

    /// Returns the elapsed duration since `earlier`, in milliseconds.
    ///
    /// Saturates at zero when `earlier` is later than `self`, which should
    /// not occur in practice but must not panic if it does.
    #[must_use]
    pub fn elapsed_millis_since(self, earlier: Self) -> u64 {
        let nanos = self.0.saturating_sub(earlier.0);
        u64::try_from(nanos / 1_000_000).unwrap_or(u64::MAX)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error constructing or formatting a [`Timestamp`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    /// The input string was not valid RFC 3339.
    #[error("invalid RFC 3339 timestamp: {0}")]
    Parse(String),
    /// The stored value cannot be represented as a valid calendar instant.
    #[error("timestamp out of representable range")]
    OutOfRange,
}
