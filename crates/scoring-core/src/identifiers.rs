// crates/scoring-core/src/identifiers.rs
// ============================================================================
// Module: Identifiers
// Description: Opaque identifier newtypes for every addressable entity.
// Purpose: Prevent cross-entity identifier confusion at compile time.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every identity in the decision engine's data model — tool names, rule
//! versions, decisions, feedback, experiments, subjects — is its own type
//! rather than a bare `String`. This lets the compiler reject, for example,
//! a `FeedbackId` passed where a `DecisionId` is expected, which a shared
//! `String` representation cannot.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Declares an opaque, string-backed identifier newtype.
macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Constructs a new identifier from any string-like value.
            ///
            /// # Errors
            ///
            /// Returns [`IdentifierError::Empty`] when `value` is empty after
            /// trimming, or [`IdentifierError::TooLong`] when it exceeds
            /// [`MAX_IDENTIFIER_LEN`] bytes.
            pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(IdentifierError::Empty);
                }
                if value.len() > MAX_IDENTIFIER_LEN {
                    return Err(IdentifierError::TooLong {
                        len: value.len(),
                        max: MAX_IDENTIFIER_LEN,
                    });
                }
                Ok(Self(value))
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier, returning the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdentifierError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = IdentifierError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum byte length accepted for any identifier in this module.
pub const MAX_IDENTIFIER_LEN: usize = 256;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error returned when constructing an identifier from an invalid string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// The supplied value was empty or all whitespace.
    #[error("identifier must not be empty")]
    Empty,
    /// The supplied value exceeded [`MAX_IDENTIFIER_LEN`].
    #[error("identifier length {len} exceeds maximum {max}")]
    TooLong {
        /// Observed length in bytes.
        len: usize,
        /// Maximum allowed length in bytes.
        max: usize,
    },
}

// ============================================================================
// SECTION: Identifiers
// ============================================================================

string_identifier!(
    /// Stable name of a declared decision tool (e.g. `"CompanyQuality"`).
    ///
    /// # Invariants
    /// - Matches one of the closed registry entries in [`crate::rule::RuleDocument`]'s
    ///   owning `ToolDefinition`.
    ToolName
);

string_identifier!(
    /// Version label of a [`crate::rule::RuleDocument`] (e.g. `"2024.03.1"`).
    ///
    /// # Invariants
    /// - Unique within a `tool_name`; immutable once published.
    RuleVersion
);

string_identifier!(
    /// Unique identifier of a [`crate::ledger::DecisionRecord`].
    ///
    /// # Invariants
    /// - Stable for the life of the record; used for idempotent appends.
    DecisionId
);

string_identifier!(
    /// Unique identifier of a [`crate::ledger::FeedbackRecord`].
    FeedbackId
);

string_identifier!(
    /// Identifier of an A/B experiment.
    ///
    /// # Invariants
    /// - Stable for the life of the experiment; reused across all
    ///   [`crate::ledger::ABAssignment`] rows belonging to it.
    ExperimentId
);

string_identifier!(
    /// Stable bucketing key for A/B assignment (e.g. a company identifier).
    ///
    /// # Invariants
    /// - The same value always hashes to the same variant for a given
    ///   `ExperimentId`, computed once and pinned via
    ///   [`crate::ledger::DecisionLedger::assign_variant`].
    SubjectKey
);

string_identifier!(
    /// Per-request correlation identifier surfaced to callers as `trace_id`.
    TraceId
);

string_identifier!(
    /// Opaque tenant identifier attached to a decision, when present.
    TenantId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty() {
        assert_eq!(ToolName::new(""), Err(IdentifierError::Empty));
        assert_eq!(ToolName::new("   "), Err(IdentifierError::Empty));
    }

    #[test]
    fn rejects_too_long() {
        let value = "x".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(matches!(
            ToolName::new(value),
            Err(IdentifierError::TooLong { .. })
        ));
    }

    #[test]
    fn round_trips_display_and_as_str() {
        let id = DecisionId::new("dec_123").expect("valid identifier");
        assert_eq!(id.as_str(), "dec_123");
        assert_eq!(id.to_string(), "dec_123");
    }

    #[test]
    fn serializes_transparently() {
        let id = ToolName::new("CompanyQuality").expect("valid identifier");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"CompanyQuality\"");
    }
}
