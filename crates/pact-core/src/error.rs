//! # Error Types
//!
//! Construction errors for the primitive types in this crate. Domain
//! errors (contract bounds, lifecycle transitions, negotiation outcomes)
//! live in the crates that own those rules.

use thiserror::Error;

/// A primitive value failed validation at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A party identifier was empty or whitespace-only.
    #[error("party id must not be empty")]
    EmptyPartyId,

    /// A party identifier exceeded the maximum length.
    #[error("party id must not exceed {max} characters, got {actual}")]
    PartyIdTooLong {
        /// Maximum permitted length.
        max: usize,
        /// Length of the rejected value.
        actual: usize,
    },

    /// A party pair was built from the same party twice.
    #[error("party pair requires two distinct parties, got {0:?} twice")]
    SameParty(String),

    /// A string could not be parsed as an identifier.
    #[error("invalid {kind} identifier {value:?}: {reason}")]
    InvalidIdentifier {
        /// Identifier namespace ("contract", "proposal").
        kind: &'static str,
        /// The rejected input.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// A timestamp string was malformed or out of range.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
