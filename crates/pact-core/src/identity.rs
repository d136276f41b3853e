//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the identifiers in the Pact stack.
//!
//! ## Security Invariant
//!
//! Party identifiers arrive from an external identity layer as opaque
//! strings. They are compared by exact value only; this crate never
//! interprets them, case-folds them, or derives roles from them.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Maximum length of a party identifier.
pub const MAX_PARTY_ID_LEN: usize = 255;

/// Unique identifier for a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContractId(pub Uuid);

/// Unique identifier for a change proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProposalId(pub Uuid);

impl ContractId {
    /// Generate a new random contract identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl ProposalId {
    /// Generate a new random proposal identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ContractId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ProposalId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ContractId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<Uuid> for ProposalId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for ContractId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| ValidationError::InvalidIdentifier {
                kind: "contract",
                value: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl FromStr for ProposalId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| ValidationError::InvalidIdentifier {
                kind: "proposal",
                value: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl std::fmt::Display for ContractId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "contract:{}", self.0)
    }
}

impl std::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "proposal:{}", self.0)
    }
}

// ─── Parties ─────────────────────────────────────────────────────────

/// Identifier of a contract party, as issued by the external identity layer.
///
/// Validated on construction: non-empty after trimming and at most
/// [`MAX_PARTY_ID_LEN`] characters. Serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartyId(String);

impl PartyId {
    /// Create a validated party identifier. Surrounding whitespace is trimmed.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyPartyId);
        }
        let len = trimmed.chars().count();
        if len > MAX_PARTY_ID_LEN {
            return Err(ValidationError::PartyIdTooLong {
                max: MAX_PARTY_ID_LEN,
                actual: len,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PartyId {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PartyId> for String {
    fn from(id: PartyId) -> Self {
        id.0
    }
}

impl FromStr for PartyId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for PartyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for PartyId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// An unordered pair of two distinct parties.
///
/// `PartyPair::new(a, b)` and `PartyPair::new(b, a)` are equal: the parties
/// are stored in lexicographic order. This is the key under which the
/// "one active contract per pair" rule is enforced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyPair {
    low: PartyId,
    high: PartyId,
}

impl PartyPair {
    /// Normalize two parties into a pair. Fails if both are the same party.
    pub fn new(a: PartyId, b: PartyId) -> Result<Self, ValidationError> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Ok(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Ok(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => Err(ValidationError::SameParty(a.0)),
        }
    }

    /// The lexicographically smaller party.
    pub fn low(&self) -> &PartyId {
        &self.low
    }

    /// The lexicographically larger party.
    pub fn high(&self) -> &PartyId {
        &self.high
    }

    /// Whether `party` is one of the two members.
    pub fn contains(&self, party: &PartyId) -> bool {
        &self.low == party || &self.high == party
    }

    /// The member that is not `party`, or `None` if `party` is not a member.
    pub fn other(&self, party: &PartyId) -> Option<&PartyId> {
        if &self.low == party {
            Some(&self.high)
        } else if &self.high == party {
            Some(&self.low)
        } else {
            None
        }
    }
}

impl std::fmt::Display for PartyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}<->{}", self.low, self.high)
    }
}
