//! # Negotiation Errors
//!
//! The error kinds callers of the engine see. Not-found kinds double as
//! "not authorized": a caller who is not a party to a record is told it
//! does not exist, and the message is identical to the truly-absent case.

use thiserror::Error;

use pact_store::StoreError;

/// Errors returned by [`crate::ContractManager`] and
/// [`crate::ChangeProposalManager`].
#[derive(Error, Debug)]
pub enum NegotiationError {
    /// No such contract, or not visible to the caller.
    #[error("contract not found: {0}")]
    ContractNotFound(String),

    /// The party pair already has an ACTIVE contract.
    #[error("an active contract already exists for {0}")]
    DuplicateActiveContract(String),

    /// Contract input violates a business rule.
    #[error("invalid contract: {0}")]
    InvalidContract(String),

    /// Proposal input violates a business rule.
    #[error("invalid proposal: {0}")]
    InvalidProposal(String),

    /// The contract is TERMINATED.
    #[error("contract {0} is not active")]
    InactiveContract(String),

    /// No such proposal, not addressed to the caller, or already reviewed.
    #[error("proposal not found: {0}")]
    ProposalNotFound(String),

    /// The store failed.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl NegotiationError {
    /// Stable machine-readable kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ContractNotFound(_) => "ContractNotFound",
            Self::DuplicateActiveContract(_) => "DuplicateActiveContract",
            Self::InvalidContract(_) => "InvalidContract",
            Self::InvalidProposal(_) => "InvalidProposal",
            Self::InactiveContract(_) => "InactiveContract",
            Self::ProposalNotFound(_) => "ProposalNotFound",
            Self::Storage(_) => "Storage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_the_variant() {
        assert_eq!(NegotiationError::ContractNotFound("c".into()).kind(), "ContractNotFound");
        assert_eq!(
            NegotiationError::DuplicateActiveContract("a<->b".into()).kind(),
            "DuplicateActiveContract"
        );
        assert_eq!(NegotiationError::InvalidProposal("x".into()).kind(), "InvalidProposal");
        assert_eq!(
            NegotiationError::from(StoreError::Corrupt("row".into())).kind(),
            "Storage"
        );
    }
}
