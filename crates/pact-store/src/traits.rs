//! Store interfaces consumed by the negotiation engine.

use async_trait::async_trait;

use pact_core::{ContractId, PartyId, PartyPair, ProposalId, Timestamp};
use pact_state::{ChangeProposal, Contract, ProposalStatus};

use crate::error::StoreError;

/// Name of the ACTIVE-per-pair uniqueness rule, as reported in
/// [`StoreError::UniqueViolation`].
pub const ACTIVE_PAIR_CONSTRAINT: &str = "contracts_one_active_per_pair";

/// Name of the PENDING-per-proposer uniqueness rule.
pub const PENDING_PROPOSER_CONSTRAINT: &str = "proposals_one_pending_per_proposer";

/// Contract persistence.
#[async_trait]
pub trait ContractStore: Send + Sync {
    /// Insert a new contract. Fails with [`StoreError::UniqueViolation`]
    /// if it is ACTIVE and the pair already has an ACTIVE contract.
    async fn insert_contract(&self, contract: &Contract) -> Result<(), StoreError>;

    async fn get_contract(&self, id: ContractId) -> Result<Option<Contract>, StoreError>;

    /// The ACTIVE contract for an unordered pair, if any.
    async fn get_active_contract(&self, pair: &PartyPair) -> Result<Option<Contract>, StoreError>;

    /// Overwrite a stored contract. Returns `false` if no row matched.
    async fn update_contract(&self, contract: &Contract) -> Result<bool, StoreError>;

    /// Flip an ACTIVE contract to TERMINATED, touching nothing else.
    /// Returns the updated record, or `None` if no ACTIVE row matched.
    async fn mark_terminated(
        &self,
        id: ContractId,
        now: Timestamp,
    ) -> Result<Option<Contract>, StoreError>;

    /// Every contract naming `party`, newest first.
    async fn contracts_for_party(&self, party: &PartyId) -> Result<Vec<Contract>, StoreError>;

    /// Cheap liveness check of the backend.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Outcome of [`ProposalStore::commit_acceptance`].
#[derive(Debug, Clone, PartialEq)]
pub enum AcceptanceOutcome {
    /// All writes applied.
    Committed {
        /// The proposal, now ACCEPTED.
        proposal: ChangeProposal,
        /// The contract with the delta merged in.
        contract: Contract,
        /// Number of REJECTED proposals deleted.
        purged: u64,
    },
    /// The proposal was missing or no longer PENDING. Nothing written.
    ProposalNotPending,
    /// The contract was not ACTIVE. Nothing written.
    ContractInactive,
}

/// Change-proposal persistence.
#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Insert a new proposal. Fails with [`StoreError::UniqueViolation`]
    /// if it is PENDING and the proposer already has a PENDING proposal on
    /// the same contract.
    async fn insert_proposal(&self, proposal: &ChangeProposal) -> Result<(), StoreError>;

    async fn get_proposal(&self, id: ProposalId) -> Result<Option<ChangeProposal>, StoreError>;

    /// The PENDING proposal by `proposer` on `contract_id`, if any.
    async fn find_pending(
        &self,
        contract_id: ContractId,
        proposer: &PartyId,
    ) -> Result<Option<ChangeProposal>, StoreError>;

    /// Proposals on `contract_id` with the given status, oldest first.
    async fn find_by_status(
        &self,
        contract_id: ContractId,
        status: ProposalStatus,
    ) -> Result<Vec<ChangeProposal>, StoreError>;

    /// All proposals on `contract_id`, oldest first.
    async fn proposals_for_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Vec<ChangeProposal>, StoreError>;

    /// Overwrite a proposal only if its stored status is `expected`.
    /// Returns `false` if no row matched.
    async fn update_proposal(
        &self,
        proposal: &ChangeProposal,
        expected: ProposalStatus,
    ) -> Result<bool, StoreError>;

    /// Delete a proposal only if its stored status is `expected`.
    /// Returns `false` if no row matched.
    async fn delete_proposal(
        &self,
        id: ProposalId,
        expected: ProposalStatus,
    ) -> Result<bool, StoreError>;

    /// Accept a proposal atomically.
    ///
    /// Flips the proposal PENDING → ACCEPTED, merges its delta into the
    /// contract (which must be ACTIVE), and deletes every REJECTED proposal
    /// on the same contract. Either all three writes happen or none do.
    async fn commit_acceptance(
        &self,
        proposal_id: ProposalId,
        now: Timestamp,
    ) -> Result<AcceptanceOutcome, StoreError>;
}
