//! # Change Proposal Manager
//!
//! Submit, accept, reject, delete and list change proposals against a
//! contract resolved through the [`ContractManager`].
//!
//! ## Visibility
//!
//! Accept, reject, delete and get answer `ProposalNotFound` whenever the
//! caller is not the party entitled to act, and whenever the proposal is
//! no longer PENDING (for accept, reject and delete). Listing answers
//! `ContractNotFound` to non-parties.

use std::sync::Arc;

use pact_core::{ContractId, PartyId, ProposalId, Timestamp};
use pact_state::{ChangeProposal, Contract, ProposalDelta, ProposalStatus};
use pact_store::traits::PENDING_PROPOSER_CONSTRAINT;
use pact_store::{AcceptanceOutcome, ProposalStore, StoreError};

use crate::contract_manager::ContractManager;
use crate::error::NegotiationError;

const PREVIOUS_NOT_REVIEWED: &str = "previous proposal not yet reviewed";

/// Change-proposal lifecycle operations.
pub struct ChangeProposalManager {
    contracts: Arc<ContractManager>,
    store: Arc<dyn ProposalStore>,
}

impl ChangeProposalManager {
    pub fn new(contracts: Arc<ContractManager>, store: Arc<dyn ProposalStore>) -> Self {
        Self { contracts, store }
    }

    /// Submit a PENDING proposal on behalf of `proposer`.
    ///
    /// Checks run in a fixed order: contract exists, proposer is a party,
    /// contract is ACTIVE, delta is non-empty and within bounds, proposer
    /// has no other PENDING proposal on this contract.
    pub async fn submit_proposal(
        &self,
        contract_id: ContractId,
        proposer: &PartyId,
        delta: ProposalDelta,
    ) -> Result<ChangeProposal, NegotiationError> {
        let contract = self.contracts.get_contract(contract_id).await?;

        let participant = contract.counterparty(proposer).cloned().ok_or_else(|| {
            NegotiationError::InvalidProposal(format!(
                "{proposer} is not a party to contract {}",
                contract_id.0
            ))
        })?;

        if !contract.is_active() {
            return Err(NegotiationError::InactiveContract(contract_id.0.to_string()));
        }

        delta
            .validate_against(&contract.terms())
            .map_err(|e| NegotiationError::InvalidProposal(e.to_string()))?;

        if self.store.find_pending(contract_id, proposer).await?.is_some() {
            return Err(NegotiationError::InvalidProposal(PREVIOUS_NOT_REVIEWED.to_string()));
        }

        let proposal = ChangeProposal::new(
            contract_id,
            proposer.clone(),
            participant,
            delta,
            Timestamp::now(),
        );
        match self.store.insert_proposal(&proposal).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation(ref constraint))
                if constraint == PENDING_PROPOSER_CONSTRAINT =>
            {
                return Err(NegotiationError::InvalidProposal(PREVIOUS_NOT_REVIEWED.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            proposal_id = %proposal.id,
            contract_id = %contract_id,
            proposer = %proposer,
            "change proposal submitted"
        );
        Ok(proposal)
    }

    /// Accept a PENDING proposal addressed to `participant`.
    ///
    /// Marks it ACCEPTED, merges its delta into the contract and deletes the
    /// contract's REJECTED proposals in one atomic store operation. Other
    /// PENDING proposals on the contract are left alone. Returns the
    /// updated contract.
    pub async fn accept_proposal(
        &self,
        proposal_id: ProposalId,
        participant: &PartyId,
    ) -> Result<Contract, NegotiationError> {
        let (proposal, contract) = self.load_for_review(proposal_id, participant).await?;

        // Terms may have moved since submission.
        proposal
            .delta
            .validate_against(&contract.terms())
            .map_err(|e| NegotiationError::InvalidProposal(e.to_string()))?;

        let outcome = match self.store.commit_acceptance(proposal_id, Timestamp::now()).await {
            Ok(outcome) => outcome,
            Err(StoreError::CheckViolation(detail)) => {
                return Err(NegotiationError::InvalidProposal(detail));
            }
            Err(e) => return Err(e.into()),
        };

        match outcome {
            AcceptanceOutcome::Committed {
                contract, purged, ..
            } => {
                tracing::info!(
                    proposal_id = %proposal_id,
                    contract_id = %contract.id,
                    purged_rejected = purged,
                    "change proposal accepted"
                );
                Ok(contract)
            }
            AcceptanceOutcome::ProposalNotPending => Err(proposal_not_found(proposal_id)),
            AcceptanceOutcome::ContractInactive => {
                Err(NegotiationError::InactiveContract(proposal.contract_id.0.to_string()))
            }
        }
    }

    /// Reject a PENDING proposal addressed to `participant`. No cascade.
    pub async fn reject_proposal(
        &self,
        proposal_id: ProposalId,
        participant: &PartyId,
    ) -> Result<ChangeProposal, NegotiationError> {
        let (mut proposal, _) = self.load_for_review(proposal_id, participant).await?;

        proposal
            .reject(Timestamp::now())
            .map_err(|_| proposal_not_found(proposal_id))?;
        if !self.store.update_proposal(&proposal, ProposalStatus::Pending).await? {
            return Err(proposal_not_found(proposal_id));
        }

        tracing::info!(
            proposal_id = %proposal_id,
            contract_id = %proposal.contract_id,
            "change proposal rejected"
        );
        Ok(proposal)
    }

    /// Withdraw a PENDING proposal. Only its proposer may do so.
    pub async fn delete_proposal(
        &self,
        proposal_id: ProposalId,
        proposer: &PartyId,
    ) -> Result<(), NegotiationError> {
        let proposal = self
            .store
            .get_proposal(proposal_id)
            .await?
            .ok_or_else(|| proposal_not_found(proposal_id))?;

        if !proposal.is_pending() {
            tracing::debug!(proposal_id = %proposal_id, status = %proposal.status, "proposal already reviewed");
            return Err(proposal_not_found(proposal_id));
        }
        if &proposal.proposer_id != proposer {
            return Err(proposal_not_found(proposal_id));
        }
        if !self.store.delete_proposal(proposal_id, ProposalStatus::Pending).await? {
            return Err(proposal_not_found(proposal_id));
        }

        tracing::info!(proposal_id = %proposal_id, contract_id = %proposal.contract_id, "change proposal withdrawn");
        Ok(())
    }

    /// Every proposal on the contract, oldest first. Non-parties get
    /// `ContractNotFound`.
    pub async fn list_proposals(
        &self,
        contract_id: ContractId,
        requester: &PartyId,
    ) -> Result<Vec<ChangeProposal>, NegotiationError> {
        self.contracts.get_visible_contract(contract_id, requester).await?;
        Ok(self.store.proposals_for_contract(contract_id).await?)
    }

    /// A single proposal, visible to its proposer and participant only.
    pub async fn get_proposal(
        &self,
        proposal_id: ProposalId,
        requester: &PartyId,
    ) -> Result<ChangeProposal, NegotiationError> {
        match self.store.get_proposal(proposal_id).await? {
            Some(p) if &p.proposer_id == requester || &p.participant_id == requester => Ok(p),
            _ => Err(proposal_not_found(proposal_id)),
        }
    }

    /// Shared preconditions of accept and reject.
    async fn load_for_review(
        &self,
        proposal_id: ProposalId,
        participant: &PartyId,
    ) -> Result<(ChangeProposal, Contract), NegotiationError> {
        let proposal = self
            .store
            .get_proposal(proposal_id)
            .await?
            .ok_or_else(|| proposal_not_found(proposal_id))?;

        if &proposal.participant_id != participant {
            tracing::debug!(proposal_id = %proposal_id, caller = %participant, "proposal hidden from non-participant");
            return Err(proposal_not_found(proposal_id));
        }
        if !proposal.is_pending() {
            return Err(proposal_not_found(proposal_id));
        }

        let contract = self.contracts.get_contract(proposal.contract_id).await?;
        if !contract.is_active() {
            return Err(NegotiationError::InactiveContract(contract.id.0.to_string()));
        }
        Ok((proposal, contract))
    }
}

fn proposal_not_found(id: ProposalId) -> NegotiationError {
    NegotiationError::ProposalNotFound(id.0.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pact_state::{ContractDraft, ContractTerms};
    use pact_store::MemoryStore;

    struct Fixture {
        contracts: Arc<ContractManager>,
        proposals: ChangeProposalManager,
        contract: Contract,
    }

    fn party(s: &str) -> PartyId {
        PartyId::new(s).unwrap()
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let contracts = Arc::new(ContractManager::new(store.clone()));
        let proposals = ChangeProposalManager::new(contracts.clone(), store);
        let contract = contracts
            .create_contract(ContractDraft {
                party_a: party("co1"),
                party_b: party("st1"),
                start_date: None,
                end_date: None,
                terms: ContractTerms {
                    hours_per_week: 10.0,
                    total_hours: 100.0,
                    price_per_hour: 15.0,
                },
            })
            .await
            .unwrap();
        Fixture {
            contracts,
            proposals,
            contract,
        }
    }

    fn price(p: f64) -> ProposalDelta {
        ProposalDelta {
            price_per_hour: Some(p),
            ..ProposalDelta::default()
        }
    }

    #[tokio::test]
    async fn submit_records_participant() {
        let f = fixture().await;
        let p = f
            .proposals
            .submit_proposal(f.contract.id, &party("co1"), price(20.0))
            .await
            .unwrap();
        assert_eq!(p.participant_id, party("st1"));
        assert_eq!(p.status, ProposalStatus::Pending);
    }

    #[tokio::test]
    async fn submit_by_outsider_is_invalid() {
        let f = fixture().await;
        assert!(matches!(
            f.proposals
                .submit_proposal(f.contract.id, &party("mallory"), price(20.0))
                .await,
            Err(NegotiationError::InvalidProposal(_))
        ));
    }

    #[tokio::test]
    async fn submit_unknown_contract_is_not_found() {
        let f = fixture().await;
        assert!(matches!(
            f.proposals
                .submit_proposal(ContractId::new(), &party("co1"), price(20.0))
                .await,
            Err(NegotiationError::ContractNotFound(_))
        ));
    }

    #[tokio::test]
    async fn submit_rejects_empty_and_out_of_bounds() {
        let f = fixture().await;
        let co1 = party("co1");
        for delta in [
            ProposalDelta::default(),
            ProposalDelta {
                hours_per_week: Some(25.0),
                ..ProposalDelta::default()
            },
            ProposalDelta {
                total_hours: Some(600.0),
                ..ProposalDelta::default()
            },
        ] {
            assert!(matches!(
                f.proposals.submit_proposal(f.contract.id, &co1, delta).await,
                Err(NegotiationError::InvalidProposal(_))
            ));
        }
    }

    #[tokio::test]
    async fn second_pending_by_same_proposer_is_invalid() {
        let f = fixture().await;
        let co1 = party("co1");
        f.proposals.submit_proposal(f.contract.id, &co1, price(20.0)).await.unwrap();
        let err = f
            .proposals
            .submit_proposal(f.contract.id, &co1, price(21.0))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid proposal: previous proposal not yet reviewed");
    }

    #[tokio::test]
    async fn submit_on_terminated_contract_is_inactive() {
        let f = fixture().await;
        f.contracts.terminate_contract(f.contract.id).await.unwrap();
        assert!(matches!(
            f.proposals
                .submit_proposal(f.contract.id, &party("co1"), price(20.0))
                .await,
            Err(NegotiationError::InactiveContract(_))
        ));
    }

    #[tokio::test]
    async fn price_only_accept_keeps_hours() {
        let f = fixture().await;
        let p = f
            .proposals
            .submit_proposal(f.contract.id, &party("co1"), price(20.0))
            .await
            .unwrap();
        let updated = f.proposals.accept_proposal(p.id, &party("st1")).await.unwrap();
        assert_eq!(updated.price_per_hour, 20.0);
        assert_eq!(updated.hours_per_week, 10.0);
        assert_eq!(updated.total_hours, 100.0);
        assert_eq!(updated.end_date, f.contract.end_date);

        let stored = f.proposals.get_proposal(p.id, &party("co1")).await.unwrap();
        assert_eq!(stored.status, ProposalStatus::Accepted);
    }

    #[tokio::test]
    async fn wrong_caller_sees_not_found() {
        let f = fixture().await;
        let p = f
            .proposals
            .submit_proposal(f.contract.id, &party("co1"), price(20.0))
            .await
            .unwrap();
        let missing = ProposalId::new();

        // The proposer is not the participant.
        let accept = f.proposals.accept_proposal(p.id, &party("co1")).await.unwrap_err();
        let reject = f.proposals.reject_proposal(p.id, &party("mallory")).await.unwrap_err();
        let delete = f.proposals.delete_proposal(p.id, &party("st1")).await.unwrap_err();
        let get = f.proposals.get_proposal(p.id, &party("mallory")).await.unwrap_err();
        for err in [accept, reject, delete, get] {
            assert!(matches!(err, NegotiationError::ProposalNotFound(_)));
        }
        assert!(matches!(
            f.proposals.accept_proposal(missing, &party("st1")).await,
            Err(NegotiationError::ProposalNotFound(_))
        ));
    }

    #[tokio::test]
    async fn reviewed_proposal_cannot_be_reviewed_or_deleted() {
        let f = fixture().await;
        let p = f
            .proposals
            .submit_proposal(f.contract.id, &party("co1"), price(20.0))
            .await
            .unwrap();
        let rejected = f.proposals.reject_proposal(p.id, &party("st1")).await.unwrap();
        assert_eq!(rejected.status, ProposalStatus::Rejected);

        assert!(matches!(
            f.proposals.accept_proposal(p.id, &party("st1")).await,
            Err(NegotiationError::ProposalNotFound(_))
        ));
        assert!(matches!(
            f.proposals.reject_proposal(p.id, &party("st1")).await,
            Err(NegotiationError::ProposalNotFound(_))
        ));
        assert!(matches!(
            f.proposals.delete_proposal(p.id, &party("co1")).await,
            Err(NegotiationError::ProposalNotFound(_))
        ));
    }

    #[tokio::test]
    async fn rejection_frees_proposer_slot() {
        let f = fixture().await;
        let co1 = party("co1");
        let p = f.proposals.submit_proposal(f.contract.id, &co1, price(20.0)).await.unwrap();
        f.proposals.reject_proposal(p.id, &party("st1")).await.unwrap();
        f.proposals.submit_proposal(f.contract.id, &co1, price(18.0)).await.unwrap();
    }

    #[tokio::test]
    async fn accept_purges_rejected_and_keeps_pending() {
        let f = fixture().await;
        let (co1, st1) = (party("co1"), party("st1"));

        let r = f.proposals.submit_proposal(f.contract.id, &co1, price(30.0)).await.unwrap();
        f.proposals.reject_proposal(r.id, &st1).await.unwrap();

        let pending = f.proposals.submit_proposal(f.contract.id, &st1, price(12.0)).await.unwrap();
        let a = f.proposals.submit_proposal(f.contract.id, &co1, price(20.0)).await.unwrap();
        f.proposals.accept_proposal(a.id, &st1).await.unwrap();

        let remaining = f.proposals.list_proposals(f.contract.id, &co1).await.unwrap();
        let ids: Vec<ProposalId> = remaining.iter().map(|p| p.id).collect();
        assert!(!ids.contains(&r.id));
        assert!(ids.contains(&pending.id));
        assert!(ids.contains(&a.id));
        assert_eq!(remaining.len(), 2);
    }

    #[tokio::test]
    async fn accept_on_terminated_contract_is_inactive() {
        let f = fixture().await;
        let p = f
            .proposals
            .submit_proposal(f.contract.id, &party("co1"), price(20.0))
            .await
            .unwrap();
        f.contracts.terminate_contract(f.contract.id).await.unwrap();
        assert!(matches!(
            f.proposals.accept_proposal(p.id, &party("st1")).await,
            Err(NegotiationError::InactiveContract(_))
        ));
    }

    #[tokio::test]
    async fn accept_revalidates_against_current_terms() {
        let f = fixture().await;
        let (co1, st1) = (party("co1"), party("st1"));
        // Each fine alone against 10 h/week, 100 h total; together 200 / 5 = 40 weeks.
        let fewer_hours = f
            .proposals
            .submit_proposal(
                f.contract.id,
                &co1,
                ProposalDelta {
                    hours_per_week: Some(5.0),
                    ..ProposalDelta::default()
                },
            )
            .await
            .unwrap();
        let more_total = f
            .proposals
            .submit_proposal(
                f.contract.id,
                &st1,
                ProposalDelta {
                    total_hours: Some(200.0),
                    ..ProposalDelta::default()
                },
            )
            .await
            .unwrap();

        f.proposals.accept_proposal(fewer_hours.id, &st1).await.unwrap();
        assert!(matches!(
            f.proposals.accept_proposal(more_total.id, &co1).await,
            Err(NegotiationError::InvalidProposal(_))
        ));
        let contract = f.contracts.get_contract(f.contract.id).await.unwrap();
        assert_eq!(contract.total_hours, 100.0);
    }

    #[tokio::test]
    async fn proposer_can_withdraw_pending() {
        let f = fixture().await;
        let co1 = party("co1");
        let p = f.proposals.submit_proposal(f.contract.id, &co1, price(20.0)).await.unwrap();
        f.proposals.delete_proposal(p.id, &co1).await.unwrap();
        assert!(f.proposals.list_proposals(f.contract.id, &co1).await.unwrap().is_empty());
        assert!(matches!(
            f.proposals.delete_proposal(p.id, &co1).await,
            Err(NegotiationError::ProposalNotFound(_))
        ));
    }

    #[tokio::test]
    async fn listing_hidden_from_outsiders() {
        let f = fixture().await;
        assert!(matches!(
            f.proposals.list_proposals(f.contract.id, &party("mallory")).await,
            Err(NegotiationError::ContractNotFound(_))
        ));
    }
}
