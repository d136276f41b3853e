//! # In-Memory Store
//!
//! Both tables live behind a single `parking_lot::RwLock`, so every check
//! and the write it guards happen in one critical section. Cloning a
//! `MemoryStore` shares the underlying tables.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use pact_core::{ContractId, PartyId, PartyPair, ProposalId, Timestamp};
use pact_state::{ChangeProposal, Contract, ProposalStatus};

use crate::error::StoreError;
use crate::traits::{
    AcceptanceOutcome, ContractStore, ProposalStore, ACTIVE_PAIR_CONSTRAINT,
    PENDING_PROPOSER_CONSTRAINT,
};

#[derive(Default)]
struct Tables {
    contracts: HashMap<ContractId, Contract>,
    proposals: HashMap<ProposalId, ChangeProposal>,
}

/// Thread-safe in-memory contract and proposal store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("MemoryStore")
            .field("contracts", &tables.contracts.len())
            .field("proposals", &tables.proposals.len())
            .finish()
    }
}

fn pair_of(contract: &Contract) -> Result<PartyPair, StoreError> {
    contract
        .pair()
        .map_err(|e| StoreError::Corrupt(format!("{}: {e}", contract.id)))
}

fn by_created_at(a: &ChangeProposal, b: &ChangeProposal) -> std::cmp::Ordering {
    a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))
}

#[async_trait]
impl ContractStore for MemoryStore {
    async fn insert_contract(&self, contract: &Contract) -> Result<(), StoreError> {
        let pair = pair_of(contract)?;
        let mut tables = self.tables.write();
        if tables.contracts.contains_key(&contract.id) {
            return Err(StoreError::UniqueViolation("contracts_pkey".to_string()));
        }
        if contract.is_active() {
            let clash = tables
                .contracts
                .values()
                .filter(|c| c.is_active())
                .any(|c| c.pair().map(|p| p == pair).unwrap_or(false));
            if clash {
                return Err(StoreError::UniqueViolation(ACTIVE_PAIR_CONSTRAINT.to_string()));
            }
        }
        tables.contracts.insert(contract.id, contract.clone());
        Ok(())
    }

    async fn get_contract(&self, id: ContractId) -> Result<Option<Contract>, StoreError> {
        Ok(self.tables.read().contracts.get(&id).cloned())
    }

    async fn get_active_contract(&self, pair: &PartyPair) -> Result<Option<Contract>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .contracts
            .values()
            .find(|c| c.is_active() && c.pair().map(|p| &p == pair).unwrap_or(false))
            .cloned())
    }

    async fn update_contract(&self, contract: &Contract) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        match tables.contracts.get_mut(&contract.id) {
            Some(slot) => {
                *slot = contract.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_terminated(
        &self,
        id: ContractId,
        now: Timestamp,
    ) -> Result<Option<Contract>, StoreError> {
        let mut tables = self.tables.write();
        match tables.contracts.get_mut(&id) {
            Some(c) => Ok(c.terminate(now).then(|| c.clone())),
            None => Ok(None),
        }
    }

    async fn contracts_for_party(&self, party: &PartyId) -> Result<Vec<Contract>, StoreError> {
        let tables = self.tables.read();
        let mut found: Vec<Contract> = tables
            .contracts
            .values()
            .filter(|c| c.involves(party))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl ProposalStore for MemoryStore {
    async fn insert_proposal(&self, proposal: &ChangeProposal) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if tables.proposals.contains_key(&proposal.id) {
            return Err(StoreError::UniqueViolation("change_proposals_pkey".to_string()));
        }
        if proposal.is_pending() {
            let clash = tables.proposals.values().any(|p| {
                p.is_pending()
                    && p.contract_id == proposal.contract_id
                    && p.proposer_id == proposal.proposer_id
            });
            if clash {
                return Err(StoreError::UniqueViolation(
                    PENDING_PROPOSER_CONSTRAINT.to_string(),
                ));
            }
        }
        tables.proposals.insert(proposal.id, proposal.clone());
        Ok(())
    }

    async fn get_proposal(&self, id: ProposalId) -> Result<Option<ChangeProposal>, StoreError> {
        Ok(self.tables.read().proposals.get(&id).cloned())
    }

    async fn find_pending(
        &self,
        contract_id: ContractId,
        proposer: &PartyId,
    ) -> Result<Option<ChangeProposal>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .proposals
            .values()
            .find(|p| p.is_pending() && p.contract_id == contract_id && &p.proposer_id == proposer)
            .cloned())
    }

    async fn find_by_status(
        &self,
        contract_id: ContractId,
        status: ProposalStatus,
    ) -> Result<Vec<ChangeProposal>, StoreError> {
        let tables = self.tables.read();
        let mut found: Vec<ChangeProposal> = tables
            .proposals
            .values()
            .filter(|p| p.contract_id == contract_id && p.status == status)
            .cloned()
            .collect();
        found.sort_by(by_created_at);
        Ok(found)
    }

    async fn proposals_for_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Vec<ChangeProposal>, StoreError> {
        let tables = self.tables.read();
        let mut found: Vec<ChangeProposal> = tables
            .proposals
            .values()
            .filter(|p| p.contract_id == contract_id)
            .cloned()
            .collect();
        found.sort_by(by_created_at);
        Ok(found)
    }

    async fn update_proposal(
        &self,
        proposal: &ChangeProposal,
        expected: ProposalStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        match tables.proposals.get_mut(&proposal.id) {
            Some(slot) if slot.status == expected => {
                *slot = proposal.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_proposal(
        &self,
        id: ProposalId,
        expected: ProposalStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        match tables.proposals.get(&id) {
            Some(p) if p.status == expected => {
                tables.proposals.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit_acceptance(
        &self,
        proposal_id: ProposalId,
        now: Timestamp,
    ) -> Result<AcceptanceOutcome, StoreError> {
        let mut guard = self.tables.write();
        let tables = &mut *guard;

        let mut proposal = match tables.proposals.get(&proposal_id) {
            Some(p) if p.is_pending() => p.clone(),
            _ => return Ok(AcceptanceOutcome::ProposalNotPending),
        };
        let mut contract = match tables.contracts.get(&proposal.contract_id) {
            Some(c) if c.is_active() => c.clone(),
            _ => return Ok(AcceptanceOutcome::ContractInactive),
        };

        proposal
            .delta
            .validate_against(&contract.terms())
            .map_err(|e| StoreError::CheckViolation(e.to_string()))?;
        contract
            .apply_delta(&proposal.delta, now)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        proposal
            .accept(now)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let contract_id = contract.id;
        let before = tables.proposals.len();
        tables
            .proposals
            .retain(|_, p| !(p.contract_id == contract_id && p.status == ProposalStatus::Rejected));
        let purged = (before - tables.proposals.len()) as u64;

        tables.proposals.insert(proposal.id, proposal.clone());
        tables.contracts.insert(contract.id, contract.clone());

        Ok(AcceptanceOutcome::Committed {
            proposal,
            contract,
            purged,
        })
    }
}
