//! # pact-engine — Contract Negotiation Engine
//!
//! Two stateless managers over the stores in `pact-store`:
//!
//! - [`ContractManager`]: create, look up and terminate contracts; enforces
//!   one ACTIVE contract per unordered party pair and the term bounds.
//! - [`ChangeProposalManager`]: submit, accept, reject, delete and list
//!   change proposals against a contract it resolves through the
//!   `ContractManager`.
//!
//! Callers pass an already-authenticated [`pact_core::PartyId`] to every
//! operation. The engine never sees roles or credentials.

pub mod contract_manager;
pub mod error;
pub mod proposal_manager;

use std::sync::Arc;

use pact_store::{ContractStore, ProposalStore};

pub use contract_manager::ContractManager;
pub use error::NegotiationError;
pub use proposal_manager::ChangeProposalManager;

/// Both managers wired to one store.
#[derive(Clone)]
pub struct Engine {
    pub contracts: Arc<ContractManager>,
    pub proposals: Arc<ChangeProposalManager>,
}

impl Engine {
    /// Build the managers over a store implementing both traits.
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: ContractStore + ProposalStore + 'static,
    {
        let contracts = Arc::new(ContractManager::new(store.clone()));
        let proposals = Arc::new(ChangeProposalManager::new(contracts.clone(), store));
        Self {
            contracts,
            proposals,
        }
    }
}
