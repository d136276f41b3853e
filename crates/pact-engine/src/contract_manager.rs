//! # Contract Manager
//!
//! Creation, lookup and termination of contracts. Has no knowledge of
//! change proposals.

use std::sync::Arc;

use pact_core::{ContractId, PartyId, PartyPair, Timestamp};
use pact_state::{Contract, ContractDraft};
use pact_store::traits::ACTIVE_PAIR_CONSTRAINT;
use pact_store::{ContractStore, StoreError};

use crate::error::NegotiationError;

/// Contract lifecycle operations over a [`ContractStore`].
pub struct ContractManager {
    store: Arc<dyn ContractStore>,
}

impl ContractManager {
    pub fn new(store: Arc<dyn ContractStore>) -> Self {
        Self { store }
    }

    /// Validate and persist a new ACTIVE contract.
    ///
    /// Fails with `InvalidContract` on a rule violation and with
    /// `DuplicateActiveContract` if the pair already has an ACTIVE contract,
    /// including when a concurrent create wins the race.
    pub async fn create_contract(&self, draft: ContractDraft) -> Result<Contract, NegotiationError> {
        let contract = Contract::open(draft, Timestamp::now())
            .map_err(|e| NegotiationError::InvalidContract(e.to_string()))?;
        let pair = contract
            .pair()
            .map_err(|e| NegotiationError::InvalidContract(e.to_string()))?;

        if self.store.get_active_contract(&pair).await?.is_some() {
            return Err(NegotiationError::DuplicateActiveContract(pair.to_string()));
        }

        match self.store.insert_contract(&contract).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation(ref constraint))
                if constraint == ACTIVE_PAIR_CONSTRAINT =>
            {
                return Err(NegotiationError::DuplicateActiveContract(pair.to_string()));
            }
            Err(StoreError::CheckViolation(constraint)) => {
                return Err(NegotiationError::InvalidContract(constraint));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            contract_id = %contract.id,
            pair = %pair,
            end_date = %contract.end_date,
            "contract created"
        );
        Ok(contract)
    }

    /// The ACTIVE contract between two parties, in either order.
    pub async fn get_active_contract(
        &self,
        party_a: &PartyId,
        party_b: &PartyId,
    ) -> Result<Contract, NegotiationError> {
        let not_found = || NegotiationError::ContractNotFound(format!("{party_a}<->{party_b}"));
        let pair = PartyPair::new(party_a.clone(), party_b.clone()).map_err(|_| not_found())?;
        tracing::debug!(pair = %pair, "looking up active contract");
        self.store
            .get_active_contract(&pair)
            .await?
            .ok_or_else(not_found)
    }

    pub async fn get_contract(&self, id: ContractId) -> Result<Contract, NegotiationError> {
        self.store
            .get_contract(id)
            .await?
            .ok_or_else(|| NegotiationError::ContractNotFound(id.0.to_string()))
    }

    /// As [`get_contract`](Self::get_contract), but a requester who is not a
    /// party gets `ContractNotFound`.
    pub async fn get_visible_contract(
        &self,
        id: ContractId,
        requester: &PartyId,
    ) -> Result<Contract, NegotiationError> {
        let contract = self.get_contract(id).await?;
        if !contract.involves(requester) {
            tracing::debug!(contract_id = %id, requester = %requester, "contract hidden from non-party");
            return Err(NegotiationError::ContractNotFound(id.0.to_string()));
        }
        Ok(contract)
    }

    /// Every contract the party appears in, newest first.
    pub async fn contracts_for_party(&self, party: &PartyId) -> Result<Vec<Contract>, NegotiationError> {
        Ok(self.store.contracts_for_party(party).await?)
    }

    /// Terminate a contract. Terminating a TERMINATED contract is a no-op
    /// that returns the record unchanged.
    pub async fn terminate_contract(&self, id: ContractId) -> Result<Contract, NegotiationError> {
        let contract = self.get_contract(id).await?;
        if !contract.is_active() {
            tracing::debug!(contract_id = %id, "contract already terminated");
            return Ok(contract);
        }

        match self.store.mark_terminated(id, Timestamp::now()).await? {
            Some(terminated) => {
                tracing::info!(contract_id = %id, "contract terminated");
                Ok(terminated)
            }
            // Lost a race with another terminate.
            None => self.get_contract(id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pact_state::{ContractStatus, ContractTerms};
    use pact_store::MemoryStore;

    fn party(s: &str) -> PartyId {
        PartyId::new(s).unwrap()
    }

    fn manager() -> ContractManager {
        ContractManager::new(Arc::new(MemoryStore::new()))
    }

    fn draft(a: &str, b: &str, hpw: f64, total: f64) -> ContractDraft {
        ContractDraft {
            party_a: party(a),
            party_b: party(b),
            start_date: None,
            end_date: None,
            terms: ContractTerms {
                hours_per_week: hpw,
                total_hours: total,
                price_per_hour: 15.0,
            },
        }
    }

    #[tokio::test]
    async fn create_sets_defaults() {
        let m = manager();
        let c = m.create_contract(draft("co1", "st1", 10.0, 100.0)).await.unwrap();
        assert_eq!(c.status, ContractStatus::Active);
        assert_eq!(c.end_date, c.start_date.checked_add_weeks(10).unwrap());
    }

    #[tokio::test]
    async fn create_rejects_rule_violations() {
        let m = manager();
        for d in [
            draft("co1", "co1", 10.0, 100.0),
            draft("co1", "st1", 21.0, 100.0),
            draft("co1", "st1", 10.0, 270.0),
        ] {
            assert!(matches!(
                m.create_contract(d).await,
                Err(NegotiationError::InvalidContract(_))
            ));
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_in_either_order() {
        let m = manager();
        m.create_contract(draft("co1", "st1", 10.0, 100.0)).await.unwrap();
        assert!(matches!(
            m.create_contract(draft("st1", "co1", 5.0, 50.0)).await,
            Err(NegotiationError::DuplicateActiveContract(_))
        ));
    }

    #[tokio::test]
    async fn mixed_case_parties_order_by_bytes() {
        let m = manager();
        let c = m.create_contract(draft("co1", "ST1", 10.0, 100.0)).await.unwrap();
        assert_eq!(c.pair().unwrap().to_string(), "ST1<->co1");
        assert!(matches!(
            m.create_contract(draft("ST1", "co1", 5.0, 50.0)).await,
            Err(NegotiationError::DuplicateActiveContract(_))
        ));
        // Case is significant: st1 is a different party.
        m.create_contract(draft("co1", "st1", 10.0, 100.0)).await.unwrap();
    }

    #[tokio::test]
    async fn get_active_is_symmetric() {
        let m = manager();
        let c = m.create_contract(draft("co1", "st1", 10.0, 100.0)).await.unwrap();
        let found = m.get_active_contract(&party("st1"), &party("co1")).await.unwrap();
        assert_eq!(found.id, c.id);
    }

    #[tokio::test]
    async fn get_active_missing_or_same_party_is_not_found() {
        let m = manager();
        assert!(matches!(
            m.get_active_contract(&party("co1"), &party("st1")).await,
            Err(NegotiationError::ContractNotFound(_))
        ));
        assert!(matches!(
            m.get_active_contract(&party("co1"), &party("co1")).await,
            Err(NegotiationError::ContractNotFound(_))
        ));
    }

    #[tokio::test]
    async fn terminate_is_idempotent_and_frees_pair() {
        let m = manager();
        let c = m.create_contract(draft("co1", "st1", 10.0, 100.0)).await.unwrap();
        let t1 = m.terminate_contract(c.id).await.unwrap();
        assert_eq!(t1.status, ContractStatus::Terminated);
        let t2 = m.terminate_contract(c.id).await.unwrap();
        assert_eq!(t1, t2);
        assert_eq!(m.get_contract(c.id).await.unwrap(), t1);

        assert!(m.get_active_contract(&party("co1"), &party("st1")).await.is_err());
        m.create_contract(draft("co1", "st1", 10.0, 100.0)).await.unwrap();
    }

    #[tokio::test]
    async fn terminate_unknown_is_not_found() {
        assert!(matches!(
            manager().terminate_contract(ContractId::new()).await,
            Err(NegotiationError::ContractNotFound(_))
        ));
    }

    #[tokio::test]
    async fn visibility_hides_contract_from_outsiders() {
        let m = manager();
        let c = m.create_contract(draft("co1", "st1", 10.0, 100.0)).await.unwrap();
        assert!(m.get_visible_contract(c.id, &party("st1")).await.is_ok());
        let hidden = m.get_visible_contract(c.id, &party("mallory")).await.unwrap_err();
        assert_eq!(hidden.to_string(), format!("contract not found: {}", c.id.0));
    }

    #[tokio::test]
    async fn contracts_for_party_lists_both_sides() {
        let m = manager();
        m.create_contract(draft("co1", "st1", 10.0, 100.0)).await.unwrap();
        m.create_contract(draft("st2", "co1", 10.0, 100.0)).await.unwrap();
        m.create_contract(draft("co2", "st3", 10.0, 100.0)).await.unwrap();
        assert_eq!(m.contracts_for_party(&party("co1")).await.unwrap().len(), 2);
        assert_eq!(m.contracts_for_party(&party("st3")).await.unwrap().len(), 1);
    }
}
