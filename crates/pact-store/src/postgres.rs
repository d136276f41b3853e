//! # PostgreSQL Store
//!
//! SQLx-backed implementation of both store traits. Uniqueness and term
//! bounds are enforced by the schema (see `migrations/`): a violation
//! surfaces as [`StoreError::UniqueViolation`] or
//! [`StoreError::CheckViolation`] through the `From<sqlx::Error>` mapping.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use pact_core::{ContractId, PartyId, PartyPair, ProposalId, Timestamp};
use pact_state::{ChangeProposal, Contract, ProposalDelta, ProposalStatus};

use crate::error::StoreError;
use crate::traits::{AcceptanceOutcome, ContractStore, ProposalStore};

const CONTRACT_COLUMNS: &str = "id, party_a, party_b, start_date, end_date, \
     hours_per_week, total_hours, price_per_hour, status, created_at, updated_at";

const PROPOSAL_COLUMNS: &str = "id, contract_id, proposer_id, participant_id, \
     hours_per_week, total_hours, price_per_hour, status, created_at, updated_at";

/// Postgres-backed contract and proposal store.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect, then apply embedded migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;
        tracing::info!(max_connections, "connected to PostgreSQL");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;
        tracing::info!("database migrations applied");

        Ok(Self { pool })
    }
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

#[async_trait]
impl ContractStore for PgStore {
    async fn insert_contract(&self, contract: &Contract) -> Result<(), StoreError> {
        let pair = contract
            .pair()
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", contract.id)))?;

        sqlx::query(
            "INSERT INTO contracts (id, party_a, party_b, party_low, party_high, start_date, end_date,
                                    hours_per_week, total_hours, price_per_hour, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(contract.id.0)
        .bind(contract.party_a.as_str())
        .bind(contract.party_b.as_str())
        .bind(pair.low().as_str())
        .bind(pair.high().as_str())
        .bind(*contract.start_date.as_datetime())
        .bind(*contract.end_date.as_datetime())
        .bind(contract.hours_per_week)
        .bind(contract.total_hours)
        .bind(contract.price_per_hour)
        .bind(contract.status.as_str())
        .bind(*contract.created_at.as_datetime())
        .bind(*contract.updated_at.as_datetime())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_contract(&self, id: ContractId) -> Result<Option<Contract>, StoreError> {
        let row = sqlx::query_as::<_, ContractRow>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ContractRow::into_record).transpose()
    }

    async fn get_active_contract(&self, pair: &PartyPair) -> Result<Option<Contract>, StoreError> {
        let row = sqlx::query_as::<_, ContractRow>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts
             WHERE party_low = $1 AND party_high = $2 AND status = 'ACTIVE'"
        ))
        .bind(pair.low().as_str())
        .bind(pair.high().as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ContractRow::into_record).transpose()
    }

    async fn update_contract(&self, contract: &Contract) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE contracts SET
                start_date = $2,
                end_date = $3,
                hours_per_week = $4,
                total_hours = $5,
                price_per_hour = $6,
                status = $7,
                updated_at = $8
             WHERE id = $1",
        )
        .bind(contract.id.0)
        .bind(*contract.start_date.as_datetime())
        .bind(*contract.end_date.as_datetime())
        .bind(contract.hours_per_week)
        .bind(contract.total_hours)
        .bind(contract.price_per_hour)
        .bind(contract.status.as_str())
        .bind(*contract.updated_at.as_datetime())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_terminated(
        &self,
        id: ContractId,
        now: Timestamp,
    ) -> Result<Option<Contract>, StoreError> {
        let row = sqlx::query_as::<_, ContractRow>(&format!(
            "UPDATE contracts SET status = 'TERMINATED', updated_at = $2
             WHERE id = $1 AND status = 'ACTIVE'
             RETURNING {CONTRACT_COLUMNS}"
        ))
        .bind(id.0)
        .bind(*now.as_datetime())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ContractRow::into_record).transpose()
    }

    async fn contracts_for_party(&self, party: &PartyId) -> Result<Vec<Contract>, StoreError> {
        let rows = sqlx::query_as::<_, ContractRow>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts
             WHERE party_a = $1 OR party_b = $1
             ORDER BY created_at DESC, id"
        ))
        .bind(party.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ContractRow::into_record).collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Proposals
// ---------------------------------------------------------------------------

#[async_trait]
impl ProposalStore for PgStore {
    async fn insert_proposal(&self, proposal: &ChangeProposal) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO change_proposals (id, contract_id, proposer_id, participant_id,
                                           hours_per_week, total_hours, price_per_hour,
                                           status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(proposal.id.0)
        .bind(proposal.contract_id.0)
        .bind(proposal.proposer_id.as_str())
        .bind(proposal.participant_id.as_str())
        .bind(proposal.delta.hours_per_week)
        .bind(proposal.delta.total_hours)
        .bind(proposal.delta.price_per_hour)
        .bind(proposal.status.as_str())
        .bind(*proposal.created_at.as_datetime())
        .bind(*proposal.updated_at.as_datetime())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_proposal(&self, id: ProposalId) -> Result<Option<ChangeProposal>, StoreError> {
        let row = sqlx::query_as::<_, ProposalRow>(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM change_proposals WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProposalRow::into_record).transpose()
    }

    async fn find_pending(
        &self,
        contract_id: ContractId,
        proposer: &PartyId,
    ) -> Result<Option<ChangeProposal>, StoreError> {
        let row = sqlx::query_as::<_, ProposalRow>(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM change_proposals
             WHERE contract_id = $1 AND proposer_id = $2 AND status = 'PENDING'"
        ))
        .bind(contract_id.0)
        .bind(proposer.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProposalRow::into_record).transpose()
    }

    async fn find_by_status(
        &self,
        contract_id: ContractId,
        status: ProposalStatus,
    ) -> Result<Vec<ChangeProposal>, StoreError> {
        let rows = sqlx::query_as::<_, ProposalRow>(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM change_proposals
             WHERE contract_id = $1 AND status = $2
             ORDER BY created_at, id"
        ))
        .bind(contract_id.0)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProposalRow::into_record).collect()
    }

    async fn proposals_for_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Vec<ChangeProposal>, StoreError> {
        let rows = sqlx::query_as::<_, ProposalRow>(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM change_proposals
             WHERE contract_id = $1
             ORDER BY created_at, id"
        ))
        .bind(contract_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProposalRow::into_record).collect()
    }

    async fn update_proposal(
        &self,
        proposal: &ChangeProposal,
        expected: ProposalStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE change_proposals SET
                hours_per_week = $2,
                total_hours = $3,
                price_per_hour = $4,
                status = $5,
                updated_at = $6
             WHERE id = $1 AND status = $7",
        )
        .bind(proposal.id.0)
        .bind(proposal.delta.hours_per_week)
        .bind(proposal.delta.total_hours)
        .bind(proposal.delta.price_per_hour)
        .bind(proposal.status.as_str())
        .bind(*proposal.updated_at.as_datetime())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_proposal(
        &self,
        id: ProposalId,
        expected: ProposalStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM change_proposals WHERE id = $1 AND status = $2")
            .bind(id.0)
            .bind(expected.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit_acceptance(
        &self,
        proposal_id: ProposalId,
        now: Timestamp,
    ) -> Result<AcceptanceOutcome, StoreError> {
        // Dropping `tx` without commit rolls back.
        let mut tx = self.pool.begin().await?;

        let proposal = sqlx::query_as::<_, ProposalRow>(&format!(
            "UPDATE change_proposals SET status = 'ACCEPTED', updated_at = $2
             WHERE id = $1 AND status = 'PENDING'
             RETURNING {PROPOSAL_COLUMNS}"
        ))
        .bind(proposal_id.0)
        .bind(*now.as_datetime())
        .fetch_optional(&mut *tx)
        .await?;
        let proposal = match proposal {
            Some(row) => row.into_record()?,
            None => return Ok(AcceptanceOutcome::ProposalNotPending),
        };

        let contract = sqlx::query_as::<_, ContractRow>(&format!(
            "UPDATE contracts SET
                hours_per_week = COALESCE($2, hours_per_week),
                total_hours = COALESCE($3, total_hours),
                price_per_hour = COALESCE($4, price_per_hour),
                updated_at = $5
             WHERE id = $1 AND status = 'ACTIVE'
             RETURNING {CONTRACT_COLUMNS}"
        ))
        .bind(proposal.contract_id.0)
        .bind(proposal.delta.hours_per_week)
        .bind(proposal.delta.total_hours)
        .bind(proposal.delta.price_per_hour)
        .bind(*now.as_datetime())
        .fetch_optional(&mut *tx)
        .await?;
        let contract = match contract {
            Some(row) => row.into_record()?,
            None => return Ok(AcceptanceOutcome::ContractInactive),
        };

        let purged = sqlx::query(
            "DELETE FROM change_proposals WHERE contract_id = $1 AND status = 'REJECTED'",
        )
        .bind(contract.id.0)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        Ok(AcceptanceOutcome::Committed {
            proposal,
            contract,
            purged,
        })
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct ContractRow {
    id: Uuid,
    party_a: String,
    party_b: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    hours_per_week: f64,
    total_hours: f64,
    price_per_hour: f64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ContractRow {
    fn into_record(self) -> Result<Contract, StoreError> {
        let corrupt = |field: &str, e: &dyn std::fmt::Display| {
            StoreError::Corrupt(format!("contract {}: {field}: {e}", self.id))
        };
        Ok(Contract {
            id: ContractId(self.id),
            party_a: PartyId::new(self.party_a.as_str()).map_err(|e| corrupt("party_a", &e))?,
            party_b: PartyId::new(self.party_b.as_str()).map_err(|e| corrupt("party_b", &e))?,
            start_date: Timestamp::from_utc(self.start_date),
            end_date: Timestamp::from_utc(self.end_date),
            hours_per_week: self.hours_per_week,
            total_hours: self.total_hours,
            price_per_hour: self.price_per_hour,
            status: self.status.parse().map_err(|e| corrupt("status", &e))?,
            created_at: Timestamp::from_utc(self.created_at),
            updated_at: Timestamp::from_utc(self.updated_at),
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProposalRow {
    id: Uuid,
    contract_id: Uuid,
    proposer_id: String,
    participant_id: String,
    hours_per_week: Option<f64>,
    total_hours: Option<f64>,
    price_per_hour: Option<f64>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProposalRow {
    fn into_record(self) -> Result<ChangeProposal, StoreError> {
        let corrupt = |field: &str, e: &dyn std::fmt::Display| {
            StoreError::Corrupt(format!("proposal {}: {field}: {e}", self.id))
        };
        Ok(ChangeProposal {
            id: ProposalId(self.id),
            contract_id: ContractId(self.contract_id),
            proposer_id: PartyId::new(self.proposer_id.as_str())
                .map_err(|e| corrupt("proposer_id", &e))?,
            participant_id: PartyId::new(self.participant_id.as_str())
                .map_err(|e| corrupt("participant_id", &e))?,
            delta: ProposalDelta {
                hours_per_week: self.hours_per_week,
                total_hours: self.total_hours,
                price_per_hour: self.price_per_hour,
            },
            status: self.status.parse().map_err(|e| corrupt("status", &e))?,
            created_at: Timestamp::from_utc(self.created_at),
            updated_at: Timestamp::from_utc(self.updated_at),
        })
    }
}
