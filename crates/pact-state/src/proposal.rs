//! # Change Proposal Record
//!
//! A request by one contract party to change some of the contract's terms,
//! awaiting review by the other party.
//!
//! ## States
//!
//! ```text
//! PENDING ──accept──▶ ACCEPTED (terminal)
//!    │
//!    └─────reject──▶ REJECTED (terminal)
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use pact_core::{ContractId, PartyId, ProposalId, Timestamp};

use crate::lifecycle::LifecycleError;
use crate::terms::{require_positive, ContractTerms, TermsError};

/// Proposal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    /// Awaiting review by the participant.
    Pending,
    /// Accepted; the delta has been merged into the contract.
    Accepted,
    /// Rejected; purged by the next accept on the same contract.
    Rejected,
}

impl ProposalStatus {
    /// Canonical upper-case name, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "ACCEPTED" => Ok(Self::Accepted),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(LifecycleError::UnknownStatus {
                record: "proposal",
                value: other.to_string(),
            }),
        }
    }
}

// ─── Delta ───────────────────────────────────────────────────────────

/// The requested changes. `None` means "leave as is".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposalDelta {
    #[serde(default)]
    pub hours_per_week: Option<f64>,
    #[serde(default)]
    pub total_hours: Option<f64>,
    #[serde(default)]
    pub price_per_hour: Option<f64>,
}

impl ProposalDelta {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.hours_per_week.is_none() && self.total_hours.is_none() && self.price_per_hour.is_none()
    }

    /// The terms that would result from merging this delta over `current`.
    pub fn effective_terms(&self, current: &ContractTerms) -> ContractTerms {
        ContractTerms {
            hours_per_week: self.hours_per_week.unwrap_or(current.hours_per_week),
            total_hours: self.total_hours.unwrap_or(current.total_hours),
            price_per_hour: self.price_per_hour.unwrap_or(current.price_per_hour),
        }
    }

    /// Check that the delta is non-empty, that every present field is
    /// positive, and that the merged terms stay within bounds.
    ///
    /// Returns the effective terms on success.
    pub fn validate_against(&self, current: &ContractTerms) -> Result<ContractTerms, TermsError> {
        if self.is_empty() {
            return Err(TermsError::EmptyDelta);
        }
        if let Some(v) = self.hours_per_week {
            require_positive("hours_per_week", v)?;
        }
        if let Some(v) = self.total_hours {
            require_positive("total_hours", v)?;
        }
        if let Some(v) = self.price_per_hour {
            require_positive("price_per_hour", v)?;
        }
        let effective = self.effective_terms(current);
        effective.validate()?;
        Ok(effective)
    }
}

// ─── Proposal ────────────────────────────────────────────────────────

/// A change proposal against one contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeProposal {
    pub id: ProposalId,
    pub contract_id: ContractId,
    /// The party that submitted the proposal.
    pub proposer_id: PartyId,
    /// The other party, who may accept or reject.
    pub participant_id: PartyId,
    #[serde(flatten)]
    pub delta: ProposalDelta,
    pub status: ProposalStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ChangeProposal {
    /// A new PENDING proposal.
    pub fn new(
        contract_id: ContractId,
        proposer_id: PartyId,
        participant_id: PartyId,
        delta: ProposalDelta,
        now: Timestamp,
    ) -> Self {
        Self {
            id: ProposalId::new(),
            contract_id,
            proposer_id,
            participant_id,
            delta,
            status: ProposalStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ProposalStatus::Pending
    }

    /// PENDING → ACCEPTED.
    pub fn accept(&mut self, now: Timestamp) -> Result<(), LifecycleError> {
        self.transition(ProposalStatus::Accepted, now)
    }

    /// PENDING → REJECTED.
    pub fn reject(&mut self, now: Timestamp) -> Result<(), LifecycleError> {
        self.transition(ProposalStatus::Rejected, now)
    }

    fn transition(&mut self, to: ProposalStatus, now: Timestamp) -> Result<(), LifecycleError> {
        if !self.is_pending() {
            return Err(LifecycleError::InvalidTransition {
                record: "proposal",
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }
}
