//! # Contract Record
//!
//! An agreement between two named parties with a weekly workload, a total
//! workload and an hourly rate.
//!
//! ## States
//!
//! ```text
//! ACTIVE ──terminate──▶ TERMINATED (terminal)
//!   │
//!   └──apply_delta──▶ ACTIVE (terms overwritten in place)
//! ```
//!
//! Termination is idempotent at this level: terminating a terminated
//! contract changes nothing and reports `false`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use pact_core::{ContractId, PartyId, PartyPair, Timestamp, ValidationError};

use crate::lifecycle::LifecycleError;
use crate::proposal::ProposalDelta;
use crate::terms::{ContractTerms, TermsError};

/// Contract status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    /// In force; proposals may be submitted and accepted.
    Active,
    /// Ended (terminal).
    Terminated,
}

impl ContractStatus {
    /// Canonical upper-case name, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Terminated => "TERMINATED",
        }
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "TERMINATED" => Ok(Self::Terminated),
            other => Err(LifecycleError::UnknownStatus {
                record: "contract",
                value: other.to_string(),
            }),
        }
    }
}

/// Caller input for a new contract, before defaults are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractDraft {
    pub party_a: PartyId,
    pub party_b: PartyId,
    /// Defaults to the creation time.
    pub start_date: Option<Timestamp>,
    /// Defaults to `start_date + ceil(total_hours / hours_per_week)` weeks.
    pub end_date: Option<Timestamp>,
    pub terms: ContractTerms,
}

/// A contract between two parties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub party_a: PartyId,
    pub party_b: PartyId,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub hours_per_week: f64,
    pub total_hours: f64,
    pub price_per_hour: f64,
    pub status: ContractStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Contract {
    /// Validate a draft and build a fresh ACTIVE contract.
    ///
    /// Checks, in order: distinct parties, term bounds, end date not before
    /// start date. Missing dates are filled in from `now` and the terms.
    pub fn open(draft: ContractDraft, now: Timestamp) -> Result<Self, TermsError> {
        if draft.party_a == draft.party_b {
            return Err(TermsError::SameParty(draft.party_a.to_string()));
        }
        draft.terms.validate()?;

        let start_date = draft.start_date.unwrap_or(now);
        let end_date = match draft.end_date {
            Some(end) if end < start_date => {
                return Err(TermsError::EndBeforeStart {
                    start: start_date.to_iso8601(),
                    end: end.to_iso8601(),
                });
            }
            Some(end) => end,
            None => {
                let weeks = draft.terms.duration_weeks();
                start_date
                    .checked_add_weeks(weeks)
                    .ok_or_else(|| TermsError::DateOutOfRange {
                        start: start_date.to_iso8601(),
                        weeks,
                    })?
            }
        };

        Ok(Self {
            id: ContractId::new(),
            party_a: draft.party_a,
            party_b: draft.party_b,
            start_date,
            end_date,
            hours_per_week: draft.terms.hours_per_week,
            total_hours: draft.terms.total_hours,
            price_per_hour: draft.terms.price_per_hour,
            status: ContractStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    /// The current numeric terms.
    pub fn terms(&self) -> ContractTerms {
        ContractTerms {
            hours_per_week: self.hours_per_week,
            total_hours: self.total_hours,
            price_per_hour: self.price_per_hour,
        }
    }

    /// The normalized party pair this contract is keyed under.
    pub fn pair(&self) -> Result<PartyPair, ValidationError> {
        PartyPair::new(self.party_a.clone(), self.party_b.clone())
    }

    pub fn is_active(&self) -> bool {
        self.status == ContractStatus::Active
    }

    /// Whether `party` is party A or party B.
    pub fn involves(&self, party: &PartyId) -> bool {
        &self.party_a == party || &self.party_b == party
    }

    /// The other party, or `None` if `party` is not on this contract.
    pub fn counterparty(&self, party: &PartyId) -> Option<&PartyId> {
        if &self.party_a == party {
            Some(&self.party_b)
        } else if &self.party_b == party {
            Some(&self.party_a)
        } else {
            None
        }
    }

    /// Move to TERMINATED. Returns `false` if already terminated.
    pub fn terminate(&mut self, now: Timestamp) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = ContractStatus::Terminated;
        self.updated_at = now;
        true
    }

    /// Overwrite the terms named in `delta`. Absent fields keep their value.
    ///
    /// The end date is left as it is. Bounds are the caller's
    /// responsibility (see [`ProposalDelta::validate_against`]).
    pub fn apply_delta(&mut self, delta: &ProposalDelta, now: Timestamp) -> Result<(), LifecycleError> {
        if !self.is_active() {
            return Err(LifecycleError::InvalidTransition {
                record: "contract",
                from: self.status.to_string(),
                to: "AMENDED".to_string(),
            });
        }
        let merged = delta.effective_terms(&self.terms());
        self.hours_per_week = merged.hours_per_week;
        self.total_hours = merged.total_hours;
        self.price_per_hour = merged.price_per_hour;
        self.updated_at = now;
        Ok(())
    }
}
