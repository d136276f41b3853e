//! # pact-state — Contract and Change-Proposal Records
//!
//! Pure domain records and the rules that govern them. Nothing in this crate
//! performs I/O; persistence and orchestration live in `pact-store` and
//! `pact-engine`.
//!
//! ## Records
//!
//! - **Contract** (`contract.rs`): `ACTIVE → TERMINATED`, irreversible.
//!   Terms are overwritten in place when a proposal is accepted.
//!
//! - **ChangeProposal** (`proposal.rs`): `PENDING → ACCEPTED | REJECTED`,
//!   both terminal. Carries a [`ProposalDelta`] whose absent fields mean
//!   "no change".
//!
//! - **Terms** (`terms.rs`): the three numeric terms of a contract and the
//!   bounds every contract and every effective proposal must satisfy.
//!
//! ## Design Decision
//!
//! Lifecycles are enums with validated transition methods returning
//! `Result`, not typestate types. Records are loaded from storage with a
//! status known only at runtime, so the check has to happen at runtime
//! anyway.

pub mod contract;
pub mod lifecycle;
pub mod proposal;
pub mod terms;

pub use contract::{Contract, ContractDraft, ContractStatus};
pub use lifecycle::LifecycleError;
pub use proposal::{ChangeProposal, ProposalDelta, ProposalStatus};
pub use terms::{
    ContractTerms, TermsError, DURATION_TOLERANCE, MAX_DURATION_WEEKS, MAX_HOURS_PER_WEEK,
};
