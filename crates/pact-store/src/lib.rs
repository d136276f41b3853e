//! # pact-store — Persistence for Contracts and Proposals
//!
//! Two traits, [`ContractStore`] and [`ProposalStore`], and two backends:
//!
//! - [`MemoryStore`]: both tables behind one `parking_lot::RwLock`. Used in
//!   tests and when no database is configured.
//! - [`PgStore`]: PostgreSQL via SQLx with embedded migrations.
//!
//! ## Uniqueness
//!
//! The stores, not the callers, enforce the two uniqueness rules:
//!
//! - at most one ACTIVE contract per unordered party pair;
//! - at most one PENDING proposal per (contract, proposer).
//!
//! A violating insert fails with [`StoreError::UniqueViolation`]. Callers
//! may pre-check for a friendlier error, but the store check is the one
//! that holds under concurrency.
//!
//! ## Acceptance
//!
//! [`ProposalStore::commit_acceptance`] performs the three writes of an
//! accept (flip proposal, merge delta into contract, purge REJECTED
//! siblings) as one unit: a transaction in Postgres, one write-lock scope
//! in memory.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use traits::{AcceptanceOutcome, ContractStore, ProposalStore};
