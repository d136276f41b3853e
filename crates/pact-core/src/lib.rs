//! # pact-core — Foundational Types for the Pact Stack
//!
//! Every other crate in the workspace depends on `pact-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `ContractId`, `ProposalId` and
//!    `PartyId` are distinct types. A proposal id cannot be passed where a
//!    contract id is expected.
//!
//! 2. **Unordered party pairs.** [`PartyPair`] normalizes two party ids into
//!    a canonical (low, high) order so that "the contract between A and B"
//!    has exactly one key regardless of argument order.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] is UTC with seconds precision,
//!    so values survive a database round-trip unchanged.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `pact-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod temporal;

pub use error::ValidationError;
pub use identity::{ContractId, PartyId, PartyPair, ProposalId};
pub use temporal::Timestamp;
