//! Errors shared by the contract and proposal lifecycles.

use thiserror::Error;

/// A status transition or status decoding failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Attempted transition is not valid from the current status.
    #[error("invalid {record} transition: {from} -> {to}")]
    InvalidTransition {
        /// "contract" or "proposal".
        record: &'static str,
        /// Current status.
        from: String,
        /// Attempted target.
        to: String,
    },

    /// A persisted status string is not one of the known statuses.
    #[error("unknown {record} status {value:?}")]
    UnknownStatus {
        /// "contract" or "proposal".
        record: &'static str,
        /// The rejected string.
        value: String,
    },
}
