//! Store error type.

use thiserror::Error;

/// Errors returned by any store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness rule rejected the write. Carries the constraint name.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A CHECK rule rejected the write. Carries the constraint name.
    #[error("check constraint violated: {0}")]
    CheckViolation(String),

    /// A persisted row could not be decoded into a record.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Any other database failure.
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db) = err.as_database_error() {
            let constraint = db.constraint().unwrap_or("unknown").to_string();
            if db.is_unique_violation() {
                return Self::UniqueViolation(constraint);
            }
            if db.is_check_violation() {
                return Self::CheckViolation(constraint);
            }
        }
        Self::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_pass_through() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn display_names_constraint() {
        let err = StoreError::UniqueViolation("contracts_one_active_per_pair".into());
        assert_eq!(
            err.to_string(),
            "unique constraint violated: contracts_one_active_per_pair"
        );
    }
}
