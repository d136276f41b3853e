//! # Contract Terms and Bounds
//!
//! The numeric terms of a contract and the limits they must respect:
//!
//! - every term is a finite, strictly positive number;
//! - `hours_per_week <= 20`;
//! - `total_hours / hours_per_week <= 26` (the contract fits in 26 weeks),
//!   compared with [`DURATION_TOLERANCE`] so that quotients like
//!   `18.2 / 0.7` that land a rounding step above 26 still pass.
//!
//! The same check runs for a fresh contract and for the *effective* terms
//! of a change proposal, so a proposal can never push a contract outside
//! the bounds it was created under.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum weekly hours on any contract.
pub const MAX_HOURS_PER_WEEK: f64 = 20.0;

/// Maximum contract duration in weeks (`total_hours / hours_per_week`).
pub const MAX_DURATION_WEEKS: f64 = 26.0;

/// Slack on the duration quotient for floating-point rounding. The
/// database CHECK uses the same value.
pub const DURATION_TOLERANCE: f64 = 1e-9;

/// Violations of contract or proposal terms.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TermsError {
    /// Both parties of a contract are the same identity.
    #[error("a contract requires two distinct parties, got {0:?} twice")]
    SameParty(String),

    /// A term is zero, negative, NaN or infinite.
    #[error("{field} must be a positive number, got {value}")]
    NotPositive {
        /// Name of the offending term.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Weekly hours above [`MAX_HOURS_PER_WEEK`].
    #[error("hours_per_week {hours_per_week} exceeds the maximum of {max}")]
    WeeklyHoursExceeded {
        /// The rejected weekly hours.
        hours_per_week: f64,
        /// The configured maximum.
        max: f64,
    },

    /// Duration above [`MAX_DURATION_WEEKS`].
    #[error("duration of {weeks} weeks (total_hours / hours_per_week) exceeds the maximum of {max}")]
    DurationExceeded {
        /// `total_hours / hours_per_week`.
        weeks: f64,
        /// The configured maximum.
        max: f64,
    },

    /// A proposal without any field to change.
    #[error("proposal must change at least one of hours_per_week, total_hours, price_per_hour")]
    EmptyDelta,

    /// Explicit end date precedes the start date.
    #[error("end date {end} is before start date {start}")]
    EndBeforeStart {
        /// Start date (ISO8601).
        start: String,
        /// End date (ISO8601).
        end: String,
    },

    /// The derived end date is not representable.
    #[error("end date out of range: start {start} plus {weeks} weeks")]
    DateOutOfRange {
        /// Start date (ISO8601).
        start: String,
        /// Weeks that were to be added.
        weeks: i64,
    },
}

/// The negotiable numeric terms of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContractTerms {
    /// Agreed weekly workload.
    pub hours_per_week: f64,
    /// Total hours over the life of the contract.
    pub total_hours: f64,
    /// Hourly rate. Single implicit currency.
    pub price_per_hour: f64,
}

impl ContractTerms {
    /// Check positivity and both bounds.
    pub fn validate(&self) -> Result<(), TermsError> {
        require_positive("hours_per_week", self.hours_per_week)?;
        require_positive("total_hours", self.total_hours)?;
        require_positive("price_per_hour", self.price_per_hour)?;

        if self.hours_per_week > MAX_HOURS_PER_WEEK {
            return Err(TermsError::WeeklyHoursExceeded {
                hours_per_week: self.hours_per_week,
                max: MAX_HOURS_PER_WEEK,
            });
        }

        let weeks = self.weeks();
        if weeks > MAX_DURATION_WEEKS + DURATION_TOLERANCE {
            return Err(TermsError::DurationExceeded {
                weeks,
                max: MAX_DURATION_WEEKS,
            });
        }
        Ok(())
    }

    /// `total_hours / hours_per_week`, unrounded.
    pub fn weeks(&self) -> f64 {
        self.total_hours / self.hours_per_week
    }

    /// Whole weeks needed to work `total_hours`, rounded up.
    ///
    /// Only meaningful for validated terms (bounded by [`MAX_DURATION_WEEKS`]).
    pub fn duration_weeks(&self) -> i64 {
        ((self.weeks() - DURATION_TOLERANCE).ceil() as i64).max(1)
    }
}

/// Reject NaN, infinities, zero and negatives.
pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<(), TermsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TermsError::NotPositive { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn terms(hours_per_week: f64, total_hours: f64, price_per_hour: f64) -> ContractTerms {
        ContractTerms {
            hours_per_week,
            total_hours,
            price_per_hour,
        }
    }

    #[test]
    fn valid_terms_pass() {
        assert!(terms(10.0, 100.0, 15.0).validate().is_ok());
    }

    #[test]
    fn boundary_values_pass() {
        assert!(terms(20.0, 520.0, 1.0).validate().is_ok());
        assert!(terms(10.0, 260.0, 1.0).validate().is_ok());
    }

    #[test]
    fn quotient_rounding_above_bound_passes() {
        let t = terms(0.7, 18.2, 15.0);
        assert!(t.weeks() > MAX_DURATION_WEEKS - DURATION_TOLERANCE);
        assert!(t.validate().is_ok());
        assert_eq!(t.duration_weeks(), 26);

        assert!(matches!(
            terms(0.7, 18.21, 15.0).validate(),
            Err(TermsError::DurationExceeded { .. })
        ));
    }

    #[test]
    fn weekly_hours_above_twenty_rejected() {
        assert!(matches!(
            terms(25.0, 100.0, 15.0).validate(),
            Err(TermsError::WeeklyHoursExceeded { .. })
        ));
    }

    #[test]
    fn duration_above_twenty_six_weeks_rejected() {
        assert!(matches!(
            terms(10.0, 600.0, 15.0).validate(),
            Err(TermsError::DurationExceeded { weeks, .. }) if weeks == 60.0
        ));
    }

    #[test]
    fn non_positive_rejected() {
        assert!(matches!(
            terms(0.0, 100.0, 15.0).validate(),
            Err(TermsError::NotPositive { field: "hours_per_week", .. })
        ));
        assert!(matches!(
            terms(10.0, -1.0, 15.0).validate(),
            Err(TermsError::NotPositive { field: "total_hours", .. })
        ));
        assert!(matches!(
            terms(10.0, 100.0, f64::NAN).validate(),
            Err(TermsError::NotPositive { field: "price_per_hour", .. })
        ));
        assert!(matches!(
            terms(f64::INFINITY, 100.0, 15.0).validate(),
            Err(TermsError::NotPositive { .. })
        ));
    }

    #[test]
    fn duration_weeks_rounds_up() {
        assert_eq!(terms(10.0, 100.0, 1.0).duration_weeks(), 10);
        assert_eq!(terms(10.0, 101.0, 1.0).duration_weeks(), 11);
        assert_eq!(terms(15.0, 20.0, 1.0).duration_weeks(), 2);
    }

    proptest! {
        /// Anything that validates is within both bounds.
        #[test]
        fn validated_terms_respect_bounds(
            hpw in 0.1f64..40.0,
            total in 0.1f64..2000.0,
            price in 0.1f64..500.0,
        ) {
            let t = terms(hpw, total, price);
            if t.validate().is_ok() {
                prop_assert!(t.hours_per_week <= MAX_HOURS_PER_WEEK);
                prop_assert!(t.weeks() <= MAX_DURATION_WEEKS + DURATION_TOLERANCE);
                prop_assert!(t.duration_weeks() <= 26);
            }
        }
    }
}
