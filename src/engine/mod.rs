//! Pure computation engine for payment reconstruction.

use crate::domain::{EventTimestampError, Login, SponsorshipAction, SponsorshipEvent};
use chrono::NaiveDate;
use thiserror::Error;

pub mod monthly;
pub mod reconstructor;
pub mod schedule;

pub use monthly::{month_windows, monthly_sums, sum_by_window};
pub use reconstructor::{reconstruct_payments, PaymentReconstructor};
pub use schedule::{ShortMonthPolicy, SubscriptionSchedule};

/// Failure of a reconstruction run. All variants are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconstructionError {
    #[error("end date {end} precedes start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("malformed {action} event for {login} on {day}: {reason}")]
    MalformedEvent {
        day: NaiveDate,
        action: SponsorshipAction,
        login: Login,
        reason: &'static str,
    },
    #[error("{action} on {day} references {login}, which has no active recurring sponsorship")]
    InconsistentState {
        day: NaiveDate,
        action: SponsorshipAction,
        login: Login,
    },
    #[error(transparent)]
    Timestamp(#[from] EventTimestampError),
}

impl ReconstructionError {
    pub(crate) fn malformed(day: NaiveDate, event: &SponsorshipEvent, reason: &'static str) -> Self {
        ReconstructionError::MalformedEvent {
            day,
            action: event.action,
            login: event.recipient_login.clone(),
            reason,
        }
    }

    pub(crate) fn inconsistent(day: NaiveDate, event: &SponsorshipEvent) -> Self {
        ReconstructionError::InconsistentState {
            day,
            action: event.action,
            login: event.recipient_login.clone(),
        }
    }
}
