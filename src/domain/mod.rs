//! Domain types for sponsorship payment reconstruction.
//!
//! This module provides:
//! - Domain primitives: Login, Tier, calendar-day helpers
//! - SponsorshipEvent and SponsorshipAction as read from the activity log
//! - Payment and MonthlyTotal outputs
//! - Grouping of the activity log by calendar day

pub mod event;
pub mod grouping;
pub mod payment;
pub mod primitives;

pub use event::{EventTimestampError, SponsorshipAction, SponsorshipEvent, UnknownActionError};
pub use grouping::{group_events_by_day, DayBuckets};
pub use payment::{total_in_cents, MonthlyTotal, Payment};
pub use primitives::{days_in_month, format_day, parse_day, start_of_day_utc, Login, Tier};
