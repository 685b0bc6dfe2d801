//! Mock data source for testing without network calls.

use super::{DataSource, DataSourceError};
use crate::domain::SponsorshipEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock data source that returns predefined test data.
#[derive(Debug, Clone, Default)]
pub struct MockDataSource {
    events: Vec<(String, SponsorshipEvent)>,
    charges: Vec<(String, DateTime<Utc>, i64)>,
    log_fetches: Arc<AtomicUsize>,
}

impl MockDataSource {
    /// Create a new mock data source with empty data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an activity log event for `sponsor`.
    pub fn with_event(mut self, sponsor: &str, event: SponsorshipEvent) -> Self {
        self.events.push((sponsor.to_string(), event));
        self
    }

    /// Add multiple activity log events for `sponsor`, in order.
    pub fn with_events(mut self, sponsor: &str, events: Vec<SponsorshipEvent>) -> Self {
        self.events
            .extend(events.into_iter().map(|e| (sponsor.to_string(), e)));
        self
    }

    /// Record a real charge counted by `fetch_total_amount`.
    pub fn with_charge(mut self, sponsor: &str, at: DateTime<Utc>, amount_in_cents: i64) -> Self {
        self.charges.push((sponsor.to_string(), at, amount_in_cents));
        self
    }

    /// Number of `fetch_sponsorship_log` calls served so far.
    pub fn log_fetch_count(&self) -> usize {
        self.log_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for MockDataSource {
    async fn fetch_sponsorship_log(
        &self,
        sponsor: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SponsorshipEvent>, DataSourceError> {
        self.log_fetches.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .events
            .iter()
            .filter(|(s, _)| s == sponsor)
            .filter(|(_, e)| match e.instant() {
                Ok(at) => at.with_timezone(&Utc) >= since,
                // Passed through so callers see the bad timestamp.
                Err(_) => true,
            })
            .map(|(_, e)| e.clone())
            .collect())
    }

    async fn fetch_total_amount(
        &self,
        sponsor: &str,
        until: DateTime<Utc>,
    ) -> Result<i64, DataSourceError> {
        Ok(self
            .charges
            .iter()
            .filter(|(s, at, _)| s == sponsor && *at < until)
            .map(|(_, _, amount)| amount)
            .sum())
    }
}
