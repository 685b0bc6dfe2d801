use crate::config::Config;
use crate::datasource::{DataSource, DataSourceError};
use crate::db::Repository;
use crate::domain::{start_of_day_utc, Login};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone)]
pub struct Ingestor {
    datasource: Arc<dyn DataSource>,
    repo: Arc<Repository>,
    config: Config,
}

impl Ingestor {
    pub fn new(datasource: Arc<dyn DataSource>, repo: Arc<Repository>, config: Config) -> Self {
        Self {
            datasource,
            repo,
            config,
        }
    }

    /// Ensure the cached activity log of `sponsor` covers everything since `since`.
    ///
    /// Once a sponsor's log is cached back to `since`, only the tail is
    /// re-fetched, starting `LOOKBACK_MS` before the previous sync.
    pub async fn ensure_ingested(
        &self,
        sponsor: &Login,
        since: DateTime<Utc>,
    ) -> Result<IngestionResult, IngestionError> {
        let fetch_from = self.compute_fetch_start(sponsor, since).await?;
        let synced_at = Utc::now();

        let events = self
            .datasource
            .fetch_sponsorship_log(sponsor.as_str(), fetch_from)
            .await?;

        let events_fetched = events.len();
        let (events_replaced, events_stored) = self
            .repo
            .replace_events_since(sponsor, fetch_from, &events)
            .await?;
        self.repo
            .record_sync(
                sponsor,
                fetch_from.timestamp_millis(),
                synced_at.timestamp_millis(),
            )
            .await?;

        tracing::info!(
            sponsor = %sponsor,
            fetch_from = %fetch_from,
            fetched = events_fetched,
            replaced = events_replaced,
            stored = events_stored,
            "Activity log synced"
        );

        Ok(IngestionResult {
            events_fetched,
            events_replaced,
            events_stored,
            fetch_from,
        })
    }

    async fn compute_fetch_start(
        &self,
        sponsor: &Login,
        since: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, IngestionError> {
        let requested = since.timestamp_millis();
        let fetch_from_ms = match self.repo.get_sync_state(sponsor).await? {
            Some(state) if state.covered_since_ms <= requested => {
                let incremental = state
                    .last_synced_at_ms
                    .saturating_sub(self.config.lookback_ms);
                incremental.max(requested)
            }
            _ => requested,
        };

        // Refetch whole days so no day mixes rows from two fetches.
        let fetch_from = Utc
            .timestamp_millis_opt(fetch_from_ms)
            .single()
            .map(|at| start_of_day_utc(at.date_naive()))
            .ok_or(IngestionError::InvalidTimestamp(fetch_from_ms))?;

        tracing::debug!(
            "Sync window for {}: requested from {} but fetching from {} (lookback {}ms)",
            sponsor,
            since,
            fetch_from,
            self.config.lookback_ms
        );

        Ok(fetch_from)
    }
}

#[derive(Debug)]
pub struct IngestionResult {
    pub events_fetched: usize,
    pub events_replaced: usize,
    pub events_stored: usize,
    pub fetch_from: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),
}
