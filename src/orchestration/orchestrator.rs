use crate::datasource::{DataSource, DataSourceError};
use crate::db::Repository;
use crate::domain::{start_of_day_utc, Login, Payment};
use crate::engine::{month_windows, reconstruct_payments, sum_by_window, ReconstructionError, ShortMonthPolicy};
use crate::orchestration::cross_check::{compare_totals, CrossChecker, MonthlyComparison};
use crate::orchestration::ensure::{IngestionError, Ingestor};
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone)]
pub struct Orchestrator {
    ingestor: Ingestor,
    repo: Arc<Repository>,
    cross_checker: CrossChecker,
    policy: ShortMonthPolicy,
}

impl Orchestrator {
    pub fn new(
        ingestor: Ingestor,
        repo: Arc<Repository>,
        datasource: Arc<dyn DataSource>,
        policy: ShortMonthPolicy,
    ) -> Self {
        Self {
            ingestor,
            repo,
            cross_checker: CrossChecker::new(datasource),
            policy,
        }
    }

    /// Sync the sponsor's activity log and reconstruct payments for `start..=end`.
    pub async fn reconstruct(
        &self,
        sponsor: &Login,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Payment>, OrchestrationError> {
        if end < start {
            return Err(ReconstructionError::InvalidRange { start, end }.into());
        }

        self.ingestor
            .ensure_ingested(sponsor, start_of_day_utc(start))
            .await?;

        let events = self.repo.query_events(sponsor).await?;
        let payments = reconstruct_payments(&events, start, end, self.policy)?;

        tracing::info!(
            sponsor = %sponsor,
            start = %start,
            end = %end,
            events = events.len(),
            payments = payments.len(),
            "Payments reconstructed"
        );

        Ok(payments)
    }

    /// Compare reconstructed payments with the platform's own totals, month by month.
    ///
    /// Windows start on `start` and step by one month; the last one is cut at
    /// the end of `end`.
    pub async fn cross_check(
        &self,
        sponsor: &Login,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MonthlyComparison>, OrchestrationError> {
        let payments = self.reconstruct(sponsor, start, end).await?;

        let Some(end_exclusive) = end.succ_opt() else {
            return Err(ReconstructionError::InvalidRange { start, end }.into());
        };
        let windows: Vec<(NaiveDate, NaiveDate)> = month_windows(start, end_exclusive)
            .into_iter()
            .map(|(window_start, window_end)| (window_start, window_end.min(end_exclusive)))
            .collect();

        let reconstructed = sum_by_window(&payments, &windows);
        let reported = self
            .cross_checker
            .reported_totals(sponsor.as_str(), &windows)
            .await?;

        let comparisons = compare_totals(&reconstructed, &reported);
        let mismatched = comparisons
            .iter()
            .filter(|c| c.difference_in_cents != 0)
            .count();
        if mismatched > 0 {
            tracing::warn!(
                sponsor = %sponsor,
                months = comparisons.len(),
                mismatched,
                "Reconstructed payments disagree with reported totals"
            );
        }

        Ok(comparisons)
    }
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
    #[error(transparent)]
    Reconstruction(#[from] ReconstructionError),
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}
