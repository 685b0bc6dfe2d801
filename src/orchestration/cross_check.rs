//! Lossy cross-check of reconstructed payments against the platform's
//! cumulative totals.
//!
//! The platform only answers "how much was paid up to instant T", so each
//! month's amount is the difference of two cumulative totals.

use crate::datasource::{DataSource, DataSourceError};
use crate::domain::{start_of_day_utc, MonthlyTotal};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;

/// Cumulative-total requests kept in flight at once.
const MAX_CONCURRENT_TOTALS: usize = 4;

/// Reported and reconstructed amounts for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyComparison {
    pub month_start: NaiveDate,
    pub reconstructed_in_cents: i64,
    pub reported_in_cents: i64,
    pub difference_in_cents: i64,
}

#[derive(Clone)]
pub struct CrossChecker {
    datasource: Arc<dyn DataSource>,
}

impl CrossChecker {
    pub fn new(datasource: Arc<dyn DataSource>) -> Self {
        Self { datasource }
    }

    /// Amount the platform reports for each `[start, end)` window.
    pub async fn reported_totals(
        &self,
        sponsor: &str,
        windows: &[(NaiveDate, NaiveDate)],
    ) -> Result<Vec<MonthlyTotal>, DataSourceError> {
        let Some(&(first_start, _)) = windows.first() else {
            return Ok(Vec::new());
        };

        let boundaries: Vec<NaiveDate> = std::iter::once(first_start)
            .chain(windows.iter().map(|&(_, end)| end))
            .collect();

        let cumulative: Vec<i64> = stream::iter(boundaries)
            .map(|boundary| {
                self.datasource
                    .fetch_total_amount(sponsor, start_of_day_utc(boundary))
            })
            .buffered(MAX_CONCURRENT_TOTALS)
            .try_collect()
            .await?;

        Ok(windows
            .iter()
            .zip(cumulative.windows(2))
            .map(|(&(month_start, _), pair)| MonthlyTotal {
                month_start,
                amount_in_cents: pair[1] - pair[0],
            })
            .collect())
    }
}

/// Pair reconstructed and reported totals of the same windows.
pub fn compare_totals(
    reconstructed: &[MonthlyTotal],
    reported: &[MonthlyTotal],
) -> Vec<MonthlyComparison> {
    reconstructed
        .iter()
        .zip(reported)
        .map(|(ours, theirs)| MonthlyComparison {
            month_start: ours.month_start,
            reconstructed_in_cents: ours.amount_in_cents,
            reported_in_cents: theirs.amount_in_cents,
            difference_in_cents: ours.amount_in_cents - theirs.amount_in_cents,
        })
        .collect()
}
