//! Fetch coverage bookkeeping for the repository.

use crate::domain::Login;
use sqlx::Row;

use super::Repository;

/// How much of a sponsor's activity log the cache holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    /// Earliest `since` instant ever fetched (ms since epoch).
    pub covered_since_ms: i64,
    /// When the last successful fetch started (ms since epoch).
    pub last_synced_at_ms: i64,
}

impl Repository {
    /// Get the sync state for a sponsor, if it was ever fetched.
    pub async fn get_sync_state(&self, sponsor: &Login) -> Result<Option<SyncState>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT covered_since_ms, last_synced_at_ms FROM sync_state WHERE sponsor = ?",
        )
        .bind(sponsor.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| SyncState {
            covered_since_ms: r.get("covered_since_ms"),
            last_synced_at_ms: r.get("last_synced_at_ms"),
        }))
    }

    /// Record a successful fetch. Coverage only ever widens.
    pub async fn record_sync(
        &self,
        sponsor: &Login,
        fetched_since_ms: i64,
        synced_at_ms: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO sync_state (sponsor, covered_since_ms, last_synced_at_ms)
            VALUES (?, ?, ?)
            ON CONFLICT(sponsor) DO UPDATE SET
                covered_since_ms = MIN(covered_since_ms, excluded.covered_since_ms),
                last_synced_at_ms = MAX(last_synced_at_ms, excluded.last_synced_at_ms)
            "#,
        )
        .bind(sponsor.as_str())
        .bind(fetched_since_ms)
        .bind(synced_at_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
