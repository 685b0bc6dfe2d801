//! Activity log operations for the repository.

use crate::domain::{Login, SponsorshipAction, SponsorshipEvent, Tier};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Row, Transaction};
use std::collections::HashMap;

use super::Repository;

impl Repository {
    /// Replace every cached event of `sponsor` at or after `from` with `events`.
    ///
    /// A single fetch then owns each day it touches, so same-day events keep
    /// the order of one source response. Rows whose timestamp could not be
    /// read are kept, so reconstruction still reports them.
    ///
    /// Returns `(removed, inserted)`.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn replace_events_since(
        &self,
        sponsor: &Login,
        from: DateTime<Utc>,
        events: &[SponsorshipEvent],
    ) -> Result<(usize, usize), sqlx::Error> {
        let fetched_at = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;

        // Write first: a deferred transaction that reads before writing cannot
        // take the write lock once another connection has committed.
        let removed = sqlx::query(
            "DELETE FROM sponsorship_events WHERE sponsor = ? AND timestamp_ms >= ?",
        )
        .bind(sponsor.as_str())
        .bind(from.timestamp_millis())
        .execute(&mut *tx)
        .await?
        .rows_affected() as usize;

        let inserted = insert_events_tx(&mut tx, sponsor, events, fetched_at).await?;
        tx.commit().await?;
        Ok((removed, inserted))
    }

    /// All cached events of `sponsor`, in the order they were first fetched.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row holds an unknown action.
    pub async fn query_events(&self, sponsor: &Login) -> Result<Vec<SponsorshipEvent>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT action, timestamp, recipient_login,
                   tier_monthly_price_in_cents, tier_is_one_time,
                   previous_tier_monthly_price_in_cents, previous_tier_is_one_time
            FROM sponsorship_events
            WHERE sponsor = ?
            ORDER BY id ASC
            "#,
        )
        .bind(sponsor.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_event).collect()
    }

    /// Number of cached events of `sponsor`.
    pub async fn count_events(&self, sponsor: &Login) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM sponsorship_events WHERE sponsor = ?")
            .bind(sponsor.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n"))
    }
}

/// Insert `events` in order. Identical events within one batch are told
/// apart by their occurrence, so only rows already cached are skipped.
async fn insert_events_tx(
    tx: &mut Transaction<'_, Sqlite>,
    sponsor: &Login,
    events: &[SponsorshipEvent],
    fetched_at: i64,
) -> Result<usize, sqlx::Error> {
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    let mut total_inserted = 0usize;
    for event in events {
        let base_key = event.event_key(sponsor);
        let seen = occurrences.entry(base_key.clone()).or_insert(0);
        let event_key = format!("{}#{}", base_key, seen);
        *seen += 1;

        let result = sqlx::query(
            r#"
            INSERT INTO sponsorship_events (
                sponsor, event_key, action, timestamp, timestamp_ms, recipient_login,
                tier_monthly_price_in_cents, tier_is_one_time,
                previous_tier_monthly_price_in_cents, previous_tier_is_one_time,
                fetched_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(sponsor, event_key) DO NOTHING
            "#,
        )
        .bind(sponsor.as_str())
        .bind(event_key)
        .bind(event.action.as_str())
        .bind(event.timestamp.as_str())
        .bind(event.instant().ok().map(|at| at.timestamp_millis()))
        .bind(event.recipient_login.as_str())
        .bind(event.tier.map(|t| t.monthly_price_in_cents))
        .bind(event.tier.map(|t| t.is_one_time))
        .bind(event.previous_tier.map(|t| t.monthly_price_in_cents))
        .bind(event.previous_tier.map(|t| t.is_one_time))
        .bind(fetched_at)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() > 0 {
            total_inserted += 1;
        }
    }
    Ok(total_inserted)
}

fn row_to_event(row: &SqliteRow) -> Result<SponsorshipEvent, sqlx::Error> {
    let action_str: String = row.try_get("action")?;
    let action: SponsorshipAction = action_str
        .parse()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(SponsorshipEvent {
        action,
        timestamp: row.try_get("timestamp")?,
        recipient_login: Login::new(row.try_get("recipient_login")?),
        tier: tier_from_columns(
            row.try_get("tier_monthly_price_in_cents")?,
            row.try_get("tier_is_one_time")?,
        ),
        previous_tier: tier_from_columns(
            row.try_get("previous_tier_monthly_price_in_cents")?,
            row.try_get("previous_tier_is_one_time")?,
        ),
    })
}

fn tier_from_columns(price: Option<i64>, is_one_time: Option<bool>) -> Option<Tier> {
    match (price, is_one_time) {
        (Some(monthly_price_in_cents), Some(is_one_time)) => Some(Tier {
            monthly_price_in_cents,
            is_one_time,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use chrono::TimeZone;

    async fn setup_repo() -> Repository {
        let pool = init_db(":memory:").await.expect("init_db failed");
        Repository::new(pool)
    }

    fn event(action: SponsorshipAction, timestamp: &str, login: &str, tier: Option<Tier>) -> SponsorshipEvent {
        SponsorshipEvent::new(action, timestamp, Login::new(login.to_string()), tier)
    }

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_query_preserves_order_and_fields() {
        let repo = setup_repo().await;
        let sponsor = Login::new("sponsor".to_string());
        let events = vec![
            event(
                SponsorshipAction::NewSubscription,
                "2024-01-05T12:00:00Z",
                "bob",
                Some(Tier::recurring(300)),
            ),
            event(
                SponsorshipAction::TierChange,
                "2024-01-05T08:00:00Z",
                "bob",
                Some(Tier::one_time(1000)),
            )
            .with_previous_tier(Tier::recurring(300)),
            event(SponsorshipAction::CancelledSubscription, "2024-01-04T00:00:00Z", "alice", None),
        ];

        let (removed, inserted) = repo
            .replace_events_since(&sponsor, utc(2024, 1, 1), &events)
            .await
            .unwrap();
        assert_eq!((removed, inserted), (0, 3));

        let cached = repo.query_events(&sponsor).await.unwrap();
        assert_eq!(cached, events);
    }

    #[tokio::test]
    async fn test_replace_is_idempotent() {
        let repo = setup_repo().await;
        let sponsor = Login::new("sponsor".to_string());
        let events = vec![event(
            SponsorshipAction::Refund,
            "2024-01-05T12:00:00Z",
            "bob",
            Some(Tier::recurring(300)),
        )];

        repo.replace_events_since(&sponsor, utc(2024, 1, 1), &events)
            .await
            .unwrap();
        let (removed, inserted) = repo
            .replace_events_since(&sponsor, utc(2024, 1, 1), &events)
            .await
            .unwrap();
        assert_eq!((removed, inserted), (1, 1));
        assert_eq!(repo.count_events(&sponsor).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_identical_events_in_one_batch_are_kept() {
        let repo = setup_repo().await;
        let sponsor = Login::new("sponsor".to_string());
        let refund = event(
            SponsorshipAction::Refund,
            "2024-01-05T12:00:00Z",
            "bob",
            Some(Tier::recurring(300)),
        );

        let (_, inserted) = repo
            .replace_events_since(&sponsor, utc(2024, 1, 1), &[refund.clone(), refund.clone()])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(repo.query_events(&sponsor).await.unwrap(), vec![refund.clone(), refund]);
    }

    #[tokio::test]
    async fn test_older_rows_returned_again_are_not_duplicated() {
        let repo = setup_repo().await;
        let sponsor = Login::new("sponsor".to_string());
        let old = event(
            SponsorshipAction::NewSubscription,
            "2024-01-05T12:00:00Z",
            "alice",
            Some(Tier::recurring(500)),
        );
        repo.replace_events_since(&sponsor, utc(2024, 1, 1), &[old.clone()])
            .await
            .unwrap();

        // The source may hand back events from before the requested instant.
        let (removed, inserted) = repo
            .replace_events_since(&sponsor, utc(2024, 2, 1), &[old])
            .await
            .unwrap();
        assert_eq!((removed, inserted), (0, 0));
        assert_eq!(repo.count_events(&sponsor).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replace_events_since_drops_only_newer_rows() {
        let repo = setup_repo().await;
        let sponsor = Login::new("sponsor".to_string());
        let old = event(
            SponsorshipAction::NewSubscription,
            "2024-01-05T12:00:00Z",
            "alice",
            Some(Tier::recurring(500)),
        );
        let stale = event(SponsorshipAction::PendingChange, "2024-02-01T09:00:00Z", "alice", None);
        repo.replace_events_since(&sponsor, utc(2024, 1, 1), &[old.clone(), stale.clone()])
            .await
            .unwrap();

        let fresh = vec![
            event(SponsorshipAction::CancelledSubscription, "2024-02-01T10:00:00Z", "alice", None),
            stale,
        ];
        let (removed, inserted) = repo
            .replace_events_since(&sponsor, utc(2024, 2, 1), &fresh)
            .await
            .unwrap();
        assert_eq!((removed, inserted), (1, 2));

        let cached = repo.query_events(&sponsor).await.unwrap();
        let expected: Vec<SponsorshipEvent> = std::iter::once(old).chain(fresh).collect();
        assert_eq!(cached, expected);
    }

    #[tokio::test]
    async fn test_unreadable_timestamp_survives_replace() {
        let repo = setup_repo().await;
        let sponsor = Login::new("sponsor".to_string());
        let broken = event(SponsorshipAction::PendingChange, "not-a-time", "alice", None);
        repo.replace_events_since(&sponsor, utc(2024, 1, 1), &[broken.clone()])
            .await
            .unwrap();

        let (removed, _) = repo
            .replace_events_since(&sponsor, utc(2024, 1, 1), &[])
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert_eq!(repo.query_events(&sponsor).await.unwrap(), vec![broken]);
    }

    #[tokio::test]
    async fn test_sponsors_are_isolated() {
        let repo = setup_repo().await;
        let a = Login::new("a".to_string());
        let b = Login::new("b".to_string());
        let e = event(SponsorshipAction::PendingChange, "2024-01-05T12:00:00Z", "bob", None);

        repo.replace_events_since(&a, utc(2024, 1, 1), &[e.clone()])
            .await
            .unwrap();
        repo.replace_events_since(&b, utc(2024, 1, 1), &[e])
            .await
            .unwrap();
        repo.replace_events_since(&a, utc(2024, 1, 1), &[]).await.unwrap();

        assert!(repo.query_events(&a).await.unwrap().is_empty());
        assert_eq!(repo.query_events(&b).await.unwrap().len(), 1);
    }
}
