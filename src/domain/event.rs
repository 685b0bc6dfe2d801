//! Sponsorship lifecycle events as reported by the platform's activity log.

use crate::domain::{Login, Tier};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Kind of lifecycle event.
///
/// Serialized with the platform's wire names; the shorter subscription
/// spellings are accepted on input as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SponsorshipAction {
    #[serde(rename = "NEW_SPONSORSHIP", alias = "NEW_SUBSCRIPTION")]
    NewSubscription,
    #[serde(rename = "CANCELLED_SPONSORSHIP", alias = "CANCELLED_SUBSCRIPTION")]
    CancelledSubscription,
    #[serde(rename = "PENDING_CHANGE")]
    PendingChange,
    #[serde(rename = "SPONSOR_MATCH_DISABLED", alias = "MATCH_DISABLED")]
    MatchDisabled,
    #[serde(rename = "TIER_CHANGE")]
    TierChange,
    #[serde(rename = "REFUND")]
    Refund,
}

impl SponsorshipAction {
    pub const ALL: [SponsorshipAction; 6] = [
        SponsorshipAction::NewSubscription,
        SponsorshipAction::CancelledSubscription,
        SponsorshipAction::PendingChange,
        SponsorshipAction::MatchDisabled,
        SponsorshipAction::TierChange,
        SponsorshipAction::Refund,
    ];

    /// Wire name used by the platform API.
    pub fn as_str(&self) -> &'static str {
        match self {
            SponsorshipAction::NewSubscription => "NEW_SPONSORSHIP",
            SponsorshipAction::CancelledSubscription => "CANCELLED_SPONSORSHIP",
            SponsorshipAction::PendingChange => "PENDING_CHANGE",
            SponsorshipAction::MatchDisabled => "SPONSOR_MATCH_DISABLED",
            SponsorshipAction::TierChange => "TIER_CHANGE",
            SponsorshipAction::Refund => "REFUND",
        }
    }
}

impl std::fmt::Display for SponsorshipAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sponsorship action: {0}")]
pub struct UnknownActionError(pub String);

impl FromStr for SponsorshipAction {
    type Err = UnknownActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "NEW_SPONSORSHIP" | "NEW_SUBSCRIPTION" => Ok(SponsorshipAction::NewSubscription),
            "CANCELLED_SPONSORSHIP" | "CANCELLED_SUBSCRIPTION" => {
                Ok(SponsorshipAction::CancelledSubscription)
            }
            "PENDING_CHANGE" => Ok(SponsorshipAction::PendingChange),
            "SPONSOR_MATCH_DISABLED" | "MATCH_DISABLED" => Ok(SponsorshipAction::MatchDisabled),
            "TIER_CHANGE" => Ok(SponsorshipAction::TierChange),
            "REFUND" => Ok(SponsorshipAction::Refund),
            other => Err(UnknownActionError(other.to_string())),
        }
    }
}

/// The event's timestamp could not be turned into a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid event timestamp {timestamp:?}: {reason}")]
pub struct EventTimestampError {
    pub timestamp: String,
    pub reason: String,
}

/// A single entry of a sponsor's activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipEvent {
    pub action: SponsorshipAction,
    /// RFC 3339 instant, kept verbatim from the source.
    pub timestamp: String,
    /// Account receiving money for this event.
    pub recipient_login: Login,
    /// Tier in effect after this event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    /// Tier in effect before this event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_tier: Option<Tier>,
}

impl SponsorshipEvent {
    pub fn new(
        action: SponsorshipAction,
        timestamp: impl Into<String>,
        recipient_login: Login,
        tier: Option<Tier>,
    ) -> Self {
        Self {
            action,
            timestamp: timestamp.into(),
            recipient_login,
            tier,
            previous_tier: None,
        }
    }

    pub fn with_previous_tier(mut self, previous_tier: Tier) -> Self {
        self.previous_tier = Some(previous_tier);
        self
    }

    /// Parse the timestamp, keeping the offset it was reported in.
    pub fn instant(&self) -> Result<DateTime<FixedOffset>, EventTimestampError> {
        DateTime::parse_from_rfc3339(self.timestamp.trim()).map_err(|e| EventTimestampError {
            timestamp: self.timestamp.clone(),
            reason: e.to_string(),
        })
    }

    /// Calendar day of the event, in the offset the timestamp carries.
    pub fn day(&self) -> Result<NaiveDate, EventTimestampError> {
        self.instant().map(|dt| dt.date_naive())
    }

    /// Stable key used to deduplicate overlapping fetches of the same log.
    ///
    /// SHA-256 over every field, truncated to 128 bits.
    pub fn event_key(&self, sponsor: &Login) -> String {
        use sha2::{Digest, Sha256};

        fn hash_var(hasher: &mut Sha256, data: &str) {
            hasher.update((data.len() as u64).to_le_bytes());
            hasher.update(data.as_bytes());
        }

        fn hash_tier(hasher: &mut Sha256, tier: Option<&Tier>) {
            match tier {
                Some(t) => {
                    hasher.update([1u8]);
                    hasher.update(t.monthly_price_in_cents.to_le_bytes());
                    hasher.update([t.is_one_time as u8]);
                }
                None => hasher.update([0u8]),
            }
        }

        let mut hasher = Sha256::new();
        hash_var(&mut hasher, sponsor.as_str());
        hash_var(&mut hasher, self.action.as_str());
        hash_var(&mut hasher, self.timestamp.trim());
        hash_var(&mut hasher, self.recipient_login.as_str());
        hash_tier(&mut hasher, self.tier.as_ref());
        hash_tier(&mut hasher, self.previous_tier.as_ref());
        let hash = hasher.finalize();
        format!("evt:{}", hex::encode(&hash[..16]))
    }
}
