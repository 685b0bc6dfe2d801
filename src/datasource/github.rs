//! GitHub GraphQL API client implementation.

use super::{DataSource, DataSourceError};
use crate::domain::{Login, SponsorshipAction, SponsorshipEvent, Tier};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com/graphql";

const TOTAL_SPONSORSHIP_AMOUNT_QUERY: &str = r#"
query getTotalSponsorshipAmount($target: String!, $until: DateTime) {
    repositoryOwner(login: $target) {
        ... on Sponsorable {
            totalSponsorshipAmountAsSponsorInCents(until: $until)
        }
    }
}
"#;

const SPONSORSHIP_LOG_QUERY: &str = r#"
query getSponsorshipLog($target: String!, $first: Int!, $after: String, $since: DateTime) {
    repositoryOwner(login: $target) {
        ... on Sponsorable {
            sponsorsActivities(first: $first, after: $after, since: $since, period: ALL, includeAsSponsor: true) {
                nodes {
                    action
                    previousSponsorsTier {
                        monthlyPriceInCents
                        isOneTime
                    }
                    sponsorsTier {
                        monthlyPriceInCents
                        isOneTime
                    }
                    timestamp
                    sponsorable {
                        ... on User {
                            login
                        }
                        ... on Organization {
                            login
                        }
                    }
                }
                pageInfo {
                    endCursor
                    hasNextPage
                }
            }
        }
    }
}
"#;

/// Sponsorship data source backed by the GitHub GraphQL API.
#[derive(Debug, Clone)]
pub struct GitHubDataSource {
    client: Client,
    api_url: String,
    token: String,
    page_size: u32,
}

impl GitHubDataSource {
    /// Create a new GitHub data source.
    pub fn new(api_url: String, token: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            token,
            page_size: 100,
        }
    }

    /// Number of activity nodes requested per page (GitHub allows 1..=100).
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 100);
        self
    }

    async fn post_graphql(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<serde_json::Value, DataSourceError> {
        let payload = serde_json::json!({
            "query": query,
            "variables": variables,
        });
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        let body = retry(backoff, || async {
            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.token)
                .header(reqwest::header::USER_AGENT, "sponsor-ledger")
                .json(&payload)
                .send()
                .await
                .map_err(|e| {
                    warn!("GitHub request failed, retrying: {}", e);
                    backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 {
                warn!("GitHub rate limit hit, backing off");
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                warn!(status = status.as_u16(), "GitHub server error, retrying");
                return Err(backoff::Error::transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Client error".to_string());
                return Err(backoff::Error::permanent(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message,
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        })
        .await?;

        extract_data(body)
    }
}

#[async_trait]
impl DataSource for GitHubDataSource {
    async fn fetch_sponsorship_log(
        &self,
        sponsor: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SponsorshipEvent>, DataSourceError> {
        let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut events = Vec::new();
        let mut after: Option<String> = None;
        let mut page = 0usize;

        loop {
            let data = self
                .post_graphql(
                    SPONSORSHIP_LOG_QUERY,
                    serde_json::json!({
                        "target": sponsor,
                        "first": self.page_size,
                        "after": after,
                        "since": since,
                    }),
                )
                .await?;

            let activities = owner(&data, sponsor)?
                .get("sponsorsActivities")
                .ok_or_else(|| {
                    DataSourceError::ParseError("Missing sponsorsActivities field".to_string())
                })?;

            let nodes = activities
                .get("nodes")
                .and_then(|v| v.as_array())
                .ok_or_else(|| DataSourceError::ParseError("Expected nodes array".to_string()))?;
            for node in nodes {
                events.push(parse_event(node)?);
            }

            let (end_cursor, has_next_page) = parse_page_info(activities)?;
            page += 1;
            debug!(
                "Fetched page {} for sponsor={} ({} nodes, has_next_page={})",
                page,
                sponsor,
                nodes.len(),
                has_next_page
            );

            if !has_next_page {
                break;
            }
            if end_cursor.is_none() {
                return Err(DataSourceError::ParseError(
                    "hasNextPage without endCursor".to_string(),
                ));
            }
            after = end_cursor;
        }

        Ok(events)
    }

    async fn fetch_total_amount(
        &self,
        sponsor: &str,
        until: DateTime<Utc>,
    ) -> Result<i64, DataSourceError> {
        debug!("Fetching total amount for sponsor={}, until={}", sponsor, until);

        let data = self
            .post_graphql(
                TOTAL_SPONSORSHIP_AMOUNT_QUERY,
                serde_json::json!({
                    "target": sponsor,
                    "until": until.to_rfc3339_opts(SecondsFormat::Secs, true),
                }),
            )
            .await?;

        owner(&data, sponsor)?
            .get("totalSponsorshipAmountAsSponsorInCents")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| {
                DataSourceError::ParseError(
                    "Missing totalSponsorshipAmountAsSponsorInCents field".to_string(),
                )
            })
    }
}

/// Unwrap the `data` member of a GraphQL response, surfacing `errors`.
fn extract_data(body: serde_json::Value) -> Result<serde_json::Value, DataSourceError> {
    if let Some(errors) = body.get("errors").and_then(|v| v.as_array()) {
        if !errors.is_empty() {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                .collect();
            return Err(DataSourceError::GraphQl(messages.join("; ")));
        }
    }
    match body.get("data") {
        Some(data) if !data.is_null() => Ok(data.clone()),
        _ => Err(DataSourceError::ParseError("Missing data field".to_string())),
    }
}

fn owner<'a>(
    data: &'a serde_json::Value,
    sponsor: &str,
) -> Result<&'a serde_json::Value, DataSourceError> {
    match data.get("repositoryOwner") {
        Some(owner) if !owner.is_null() => Ok(owner),
        _ => Err(DataSourceError::NotFound(sponsor.to_string())),
    }
}

fn parse_page_info(
    activities: &serde_json::Value,
) -> Result<(Option<String>, bool), DataSourceError> {
    let page_info = activities
        .get("pageInfo")
        .ok_or_else(|| DataSourceError::ParseError("Missing pageInfo field".to_string()))?;
    let has_next_page = page_info
        .get("hasNextPage")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| DataSourceError::ParseError("Missing hasNextPage field".to_string()))?;
    let end_cursor = page_info
        .get("endCursor")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    Ok((end_cursor, has_next_page))
}

fn parse_tier(tier_json: Option<&serde_json::Value>) -> Result<Option<Tier>, DataSourceError> {
    let Some(tier_json) = tier_json.filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let monthly_price_in_cents = tier_json
        .get("monthlyPriceInCents")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| DataSourceError::ParseError("Missing monthlyPriceInCents field".to_string()))?;
    let is_one_time = tier_json
        .get("isOneTime")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| DataSourceError::ParseError("Missing isOneTime field".to_string()))?;
    Ok(Some(Tier {
        monthly_price_in_cents,
        is_one_time,
    }))
}

fn parse_event(node: &serde_json::Value) -> Result<SponsorshipEvent, DataSourceError> {
    let action_str = node
        .get("action")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DataSourceError::ParseError("Missing action field".to_string()))?;
    let action: SponsorshipAction = action_str
        .parse()
        .map_err(|e| DataSourceError::ParseError(format!("{}", e)))?;

    let timestamp = node
        .get("timestamp")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DataSourceError::ParseError("Missing timestamp field".to_string()))?;

    let login = node
        .get("sponsorable")
        .and_then(|v| v.get("login"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| DataSourceError::ParseError("Missing sponsorable login".to_string()))?;

    Ok(SponsorshipEvent {
        action,
        timestamp: timestamp.to_string(),
        recipient_login: Login::new(login.to_string()),
        tier: parse_tier(node.get("sponsorsTier"))?,
        previous_tier: parse_tier(node.get("previousSponsorsTier"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_valid() {
        let node = serde_json::json!({
            "action": "TIER_CHANGE",
            "previousSponsorsTier": { "monthlyPriceInCents": 500, "isOneTime": false },
            "sponsorsTier": { "monthlyPriceInCents": 1000, "isOneTime": false },
            "timestamp": "2024-01-20T08:15:00Z",
            "sponsorable": { "login": "alice" }
        });

        let event = parse_event(&node).unwrap();
        assert_eq!(event.action, SponsorshipAction::TierChange);
        assert_eq!(event.recipient_login.as_str(), "alice");
        assert_eq!(event.tier, Some(Tier::recurring(1000)));
        assert_eq!(event.previous_tier, Some(Tier::recurring(500)));
        assert_eq!(event.timestamp, "2024-01-20T08:15:00Z");
    }

    #[test]
    fn test_parse_event_null_tiers() {
        let node = serde_json::json!({
            "action": "CANCELLED_SPONSORSHIP",
            "previousSponsorsTier": null,
            "sponsorsTier": null,
            "timestamp": "2024-02-10T00:00:00Z",
            "sponsorable": { "login": "alice" }
        });

        let event = parse_event(&node).unwrap();
        assert_eq!(event.action, SponsorshipAction::CancelledSubscription);
        assert!(event.tier.is_none());
        assert!(event.previous_tier.is_none());
    }

    #[test]
    fn test_parse_event_unknown_action_errors() {
        let node = serde_json::json!({
            "action": "SOMETHING_NEW",
            "timestamp": "2024-02-10T00:00:00Z",
            "sponsorable": { "login": "alice" }
        });
        let err = parse_event(&node).unwrap_err();
        assert!(matches!(err, DataSourceError::ParseError(_)));
    }

    #[test]
    fn test_parse_event_missing_login_errors() {
        let node = serde_json::json!({
            "action": "REFUND",
            "timestamp": "2024-02-10T00:00:00Z",
            "sponsorable": {}
        });
        assert!(parse_event(&node).is_err());
    }

    #[test]
    fn test_extract_data_surfaces_graphql_errors() {
        let body = serde_json::json!({
            "data": null,
            "errors": [{ "message": "Bad thing" }, { "message": "Worse thing" }]
        });
        match extract_data(body) {
            Err(DataSourceError::GraphQl(msg)) => assert_eq!(msg, "Bad thing; Worse thing"),
            other => panic!("expected GraphQl error, got {:?}", other),
        }
    }

    #[test]
    fn test_null_owner_is_not_found() {
        let data = serde_json::json!({ "repositoryOwner": null });
        match owner(&data, "ghost") {
            Err(DataSourceError::NotFound(login)) => assert_eq!(login, "ghost"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_page_info() {
        let activities = serde_json::json!({
            "pageInfo": { "endCursor": "Y3Vyc29y", "hasNextPage": true }
        });
        let (cursor, more) = parse_page_info(&activities).unwrap();
        assert_eq!(cursor.as_deref(), Some("Y3Vyc29y"));
        assert!(more);
    }

    #[test]
    fn test_page_size_is_clamped() {
        let ds = GitHubDataSource::new(DEFAULT_GITHUB_API_URL.to_string(), "t".to_string()).with_page_size(500);
        assert_eq!(ds.page_size, 100);
        let ds = ds.with_page_size(0);
        assert_eq!(ds.page_size, 1);
    }
}
