//! Data source abstraction for fetching a sponsor's activity log and cumulative totals.

use crate::domain::SponsorshipEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

pub mod github;
pub mod mock;

pub use github::GitHubDataSource;
pub use mock::MockDataSource;

/// Data source trait for sponsorship activity and totals.
///
/// Implementations must handle pagination and retry/backoff. Pagination of a
/// single sponsor is serial; different sponsors may be fetched concurrently.
#[async_trait]
pub trait DataSource: Send + Sync + fmt::Debug {
    /// Fetch the complete activity log of `sponsor` since an instant.
    ///
    /// # Arguments
    /// * `sponsor` - Login of the paying account
    /// * `since` - Earliest instant of interest (inclusive)
    ///
    /// # Returns
    /// Every event, in the order the source reported them. Events sharing a
    /// calendar day must keep their relative order.
    async fn fetch_sponsorship_log(
        &self,
        sponsor: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SponsorshipEvent>, DataSourceError>;

    /// Fetch the total amount in cents `sponsor` has paid up to an instant.
    async fn fetch_total_amount(
        &self,
        sponsor: &str,
        until: DateTime<Utc>,
    ) -> Result<i64, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 401 bad token, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Errors reported in a GraphQL response body
    GraphQl(String),
    /// The requested account does not exist or is not sponsorable
    NotFound(String),
    /// Rate limit exceeded (caller should implement backoff)
    RateLimited,
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::GraphQl(msg) => write!(f, "GraphQL error: {}", msg),
            DataSourceError::NotFound(login) => write!(f, "Not found: {}", login),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
        }
    }
}

impl std::error::Error for DataSourceError {}
