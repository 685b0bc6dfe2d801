pub mod cross_check;
pub mod health;
pub mod payments;

use crate::config::Config;
use crate::db::Repository;
use crate::domain::{parse_day, Login};
use crate::error::AppError;
use crate::orchestration::Orchestrator;
use axum::{routing::get, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, config: Config, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            repo,
            config,
            orchestrator,
        }
    }
}

/// Query string shared by every sponsor-scoped endpoint.
#[derive(Debug, Deserialize)]
pub struct SponsorRangeQuery {
    pub sponsor: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl SponsorRangeQuery {
    /// Validate the sponsor login and resolve the inclusive day range.
    ///
    /// `from` falls back to the configured start date, `to` to today (UTC).
    pub fn resolve(&self, default_start: NaiveDate) -> Result<(Login, NaiveDate, NaiveDate), AppError> {
        let sponsor = self
            .sponsor
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::BadRequest("sponsor is required".to_string()))?;

        let from = parse_optional_day("from", self.from.as_deref())?.unwrap_or(default_start);
        let to = parse_optional_day("to", self.to.as_deref())?
            .unwrap_or_else(|| Utc::now().date_naive());

        Ok((Login::new(sponsor.to_string()), from, to))
    }
}

fn parse_optional_day(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_day(raw).map(Some).map_err(|_| {
            AppError::BadRequest(format!("{} must be a YYYY-MM-DD date, got {:?}", name, raw))
        }),
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/payments", get(payments::get_payments))
        .route("/v1/payments.csv", get(payments::get_payments_csv))
        .route("/v1/cross-check", get(cross_check::get_cross_check))
        .layer(cors)
        .with_state(state)
}
