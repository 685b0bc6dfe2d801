use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;

use crate::api::{AppState, SponsorRangeQuery};
use crate::error::AppError;
use crate::orchestration::MonthlyComparison;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossCheckResponse {
    pub months: Vec<MonthlyComparison>,
    pub mismatched_months: usize,
}

pub async fn get_cross_check(
    Query(params): Query<SponsorRangeQuery>,
    State(state): State<AppState>,
) -> Result<Json<CrossCheckResponse>, AppError> {
    let (sponsor, from, to) = params.resolve(state.config.default_start_date)?;
    let months = state.orchestrator.cross_check(&sponsor, from, to).await?;
    let mismatched_months = months
        .iter()
        .filter(|m| m.difference_in_cents != 0)
        .count();

    Ok(Json(CrossCheckResponse {
        months,
        mismatched_months,
    }))
}
