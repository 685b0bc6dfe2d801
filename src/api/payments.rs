use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::Serialize;

use crate::api::{AppState, SponsorRangeQuery};
use crate::domain::{total_in_cents, Login, Payment};
use crate::error::AppError;
use crate::report::payments_to_csv;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentItem {
    pub date: NaiveDate,
    pub sponsorable: Login,
    pub amount_in_cents: i64,
}

impl From<Payment> for PaymentItem {
    fn from(payment: Payment) -> Self {
        Self {
            date: payment.date,
            sponsorable: payment.recipient_login,
            amount_in_cents: payment.amount_in_cents,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentsResponse {
    pub payments: Vec<PaymentItem>,
    pub total_in_cents: i64,
    pub payment_count: usize,
}

async fn reconstruct(state: &AppState, params: &SponsorRangeQuery) -> Result<Vec<Payment>, AppError> {
    let (sponsor, from, to) = params.resolve(state.config.default_start_date)?;
    Ok(state.orchestrator.reconstruct(&sponsor, from, to).await?)
}

pub async fn get_payments(
    Query(params): Query<SponsorRangeQuery>,
    State(state): State<AppState>,
) -> Result<Json<PaymentsResponse>, AppError> {
    let payments = reconstruct(&state, &params).await?;

    let total = total_in_cents(&payments);
    let payment_count = payments.len();

    Ok(Json(PaymentsResponse {
        payments: payments.into_iter().map(PaymentItem::from).collect(),
        total_in_cents: total,
        payment_count,
    }))
}

pub async fn get_payments_csv(
    Query(params): Query<SponsorRangeQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let payments = reconstruct(&state, &params).await?;
    let body = payments_to_csv(&payments).map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body).into_response())
}
