//! Inferred payments and monthly aggregates.

use crate::domain::Login;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single inferred charge (negative amount = refund).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub date: NaiveDate,
    pub recipient_login: Login,
    pub amount_in_cents: i64,
}

impl Payment {
    pub fn new(date: NaiveDate, recipient_login: Login, amount_in_cents: i64) -> Self {
        Self {
            date,
            recipient_login,
            amount_in_cents,
        }
    }

    pub fn is_refund(&self) -> bool {
        self.amount_in_cents < 0
    }
}

/// Money moved within the month-long window starting at `month_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTotal {
    pub month_start: NaiveDate,
    pub amount_in_cents: i64,
}

/// Sum of all payment amounts.
pub fn total_in_cents(payments: &[Payment]) -> i64 {
    payments.iter().map(|p| p.amount_in_cents).sum()
}
