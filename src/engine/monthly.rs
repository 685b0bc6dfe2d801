//! Month-long windows and per-window sums of payments.

use crate::domain::{MonthlyTotal, Payment};
use chrono::{Months, NaiveDate};

/// Half-open windows `[start + k months, start + (k+1) months)` for every
/// window that starts before `end`.
///
/// Month arithmetic clamps to the end of shorter months, so a window starting
/// on Jan 31 ends on Feb 29 (or 28).
pub fn month_windows(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut windows = Vec::new();
    let mut k: u32 = 0;
    loop {
        let Some(window_start) = start.checked_add_months(Months::new(k)) else {
            break;
        };
        if window_start >= end {
            break;
        }
        let Some(window_end) = start.checked_add_months(Months::new(k + 1)) else {
            break;
        };
        windows.push((window_start, window_end));
        k += 1;
    }
    windows
}

/// Sum payments into the windows of [`month_windows`].
pub fn monthly_sums(payments: &[Payment], start: NaiveDate, end: NaiveDate) -> Vec<MonthlyTotal> {
    sum_by_window(payments, &month_windows(start, end))
}

/// Sum payments falling in each half-open `[start, end)` window.
pub fn sum_by_window(payments: &[Payment], windows: &[(NaiveDate, NaiveDate)]) -> Vec<MonthlyTotal> {
    windows
        .iter()
        .map(|&(window_start, window_end)| MonthlyTotal {
            month_start: window_start,
            amount_in_cents: payments
                .iter()
                .filter(|p| p.date >= window_start && p.date < window_end)
                .map(|p| p.amount_in_cents)
                .sum(),
        })
        .collect()
}
