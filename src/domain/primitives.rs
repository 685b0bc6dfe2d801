//! Domain primitives: Login, Tier, calendar-day helpers.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;

/// Account login on the sponsorship platform (user or organization).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Login(pub String);

impl Login {
    /// Create a Login from a string.
    pub fn new(login: String) -> Self {
        Login(login)
    }

    /// Get the login as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Login {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Login(s.to_string()))
    }
}

impl std::fmt::Display for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A priced sponsorship plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    pub monthly_price_in_cents: i64,
    pub is_one_time: bool,
}

impl Tier {
    pub fn recurring(monthly_price_in_cents: i64) -> Self {
        Self {
            monthly_price_in_cents,
            is_one_time: false,
        }
    }

    pub fn one_time(price_in_cents: i64) -> Self {
        Self {
            monthly_price_in_cents: price_in_cents,
            is_one_time: true,
        }
    }
}

/// Format a calendar day as `YYYY-MM-DD`.
pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` calendar day.
pub fn parse_day(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
}

/// Midnight UTC at the start of `day`.
pub fn start_of_day_utc(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

/// Number of days in the month containing `day`.
pub fn days_in_month(day: NaiveDate) -> u32 {
    let (year, month) = if day.month() == 12 {
        (day.year() + 1, 1)
    } else {
        (day.year(), day.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_display() {
        let login = Login::new("alice".to_string());
        assert_eq!(login.to_string(), "alice");
    }

    #[test]
    fn test_login_serializes_as_plain_string() {
        let json = serde_json::to_string(&Login::new("bob".to_string())).unwrap();
        assert_eq!(json, "\"bob\"");
    }

    #[test]
    fn test_tier_wire_shape() {
        let tier: Tier =
            serde_json::from_str(r#"{"monthlyPriceInCents": 500, "isOneTime": false}"#).unwrap();
        assert_eq!(tier, Tier::recurring(500));
    }

    #[test]
    fn test_day_format_and_parse() {
        let day = parse_day("2024-02-05").unwrap();
        assert_eq!(format_day(day), "2024-02-05");
        assert!(parse_day("2024-02-30").is_err());
    }

    #[test]
    fn test_start_of_day_utc() {
        let at = start_of_day_utc(parse_day("2024-03-01").unwrap());
        assert_eq!(at.to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(parse_day("2024-02-10").unwrap()), 29);
        assert_eq!(days_in_month(parse_day("2023-02-10").unwrap()), 28);
        assert_eq!(days_in_month(parse_day("2024-04-01").unwrap()), 30);
        assert_eq!(days_in_month(parse_day("2024-12-31").unwrap()), 31);
    }
}
