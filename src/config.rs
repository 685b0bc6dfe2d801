use crate::datasource::github::DEFAULT_GITHUB_API_URL;
use crate::domain::parse_day;
use crate::engine::ShortMonthPolicy;
use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub github_api_url: String,
    pub github_token: String,
    pub default_start_date: NaiveDate,
    pub lookback_ms: i64,
    pub page_size: u32,
    pub short_month_policy: ShortMonthPolicy,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let github_api_url = env_map
            .get("GITHUB_API_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string());

        let github_token = env_map
            .get("GITHUB_TOKEN")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnv("GITHUB_TOKEN".to_string()))?;

        // Sponsors activity is not available before this month.
        let default_start_date = parse_day(
            env_map
                .get("DEFAULT_START_DATE")
                .map(|s| s.as_str())
                .unwrap_or("2021-08-01"),
        )
        .map_err(|_| {
            ConfigError::InvalidValue(
                "DEFAULT_START_DATE".to_string(),
                "must be a YYYY-MM-DD date".to_string(),
            )
        })?;

        let lookback_ms = env_map
            .get("LOOKBACK_MS")
            .map(|s| s.as_str())
            .unwrap_or("86400000")
            .parse::<i64>()
            .ok()
            .filter(|v| *v >= 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "LOOKBACK_MS".to_string(),
                    "must be a non-negative i64".to_string(),
                )
            })?;

        let page_size = env_map
            .get("PAGE_SIZE")
            .map(|s| s.as_str())
            .unwrap_or("100")
            .parse::<u32>()
            .ok()
            .filter(|v| (1..=100).contains(v))
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "PAGE_SIZE".to_string(),
                    "must be between 1 and 100".to_string(),
                )
            })?;

        let short_month_policy = match env_map
            .get("SHORT_MONTH_POLICY")
            .map(|s| s.as_str())
            .unwrap_or("skip")
        {
            "skip" => ShortMonthPolicy::Skip,
            "clamp" => ShortMonthPolicy::ClampToMonthEnd,
            other => {
                return Err(ConfigError::InvalidValue(
                    "SHORT_MONTH_POLICY".to_string(),
                    format!("must be skip or clamp, got {}", other),
                ))
            }
        };

        Ok(Config {
            port,
            database_path,
            github_api_url,
            github_token,
            default_start_date,
            lookback_ms,
            page_size,
            short_month_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map.insert("GITHUB_TOKEN".to_string(), "ghp_test".to_string());
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.github_api_url, DEFAULT_GITHUB_API_URL);
        assert_eq!(
            config.default_start_date,
            NaiveDate::from_ymd_opt(2021, 8, 1).unwrap()
        );
        assert_eq!(config.lookback_ms, 86_400_000);
        assert_eq!(config.page_size, 100);
        assert_eq!(config.short_month_policy, ShortMonthPolicy::Skip);
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_or_blank_token() {
        let mut env_map = setup_required_env();
        env_map.remove("GITHUB_TOKEN");
        match Config::from_env_map(env_map.clone()) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "GITHUB_TOKEN"),
            _ => panic!("Expected MissingEnv error"),
        }

        env_map.insert("GITHUB_TOKEN".to_string(), "   ".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "GITHUB_TOKEN"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_start_date() {
        let mut env_map = setup_required_env();
        env_map.insert("DEFAULT_START_DATE".to_string(), "2021-08".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "DEFAULT_START_DATE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_page_size_bounds() {
        let mut env_map = setup_required_env();
        env_map.insert("PAGE_SIZE".to_string(), "101".to_string());
        match Config::from_env_map(env_map.clone()) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PAGE_SIZE"),
            _ => panic!("Expected InvalidValue error"),
        }

        env_map.insert("PAGE_SIZE".to_string(), "25".to_string());
        assert_eq!(Config::from_env_map(env_map).unwrap().page_size, 25);
    }

    #[test]
    fn test_negative_lookback_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("LOOKBACK_MS".to_string(), "-1".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "LOOKBACK_MS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_short_month_policy() {
        let mut env_map = setup_required_env();
        env_map.insert("SHORT_MONTH_POLICY".to_string(), "clamp".to_string());
        assert_eq!(
            Config::from_env_map(env_map.clone()).unwrap().short_month_policy,
            ShortMonthPolicy::ClampToMonthEnd
        );

        env_map.insert("SHORT_MONTH_POLICY".to_string(), "round".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "SHORT_MONTH_POLICY"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
