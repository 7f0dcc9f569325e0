// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;

use crate::error::AppError;

/// Authored reviews a learner must write before advancing.
pub const DEFAULT_REVIEW_QUORUM: usize = 3;

/// Reviews a learner's own work must have received before the final
/// challenge of a stack opens.
pub const DEFAULT_FINAL_GATE_RECEIVED: usize = 2;

pub const DEFAULT_MIN_OFFSET_HOURS: i64 = 0;
pub const DEFAULT_MAX_OFFSET_HOURS: i64 = 0;

/// Upper bound for either end of the offset window (ten years).
pub const MAX_OFFSET_HOURS: i64 = 24 * 365 * 10;

/// Tunables of the peer-review process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewConfig {
    /// Lower bound (hours) of the idle window an elaboration must sit
    /// through before it can be handed out for review.
    pub min_offset_hours: i64,
    /// Upper bound (hours) of the same window.
    pub max_offset_hours: i64,
    pub quorum: usize,
    pub final_gate_received: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            min_offset_hours: DEFAULT_MIN_OFFSET_HOURS,
            max_offset_hours: DEFAULT_MAX_OFFSET_HOURS,
            quorum: DEFAULT_REVIEW_QUORUM,
            final_gate_received: DEFAULT_FINAL_GATE_RECEIVED,
        }
    }
}

impl ReviewConfig {
    /// Reads the review settings, falling back to defaults for unset keys.
    pub fn from_env() -> Result<Self, AppError> {
        let config = Self {
            min_offset_hours: parse_or("REVIEW_MIN_OFFSET_HOURS", DEFAULT_MIN_OFFSET_HOURS)?,
            max_offset_hours: parse_or("REVIEW_MAX_OFFSET_HOURS", DEFAULT_MAX_OFFSET_HOURS)?,
            quorum: parse_or("REVIEW_QUORUM", DEFAULT_REVIEW_QUORUM)?,
            final_gate_received: parse_or("FINAL_GATE_RECEIVED", DEFAULT_FINAL_GATE_RECEIVED)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.min_offset_hours < 0
            || self.max_offset_hours < self.min_offset_hours
            || self.max_offset_hours > MAX_OFFSET_HOURS
        {
            return Err(AppError::Configuration(format!(
                "invalid review offset window [{}, {}]",
                self.min_offset_hours, self.max_offset_hours
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub review: ReviewConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;

        let jwt_secret = required("JWT_SECRET")?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            rust_log,
            review: ReviewConfig::from_env()?,
        })
    }
}

fn required(key: &str) -> Result<String, AppError> {
    env::var(key).map_err(|_| AppError::Configuration(format!("{} must be set", key)))
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Configuration(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_review_config() {
        let config = ReviewConfig::default();
        assert_eq!(config.quorum, 3);
        assert_eq!(config.final_gate_received, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_window_rejected() {
        let config = ReviewConfig {
            min_offset_hours: 5,
            max_offset_hours: 2,
            ..ReviewConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_negative_window_rejected() {
        let config = ReviewConfig {
            min_offset_hours: -1,
            ..ReviewConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_offset_window_is_capped() {
        let at_cap = ReviewConfig {
            min_offset_hours: 0,
            max_offset_hours: MAX_OFFSET_HOURS,
            ..ReviewConfig::default()
        };
        assert!(at_cap.validate().is_ok());

        let huge = ReviewConfig {
            min_offset_hours: 10_000_000_000,
            max_offset_hours: 10_000_000_000,
            ..ReviewConfig::default()
        };
        assert!(matches!(huge.validate(), Err(AppError::Configuration(_))));
    }
}
