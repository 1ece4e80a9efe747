//! # Application Configuration
//!
//! Settings read from the environment (and a `.env` file when present) by the
//! command-line binary. Planner tuning tables live in
//! [`crate::planner_config`]; only the plan size and recency window can be
//! overridden from here.

use crate::planner_config::{PlannerConfig, DEFAULT_MAX_PLAN_SIZE, DEFAULT_RECENCY_DAYS};
use anyhow::{bail, Context, Result};
use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Accepted values for `RECENCY_DAYS`
pub const RECENCY_DAYS_RANGE: RangeInclusive<i64> = 1..=3650;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => bail!("Unknown log format: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// PostgreSQL connection URL, required by store-backed commands
    pub database_url: Option<String>,
    pub log_level: String,
    pub log_format: LogFormat,
    pub recency_days: i64,
    pub max_plan_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            recency_days: DEFAULT_RECENCY_DAYS,
            max_plan_size: DEFAULT_MAX_PLAN_SIZE,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let recency_days = match lookup("RECENCY_DAYS") {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| {
                    format!("RECENCY_DAYS must be a whole number of days, got {value:?}")
                })?,
            None => defaults.recency_days,
        };
        if !RECENCY_DAYS_RANGE.contains(&recency_days) {
            bail!(
                "RECENCY_DAYS must be between {} and {}, got {recency_days}",
                RECENCY_DAYS_RANGE.start(),
                RECENCY_DAYS_RANGE.end()
            );
        }

        let max_plan_size = match lookup("MAX_PLAN_SIZE") {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| {
                    format!("MAX_PLAN_SIZE must be a positive integer, got {value:?}")
                })?,
            None => defaults.max_plan_size,
        };
        if max_plan_size == 0 {
            bail!("MAX_PLAN_SIZE must be at least 1");
        }

        let log_format = match lookup("LOG_FORMAT") {
            Some(value) => value.parse()?,
            None => defaults.log_format,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format,
            recency_days,
            max_plan_size,
        })
    }

    /// The database URL, or an error naming the missing variable
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set")
    }

    /// Planner defaults with this configuration's overrides applied
    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig::default()
            .with_max_plan_size(self.max_plan_size)
            .with_recency_days(self.recency_days)
    }
}
