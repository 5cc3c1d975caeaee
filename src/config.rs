//! Server configuration read from the process environment.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::observability::parse_bool;
use crate::sheet::SheetsConfig;
use crate::visibility::HolidayConfig;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Berlin;
pub const DEFAULT_STATE_PATH: &str = "advent-state.sqlite3";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub sheets: SheetsConfig,
    pub holiday: HolidayConfig,
    pub timezone: Tz,
    pub dev_mode: bool,
    pub state_path: PathBuf,
    pub use_demo: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            sheets: SheetsConfig::default(),
            holiday: HolidayConfig::default(),
            timezone: DEFAULT_TIMEZONE,
            dev_mode: false,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            use_demo: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(raw) = non_empty_var("ADVENT_ADDR") {
            config.addr = raw
                .parse()
                .map_err(|err| ConfigError::invalid("ADVENT_ADDR", &raw, err))?;
        }

        config.sheets.api_key = non_empty_var("GOOGLE_API_KEY");
        if let Some(raw) = non_empty_var("ADVENT_SHEET_ID") {
            config.sheets.sheet_id = raw;
        }
        if let Some(raw) = non_empty_var("ADVENT_CALENDAR_GID") {
            config.sheets.calendar_gid = raw
                .parse()
                .map_err(|err| ConfigError::invalid("ADVENT_CALENDAR_GID", &raw, err))?;
        }
        if let Some(raw) = non_empty_var("ADVENT_WINNERS_TAB") {
            config.sheets.winners_tab = raw;
        }
        if let Some(raw) = non_empty_var("ADVENT_HTTP_TIMEOUT_MS") {
            config.sheets.timeout_ms = raw
                .parse()
                .map_err(|err| ConfigError::invalid("ADVENT_HTTP_TIMEOUT_MS", &raw, err))?;
        }

        if let Some(raw) = non_empty_var("ADVENT_CUTOVER_DATE") {
            config.holiday.cutover_date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|err| ConfigError::invalid("ADVENT_CUTOVER_DATE", &raw, err))?;
        }
        if let Some(raw) = non_empty_var("ADVENT_TIMEZONE") {
            config.timezone = raw
                .parse::<Tz>()
                .map_err(|err| ConfigError::invalid("ADVENT_TIMEZONE", &raw, err))?;
        }

        if let Some(raw) = non_empty_var("ADVENT_ENV") {
            config.dev_mode = raw.eq_ignore_ascii_case("development");
        }
        if let Some(raw) = non_empty_var("ADVENT_STATE_PATH") {
            config.state_path = PathBuf::from(raw);
        }
        if let Some(raw) = non_empty_var("ADVENT_USE_DEMO") {
            config.use_demo = parse_bool(&raw)
                .ok_or_else(|| ConfigError::invalid("ADVENT_USE_DEMO", &raw, "expected a boolean"))?;
        }

        Ok(config)
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        today(now, self.timezone)
    }
}

/// Calendar date of `now` in the given timezone.
pub fn today(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    tz.from_utc_datetime(&now.naive_utc()).date_naive()
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}
