//! Logging setup for the advent server plus the lifecycle events it emits.
//!
//! Everything here logs under `component = "advent_server"`; feature modules
//! carry their own component names.

use std::env;
use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, ConfigError};

/// Directives appended to the configured level so HTTP and SQLite internals
/// stay quiet unless asked for explicitly.
const DEPENDENCY_DIRECTIVES: &[&str] = &["hyper=warn", "reqwest=warn", "rusqlite=warn"];

const SERVER_ROUTES: &[&str] = &["/", "/gewinner", "/api"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    /// Single-line output for terminals.
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// The filter handed to `tracing-subscriber`. An explicit directive for a
    /// dependency in `level` wins over the quiet default.
    pub fn filter_directives(&self) -> String {
        let mut directives = vec![self.level.clone()];
        for quiet in DEPENDENCY_DIRECTIVES {
            let target = quiet.split('=').next().unwrap_or(*quiet);
            let overridden = self
                .level
                .split(',')
                .any(|directive| directive.trim().starts_with(target));
            if !overridden {
                directives.push((*quiet).to_string());
            }
        }
        directives.join(",")
    }
}

#[derive(Debug, Error)]
pub enum LoggingInitError {
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

pub fn logging_config_from_env() -> LoggingConfig {
    let mut config = LoggingConfig::default();

    if let Some(level) = env::var("ADVENT_LOG_LEVEL")
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
    {
        config.level = level;
    }
    if let Some(format) = env::var("ADVENT_LOG_FORMAT")
        .ok()
        .and_then(|raw| parse_log_format(&raw))
    {
        config.format = format;
    }
    if let Some(include_target) = env::var("ADVENT_LOG_TARGET")
        .ok()
        .and_then(|raw| parse_bool(&raw))
    {
        config.include_target = include_target;
    }

    config
}

pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    let env_filter = EnvFilter::try_new(config.filter_directives())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.include_target)
        .with_ansi(!matches!(config.format, LogFormat::Json));

    match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
        LogFormat::Compact => {
            tracing::subscriber::set_global_default(builder.compact().finish())?
        }
    }

    Ok(())
}

/// First event after the configuration is known: which sheet, which holiday
/// cutover, which clock zone, and where interaction state is kept.
pub fn log_app_start(logging: &LoggingConfig, app: &AppConfig) {
    info!(
        component = "advent_server",
        event = "app.start",
        log_level = %logging.level,
        log_format = ?logging.format,
        sheet_id = %app.sheets.sheet_id,
        calendar_gid = app.sheets.calendar_gid,
        winners_tab = %app.sheets.winners_tab,
        api_key_present = app.sheets.api_key.is_some(),
        cutover_date = %app.holiday.cutover_date,
        timezone = %app.timezone,
        dev_mode = app.dev_mode,
        use_demo = app.use_demo,
        state_path = %app.state_path.display()
    );
}

pub fn log_config_invalid(err: &ConfigError) {
    error!(
        component = "advent_server",
        event = "app.config.invalid",
        error = %err
    );
}

pub fn log_app_bind(bound_addr: SocketAddr) {
    info!(
        component = "advent_server",
        event = "app.bind",
        bind_addr = %bound_addr,
        routes = ?SERVER_ROUTES
    );
}

pub fn log_source_selected(source: &str, reason: Option<&str>) {
    match reason {
        Some(reason) => info!(
            component = "advent_server",
            event = "source.selected",
            source,
            reason
        ),
        None => info!(component = "advent_server", event = "source.selected", source),
    }
}

pub fn log_session_restored(state_path: &Path, favorites: usize, snow_enabled: bool) {
    info!(
        component = "advent_server",
        event = "session.restored",
        state_path = %state_path.display(),
        favorites,
        snow_enabled
    );
}

fn parse_log_format(raw: &str) -> Option<LogFormat> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" => Some(LogFormat::Pretty),
        "compact" => Some(LogFormat::Compact),
        _ => None,
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "ja" => Some(true),
        "0" | "false" | "no" | "off" | "nein" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::with_env_vars;

    const LOG_VARS: [&str; 3] = ["ADVENT_LOG_LEVEL", "ADVENT_LOG_FORMAT", "ADVENT_LOG_TARGET"];

    fn config_with(values: [Option<&str>; 3]) -> LoggingConfig {
        let vars: Vec<(&str, Option<&str>)> = LOG_VARS.iter().copied().zip(values).collect();
        with_env_vars(&vars, logging_config_from_env)
    }

    #[test]
    fn unset_or_blank_env_keeps_pretty_info() {
        assert_eq!(config_with([None, None, None]), LoggingConfig::default());
        assert_eq!(config_with([Some("  "), None, None]).level, "info");
    }

    #[test]
    fn server_env_selects_format_level_and_target() {
        let cfg = config_with([Some("advent=debug"), Some(" Compact "), Some("nein")]);
        assert_eq!(cfg.level, "advent=debug");
        assert_eq!(cfg.format, LogFormat::Compact);
        assert!(!cfg.include_target);

        let cfg = config_with([None, Some("JSON"), Some("1")]);
        assert_eq!(cfg.format, LogFormat::Json);
        assert!(cfg.include_target);
    }

    #[test]
    fn unknown_values_are_ignored() {
        let cfg = config_with([Some("trace"), Some("yaml"), Some("vielleicht")]);
        assert_eq!(cfg.level, "trace");
        assert_eq!(cfg.format, LogFormat::Pretty);
        assert!(cfg.include_target);
    }

    #[test]
    fn dependency_noise_is_filtered_unless_named() {
        let cfg = LoggingConfig::default();
        assert_eq!(
            cfg.filter_directives(),
            "info,hyper=warn,reqwest=warn,rusqlite=warn"
        );

        let cfg = LoggingConfig {
            level: "debug,reqwest=trace".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(
            cfg.filter_directives(),
            "debug,reqwest=trace,hyper=warn,rusqlite=warn"
        );
        assert!(EnvFilter::try_new(cfg.filter_directives()).is_ok());
    }
}
