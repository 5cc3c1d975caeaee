//! Advent calendar aggregator core crate.
//!
//! Current implemented scope:
//! - spreadsheet decoding for the calendar and winners feeds
//! - visibility, ordering and holiday-mode board policy
//! - per-session favorites, daily visited marks, snow flag and toasts
//! - HTTP pages and JSON API

mod access;
mod config;
mod currency;
mod interaction;
mod observability;
mod session;
mod sheet;
mod toast;
mod visibility;
mod web;

#[cfg(test)]
mod test_support;

pub use access::{check_referer, AccessDenied};
pub use config::{today, AppConfig, ConfigError, DEFAULT_STATE_PATH, DEFAULT_TIMEZONE};
pub use currency::format_value;
pub use interaction::{
    favorite_message, toggle_membership, FavoriteDirection, InteractionState, InteractionStore,
    KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StoreError, FAVORITES_KEY,
    SNOW_KEY, TOAST_SUPPRESSION_MS, VISITED_DATE_KEY, VISITED_KEY,
};
pub use observability::{
    init_logging, log_app_bind, log_app_start, log_config_invalid, log_session_restored,
    log_source_selected, logging_config_from_env, LogFormat, LoggingConfig, LoggingInitError,
};
pub use session::{FeedState, Session, SessionError};
pub use sheet::{
    decode_calendar_rows, decode_winner_rows, demo_grids, fetch_calendar, fetch_winners,
    profile_link, CalendarEntry, FeedGrids, FeedSource, FetchStage, GoogleSheetsSource,
    InMemoryFeedSource, SheetCell, SheetError, SheetRow, SheetsConfig, WinnerEntry,
    DEFAULT_CALENDAR_GID, DEFAULT_SHEET_ID, DEFAULT_WINNERS_TAB,
};
pub use toast::{Toast, ToastId, ToastQueue, TOAST_LIFETIME_MS};
pub use visibility::{
    build_board, compare_entries, is_candidate, is_holiday_mode, is_visible, locale_compare,
    normalize_link, parse_runs_until, partition_board, sort_entries, stand_date,
    valid_favorites_count, visible_entries, Board, BoardSection, BoardTile, BoardView,
    DisplayMode, HolidayConfig, RunsUntil,
};
pub use web::{
    advent_router, render_board_html, render_error_html, render_winners_html, AdventAppState,
    ApiError, BoardPage, Clock, FavoriteResponse, LinksResponse, NameRequest, SnowResponse,
    VisitedResponse, WebConfig,
};
