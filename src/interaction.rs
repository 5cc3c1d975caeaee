//! Per-browser interaction state: favorites, visited markers, and the snow toggle.
//!
//! Each facet is persisted under its own key. The visited set is tied to the
//! calendar day it was written on and is discarded once that day has passed.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::toast::ToastQueue;

pub const FAVORITES_KEY: &str = "advent-favorites";
pub const VISITED_KEY: &str = "advent-visited";
pub const VISITED_DATE_KEY: &str = "advent-visited-date";
pub const SNOW_KEY: &str = "advent-show-snow";

/// Window in which a repeated `(name, direction)` favorite change stays silent.
pub const TOAST_SUPPRESSION_MS: i64 = 100;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("could not encode {key}: {message}")]
    Encode { key: &'static str, message: String },
}

pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: HashMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

pub struct SqliteKeyValueStore {
    conn: Connection,
}

impl SqliteKeyValueStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            ",
        )?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionState {
    pub favorites: BTreeSet<String>,
    pub visited: BTreeSet<String>,
    pub visited_reset_date: NaiveDate,
    pub snow_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteDirection {
    Added,
    Removed,
}

/// Adds `name` when absent and removes it when present.
pub fn toggle_membership(
    set: &BTreeSet<String>,
    name: &str,
) -> (BTreeSet<String>, FavoriteDirection) {
    let mut next = set.clone();
    if next.remove(name) {
        (next, FavoriteDirection::Removed)
    } else {
        next.insert(name.to_string());
        (next, FavoriteDirection::Added)
    }
}

pub fn favorite_message(name: &str, direction: FavoriteDirection) -> String {
    match direction {
        FavoriteDirection::Added => format!("⭐ {name} zu Favoriten hinzugefügt"),
        FavoriteDirection::Removed => format!("❌ {name} aus Favoriten entfernt"),
    }
}

pub struct InteractionStore {
    store: Box<dyn KeyValueStore>,
    state: InteractionState,
    recent_favorite_toasts: HashMap<(String, FavoriteDirection), i64>,
}

impl InteractionStore {
    /// Restores persisted state. A visited set written on another day is dropped and
    /// the stored date advanced to `today`.
    pub fn load(store: Box<dyn KeyValueStore>, today: NaiveDate) -> Result<Self, StoreError> {
        let favorites = read_name_set(&*store, FAVORITES_KEY)?;
        let snow_enabled = match store.get(SNOW_KEY)? {
            Some(raw) => raw == "true",
            None => true,
        };

        let saved_date = store
            .get(VISITED_DATE_KEY)?
            .and_then(|raw| NaiveDate::parse_from_str(&raw, DATE_FORMAT).ok());
        let mut loaded = Self {
            store,
            state: InteractionState {
                favorites,
                visited: BTreeSet::new(),
                visited_reset_date: today,
                snow_enabled,
            },
            recent_favorite_toasts: HashMap::new(),
        };

        if saved_date == Some(today) {
            loaded.state.visited = read_name_set(&*loaded.store, VISITED_KEY)?;
        } else {
            loaded.reset_visited(saved_date, today)?;
        }

        debug!(
            component = "interaction",
            event = "interaction.loaded",
            favorites = loaded.state.favorites.len(),
            visited = loaded.state.visited.len(),
            snow_enabled = loaded.state.snow_enabled
        );
        Ok(loaded)
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn favorites(&self) -> &BTreeSet<String> {
        &self.state.favorites
    }

    pub fn visited(&self) -> &BTreeSet<String> {
        &self.state.visited
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.state.favorites.contains(name)
    }

    pub fn is_visited(&self, name: &str) -> bool {
        self.state.visited.contains(name)
    }

    pub fn snow_enabled(&self) -> bool {
        self.state.snow_enabled
    }

    /// Applies the daily reset if `today` is past the day the visited set belongs to.
    pub fn roll_over(&mut self, today: NaiveDate) -> Result<(), StoreError> {
        if self.state.visited_reset_date != today {
            let previous = Some(self.state.visited_reset_date);
            self.reset_visited(previous, today)?;
        }
        Ok(())
    }

    pub fn toggle_favorite(
        &mut self,
        name: &str,
        now_ms: i64,
        toasts: &mut ToastQueue,
    ) -> Result<FavoriteDirection, StoreError> {
        let (next, direction) = toggle_membership(&self.state.favorites, name);
        self.persist_favorites(&next)?;
        self.state.favorites = next;
        self.announce_favorite_change(name, direction, now_ms, toasts);
        Ok(direction)
    }

    /// Enqueues the toast for a favorite change unless the same `(name, direction)`
    /// was announced less than [`TOAST_SUPPRESSION_MS`] ago. Returns whether a toast
    /// was enqueued.
    pub fn announce_favorite_change(
        &mut self,
        name: &str,
        direction: FavoriteDirection,
        now_ms: i64,
        toasts: &mut ToastQueue,
    ) -> bool {
        self.recent_favorite_toasts
            .retain(|_, emitted_at| now_ms - *emitted_at < TOAST_SUPPRESSION_MS);

        let key = (name.to_string(), direction);
        if self.recent_favorite_toasts.contains_key(&key) {
            debug!(
                component = "interaction",
                event = "interaction.favorite.toast_suppressed",
                name,
                direction = ?direction
            );
            return false;
        }

        toasts.enqueue(favorite_message(name, direction), now_ms);
        self.recent_favorite_toasts.insert(key, now_ms);
        true
    }

    pub fn mark_visited(&mut self, name: &str, today: NaiveDate) -> Result<bool, StoreError> {
        self.roll_over(today)?;
        if self.state.visited.contains(name) {
            return Ok(false);
        }

        let mut next = self.state.visited.clone();
        next.insert(name.to_string());
        let encoded = encode_names(VISITED_KEY, &next)?;
        self.store.set(VISITED_KEY, &encoded)?;
        self.store
            .set(VISITED_DATE_KEY, &today.format(DATE_FORMAT).to_string())?;
        self.state.visited = next;
        Ok(true)
    }

    pub fn toggle_snow(&mut self, now_ms: i64, toasts: &mut ToastQueue) -> Result<bool, StoreError> {
        let enabled = !self.state.snow_enabled;
        self.store
            .set(SNOW_KEY, if enabled { "true" } else { "false" })?;
        self.state.snow_enabled = enabled;
        toasts.enqueue(
            if enabled {
                "❄️ Schneefall aktiviert"
            } else {
                "❄️ Schneefall deaktiviert"
            },
            now_ms,
        );
        Ok(enabled)
    }

    fn persist_favorites(&mut self, favorites: &BTreeSet<String>) -> Result<(), StoreError> {
        if favorites.is_empty() {
            self.store.remove(FAVORITES_KEY)
        } else {
            let encoded = encode_names(FAVORITES_KEY, favorites)?;
            self.store.set(FAVORITES_KEY, &encoded)
        }
    }

    fn reset_visited(
        &mut self,
        previous: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<(), StoreError> {
        let discarded = self.state.visited.len();
        self.store.remove(VISITED_KEY)?;
        self.store
            .set(VISITED_DATE_KEY, &today.format(DATE_FORMAT).to_string())?;
        self.state.visited.clear();
        self.state.visited_reset_date = today;
        info!(
            component = "interaction",
            event = "interaction.visited.reset",
            previous_date = ?previous,
            today = %today,
            discarded
        );
        Ok(())
    }
}

fn read_name_set(store: &dyn KeyValueStore, key: &'static str) -> Result<BTreeSet<String>, StoreError> {
    let Some(raw) = store.get(key)? else {
        return Ok(BTreeSet::new());
    };
    match serde_json::from_str::<Vec<String>>(&raw) {
        Ok(names) => Ok(names.into_iter().collect()),
        Err(err) => {
            warn!(
                component = "interaction",
                event = "interaction.persisted.unreadable",
                key,
                error = %err
            );
            Ok(BTreeSet::new())
        }
    }
}

fn encode_names(key: &'static str, names: &BTreeSet<String>) -> Result<String, StoreError> {
    serde_json::to_string(names).map_err(|err| StoreError::Encode {
        key,
        message: err.to_string(),
    })
}
