//! Which calendar entries are shown, in which order, under which display mode.
//!
//! Pipeline:
//! - base filter: non-empty link and status `aktiv` (case-insensitive); the `Stand` row is
//!   never a tile and only feeds the footer date
//! - expiry filter against `runs_until`, narrowed on the cutover day (holiday mode)
//! - ordering by category (empty last), then name
//! - favorites partitioned ahead of the remaining entries, numbered 1..n across both groups

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::sheet::CalendarEntry;

pub const STAND_ENTRY_NAME: &str = "Stand";
pub const ACTIVE_STATUS: &str = "aktiv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HolidayConfig {
    pub cutover_date: NaiveDate,
}

impl Default for HolidayConfig {
    fn default() -> Self {
        Self {
            cutover_date: NaiveDate::from_ymd_opt(2025, 12, 24).expect("valid default cutover"),
        }
    }
}

impl HolidayConfig {
    fn cutover_instant(&self) -> NaiveDateTime {
        end_of_day(self.cutover_date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    Normal,
    Holiday,
}

impl DisplayMode {
    pub fn for_date(today: NaiveDate, cfg: &HolidayConfig) -> Self {
        if is_holiday_mode(today, cfg) {
            DisplayMode::Holiday
        } else {
            DisplayMode::Normal
        }
    }
}

pub fn is_holiday_mode(today: NaiveDate, cfg: &HolidayConfig) -> bool {
    today == cfg.cutover_date
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunsUntil {
    Absent,
    Until(NaiveDate),
    Malformed(String),
}

/// Parses a `DD.MM.YYYY` date. Blank input is `Absent`; anything else that is not a real
/// calendar date is `Malformed`.
pub fn parse_runs_until(raw: Option<&str>) -> RunsUntil {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return RunsUntil::Absent;
    };

    let parts: Vec<&str> = raw.split('.').map(str::trim).collect();
    let parsed = match parts.as_slice() {
        [day, month, year] => match (day.parse::<u32>(), month.parse::<u32>(), year.parse::<i32>())
        {
            (Ok(day), Ok(month), Ok(year)) => NaiveDate::from_ymd_opt(year, month, day),
            _ => None,
        },
        _ => None,
    };

    match parsed {
        Some(date) => RunsUntil::Until(date),
        None => RunsUntil::Malformed(raw.to_string()),
    }
}

pub fn is_candidate(entry: &CalendarEntry) -> bool {
    entry.name != STAND_ENTRY_NAME
        && !entry.link.trim().is_empty()
        && entry.status.to_lowercase() == ACTIVE_STATUS
}

/// Footer "as of" text carried in the link column of the `Stand` row.
pub fn stand_date(entries: &[CalendarEntry]) -> Option<String> {
    entries
        .iter()
        .find(|entry| entry.name == STAND_ENTRY_NAME)
        .map(|entry| entry.link.trim())
        .filter(|link| !link.is_empty())
        .map(str::to_string)
}

pub fn is_visible(entry: &CalendarEntry, today: NaiveDate, cfg: &HolidayConfig) -> bool {
    is_candidate(entry) && is_running(entry, today, cfg)
}

fn is_running(entry: &CalendarEntry, today: NaiveDate, cfg: &HolidayConfig) -> bool {
    match parse_runs_until(entry.runs_until.as_deref()) {
        RunsUntil::Absent => true,
        RunsUntil::Malformed(raw) => {
            warn!(
                component = "visibility",
                event = "visibility.runs_until.malformed",
                entry = %entry.name,
                runs_until = %raw
            );
            true
        }
        RunsUntil::Until(until) => {
            let until_end = end_of_day(until);
            match DisplayMode::for_date(today, cfg) {
                DisplayMode::Holiday => until_end > cfg.cutover_instant(),
                DisplayMode::Normal => until_end >= start_of_day(today),
            }
        }
    }
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).expect("midnight exists for every date")
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .expect("23:59:59.999 exists for every date")
}

/// Category first (empty category after every named one), then name.
pub fn compare_entries(a: &CalendarEntry, b: &CalendarEntry) -> Ordering {
    a.category
        .is_empty()
        .cmp(&b.category.is_empty())
        .then_with(|| locale_compare(&a.category, &b.category))
        .then_with(|| locale_compare(&a.name, &b.name))
}

pub fn sort_entries(entries: &mut [CalendarEntry]) {
    entries.sort_by(compare_entries);
}

/// Case- and accent-insensitive comparison; exact text breaks remaining ties so the
/// order stays total.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

fn collation_key(text: &str) -> String {
    let mut key = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        match c {
            'ä' | 'á' | 'à' | 'â' | 'å' | 'ã' => key.push('a'),
            'ö' | 'ó' | 'ò' | 'ô' | 'õ' | 'ø' => key.push('o'),
            'ü' | 'ú' | 'ù' | 'û' => key.push('u'),
            'é' | 'è' | 'ê' | 'ë' => key.push('e'),
            'í' | 'ì' | 'î' | 'ï' => key.push('i'),
            'ç' => key.push('c'),
            'ñ' => key.push('n'),
            'ß' => key.push_str("ss"),
            other => key.push(other),
        }
    }
    key
}

pub fn visible_entries(
    entries: &[CalendarEntry],
    today: NaiveDate,
    cfg: &HolidayConfig,
) -> Vec<CalendarEntry> {
    let mut visible: Vec<CalendarEntry> = entries
        .iter()
        .filter(|entry| is_visible(entry, today, cfg))
        .cloned()
        .collect();
    sort_entries(&mut visible);
    visible
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    pub favorites: Vec<CalendarEntry>,
    pub normal: Vec<CalendarEntry>,
}

impl Board {
    /// Display numbers: favorites take 1..=n, normal entries continue after them.
    pub fn numbered(&self) -> impl Iterator<Item = (usize, &CalendarEntry)> {
        self.favorites
            .iter()
            .chain(self.normal.iter())
            .enumerate()
            .map(|(idx, entry)| (idx + 1, entry))
    }

    pub fn len(&self) -> usize {
        self.favorites.len() + self.normal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn partition_board(entries: Vec<CalendarEntry>, favorites: &BTreeSet<String>) -> Board {
    let (mut favorite_entries, mut normal): (Vec<_>, Vec<_>) = entries
        .into_iter()
        .partition(|entry| favorites.contains(&entry.name));
    sort_entries(&mut favorite_entries);
    sort_entries(&mut normal);
    Board {
        favorites: favorite_entries,
        normal,
    }
}

pub fn valid_favorites_count(entries: &[CalendarEntry], favorites: &BTreeSet<String>) -> usize {
    entries
        .iter()
        .filter(|entry| favorites.contains(&entry.name) && !entry.link.trim().is_empty())
        .count()
}

/// Prepends `https://` to links that carry no http(s) scheme.
pub fn normalize_link(link: &str) -> String {
    let link = link.trim();
    if link.starts_with("http://") || link.starts_with("https://") {
        link.to_string()
    } else {
        format!("https://{link}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardSection {
    Favorites,
    Normal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardTile {
    pub number: usize,
    pub section: BoardSection,
    pub name: String,
    pub href: String,
    pub category: String,
    pub start_date: String,
    pub added_date: String,
    pub note: String,
    pub runs_until: Option<String>,
    pub visited: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardView {
    pub mode: DisplayMode,
    pub stand_date: Option<String>,
    pub favorites_count: usize,
    pub normal_count: usize,
    pub valid_favorites_count: usize,
    pub tiles: Vec<BoardTile>,
}

impl BoardView {
    pub fn section(&self, section: BoardSection) -> impl Iterator<Item = &BoardTile> {
        self.tiles.iter().filter(move |tile| tile.section == section)
    }
}

pub fn build_board(
    entries: &[CalendarEntry],
    favorites: &BTreeSet<String>,
    visited: &BTreeSet<String>,
    today: NaiveDate,
    cfg: &HolidayConfig,
) -> BoardView {
    let visible = visible_entries(entries, today, cfg);
    let valid_favorites = valid_favorites_count(&visible, favorites);
    let board = partition_board(visible, favorites);
    let favorites_count = board.favorites.len();

    let tiles = board
        .numbered()
        .map(|(number, entry)| BoardTile {
            number,
            section: if number <= favorites_count {
                BoardSection::Favorites
            } else {
                BoardSection::Normal
            },
            name: entry.name.clone(),
            href: normalize_link(&entry.link),
            category: entry.category.clone(),
            start_date: entry.start_date.clone(),
            added_date: entry.added_date.clone(),
            note: entry.note.clone(),
            runs_until: entry.runs_until.clone(),
            visited: visited.contains(&entry.name),
        })
        .collect();

    BoardView {
        mode: DisplayMode::for_date(today, cfg),
        stand_date: stand_date(entries),
        favorites_count,
        normal_count: board.normal.len(),
        valid_favorites_count: valid_favorites,
        tiles,
    }
}
