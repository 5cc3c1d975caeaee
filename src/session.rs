//! One browser session: interaction state, its toast stream, and the feed snapshots
//! fetched for it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::interaction::{FavoriteDirection, InteractionStore, StoreError};
use crate::sheet::{fetch_calendar, fetch_winners, CalendarEntry, FeedSource, SheetError, WinnerEntry};
use crate::toast::{Toast, ToastQueue};
use crate::visibility::{build_board, normalize_link, visible_entries, BoardView, HolidayConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum FeedState<T> {
    Loaded(T),
    Failed(String),
}

impl<T> FeedState<T> {
    fn from_result(result: Result<T, SheetError>) -> Self {
        match result {
            Ok(value) => FeedState::Loaded(value),
            Err(err) => FeedState::Failed(err.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Kalenderdaten wurden noch nicht geladen")]
    CalendarNotLoaded,
    #[error("{0}")]
    CalendarFailed(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Session {
    interaction: InteractionStore,
    toasts: ToastQueue,
    calendar: Option<FeedState<Vec<CalendarEntry>>>,
    winners: Option<FeedState<Vec<WinnerEntry>>>,
}

impl Session {
    pub fn new(interaction: InteractionStore) -> Self {
        Self {
            interaction,
            toasts: ToastQueue::new(),
            calendar: None,
            winners: None,
        }
    }

    pub fn interaction(&self) -> &InteractionStore {
        &self.interaction
    }

    pub fn calendar_loaded(&self) -> bool {
        self.calendar.is_some()
    }

    pub fn calendar(&self) -> Option<&FeedState<Vec<CalendarEntry>>> {
        self.calendar.as_ref()
    }

    pub fn winners(&self) -> Option<&FeedState<Vec<WinnerEntry>>> {
        self.winners.as_ref()
    }

    pub fn set_calendar(&mut self, result: Result<Vec<CalendarEntry>, SheetError>) {
        self.calendar = Some(FeedState::from_result(result));
    }

    pub fn set_winners(&mut self, result: Result<Vec<WinnerEntry>, SheetError>) {
        self.winners = Some(FeedState::from_result(result));
    }

    /// Fetches the calendar feed unless this session already holds a result for it.
    pub fn load_calendar(&mut self, source: &dyn FeedSource) -> &FeedState<Vec<CalendarEntry>> {
        let state = match self.calendar.take() {
            Some(state) => state,
            None => FeedState::from_result(fetch_calendar(source)),
        };
        self.calendar.insert(state)
    }

    pub fn reload_calendar(&mut self, source: &dyn FeedSource) -> &FeedState<Vec<CalendarEntry>> {
        self.calendar = None;
        self.load_calendar(source)
    }

    /// Winners are fetched again each time the winners view is opened.
    pub fn load_winners(&mut self, source: &dyn FeedSource) -> &FeedState<Vec<WinnerEntry>> {
        self.winners
            .insert(FeedState::from_result(fetch_winners(source)))
    }

    pub fn board(&mut self, today: NaiveDate, cfg: &HolidayConfig) -> Result<BoardView, SessionError> {
        self.interaction.roll_over(today)?;
        let entries = self.loaded_calendar()?;
        Ok(build_board(
            entries,
            self.interaction.favorites(),
            self.interaction.visited(),
            today,
            cfg,
        ))
    }

    pub fn toggle_favorite(
        &mut self,
        name: &str,
        now_ms: i64,
    ) -> Result<FavoriteDirection, SessionError> {
        Ok(self
            .interaction
            .toggle_favorite(name, now_ms, &mut self.toasts)?)
    }

    pub fn mark_visited(&mut self, name: &str, today: NaiveDate) -> Result<bool, SessionError> {
        Ok(self.interaction.mark_visited(name, today)?)
    }

    pub fn toggle_snow(&mut self, now_ms: i64) -> Result<bool, SessionError> {
        Ok(self.interaction.toggle_snow(now_ms, &mut self.toasts)?)
    }

    pub fn toasts(&mut self, now_ms: i64) -> Vec<Toast> {
        self.toasts.visible(now_ms)
    }

    /// Normalized links of every visible entry in category and name order.
    /// Favorites are not moved to the front.
    pub fn open_all_links(
        &self,
        today: NaiveDate,
        cfg: &HolidayConfig,
    ) -> Result<Vec<String>, SessionError> {
        let entries = self.loaded_calendar()?;
        let links: Vec<String> = visible_entries(entries, today, cfg)
            .iter()
            .map(|entry| normalize_link(&entry.link))
            .collect();
        info!(
            component = "session",
            event = "session.open_all",
            links = links.len()
        );
        Ok(links)
    }

    pub fn open_favorite_links(
        &mut self,
        today: NaiveDate,
        cfg: &HolidayConfig,
        now_ms: i64,
    ) -> Result<Vec<String>, SessionError> {
        let entries = self.loaded_calendar()?;
        let favorites = self.interaction.favorites();
        let links: Vec<String> = visible_entries(entries, today, cfg)
            .iter()
            .filter(|entry| favorites.contains(&entry.name))
            .map(|entry| normalize_link(&entry.link))
            .collect();
        self.toasts
            .enqueue(format!("🌟 {} Favoriten geöffnet", links.len()), now_ms);
        Ok(links)
    }

    fn loaded_calendar(&self) -> Result<&[CalendarEntry], SessionError> {
        match &self.calendar {
            Some(FeedState::Loaded(entries)) => Ok(entries),
            Some(FeedState::Failed(message)) => Err(SessionError::CalendarFailed(message.clone())),
            None => Err(SessionError::CalendarNotLoaded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::MemoryKeyValueStore;
    use crate::sheet::{FeedGrids, InMemoryFeedSource, SheetRow};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn session(today: NaiveDate) -> Session {
        let store = InteractionStore::load(Box::new(MemoryKeyValueStore::new()), today).unwrap();
        Session::new(store)
    }

    struct CountingSource {
        inner: InMemoryFeedSource,
        calendar_calls: AtomicUsize,
        winners_calls: AtomicUsize,
    }

    impl FeedSource for CountingSource {
        fn calendar_rows(&self) -> Result<Vec<SheetRow>, SheetError> {
            self.calendar_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.calendar_rows()
        }

        fn winners_rows(&self) -> Result<Option<Vec<SheetRow>>, SheetError> {
            self.winners_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.winners_rows()
        }
    }

    fn counting() -> CountingSource {
        CountingSource {
            inner: InMemoryFeedSource::demo(),
            calendar_calls: AtomicUsize::new(0),
            winners_calls: AtomicUsize::new(0),
        }
    }

    #[test]
    fn calendar_is_fetched_once_per_session() {
        let source = counting();
        let mut session = session(date(2025, 12, 5));

        session.load_calendar(&source);
        session.load_calendar(&source);
        assert_eq!(source.calendar_calls.load(Ordering::SeqCst), 1);

        session.reload_calendar(&source);
        assert_eq!(source.calendar_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn winners_are_refetched_on_every_open() {
        let source = counting();
        let mut session = session(date(2025, 12, 5));

        session.load_winners(&source);
        session.load_winners(&source);
        assert_eq!(source.winners_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn calendar_failure_is_terminal_for_the_board_but_not_for_winners() {
        let source = InMemoryFeedSource::new(FeedGrids {
            calendar_failure: Some("offline".to_string()),
            winners: Some(crate::sheet::demo_grids().winners.unwrap()),
            ..FeedGrids::default()
        });
        let mut session = session(date(2025, 12, 5));

        assert!(matches!(session.load_calendar(&source), FeedState::Failed(_)));
        assert!(matches!(
            session.calendar(),
            Some(FeedState::Failed(message)) if message.contains("offline")
        ));
        let err = session.board(date(2025, 12, 5), &HolidayConfig::default()).unwrap_err();
        assert!(matches!(err, SessionError::CalendarFailed(ref m) if m.contains("offline")));

        assert!(matches!(session.load_winners(&source), FeedState::Loaded(w) if w.len() == 2));
    }

    #[test]
    fn board_before_load_reports_not_loaded() {
        let mut session = session(date(2025, 12, 5));
        assert!(session.calendar().is_none());
        assert!(matches!(
            session.board(date(2025, 12, 5), &HolidayConfig::default()),
            Err(SessionError::CalendarNotLoaded)
        ));
    }

    #[test]
    fn favorites_feed_back_into_board_order() {
        let source = InMemoryFeedSource::demo();
        let today = date(2025, 12, 5);
        let cfg = HolidayConfig::default();
        let mut session = session(today);
        session.load_calendar(&source);

        let before = session.board(today, &cfg).unwrap();
        let last = before.tiles.last().unwrap().name.clone();
        session.toggle_favorite(&last, 0).unwrap();

        let after = session.board(today, &cfg).unwrap();
        assert_eq!(after.tiles[0].name, last);
        assert_eq!(after.tiles[0].number, 1);
        assert_eq!(after.favorites_count, 1);
        assert_eq!(session.toasts(0).len(), 1);
    }

    #[test]
    fn open_commands_return_normalized_links() {
        let source = InMemoryFeedSource::demo();
        let today = date(2025, 12, 5);
        let cfg = HolidayConfig::default();
        let mut session = session(today);
        session.load_calendar(&source);

        let all = session.open_all_links(today, &cfg).unwrap();
        assert!(all.iter().all(|link| link.starts_with("https://")));
        assert!(all.contains(&"https://kaffee.example".to_string()));

        session.toggle_favorite("Kaffeerösterei", 0).unwrap();
        let all_after = session.open_all_links(today, &cfg).unwrap();
        assert_eq!(all_after, all);
        let favorites = session.open_favorite_links(today, &cfg, 10).unwrap();
        assert_eq!(favorites, vec!["https://kaffee.example".to_string()]);
        let toasts = session.toasts(10);
        assert_eq!(toasts.last().unwrap().message, "🌟 1 Favoriten geöffnet");
    }

    #[test]
    fn visited_marks_show_on_tiles() {
        let source = InMemoryFeedSource::demo();
        let today = date(2025, 12, 5);
        let cfg = HolidayConfig::default();
        let mut session = session(today);
        session.load_calendar(&source);

        session.mark_visited("Bastelladen", today).unwrap();
        let board = session.board(today, &cfg).unwrap();
        let tile = board.tiles.iter().find(|t| t.name == "Bastelladen").unwrap();
        assert!(tile.visited);

        let tomorrow = date(2025, 12, 6);
        let board = session.board(tomorrow, &cfg).unwrap();
        assert!(board.tiles.iter().all(|t| !t.visited));
    }
}
