//! Spreadsheet grid model, row decoding, and the feed sources that supply raw grids.
//!
//! Decoding rules:
//! - row 0 is the header and is always discarded
//! - rows without any cell value are dropped before mapping
//! - columns map positionally (calendar `A:H`, winners `A:E`)
//! - link columns prefer the cell hyperlink over its formatted text

use std::sync::{Arc, OnceLock, RwLock};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::currency::format_value;

pub const CALENDAR_RANGE: &str = "A:H";
pub const WINNERS_RANGE: &str = "A:E";
pub const DEFAULT_SHEET_ID: &str = "17kkvJCb9Bu_7WzPVAogoR4FKFHP5OSFuwVSmnNrICKU";
pub const DEFAULT_CALENDAR_GID: i64 = 1_241_575_332;
pub const DEFAULT_WINNERS_TAB: &str = "Gewinner";
pub const MYDEALZ_PROFILE_BASE: &str = "https://www.mydealz.de/profile/";

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const CELL_FIELDS: &str = "sheets.data.rowData.values(formattedValue,hyperlink)";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetCell {
    #[serde(default)]
    pub formatted_value: Option<String>,
    #[serde(default)]
    pub hyperlink: Option<String>,
}

impl SheetCell {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            formatted_value: Some(value.into()),
            hyperlink: None,
        }
    }

    pub fn linked(value: impl Into<String>, hyperlink: impl Into<String>) -> Self {
        Self {
            formatted_value: Some(value.into()),
            hyperlink: Some(hyperlink.into()),
        }
    }

    pub fn text_value(&self) -> &str {
        non_empty(&self.formatted_value).unwrap_or("")
    }

    pub fn link_or_text(&self) -> &str {
        non_empty(&self.hyperlink)
            .or_else(|| non_empty(&self.formatted_value))
            .unwrap_or("")
    }

    fn has_value(&self) -> bool {
        self.formatted_value.is_some() || self.hyperlink.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRow {
    #[serde(default)]
    pub values: Vec<SheetCell>,
}

impl SheetRow {
    pub fn new(values: Vec<SheetCell>) -> Self {
        Self { values }
    }

    /// Builds a row of plain text cells; empty strings become value-less cells.
    pub fn from_texts(texts: &[&str]) -> Self {
        Self {
            values: texts
                .iter()
                .map(|text| {
                    if text.is_empty() {
                        SheetCell::default()
                    } else {
                        SheetCell::text(*text)
                    }
                })
                .collect(),
        }
    }

    fn text_at(&self, idx: usize) -> String {
        self.values
            .get(idx)
            .map(|cell| cell.text_value().to_string())
            .unwrap_or_default()
    }

    fn link_at(&self, idx: usize) -> String {
        self.values
            .get(idx)
            .map(|cell| cell.link_or_text().to_string())
            .unwrap_or_default()
    }

    fn has_values(&self) -> bool {
        self.values.iter().any(SheetCell::has_value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub name: String,
    pub link: String,
    pub start_date: String,
    pub status: String,
    pub added_date: String,
    pub note: String,
    pub category: String,
    pub runs_until: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerEntry {
    pub mydealz_name: String,
    pub profile_link: String,
    pub calendar_name: String,
    pub prize_won: String,
    pub raw_value: String,
    pub formatted_value: String,
    pub proof_link: String,
}

pub fn profile_link(mydealz_name: &str) -> String {
    format!("{MYDEALZ_PROFILE_BASE}{mydealz_name}")
}

pub fn decode_calendar_rows(rows: &[SheetRow]) -> Vec<CalendarEntry> {
    data_rows(rows)
        .map(|row| {
            let runs_until = row.text_at(7);
            CalendarEntry {
                name: row.text_at(0),
                link: row.link_at(1),
                start_date: row.text_at(2),
                status: row.text_at(3),
                added_date: row.text_at(4),
                note: row.text_at(5),
                category: row.text_at(6),
                runs_until: if runs_until.trim().is_empty() {
                    None
                } else {
                    Some(runs_until)
                },
            }
        })
        .collect()
}

pub fn decode_winner_rows(rows: &[SheetRow]) -> Vec<WinnerEntry> {
    data_rows(rows)
        .map(|row| {
            let mydealz_name = row.text_at(0);
            let raw_value = row.text_at(3);
            WinnerEntry {
                profile_link: profile_link(&mydealz_name),
                calendar_name: row.text_at(1),
                prize_won: row.text_at(2),
                formatted_value: format_value(&raw_value),
                raw_value,
                proof_link: row.link_at(4),
                mydealz_name,
            }
        })
        .filter(|winner| {
            !winner.mydealz_name.trim().is_empty() && !winner.prize_won.trim().is_empty()
        })
        .collect()
}

fn data_rows(rows: &[SheetRow]) -> impl Iterator<Item = &SheetRow> {
    rows.iter().skip(1).filter(|row| row.has_values())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("GOOGLE_API_KEY nicht konfiguriert")]
    MissingApiKey,
    #[error("Verbindungsfehler beim Abrufen der {stage}: {message}")]
    Transport { stage: FetchStage, message: String },
    #[error("Fehler beim Abrufen der Sheet-Metadaten: {0}")]
    MetadataStatus(String),
    #[error("Google Sheet nicht gefunden. Bitte stelle sicher, dass das Sheet öffentlich freigegeben ist (Jeder mit dem Link kann ansehen).")]
    SheetNotFound,
    #[error("Google Sheets API Fehler: {0}")]
    DataStatus(String),
    #[error("Unlesbare Antwort der Google Sheets API: {0}")]
    Decode(String),
    #[error("Tabelle mit GID {0} nicht gefunden")]
    TabNotFound(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Metadata,
    Calendar,
    Winners,
}

impl std::fmt::Display for FetchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FetchStage::Metadata => "Sheet-Metadaten",
            FetchStage::Calendar => "Kalenderdaten",
            FetchStage::Winners => "Gewinnerdaten",
        })
    }
}

/// Supplies raw grids for the two feeds.
///
/// `winners_rows` returns `Ok(None)` when the winners tab does not exist yet.
pub trait FeedSource: Send + Sync + 'static {
    fn calendar_rows(&self) -> Result<Vec<SheetRow>, SheetError>;
    fn winners_rows(&self) -> Result<Option<Vec<SheetRow>>, SheetError>;
}

pub fn fetch_calendar(source: &dyn FeedSource) -> Result<Vec<CalendarEntry>, SheetError> {
    info!(component = "sheet", event = "sheet.fetch.start", feed = "calendar");
    let rows = source.calendar_rows().map_err(|err| {
        warn!(
            component = "sheet",
            event = "sheet.fetch.error",
            feed = "calendar",
            error = %err
        );
        err
    })?;
    let entries = decode_calendar_rows(&rows);
    info!(
        component = "sheet",
        event = "sheet.fetch.done",
        feed = "calendar",
        raw_rows = rows.len(),
        entries = entries.len()
    );
    Ok(entries)
}

pub fn fetch_winners(source: &dyn FeedSource) -> Result<Vec<WinnerEntry>, SheetError> {
    info!(component = "sheet", event = "sheet.fetch.start", feed = "winners");
    let rows = match source.winners_rows() {
        Ok(Some(rows)) => rows,
        Ok(None) => {
            info!(
                component = "sheet",
                event = "sheet.winners.tab_missing",
                feed = "winners"
            );
            return Ok(Vec::new());
        }
        Err(err) => {
            warn!(
                component = "sheet",
                event = "sheet.fetch.error",
                feed = "winners",
                error = %err
            );
            return Err(err);
        }
    };
    let winners = decode_winner_rows(&rows);
    info!(
        component = "sheet",
        event = "sheet.fetch.done",
        feed = "winners",
        raw_rows = rows.len(),
        entries = winners.len()
    );
    Ok(winners)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetsConfig {
    pub sheet_id: String,
    pub calendar_gid: i64,
    pub winners_tab: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            sheet_id: DEFAULT_SHEET_ID.to_string(),
            calendar_gid: DEFAULT_CALENDAR_GID,
            winners_tab: DEFAULT_WINNERS_TAB.to_string(),
            api_key: None,
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<TabMeta>,
}

#[derive(Debug, Deserialize)]
struct TabMeta {
    properties: TabProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TabProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetData {
    #[serde(default)]
    sheets: Vec<TabData>,
}

#[derive(Debug, Deserialize)]
struct TabData {
    #[serde(default)]
    data: Vec<GridData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridData {
    #[serde(default)]
    row_data: Vec<SheetRow>,
}

fn tab_title_by_id(meta: &SpreadsheetMeta, gid: i64) -> Option<&str> {
    meta.sheets
        .iter()
        .find(|tab| tab.properties.sheet_id == gid)
        .map(|tab| tab.properties.title.as_str())
}

fn tab_title_by_label<'a>(meta: &'a SpreadsheetMeta, label: &str) -> Option<&'a str> {
    let wanted = label.to_lowercase();
    meta.sheets
        .iter()
        .find(|tab| tab.properties.title.to_lowercase() == wanted)
        .map(|tab| tab.properties.title.as_str())
}

fn first_grid(data: SpreadsheetData) -> Vec<SheetRow> {
    data.sheets
        .into_iter()
        .next()
        .and_then(|tab| tab.data.into_iter().next())
        .map(|grid| grid.row_data)
        .unwrap_or_default()
}

struct HttpResponse {
    status: u16,
    reason: String,
    body: String,
}

trait HttpFetcher: Send + Sync {
    fn get_text(&self, url: &Url) -> Result<HttpResponse, String>;
}

/// Builds its client on first use so construction happens on the blocking thread
/// that performs the request.
struct ReqwestBlockingFetcher {
    timeout_ms: u64,
    client: OnceLock<reqwest::blocking::Client>,
}

impl ReqwestBlockingFetcher {
    fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, String> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .build()
            .map_err(|err| format!("HTTP-Client konnte nicht erstellt werden: {err}"))?;
        Ok(self.client.get_or_init(|| client))
    }
}

impl HttpFetcher for ReqwestBlockingFetcher {
    fn get_text(&self, url: &Url) -> Result<HttpResponse, String> {
        let response = self
            .client()?
            .get(url.clone())
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .map_err(|err| err.without_url().to_string())?;
        let status = response.status();
        let reason = status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string();
        let body = response
            .text()
            .map_err(|err| err.without_url().to_string())?;
        Ok(HttpResponse {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}

/// Reads both feeds from the Google Sheets v4 API.
pub struct GoogleSheetsSource {
    cfg: SheetsConfig,
    fetcher: Box<dyn HttpFetcher>,
}

impl GoogleSheetsSource {
    pub fn new(cfg: SheetsConfig) -> Self {
        let fetcher = ReqwestBlockingFetcher::new(cfg.timeout_ms);
        Self {
            cfg,
            fetcher: Box::new(fetcher),
        }
    }

    fn api_key(&self) -> Result<&str, SheetError> {
        self.cfg
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(SheetError::MissingApiKey)
    }

    fn metadata(&self) -> Result<SpreadsheetMeta, SheetError> {
        let key = self.api_key()?;
        let url = Url::parse_with_params(
            &format!("{SHEETS_API_BASE}/{}", self.cfg.sheet_id),
            &[("key", key)],
        )
        .map_err(|err| SheetError::Decode(err.to_string()))?;

        let response = self
            .fetcher
            .get_text(&url)
            .map_err(|message| SheetError::Transport {
                stage: FetchStage::Metadata,
                message,
            })?;
        if !(200..300).contains(&response.status) {
            return Err(SheetError::MetadataStatus(response.reason));
        }
        serde_json::from_str(&response.body).map_err(|err| SheetError::Decode(err.to_string()))
    }

    fn tab_rows(
        &self,
        title: &str,
        range: &str,
        stage: FetchStage,
    ) -> Result<Vec<SheetRow>, SheetError> {
        let key = self.api_key()?;
        let ranges = format!("{title}!{range}");
        let url = Url::parse_with_params(
            &format!("{SHEETS_API_BASE}/{}", self.cfg.sheet_id),
            &[
                ("ranges", ranges.as_str()),
                ("fields", CELL_FIELDS),
                ("key", key),
            ],
        )
        .map_err(|err| SheetError::Decode(err.to_string()))?;

        debug!(
            component = "sheet",
            event = "sheet.fetch.range",
            tab = title,
            range
        );
        let response = self
            .fetcher
            .get_text(&url)
            .map_err(|message| SheetError::Transport { stage, message })?;
        match response.status {
            200..=299 => {}
            404 => return Err(SheetError::SheetNotFound),
            _ => return Err(SheetError::DataStatus(response.reason)),
        }
        let data: SpreadsheetData = serde_json::from_str(&response.body)
            .map_err(|err| SheetError::Decode(err.to_string()))?;
        Ok(first_grid(data))
    }
}

impl FeedSource for GoogleSheetsSource {
    fn calendar_rows(&self) -> Result<Vec<SheetRow>, SheetError> {
        let meta = self.metadata()?;
        let title = tab_title_by_id(&meta, self.cfg.calendar_gid)
            .ok_or(SheetError::TabNotFound(self.cfg.calendar_gid))?;
        self.tab_rows(title, CALENDAR_RANGE, FetchStage::Calendar)
    }

    fn winners_rows(&self) -> Result<Option<Vec<SheetRow>>, SheetError> {
        let meta = self.metadata()?;
        match tab_title_by_label(&meta, &self.cfg.winners_tab) {
            Some(title) => self
                .tab_rows(title, WINNERS_RANGE, FetchStage::Winners)
                .map(Some),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedGrids {
    pub calendar: Vec<SheetRow>,
    pub winners: Option<Vec<SheetRow>>,
    pub calendar_failure: Option<String>,
    pub winners_failure: Option<String>,
}

#[derive(Clone)]
pub struct InMemoryFeedSource {
    inner: Arc<RwLock<FeedGrids>>,
}

impl InMemoryFeedSource {
    pub fn new(grids: FeedGrids) -> Self {
        Self {
            inner: Arc::new(RwLock::new(grids)),
        }
    }

    pub fn demo() -> Self {
        Self::new(demo_grids())
    }

    pub fn replace_grids(&self, grids: FeedGrids) {
        let mut guard = self
            .inner
            .write()
            .expect("in-memory feed lock should not be poisoned");
        *guard = grids;
    }

    fn grids(&self) -> FeedGrids {
        self.inner
            .read()
            .expect("in-memory feed lock should not be poisoned")
            .clone()
    }
}

impl FeedSource for InMemoryFeedSource {
    fn calendar_rows(&self) -> Result<Vec<SheetRow>, SheetError> {
        let grids = self.grids();
        match grids.calendar_failure {
            Some(message) => Err(SheetError::Transport {
                stage: FetchStage::Calendar,
                message,
            }),
            None => Ok(grids.calendar),
        }
    }

    fn winners_rows(&self) -> Result<Option<Vec<SheetRow>>, SheetError> {
        let grids = self.grids();
        match grids.winners_failure {
            Some(message) => Err(SheetError::Transport {
                stage: FetchStage::Winners,
                message,
            }),
            None => Ok(grids.winners),
        }
    }
}

pub fn demo_grids() -> FeedGrids {
    let header = SheetRow::from_texts(&[
        "Name",
        "Link",
        "Startdatum",
        "Status",
        "Hinzugefügt",
        "Kommentar",
        "Kategorie",
        "Läuft bis",
    ]);
    let mut calendar = vec![
        header,
        SheetRow::from_texts(&["Stand", "01.12.2025"]),
        SheetRow::from_texts(&[
            "Kaffeerösterei",
            "kaffee.example",
            "01.12.2025",
            "aktiv",
            "28.11.2025",
            "täglich",
            "Lebensmittel",
        ]),
        SheetRow::from_texts(&[
            "Bastelladen",
            "https://basteln.example/advent",
            "01.12.2025",
            "Aktiv",
            "29.11.2025",
            "",
            "Hobby",
            "31.12.2025",
        ]),
        SheetRow::from_texts(&[
            "Elektronikmarkt",
            "",
            "01.12.2025",
            "aktiv",
            "",
            "Link folgt",
            "Technik",
        ]),
        SheetRow::from_texts(&[
            "Buchhandlung",
            "buch.example",
            "01.12.2025",
            "beendet",
            "",
            "",
            "Medien",
        ]),
    ];
    calendar.push(SheetRow::new(vec![
        SheetCell::text("Spielwaren"),
        SheetCell::linked("Zum Kalender", "https://spiel.example/tuer"),
        SheetCell::text("02.12.2025"),
        SheetCell::text("aktiv"),
    ]));

    let winners = vec![
        SheetRow::from_texts(&["MyDealz Name", "Kalender", "Gewinn", "Wert", "Bilder"]),
        SheetRow::new(vec![
            SheetCell::text("schnaeppchenjaeger"),
            SheetCell::text("Kaffeerösterei"),
            SheetCell::text("Kaffeepaket"),
            SheetCell::text("25"),
            SheetCell::linked("Foto", "https://bilder.example/1"),
        ]),
        SheetRow::from_texts(&["dealfuchs", "Bastelladen", "Gutschein", "20 Euro"]),
    ];

    FeedGrids {
        calendar,
        winners: Some(winners),
        calendar_failure: None,
        winners_failure: None,
    }
}
