//! HTTP routes: the calendar page, the winners page and the JSON API behind them.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::access::{check_referer, AccessDenied};
use crate::config::{self, AppConfig, DEFAULT_TIMEZONE};
use crate::interaction::FavoriteDirection;
use crate::session::{FeedState, Session, SessionError};
use crate::sheet::{
    fetch_calendar, fetch_winners, CalendarEntry, FeedSource, FetchStage, SheetError, WinnerEntry,
};
use crate::toast::Toast;
use crate::visibility::{is_holiday_mode, BoardSection, BoardView, DisplayMode, HolidayConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(at) => *at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebConfig {
    pub holiday: HolidayConfig,
    pub timezone: Tz,
    pub dev_mode: bool,
    pub clock: Clock,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            holiday: HolidayConfig::default(),
            timezone: DEFAULT_TIMEZONE,
            dev_mode: false,
            clock: Clock::System,
        }
    }
}

impl From<&AppConfig> for WebConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            holiday: cfg.holiday,
            timezone: cfg.timezone,
            dev_mode: cfg.dev_mode,
            clock: Clock::System,
        }
    }
}

#[derive(Clone)]
pub struct AdventAppState {
    source: Arc<dyn FeedSource>,
    session: Arc<Mutex<Session>>,
    cfg: WebConfig,
}

impl AdventAppState {
    pub fn new(source: Arc<dyn FeedSource>, session: Session, cfg: WebConfig) -> Self {
        Self {
            source,
            session: Arc::new(Mutex::new(session)),
            cfg,
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session
            .lock()
            .expect("session lock should not be poisoned")
    }

    fn now_ms(&self) -> i64 {
        self.cfg.clock.now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        config::today(self.cfg.clock.now(), self.cfg.timezone)
    }
}

pub fn advent_router(state: AdventAppState) -> Router {
    Router::new()
        .route("/", get(get_index_html))
        .route("/gewinner", get(get_winners_html))
        .route("/api/sheet", get(get_api_sheet))
        .route("/api/gewinner", get(get_api_winners))
        .route("/api/board", get(get_api_board))
        .route("/api/favorites/toggle", post(post_toggle_favorite))
        .route("/api/visited", post(post_mark_visited))
        .route("/api/snow/toggle", post(post_toggle_snow))
        .route("/api/open-all", post(post_open_all))
        .route("/api/open-favorites", post(post_open_favorites))
        .route("/api/toasts", get(get_api_toasts))
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Access(#[from] AccessDenied),
    #[error(transparent)]
    Sheet(#[from] SheetError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Name darf nicht leer sein")]
    EmptyName,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Access(denied) => (StatusCode::FORBIDDEN, denied.public_message().to_string()),
            ApiError::EmptyName => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Sheet(_) | ApiError::Session(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

impl NameRequest {
    fn trimmed(&self) -> Result<&str, ApiError> {
        let name = self.name.trim();
        if name.is_empty() {
            Err(ApiError::EmptyName)
        } else {
            Ok(name)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteResponse {
    pub name: String,
    pub favorite: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitedResponse {
    pub name: String,
    pub newly_visited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnowResponse {
    pub snow_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksResponse {
    pub links: Vec<String>,
}

/// Runs a blocking feed fetch off the async workers.
async fn blocking_fetch<T, F>(
    source: &Arc<dyn FeedSource>,
    stage: FetchStage,
    fetch: F,
) -> Result<T, SheetError>
where
    T: Send + 'static,
    F: FnOnce(&dyn FeedSource) -> Result<T, SheetError> + Send + 'static,
{
    let source = Arc::clone(source);
    tokio::task::spawn_blocking(move || fetch(&*source))
        .await
        .unwrap_or_else(|err| {
            Err(SheetError::Transport {
                stage,
                message: err.to_string(),
            })
        })
}

async fn ensure_calendar(state: &AdventAppState) {
    let loaded = state.session().calendar_loaded();
    if loaded {
        return;
    }
    let result = blocking_fetch(&state.source, FetchStage::Calendar, fetch_calendar).await;
    let mut session = state.session();
    if !session.calendar_loaded() {
        session.set_calendar(result);
    }
}

async fn refresh_winners(state: &AdventAppState) {
    let result = blocking_fetch(&state.source, FetchStage::Winners, fetch_winners).await;
    state.session().set_winners(result);
}

fn authorize(state: &AdventAppState, headers: &HeaderMap, route: &'static str) -> Result<(), ApiError> {
    let referer = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok());
    let host = headers.get(header::HOST).and_then(|value| value.to_str().ok());
    check_referer(referer, host, state.cfg.dev_mode).map_err(|denied| {
        warn!(
            component = "web",
            event = "http.access.denied",
            route,
            reason = %denied
        );
        ApiError::from(denied)
    })
}

async fn get_index_html(State(state): State<AdventAppState>) -> Response {
    ensure_calendar(&state).await;
    let today = state.today();
    if is_holiday_mode(today, &state.cfg.holiday) {
        refresh_winners(&state).await;
    }

    let now_ms = state.now_ms();
    let mut session = state.session();
    match session.board(today, &state.cfg.holiday) {
        Ok(view) => {
            info!(
                component = "web",
                event = "http.board.request",
                route = "/",
                mode = ?view.mode,
                tiles = view.tiles.len()
            );
            let toasts = session.toasts(now_ms);
            let page = BoardPage {
                view: &view,
                toasts: &toasts,
                snow_enabled: session.interaction().snow_enabled(),
                winners: session.winners(),
            };
            Html(render_board_html(&page)).into_response()
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(render_error_html(&err.to_string())),
        )
            .into_response(),
    }
}

async fn get_winners_html(State(state): State<AdventAppState>) -> Response {
    refresh_winners(&state).await;
    let session = state.session();
    match session.winners() {
        Some(winners) => Html(render_winners_html(winners)).into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(render_error_html("Fehler beim Laden der Gewinner")),
        )
            .into_response(),
    }
}

async fn get_api_sheet(
    State(state): State<AdventAppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<CalendarEntry>>, ApiError> {
    authorize(&state, &headers, "/api/sheet")?;
    let entries = blocking_fetch(&state.source, FetchStage::Calendar, fetch_calendar).await?;
    Ok(Json(entries))
}

async fn get_api_winners(
    State(state): State<AdventAppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<WinnerEntry>>, ApiError> {
    authorize(&state, &headers, "/api/gewinner")?;
    let winners = blocking_fetch(&state.source, FetchStage::Winners, fetch_winners).await?;
    Ok(Json(winners))
}

async fn get_api_board(State(state): State<AdventAppState>) -> Result<Json<BoardView>, ApiError> {
    ensure_calendar(&state).await;
    let today = state.today();
    let view = state.session().board(today, &state.cfg.holiday)?;
    info!(
        component = "web",
        event = "http.board.request",
        route = "/api/board",
        mode = ?view.mode,
        tiles = view.tiles.len()
    );
    Ok(Json(view))
}

async fn post_toggle_favorite(
    State(state): State<AdventAppState>,
    Json(request): Json<NameRequest>,
) -> Result<Json<FavoriteResponse>, ApiError> {
    let name = request.trimmed()?;
    let now_ms = state.now_ms();
    let direction = state.session().toggle_favorite(name, now_ms)?;
    Ok(Json(FavoriteResponse {
        name: name.to_string(),
        favorite: direction == FavoriteDirection::Added,
    }))
}

async fn post_mark_visited(
    State(state): State<AdventAppState>,
    Json(request): Json<NameRequest>,
) -> Result<Json<VisitedResponse>, ApiError> {
    let name = request.trimmed()?;
    let today = state.today();
    let newly_visited = state.session().mark_visited(name, today)?;
    Ok(Json(VisitedResponse {
        name: name.to_string(),
        newly_visited,
    }))
}

async fn post_toggle_snow(State(state): State<AdventAppState>) -> Result<Json<SnowResponse>, ApiError> {
    let now_ms = state.now_ms();
    let snow_enabled = state.session().toggle_snow(now_ms)?;
    Ok(Json(SnowResponse { snow_enabled }))
}

async fn post_open_all(State(state): State<AdventAppState>) -> Result<Json<LinksResponse>, ApiError> {
    ensure_calendar(&state).await;
    let today = state.today();
    let links = state.session().open_all_links(today, &state.cfg.holiday)?;
    Ok(Json(LinksResponse { links }))
}

async fn post_open_favorites(
    State(state): State<AdventAppState>,
) -> Result<Json<LinksResponse>, ApiError> {
    ensure_calendar(&state).await;
    let today = state.today();
    let now_ms = state.now_ms();
    let links = state
        .session()
        .open_favorite_links(today, &state.cfg.holiday, now_ms)?;
    Ok(Json(LinksResponse { links }))
}

async fn get_api_toasts(State(state): State<AdventAppState>) -> Json<Vec<Toast>> {
    let now_ms = state.now_ms();
    Json(state.session().toasts(now_ms))
}

pub struct BoardPage<'a> {
    pub view: &'a BoardView,
    pub toasts: &'a [Toast],
    pub snow_enabled: bool,
    pub winners: Option<&'a FeedState<Vec<WinnerEntry>>>,
}

const PAGE_STYLE: &str = "<style>:root{--bg:#0f2a1d;--card:#fffdf7;--ink:#1d1d1b;--muted:#6b6b66;--gold:#d4a017;--fav:#e25c8a;--visited:#2f6fd0}*{box-sizing:border-box}body{margin:0;color:var(--ink);font-family:\"Avenir Next\",\"Segoe UI\",sans-serif;background:linear-gradient(170deg,#0f2a1d,#1c4630);min-height:100vh}.shell{max-width:1200px;margin:0 auto;padding:20px 16px}.hero{background:linear-gradient(135deg,#b8860b,#f2c94c);border-radius:16px;padding:16px 20px;color:#1d1d1b;display:flex;gap:12px;flex-wrap:wrap;align-items:center;justify-content:space-between}.hero h1{margin:0;font-size:1.5rem}.actions button,.actions a{margin-left:6px;border:0;border-radius:9px;padding:8px 12px;font-weight:700;cursor:pointer;background:#14343f;color:#fff;text-decoration:none}.banner{margin-top:16px;background:var(--card);border-radius:16px;padding:16px 20px}.grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(210px,1fr));gap:12px;margin-top:16px}.tile{position:relative;background:var(--card);border-radius:14px;padding:12px;border:2px solid transparent}.tile.favorite{border-color:var(--fav)}.tile .number{font-size:1.6rem;font-weight:800;color:var(--gold)}.tile a.door{display:block;font-weight:700;color:var(--ink);text-decoration:none;margin:4px 0}.tile .meta{font-size:.78rem;color:var(--muted)}.badge{display:inline-block;background:var(--visited);color:#fff;border-radius:6px;padding:1px 6px;font-size:.7rem}.fav-btn{position:absolute;top:8px;right:8px;border:0;background:none;font-size:1.1rem;cursor:pointer}h2{color:#f7f3e3;margin:22px 0 0}table{width:100%;border-collapse:collapse}td,th{padding:6px 8px;border-bottom:1px solid #e2ded2;text-align:left}footer{margin-top:24px;color:#d8d2bd;font-size:.85rem}.toasts{position:fixed;bottom:16px;right:16px;display:flex;flex-direction:column;gap:8px}.toast{background:#1d1d1b;color:#fff;border-radius:10px;padding:10px 14px}.snow::before{content:\"\";position:fixed;inset:0;pointer-events:none;background-image:radial-gradient(#fff 1px,transparent 1.5px);background-size:36px 36px;opacity:.35}.error{background:var(--card);border-radius:16px;padding:24px;margin-top:40px}</style>\n";

const PAGE_SCRIPT: &str = "<script>async function post(path,body){const r=await fetch(path,{method:'POST',headers:{'content-type':'application/json'},body:body?JSON.stringify(body):undefined});return r.json()}\ndocument.querySelectorAll('.fav-btn').forEach(b=>b.addEventListener('click',async()=>{await post('/api/favorites/toggle',{name:b.dataset.name});location.reload()}));\ndocument.querySelectorAll('a.door').forEach(a=>a.addEventListener('click',()=>{post('/api/visited',{name:a.dataset.name})}));\nconst snow=document.getElementById('snow-toggle');if(snow){snow.addEventListener('click',async()=>{await post('/api/snow/toggle');location.reload()})}\nasync function openAll(path){const r=await post(path);(r.links||[]).forEach(l=>window.open(l,'_blank','noopener,noreferrer'));location.reload()}\nconst all=document.getElementById('open-all');if(all){all.addEventListener('click',()=>openAll('/api/open-all'))}\nconst favs=document.getElementById('open-favorites');if(favs){favs.addEventListener('click',()=>openAll('/api/open-favorites'))}\n</script>\n";

fn page_head(out: &mut String, title: &str, snow_enabled: bool) {
    out.push_str("<!DOCTYPE html><html lang=\"de\"><head><meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape_html(title)));
    out.push_str(PAGE_STYLE);
    if snow_enabled {
        out.push_str("</head><body class=\"snow\"><main class=\"shell\">\n");
    } else {
        out.push_str("</head><body><main class=\"shell\">\n");
    }
}

pub fn render_board_html(page: &BoardPage<'_>) -> String {
    let view = page.view;
    let mut out = String::new();
    page_head(&mut out, "Adventskalender", page.snow_enabled);

    out.push_str("<section class=\"hero\"><h1>Adventskalender</h1><div class=\"actions\">");
    out.push_str("<a href=\"/gewinner\">Gewinner</a>");
    out.push_str(&format!(
        "<button id=\"snow-toggle\" data-enabled=\"{}\">❄️ Schnee</button>",
        page.snow_enabled
    ));
    if view.mode == DisplayMode::Normal {
        out.push_str("<button id=\"open-all\">Alle öffnen</button>");
        out.push_str(&format!(
            "<button id=\"open-favorites\">Alle Favs öffnen ({})</button>",
            view.valid_favorites_count
        ));
    } else {
        out.push_str("<button id=\"open-all\">Alle Türchen öffnen</button>");
    }
    out.push_str("</div></section>\n");

    if view.mode == DisplayMode::Holiday {
        render_holiday_banner(&mut out, page.winners);
    }

    if view.favorites_count > 0 {
        out.push_str(&format!(
            "<h2 id=\"favorites\">⭐ Favoriten ({})</h2><div class=\"grid\">\n",
            view.favorites_count
        ));
        for tile in view.section(BoardSection::Favorites) {
            render_tile(&mut out, tile);
        }
        out.push_str("</div>\n");
    }

    let heading = match view.mode {
        DisplayMode::Normal => "Alle Türchen",
        DisplayMode::Holiday => "Diese Kalender laufen noch",
    };
    out.push_str(&format!(
        "<h2 id=\"doors\">{} ({})</h2><div class=\"grid\">\n",
        heading, view.normal_count
    ));
    for tile in view.section(BoardSection::Normal) {
        render_tile(&mut out, tile);
    }
    out.push_str("</div>\n");

    if let Some(stand) = &view.stand_date {
        out.push_str(&format!("<footer>Stand: {}</footer>\n", escape_html(stand)));
    }

    render_toasts(&mut out, page.toasts);
    out.push_str("</main>");
    out.push_str(PAGE_SCRIPT);
    out.push_str("</body></html>\n");
    out
}

fn render_tile(out: &mut String, tile: &crate::visibility::BoardTile) {
    let class = match tile.section {
        BoardSection::Favorites => "tile favorite",
        BoardSection::Normal => "tile",
    };
    let star = match tile.section {
        BoardSection::Favorites => "★",
        BoardSection::Normal => "☆",
    };
    let name = escape_html(&tile.name);
    out.push_str(&format!(
        "<article class=\"{class}\" data-number=\"{}\">",
        tile.number
    ));
    out.push_str(&format!(
        "<button class=\"fav-btn\" data-name=\"{name}\" aria-label=\"Favorit umschalten\">{star}</button>"
    ));
    out.push_str(&format!("<span class=\"number\">{}</span>", tile.number));
    out.push_str(&format!(
        "<a class=\"door\" target=\"_blank\" rel=\"noopener noreferrer\" data-name=\"{name}\" href=\"{}\">{name}</a>",
        escape_html(&tile.href)
    ));
    if tile.visited {
        out.push_str("<span class=\"badge\">Besucht</span>");
    }
    out.push_str("<div class=\"meta\">");
    if !tile.category.is_empty() {
        out.push_str(&format!("<div>{}</div>", escape_html(&tile.category)));
    }
    if !tile.start_date.is_empty() {
        out.push_str(&format!("<div>Start: {}</div>", escape_html(&tile.start_date)));
    }
    if let Some(until) = &tile.runs_until {
        out.push_str(&format!("<div>Läuft bis: {}</div>", escape_html(until)));
    }
    if !tile.note.is_empty() {
        out.push_str(&format!("<div>{}</div>", escape_html(&tile.note)));
    }
    out.push_str("</div></article>\n");
}

fn render_holiday_banner(out: &mut String, winners: Option<&FeedState<Vec<WinnerEntry>>>) {
    out.push_str("<section class=\"banner\" id=\"holiday\"><h2 style=\"color:inherit;margin-top:0\">🎄 Frohe Weihnachten!</h2>");
    out.push_str("<p>Danke an alle, die dieses Jahr mitgemacht haben. Hier sind die Gewinner:</p>");
    match winners {
        Some(FeedState::Loaded(winners)) => render_winners_table(out, winners),
        Some(FeedState::Failed(message)) => out.push_str(&format!(
            "<p class=\"winners-error\">{}</p>",
            escape_html(message)
        )),
        None => out.push_str("<p>Gewinner werden geladen…</p>"),
    }
    out.push_str("</section>\n");
}

fn render_winners_table(out: &mut String, winners: &[WinnerEntry]) {
    if winners.is_empty() {
        out.push_str("<p class=\"winners-empty\">Noch keine Gewinner eingetragen.</p>");
        return;
    }
    out.push_str("<table id=\"winners\"><thead><tr><th>MyDealz</th><th>Kalender</th><th>Gewinn</th><th>Wert</th><th>Nachweis</th></tr></thead><tbody>\n");
    for winner in winners {
        out.push_str("<tr>");
        out.push_str(&format!(
            "<td><a target=\"_blank\" rel=\"noopener noreferrer\" href=\"{}\">{}</a></td>",
            escape_html(&winner.profile_link),
            escape_html(&winner.mydealz_name)
        ));
        out.push_str(&format!("<td>{}</td>", escape_html(&winner.calendar_name)));
        out.push_str(&format!("<td>{}</td>", escape_html(&winner.prize_won)));
        out.push_str(&format!("<td>{}</td>", escape_html(&winner.formatted_value)));
        if winner.proof_link.is_empty() {
            out.push_str("<td>-</td>");
        } else {
            out.push_str(&format!(
                "<td><a target=\"_blank\" rel=\"noopener noreferrer\" href=\"{}\">Bilder</a></td>",
                escape_html(&crate::visibility::normalize_link(&winner.proof_link))
            ));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody></table>\n");
}

fn render_toasts(out: &mut String, toasts: &[Toast]) {
    out.push_str("<div class=\"toasts\">");
    for toast in toasts {
        out.push_str(&format!(
            "<div class=\"toast\" data-expires=\"{}\">{}</div>",
            toast.expires_at_ms,
            escape_html(&toast.message)
        ));
    }
    out.push_str("</div>\n");
}

pub fn render_winners_html(winners: &FeedState<Vec<WinnerEntry>>) -> String {
    let mut out = String::new();
    page_head(&mut out, "Gewinner 2025", false);
    out.push_str("<section class=\"hero\"><h1>🏆 Gewinner 2025</h1><div class=\"actions\"><a href=\"/\">Zurück</a></div></section>\n");
    out.push_str("<section class=\"banner\">");
    match winners {
        FeedState::Loaded(winners) => render_winners_table(&mut out, winners),
        FeedState::Failed(message) => out.push_str(&format!(
            "<p class=\"winners-error\">{}</p>",
            escape_html(message)
        )),
    }
    out.push_str("</section></main></body></html>\n");
    out
}

pub fn render_error_html(message: &str) -> String {
    let mut out = String::new();
    page_head(&mut out, "Fehler aufgetreten", false);
    out.push_str("<section class=\"error\"><h1>Fehler aufgetreten</h1>");
    out.push_str(&format!("<p>{}</p>", escape_html(message)));
    out.push_str("</section></main></body></html>\n");
    out
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::BoardTile;

    fn tile(number: usize, section: BoardSection, name: &str) -> BoardTile {
        BoardTile {
            number,
            section,
            name: name.to_string(),
            href: format!("https://{}.example", name.to_lowercase()),
            category: "Hobby".to_string(),
            start_date: "01.12.2025".to_string(),
            added_date: String::new(),
            note: String::new(),
            runs_until: None,
            visited: false,
        }
    }

    fn view(mode: DisplayMode, tiles: Vec<BoardTile>) -> BoardView {
        let favorites_count = tiles
            .iter()
            .filter(|t| t.section == BoardSection::Favorites)
            .count();
        BoardView {
            mode,
            stand_date: Some("01.12.2025".to_string()),
            favorites_count,
            normal_count: tiles.len() - favorites_count,
            valid_favorites_count: favorites_count,
            tiles,
        }
    }

    #[test]
    fn board_html_numbers_favorites_first_and_shows_footer() {
        let mut visited = tile(2, BoardSection::Normal, "Basteln");
        visited.visited = true;
        let view = view(
            DisplayMode::Normal,
            vec![tile(1, BoardSection::Favorites, "Kaffee"), visited],
        );
        let html = render_board_html(&BoardPage {
            view: &view,
            toasts: &[],
            snow_enabled: true,
            winners: None,
        });

        assert!(html.contains("<body class=\"snow\">"));
        assert!(html.contains("⭐ Favoriten (1)"));
        assert!(html.contains("data-number=\"1\""));
        assert!(html.contains("Besucht"));
        assert!(html.contains("Stand: 01.12.2025"));
        assert!(html.contains("Alle Favs öffnen (1)"));
        assert!(!html.contains("Frohe Weihnachten"));
        let favorites_at = html.find("id=\"favorites\"").unwrap();
        let doors_at = html.find("id=\"doors\"").unwrap();
        assert!(favorites_at < doors_at);
    }

    #[test]
    fn holiday_html_shows_thanks_and_winners() {
        let view = view(DisplayMode::Holiday, vec![tile(1, BoardSection::Normal, "Basteln")]);
        let winners = FeedState::Loaded(vec![WinnerEntry {
            mydealz_name: "dealfuchs".to_string(),
            profile_link: "https://www.mydealz.de/profile/dealfuchs".to_string(),
            calendar_name: "Basteln".to_string(),
            prize_won: "Gutschein".to_string(),
            raw_value: "20".to_string(),
            formatted_value: "20,00 €".to_string(),
            proof_link: String::new(),
        }]);
        let html = render_board_html(&BoardPage {
            view: &view,
            toasts: &[],
            snow_enabled: false,
            winners: Some(&winners),
        });

        assert!(html.contains("Frohe Weihnachten"));
        assert!(html.contains("Diese Kalender laufen noch (1)"));
        assert!(html.contains("https://www.mydealz.de/profile/dealfuchs"));
        assert!(html.contains("20,00 €"));
        assert!(!html.contains("Alle Favs öffnen"));
    }

    #[test]
    fn names_are_escaped() {
        let view = view(
            DisplayMode::Normal,
            vec![tile(1, BoardSection::Normal, "<script>\"x\"</script>")],
        );
        let html = render_board_html(&BoardPage {
            view: &view,
            toasts: &[],
            snow_enabled: false,
            winners: None,
        });
        assert!(html.contains("&lt;script&gt;&quot;x&quot;&lt;/script&gt;"));
        assert!(!html.contains("<script>\"x\""));
    }

    #[test]
    fn access_errors_map_to_forbidden() {
        let response = ApiError::from(AccessDenied::MissingReferer).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = ApiError::from(SheetError::MissingApiKey).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
