use std::sync::Arc;

use chrono::Utc;

use advent::{
    advent_router, init_logging, log_app_bind, log_app_start, log_config_invalid,
    log_session_restored,
    log_source_selected, logging_config_from_env, AdventAppState, AppConfig, FeedSource,
    GoogleSheetsSource, InMemoryFeedSource, InteractionStore, Session, SqliteKeyValueStore,
    WebConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env();
    init_logging(&logging_cfg)?;

    let cfg = AppConfig::from_env().inspect_err(log_config_invalid)?;
    log_app_start(&logging_cfg, &cfg);
    let source = source_from_config(&cfg);

    let store = SqliteKeyValueStore::open(&cfg.state_path)?;
    let interaction = InteractionStore::load(Box::new(store), cfg.today(Utc::now()))?;
    log_session_restored(
        &cfg.state_path,
        interaction.favorites().len(),
        interaction.snow_enabled(),
    );

    let state = AdventAppState::new(source, Session::new(interaction), WebConfig::from(&cfg));
    let app = advent_router(state);
    let listener = tokio::net::TcpListener::bind(cfg.addr).await?;
    let bound_addr = listener.local_addr()?;

    log_app_bind(bound_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn source_from_config(cfg: &AppConfig) -> Arc<dyn FeedSource> {
    if cfg.use_demo {
        log_source_selected("demo", Some("ADVENT_USE_DEMO"));
        return Arc::new(InMemoryFeedSource::demo());
    }
    if cfg.sheets.api_key.is_none() {
        log_source_selected("google_sheets", Some("GOOGLE_API_KEY missing"));
    } else {
        log_source_selected("google_sheets", None);
    }
    Arc::new(GoogleSheetsSource::new(cfg.sheets.clone()))
}
