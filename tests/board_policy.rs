use std::collections::BTreeSet;

use advent::{
    build_board, decode_calendar_rows, BoardSection, DisplayMode, HolidayConfig, SheetCell,
    SheetRow,
};
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn sheet() -> Vec<SheetRow> {
    vec![
        SheetRow::from_texts(&["Name", "Link", "Start", "Status", "Neu", "Notiz", "Kat", "Bis"]),
        SheetRow::from_texts(&["Stand", "03.12.2025 18:00"]),
        SheetRow::from_texts(&["Zoo", "zoo.example", "", "AKTIV", "", "", "Freizeit"]),
        SheetRow::from_texts(&["Ämter", "amt.example", "", "aktiv", "", "", "Freizeit", "02.12.2025"]),
        SheetRow::from_texts(&["Apotheke", "apo.example", "", "aktiv", "", "", "", "31.12.2025"]),
        SheetRow::new(vec![
            SheetCell::text("Bäckerei"),
            SheetCell::linked("hier klicken", "http://baecker.example/advent"),
            SheetCell::text(""),
            SheetCell::text("aktiv"),
            SheetCell::text(""),
            SheetCell::text(""),
            SheetCell::text("Essen"),
            SheetCell::text("kaputt"),
        ]),
        SheetRow::from_texts(&["Pausiert", "p.example", "", "pausiert", "", "", "Essen"]),
        SheetRow::default(),
    ]
}

#[test]
fn pipeline_filters_orders_and_numbers_from_raw_rows() {
    let entries = decode_calendar_rows(&sheet());
    let favorites = names(&["Apotheke", "Gelöscht"]);
    let visited = names(&["Zoo"]);
    let view = build_board(
        &entries,
        &favorites,
        &visited,
        date(2025, 12, 3),
        &HolidayConfig::default(),
    );

    assert_eq!(view.mode, DisplayMode::Normal);
    assert_eq!(view.stand_date.as_deref(), Some("03.12.2025 18:00"));

    let order: Vec<(usize, &str)> = view
        .tiles
        .iter()
        .map(|tile| (tile.number, tile.name.as_str()))
        .collect();
    assert_eq!(order, vec![(1, "Apotheke"), (2, "Bäckerei"), (3, "Zoo")]);

    assert_eq!(view.favorites_count, 1);
    assert_eq!(view.valid_favorites_count, 1);
    assert_eq!(view.section(BoardSection::Normal).count(), 2);

    let bakery = &view.tiles[1];
    assert_eq!(bakery.href, "http://baecker.example/advent");
    assert_eq!(bakery.runs_until.as_deref(), Some("kaputt"));
    assert!(view.tiles[2].visited);
}

#[test]
fn cutover_day_keeps_open_ended_and_later_entries_only() {
    let entries = decode_calendar_rows(&sheet());
    let view = build_board(
        &entries,
        &BTreeSet::new(),
        &BTreeSet::new(),
        date(2025, 12, 24),
        &HolidayConfig::default(),
    );

    assert_eq!(view.mode, DisplayMode::Holiday);
    let shown: Vec<&str> = view.tiles.iter().map(|tile| tile.name.as_str()).collect();
    assert_eq!(shown, vec!["Bäckerei", "Zoo", "Apotheke"]);
}

#[test]
fn custom_cutover_date_moves_holiday_mode() {
    let entries = decode_calendar_rows(&sheet());
    let cfg = HolidayConfig {
        cutover_date: date(2025, 12, 31),
    };
    let view = build_board(&entries, &BTreeSet::new(), &BTreeSet::new(), date(2025, 12, 31), &cfg);
    assert_eq!(view.mode, DisplayMode::Holiday);
    let shown: Vec<&str> = view.tiles.iter().map(|tile| tile.name.as_str()).collect();
    assert_eq!(shown, vec!["Bäckerei", "Zoo"]);

    let view = build_board(&entries, &BTreeSet::new(), &BTreeSet::new(), date(2025, 12, 24), &cfg);
    assert_eq!(view.mode, DisplayMode::Normal);
}
