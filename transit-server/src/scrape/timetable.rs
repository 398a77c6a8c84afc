//! Timetable extraction from a line's detail page.
//!
//! A detail page holds one timetable table per service-day category.
//! Header cells name the stations; each body row is one departure wave,
//! with the cell in column `i` giving the time at station `i`.

use std::sync::LazyLock;

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::domain::{StationDeparture, parse_departure, table_index_for};

use super::catalog::element_text;

/// Timetable tables, in service-day order.
pub const TIMETABLE_SELECTOR: &str = "table.tztable";

static TABLES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(TIMETABLE_SELECTOR).expect("static selector is valid"));
static HEADERS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th").expect("static selector is valid"));
static BODY_ROWS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tbody tr").expect("static selector is valid"));
static CELLS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("static selector is valid"));

/// Extract the departures that apply on `service_day`.
///
/// Returns an empty schedule if the page has no table for that day.
pub fn extract_timetable(document: &Html, service_day: NaiveDate) -> Vec<StationDeparture> {
    let index = table_index_for(service_day);

    match document.select(&TABLES).nth(index) {
        Some(table) => extract_table(table, service_day),
        None => {
            debug!(index, "No timetable for this service day");
            Vec::new()
        }
    }
}

/// Extract one timetable table, preserving row and column order.
///
/// Blank cells (no service at that stop) are skipped silently; cells that
/// don't start with an `HH:MM` time are skipped with a warning.
pub fn extract_table(table: ElementRef<'_>, service_day: NaiveDate) -> Vec<StationDeparture> {
    let mut stations: Vec<StationDeparture> = table
        .select(&HEADERS)
        .map(|th| StationDeparture::new(element_text(th)))
        .collect();

    for (row, tr) in table.select(&BODY_ROWS).enumerate() {
        for (column, td) in tr.select(&CELLS).enumerate() {
            let Some(station) = stations.get_mut(column) else {
                warn!(row, column, "Ignoring cells beyond the last station column");
                break;
            };

            let text = element_text(td);
            if text.is_empty() {
                continue;
            }

            match parse_departure(&text, service_day) {
                Ok(departure) => station.departures.push(departure),
                Err(e) => warn!(
                    row,
                    station = %station.station,
                    error = %e,
                    "Skipping malformed departure"
                ),
            }
        }
    }

    stations
}
