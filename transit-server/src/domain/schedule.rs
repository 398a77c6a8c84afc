//! Timetable and catalog types.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use super::line::{LineId, LineType};

/// Departures from one station on the current service day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationDeparture {
    /// Station display name, trimmed.
    pub station: String,

    /// Departure times in timetable order (not re-sorted).
    pub departures: Vec<NaiveDateTime>,
}

impl StationDeparture {
    pub fn new(station: impl Into<String>) -> Self {
        Self {
            station: station.into(),
            departures: Vec::new(),
        }
    }
}

/// A line as advertised on its listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRecord {
    /// Absolute URL of the line's detail page.
    pub url: String,

    #[serde(rename = "type")]
    pub line_type: LineType,

    /// Only present when the schedule has been joined in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stations: Option<Vec<StationDeparture>>,
}

impl LineRecord {
    pub fn new(url: impl Into<String>, line_type: LineType) -> Self {
        Self {
            url: url.into(),
            line_type,
            stations: None,
        }
    }

    /// Attach a schedule to this record.
    pub fn with_stations(mut self, stations: Vec<StationDeparture>) -> Self {
        self.stations = Some(stations);
        self
    }
}

/// Line identifier → record. Keys are unique.
pub type Catalog = BTreeMap<LineId, LineRecord>;

/// Line identifier → per-station departures.
pub type Schedules = BTreeMap<LineId, Vec<StationDeparture>>;

/// Index of the timetable table that applies on `weekday`.
///
/// Detail pages list one table per service-day category:
/// weekdays first, then Saturday, then Sunday.
pub fn table_index(weekday: Weekday) -> usize {
    match weekday {
        Weekday::Sat => 1,
        Weekday::Sun => 2,
        _ => 0,
    }
}

/// Index of the timetable table for a calendar date.
pub fn table_index_for(date: NaiveDate) -> usize {
    table_index(date.weekday())
}

/// A timetable cell that does not start with a valid `HH:MM` time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid departure time {text:?}: {reason}")]
pub struct DepartureParseError {
    pub text: String,
    reason: &'static str,
}

/// Last hour a timetable may name: service days run past midnight as `24:xx`..`47:xx`.
const MAX_SERVICE_HOUR: u32 = 47;

/// Parse a timetable cell into a departure on `service_day`.
///
/// Only the first five characters are read, as `HH:MM`; trailing
/// annotations (footnote markers and the like) are ignored. Hours of 24
/// and above roll over into the following calendar day.
pub fn parse_departure(
    cell: &str,
    service_day: NaiveDate,
) -> Result<NaiveDateTime, DepartureParseError> {
    let trimmed = cell.trim();
    let error = |reason| DepartureParseError {
        text: trimmed.to_string(),
        reason,
    };

    let head: String = trimmed.chars().take(5).collect();
    let (hours, minutes) = head.split_once(':').ok_or_else(|| error("missing ':'"))?;

    if hours.is_empty()
        || minutes.is_empty()
        || !hours.bytes().all(|b| b.is_ascii_digit())
        || !minutes.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(error("hour and minute must be numeric"));
    }

    let hours: u32 = hours.parse().map_err(|_| error("hour out of range"))?;
    let minutes: u32 = minutes.parse().map_err(|_| error("minute out of range"))?;

    if hours > MAX_SERVICE_HOUR {
        return Err(error("hour out of range"));
    }
    if minutes > 59 {
        return Err(error("minute out of range"));
    }

    Ok(service_day.and_time(NaiveTime::MIN)
        + Duration::hours(i64::from(hours))
        + Duration::minutes(i64::from(minutes)))
}
