//! Domain types for the transit timetable service.
//!
//! Identifiers and line types are validated at construction; timetable
//! types carry already-parsed departure times.

mod line;
mod schedule;

pub use line::{InvalidLineId, InvalidLineType, LineId, LineType};
pub use schedule::{
    Catalog, DepartureParseError, LineRecord, Schedules, StationDeparture, parse_departure,
    table_index, table_index_for,
};
