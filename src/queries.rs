/// The fixed read-only queries behind the API routes.
///
/// Each function runs exactly one statement against the climate dataset and
/// shapes the rows into the mapping the endpoint serializes. Dates are stored
/// as `YYYY-MM-DD` text, so range filters compare strings.

use crate::db::StoreError;
use crate::model::{DailyObservation, Station, TemperatureStats};
use chrono::NaiveDate;
use rusqlite::{Connection, Row, params};
use std::collections::BTreeMap;
use thiserror::Error;

/// First day of the fixed temperature-observation window (inclusive).
pub const TOBS_WINDOW_START: &str = "2016-08-23";
/// Last day of the fixed temperature-observation window (inclusive).
pub const TOBS_WINDOW_END: &str = "2017-08-23";

/// Format accepted for `start`/`end` path segments.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum QueryError {
    /// Not shaped like `YYYY-MM-DD` at all.
    #[error("time data {0:?} does not match format '%Y-%m-%d'")]
    MalformedDate(String),

    /// Shaped right but not a calendar date, e.g. `2017-02-30`.
    #[error("time data {value:?} does not match format '%Y-%m-%d'")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<rusqlite::Error> for QueryError {
    fn from(e: rusqlite::Error) -> Self {
        QueryError::Store(StoreError::Query(e))
    }
}

/// Four-digit year, then one- or two-digit month and day, ASCII digits
/// only. chrono alone would also take short or signed years and leading
/// whitespace.
fn has_iso_shape(value: &str) -> bool {
    let parts: Vec<&str> = value.split('-').collect();
    let digits = |s: &str, min: usize, max: usize| {
        (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
    };

    match parts.as_slice() {
        [year, month, day] => digits(*year, 4, 4) && digits(*month, 1, 2) && digits(*day, 1, 2),
        _ => false,
    }
}

/// Parses a `YYYY-MM-DD` path segment.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate, QueryError> {
    if !has_iso_shape(value) {
        return Err(QueryError::MalformedDate(value.to_string()));
    }

    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| QueryError::InvalidDate {
        value: value.to_string(),
        source,
    })
}

fn observation_from_row(row: &Row<'_>) -> rusqlite::Result<DailyObservation> {
    Ok(DailyObservation {
        date: row.get(0)?,
        value: row.get(1)?,
    })
}

fn stats_from_row(row: &Row<'_>) -> rusqlite::Result<TemperatureStats> {
    Ok(TemperatureStats {
        min: row.get(0)?,
        avg: row.get(1)?,
        max: row.get(2)?,
    })
}

// ---------------------------------------------------------------------------
// Record queries
// ---------------------------------------------------------------------------

/// `(date, prcp)` for every measurement, in storage order.
pub fn precipitation_rows(conn: &Connection) -> Result<Vec<DailyObservation>, QueryError> {
    let mut stmt = conn.prepare(
        "SELECT date, prcp
         FROM measurement
         ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], observation_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// `(date, tobs)` with `start <= date <= end`, in storage order.
pub fn temperature_rows_between(
    conn: &Connection,
    start: &str,
    end: &str,
) -> Result<Vec<DailyObservation>, QueryError> {
    let mut stmt = conn.prepare(
        "SELECT date, tobs
         FROM measurement
         WHERE date BETWEEN ?1 AND ?2
         ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![start, end], observation_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// One row per distinct station code.
pub fn distinct_stations(conn: &Connection) -> Result<Vec<Station>, QueryError> {
    let mut stmt = conn.prepare(
        "SELECT station, name
         FROM station
         GROUP BY station
         ORDER BY station",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Station {
            station: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

// ---------------------------------------------------------------------------
// Route shapes
// ---------------------------------------------------------------------------

/// Later rows overwrite earlier ones: one value per date, the last seen.
fn last_value_per_date(rows: Vec<DailyObservation>) -> BTreeMap<String, Option<f64>> {
    let mut by_date = BTreeMap::new();
    for row in rows {
        by_date.insert(row.date, row.value);
    }
    by_date
}

/// `date -> prcp` over every measurement.
///
/// Several stations report on the same date, so most dates appear many
/// times; only the last value seen for a date is kept.
pub fn precipitation_by_date(conn: &Connection) -> Result<BTreeMap<String, Option<f64>>, QueryError> {
    Ok(last_value_per_date(precipitation_rows(conn)?))
}

/// `date -> tobs` inside the fixed window, last row per date wins.
pub fn tobs_by_date(conn: &Connection) -> Result<BTreeMap<String, Option<f64>>, QueryError> {
    Ok(last_value_per_date(temperature_rows_between(
        conn,
        TOBS_WINDOW_START,
        TOBS_WINDOW_END,
    )?))
}

/// Min/avg/max temperature for `date >= start`, or `start <= date <= end`
/// when `end` is given.
///
/// Both bounds are validated before anything touches the database. An empty
/// match is not an error: SQL aggregates over no rows are NULL.
pub fn temperature_stats(
    conn: &Connection,
    start: &str,
    end: Option<&str>,
) -> Result<TemperatureStats, QueryError> {
    let start = parse_iso_date(start)?.format(DATE_FORMAT).to_string();
    let end = end
        .map(|e| parse_iso_date(e).map(|d| d.format(DATE_FORMAT).to_string()))
        .transpose()?;

    let stats = match end {
        Some(end) => conn.query_row(
            "SELECT MIN(tobs), AVG(tobs), MAX(tobs)
             FROM measurement
             WHERE date BETWEEN ?1 AND ?2",
            params![start, end],
            stats_from_row,
        )?,
        None => conn.query_row(
            "SELECT MIN(tobs), AVG(tobs), MAX(tobs)
             FROM measurement
             WHERE date >= ?1",
            params![start],
            stats_from_row,
        )?,
    };

    Ok(stats)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
