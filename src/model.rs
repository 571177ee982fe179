/// Shared data types for the climate service.
///
/// The records mirror the two tables of the climate dataset, projected down
/// to the columns the routes read. Nullable columns are `Option` so a single
/// missing value surfaces as JSON `null` instead of failing the query.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Stored records
// ---------------------------------------------------------------------------

/// One value from the measurement table keyed by its ISO date: either
/// precipitation or temperature, depending on the query that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyObservation {
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
    /// Precipitation in inches or temperature in degrees Fahrenheit.
    pub value: Option<f64>,
}

/// A weather-recording location.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    /// Unique station code, e.g. "USC00519397".
    pub station: String,
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Min/avg/max temperature over a filtered set of measurements.
///
/// All three fields are `None` when no measurement matched, which serializes
/// as `{"Tmin": null, "Tavg": null, "Tmax": null}`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TemperatureStats {
    #[serde(rename = "Tmin")]
    pub min: Option<f64>,
    #[serde(rename = "Tavg")]
    pub avg: Option<f64>,
    #[serde(rename = "Tmax")]
    pub max: Option<f64>,
}

/// Flattens stations into the interleaved `[id, name, id, name, ...]` list
/// served by `/api/v1.0/stations`.
pub fn interleave_stations(stations: &[Station]) -> Vec<Option<String>> {
    stations
        .iter()
        .flat_map(|s| [Some(s.station.clone()), s.name.clone()])
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats_serialize_as_nulls() {
        let json = serde_json::to_value(TemperatureStats::default()).unwrap();
        assert_eq!(json, serde_json::json!({"Tmin": null, "Tavg": null, "Tmax": null}));
    }

    #[test]
    fn test_stats_field_names() {
        let stats = TemperatureStats { min: Some(56.0), avg: Some(68.5), max: Some(81.0) };
        let json = serde_json::to_value(stats).unwrap();

        assert_eq!(json["Tmin"], 56.0);
        assert_eq!(json["Tavg"], 68.5);
        assert_eq!(json["Tmax"], 81.0);
    }

    #[test]
    fn test_interleave_stations_alternates_id_and_name() {
        let stations = vec![
            Station { station: "USC00519397".to_string(), name: Some("WAIKIKI 717.2, HI US".to_string()) },
            Station { station: "USC00513117".to_string(), name: Some("KANEOHE 838.1, HI US".to_string()) },
        ];

        let json = serde_json::to_value(interleave_stations(&stations)).unwrap();
        assert_eq!(
            json,
            serde_json::json!(["USC00519397", "WAIKIKI 717.2, HI US", "USC00513117", "KANEOHE 838.1, HI US"])
        );
    }

    #[test]
    fn test_interleave_keeps_null_name_in_place() {
        let stations = vec![Station { station: "USC00511918".to_string(), name: None }];

        let json = serde_json::to_value(interleave_stations(&stations)).unwrap();
        assert_eq!(json, serde_json::json!(["USC00511918", null]));
    }

    #[test]
    fn test_interleave_no_stations() {
        assert!(interleave_stations(&[]).is_empty());
    }
}
