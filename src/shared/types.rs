use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

use crate::utils::format::parse_observed_at;

/// One city's entry in a snapshot's ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityMetric {
    #[serde(rename = "city", alias = "cityName")]
    pub city: String,
    #[serde(
        rename = "activeRides",
        alias = "activeRidesCount",
        default,
        deserialize_with = "null_as_default"
    )]
    pub active_rides: u64,
}

/// A point-in-time metrics reading. A new snapshot always replaces the
/// previous one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotWire")]
pub struct MetricsSnapshot {
    #[serde(rename = "activeRides")]
    pub active_rides: u64,
    #[serde(rename = "averageDuration")]
    pub average_duration_minutes: f64,
    #[serde(rename = "topCities")]
    pub top_cities: Vec<CityMetric>,
    #[serde(rename = "timestamp")]
    pub observed_at: String,
}

#[derive(Deserialize)]
struct SnapshotWire {
    #[serde(
        rename = "activeRides",
        alias = "activeRidesCount",
        default,
        deserialize_with = "null_as_default"
    )]
    active_rides: u64,
    #[serde(
        rename = "averageDuration",
        alias = "averageDurationMinutes",
        default,
        deserialize_with = "null_as_default"
    )]
    average_duration: f64,
    #[serde(rename = "topCities", default, deserialize_with = "null_as_default")]
    top_cities: Vec<CityMetric>,
    #[serde(rename = "timestamp", alias = "observedAt")]
    timestamp: String,
}

impl TryFrom<SnapshotWire> for MetricsSnapshot {
    type Error = String;

    fn try_from(wire: SnapshotWire) -> Result<Self, Self::Error> {
        if parse_observed_at(&wire.timestamp).is_none() {
            return Err(format!("timestamp is not a date-time: {:?}", wire.timestamp));
        }
        if !wire.average_duration.is_finite() || wire.average_duration < 0.0 {
            return Err(format!(
                "averageDuration must be a non-negative number, got {}",
                wire.average_duration
            ));
        }
        let mut seen = HashSet::new();
        for c in &wire.top_cities {
            if !seen.insert(c.city.as_str()) {
                return Err(format!("duplicate city in topCities: {}", c.city));
            }
        }
        Ok(MetricsSnapshot {
            active_rides: wire.active_rides,
            average_duration_minutes: wire.average_duration,
            top_cities: wire.top_cities,
            observed_at: wire.timestamp,
        })
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// State of the push channel. Starts out `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

/// One sample of the active-rides time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidePoint {
    pub observed_at: String, // as received
    pub active_rides: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_upstream_field_names() {
        let json = r#"{
            "activeRides": 42,
            "averageDuration": 7.5,
            "topCities": [{"city": "NYC", "activeRides": 10}, {"city": "SF", "activeRides": 8}],
            "timestamp": "2024-01-01T00:00:00"
        }"#;
        let s: MetricsSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(s.active_rides, 42);
        assert_eq!(s.average_duration_minutes, 7.5);
        assert_eq!(s.top_cities.len(), 2);
        assert_eq!(s.top_cities[0].city, "NYC");
        assert_eq!(s.top_cities[1].active_rides, 8);
        assert_eq!(s.observed_at, "2024-01-01T00:00:00");
    }

    #[test]
    fn accepts_descriptive_aliases() {
        let json = r#"{
            "activeRidesCount": 42,
            "averageDurationMinutes": 7.5,
            "topCities": [{"cityName": "NYC", "activeRidesCount": 10}],
            "observedAt": "2024-01-01T00:00:00Z"
        }"#;
        let s: MetricsSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(s.active_rides, 42);
        assert_eq!(s.top_cities[0].city, "NYC");
        assert_eq!(s.top_cities[0].active_rides, 10);
        assert_eq!(s.observed_at, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn nulls_and_missing_fields_fall_back_to_defaults() {
        let json = r#"{"activeRides": null, "averageDuration": 0.0, "topCities": null,
                       "timestamp": "2024-01-01T00:00:00"}"#;
        let s: MetricsSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(s.active_rides, 0);
        assert!(s.top_cities.is_empty());

        let city: CityMetric = serde_json::from_str(r#"{"city": "Rome", "activeRides": null}"#).unwrap();
        assert_eq!(city.active_rides, 0);
    }

    #[test]
    fn rejects_negative_counts_and_durations() {
        let at = r#""timestamp": "2024-01-01T00:00:00Z""#;
        let negative_count = format!(r#"{{"activeRides": -1, {at}}}"#);
        let negative_duration = format!(r#"{{"averageDuration": -0.5, {at}}}"#);
        assert!(serde_json::from_str::<MetricsSnapshot>(&negative_count).is_err());
        assert!(serde_json::from_str::<MetricsSnapshot>(&negative_duration).is_err());
    }

    #[test]
    fn rejects_duplicate_cities() {
        let json = r#"{"topCities": [{"city": "NYC", "activeRides": 1}, {"city": "NYC", "activeRides": 2}],
                       "timestamp": "2024-01-01T00:00:00Z"}"#;
        let err = serde_json::from_str::<MetricsSnapshot>(json).unwrap_err();
        assert!(err.to_string().contains("duplicate city"));
    }

    #[test]
    fn objects_without_a_timestamp_are_not_snapshots() {
        for json in ["{}", "[]", r#"{"error": "x"}"#, r#"{"status": "error"}"#, r#"{"activeRides": 3}"#] {
            assert!(serde_json::from_str::<MetricsSnapshot>(json).is_err(), "{json}");
        }
    }

    #[test]
    fn timestamp_must_parse() {
        for ts in [r#""""#, r#""yesterday""#, "null", "17"] {
            let json = format!(r#"{{"activeRides": 1, "timestamp": {ts}}}"#);
            assert!(serde_json::from_str::<MetricsSnapshot>(&json).is_err(), "{json}");
        }
        let ok = r#"{"activeRides": 1, "timestamp": "2024-01-01T00:00:00.250"}"#;
        assert!(serde_json::from_str::<MetricsSnapshot>(ok).is_ok());
    }

    #[test]
    fn serializes_with_upstream_names() {
        let s = MetricsSnapshot {
            active_rides: 3,
            average_duration_minutes: 1.25,
            top_cities: vec![],
            observed_at: "2024-01-01T00:00:00Z".into(),
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["activeRides"], 3);
        assert_eq!(v["averageDuration"], 1.25);
        assert_eq!(v["timestamp"], "2024-01-01T00:00:00Z");
        let back: MetricsSnapshot = serde_json::from_value(v).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn connection_state_starts_connecting() {
        assert_eq!(ConnectionState::default(), ConnectionState::Connecting);
    }
}
