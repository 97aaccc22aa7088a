use chrono::Utc;
use serde_json::{json, Value};
use sitmon_model::{Category, Item};

use crate::builder::{build_item, NewItem};
use crate::location::Location;

/// A small offline IATA -> (lat, lon) table covering the airports the FAA OIS feed
/// reports delays for most often. Airports outside this table fall back to `U_unknown`
/// rather than reaching out to an online geocoder (spec.md Non-goals).
const AIRPORT_COORDS: &[(&str, f64, f64)] = &[
    ("ATL", 33.6407, -84.4277),
    ("ORD", 41.9742, -87.9073),
    ("DFW", 32.8998, -97.0403),
    ("DEN", 39.8561, -104.6737),
    ("JFK", 40.6413, -73.7781),
    ("LAX", 33.9416, -118.4085),
    ("SFO", 37.6213, -122.3790),
    ("EWR", 40.6895, -74.1745),
    ("LGA", 40.7769, -73.8740),
    ("PHL", 39.8744, -75.2424),
    ("IAH", 29.9902, -95.3368),
    ("MCO", 28.4312, -81.3081),
    ("SEA", 47.4502, -122.3088),
    ("MIA", 25.7959, -80.2870),
    ("BOS", 42.3656, -71.0096),
];

fn airport_coords(iata: &str) -> Option<(f64, f64)> {
    AIRPORT_COORDS
        .iter()
        .find(|(code, _, _)| code.eq_ignore_ascii_case(iata))
        .map(|(_, lat, lon)| (*lat, *lon))
}

/// Classifies the free-text delay `reason`/`type` fields into the closed kind set the
/// Clusterer's aviation severity formula switches on.
fn classify_kind(reason: &str, kind_field: &str) -> &'static str {
    let haystack = format!("{reason} {kind_field}").to_lowercase();
    if haystack.contains("closure") || haystack.contains("closed") {
        "closure"
    } else if haystack.contains("ground stop") {
        "ground_stop"
    } else if haystack.contains("ground delay") || haystack.contains("gdp") {
        "gdp"
    } else {
        "delay"
    }
}

/// FAA OIS airport-status record, flattened by `parsers::parse_faa_airport_status` into a
/// plain `Json` object (`iata`, `reason`, `avg_delay`, `type`, `update_time`, ...).
pub fn normalize_faa_airport_disruption(source_id: &str, record: &Value) -> Item {
    let iata = record.get("iata").and_then(Value::as_str).unwrap_or("").trim().to_uppercase();
    let name = record.get("name").and_then(Value::as_str).unwrap_or("");
    let reason = record.get("reason").and_then(Value::as_str).unwrap_or("");
    let kind_field = record.get("type").and_then(Value::as_str).unwrap_or("");
    let kind = classify_kind(reason, kind_field);
    let avg_delay_min: Option<f64> = record
        .get("avg_delay")
        .and_then(Value::as_str)
        .and_then(|s| s.chars().filter(|c| c.is_ascii_digit()).collect::<String>().parse().ok());

    let title = if reason.is_empty() {
        format!("{name} ({iata}) disruption")
    } else {
        format!("{name} ({iata}): {reason}")
    };

    let location = match airport_coords(&iata) {
        Some((lat, lon)) => Location::exact(None, lat, lon, Some(name.to_string()), "FAA OIS airport code lookup"),
        None => Location::unknown("airport code not in offline table"),
    };

    let published_at = record
        .get("update_time")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true));

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "xml_api".to_string(),
        external_id: Some(format!("{iata}:{kind}:{published_at}")),
        url: format!("faa-ois:{iata}:{published_at}"),
        title,
        summary: reason.to_string(),
        content: None,
        published_at,
        updated_at: None,
        category: Category::AviationDisruption,
        tags: vec!["faa".to_string(), "aviation_disruption".to_string(), format!("kind:{kind}")],
        location,
        raw: json!({
            "kind": kind,
            "avg_delay_min": avg_delay_min,
            "trend": record.get("trend"),
            "program": record.get("program"),
        }),
    };
    build_item(new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_ground_stop_from_free_text() {
        let record = json!({
            "name": "Chicago O'Hare",
            "iata": "ord",
            "reason": "Ground Stop due to weather",
            "avg_delay": "45 minutes",
            "update_time": "2024-01-01T00:00:00Z",
        });
        let item = normalize_faa_airport_disruption("faa-ois", &record);
        assert!(item.tags.contains(&"kind:ground_stop".to_string()));
        assert_eq!(item.lat, Some(41.9742));
    }
}
