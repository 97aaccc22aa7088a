use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde_json::json;
use sitmon_model::{Category, Item};

use crate::builder::{build_item, NewItem};
use crate::location::Location;

fn field<'a>(row: &'a IndexMap<String, String>, key: &str) -> Option<&'a str> {
    row.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

/// NASA FIRMS CSV hotspot row: `latitude,longitude,brightness,...,acq_date,acq_time,frp,...`.
/// `published_at` is reconstructed from `acq_date`+`acq_time` (`HHMM`, UTC).
pub fn normalize_firms_hotspot(source_id: &str, row: &IndexMap<String, String>) -> Option<Item> {
    let lat: f64 = field(row, "latitude")?.parse().ok()?;
    let lon: f64 = field(row, "longitude")?.parse().ok()?;
    let frp: Option<f64> = field(row, "frp").and_then(|v| v.parse().ok());
    let brightness: Option<f64> = field(row, "brightness").and_then(|v| v.parse().ok());

    let acq_date = field(row, "acq_date");
    let acq_time = field(row, "acq_time").unwrap_or("0000");
    let published_at = acq_date
        .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
        .and_then(|date| {
            let padded = format!("{acq_time:0>4}");
            let time = NaiveTime::parse_from_str(&padded, "%H%M").ok()?;
            Some(Utc.from_utc_datetime(&date.and_time(time)))
        })
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true));

    let title = format!("Wildfire hotspot at {lat:.3},{lon:.3}");
    let external_id = format!("{}:{}:{}", lat, lon, published_at);
    let url = format!("firms:{source_id}:{external_id}");

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "csv_api".to_string(),
        external_id: Some(external_id),
        url,
        title,
        summary: format!("FRP {:.1}, brightness {:.1}", frp.unwrap_or(0.0), brightness.unwrap_or(0.0)),
        content: None,
        published_at,
        updated_at: None,
        category: Category::Wildfire,
        tags: vec!["firms".to_string(), "wildfire".to_string()],
        location: Location::exact(None, lat, lon, None, "FIRMS hotspot coordinates"),
        raw: json!({
            "brightness": brightness,
            "frp": frp,
            "confidence": field(row, "confidence"),
            "satellite": field(row, "satellite"),
            "daynight": field(row, "daynight"),
        }),
    };
    Some(build_item(new))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconstructs_published_at_from_date_and_time() {
        let mut row = IndexMap::new();
        row.insert("latitude".to_string(), "-33.8".to_string());
        row.insert("longitude".to_string(), "151.2".to_string());
        row.insert("acq_date".to_string(), "2024-01-02".to_string());
        row.insert("acq_time".to_string(), "0915".to_string());
        row.insert("frp".to_string(), "42.5".to_string());
        let item = normalize_firms_hotspot("firms-hotspots", &row).unwrap();
        assert_eq!(item.published_at, "2024-01-02T09:15:00Z");
        assert_eq!(item.lat, Some(-33.8));
    }

    #[test]
    fn missing_coordinates_yields_none() {
        let row = IndexMap::new();
        assert!(normalize_firms_hotspot("firms-hotspots", &row).is_none());
    }
}
