use serde_json::{json, Value};
use sitmon_model::{Category, Item};
use sitmon_parsers::XmlItem;

use crate::builder::{build_item, NewItem};
use crate::helpers::truncate_300;
use crate::location::Location;
use crate::text::canonicalize_url;

/// USGS HANS (Hazard Alert Notification Service) elevated-volcano list entry, one per
/// currently-elevated US volcano: `{"volcano","lat","lon","alert_level",
/// "aviation_color_code","observatory","updated"}`. Carries both alert scales through
/// unchanged; the clusterer's severity formula picks between them per category.
pub fn normalize_hans_elevated_notice(source_id: &str, record: &Value) -> Option<Item> {
    let volcano = record.get("volcano").and_then(Value::as_str)?.to_string();
    let lat = record.get("lat").and_then(Value::as_f64)?;
    let lon = record.get("lon").and_then(Value::as_f64)?;
    let alert_level = record.get("alert_level").and_then(Value::as_str).unwrap_or("");
    let color_code = record.get("aviation_color_code").and_then(Value::as_str).unwrap_or("");
    let observatory = record.get("observatory").and_then(Value::as_str).unwrap_or("");
    let updated = record.get("updated").and_then(Value::as_str).unwrap_or("").to_string();

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "json_api".to_string(),
        external_id: Some(format!("hans:{volcano}")),
        url: format!("usgs-hans:{volcano}"),
        title: format!("{volcano}: alert level {alert_level}, aviation color {color_code}"),
        summary: format!("Observatory: {observatory}"),
        content: None,
        published_at: updated.clone(),
        updated_at: Some(updated),
        category: Category::Volcano,
        tags: vec![
            "usgs-hans".to_string(),
            format!("alert_level:{alert_level}"),
            format!("color_code:{color_code}"),
        ],
        location: Location::exact(None, lat, lon, Some(volcano), "USGS HANS volcano coordinates"),
        raw: json!({"observatory": observatory, "alert_level": alert_level, "aviation_color_code": color_code}),
    };
    Some(build_item(new))
}

/// Per-volcano RSS item, the feed plugin the scheduler expands for each HANS entry
/// whose observatory publishes an individual volcano RSS feed.
pub fn normalize_hans_volcano_rss_item(source_id: &str, volcano_name: &str, record: &XmlItem) -> Item {
    let title = record.title.clone().unwrap_or_default();
    let description = record.description.clone().unwrap_or_default();
    let link = record.link.clone().unwrap_or_default();
    let external_id = record.guid.clone().unwrap_or_else(|| link.clone());

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "xml_api".to_string(),
        external_id: Some(external_id),
        url: canonicalize_url(&link),
        title,
        summary: truncate_300(description.trim()),
        content: None,
        published_at: record.published.clone().unwrap_or_default(),
        updated_at: None,
        category: Category::Volcano,
        tags: vec!["usgs-hans".to_string(), "volcano_rss".to_string()],
        location: Location::unknown("per-volcano RSS carries no coordinates, matched by name downstream"),
        raw: json!({"volcano": volcano_name}),
    };
    build_item(new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevated_notice_carries_both_alert_scales() {
        let record = json!({
            "volcano": "Mount Spurr",
            "lat": 61.3,
            "lon": -152.25,
            "alert_level": "Watch",
            "aviation_color_code": "Orange",
            "observatory": "Alaska Volcano Observatory",
            "updated": "2024-01-01T00:00:00Z",
        });
        let item = normalize_hans_elevated_notice("usgs-hans", &record).unwrap();
        assert!(item.tags.contains(&"alert_level:Watch".to_string()));
        assert!(item.tags.contains(&"color_code:Orange".to_string()));
        assert_eq!(item.lat, Some(61.3));
    }

    #[test]
    fn missing_coordinates_yields_none() {
        let record = json!({"volcano": "Unknown Peak", "alert_level": "Normal"});
        assert!(normalize_hans_elevated_notice("usgs-hans", &record).is_none());
    }
}
