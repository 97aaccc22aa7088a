use serde_json::{json, Value};
use sitmon_model::{Category, Item};
use sitmon_parsers::FeedEntry;

use crate::builder::{build_item, NewItem};
use crate::location::Location;
use crate::text::canonicalize_url;

/// Smartraveller per-level-advisory RSS feed. Title pattern is `"Country - headline"`.
pub fn normalize_smartraveller_rss(source_id: &str, record: &FeedEntry, level_tag: &str) -> Item {
    let title = record.title.clone().unwrap_or_default();
    let url = canonicalize_url(record.link.as_deref().unwrap_or(""));
    let external_id = record.id.clone().unwrap_or_else(|| url.clone());
    let country = title.split_once(" - ").map(|(head, _)| head.trim().to_string()).filter(|c| !c.is_empty());

    let location = match &country {
        Some(c) => Location::country(c.clone(), None, "Country prefix in Smartraveller title"),
        None => Location::unknown("no country prefix found"),
    };

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "rss".to_string(),
        external_id: Some(external_id),
        url,
        title,
        summary: record.summary.clone().unwrap_or_default(),
        content: None,
        published_at: record.published.clone().unwrap_or_default(),
        updated_at: record.updated.clone(),
        category: Category::TravelAdvisory,
        tags: vec!["smartraveller".to_string(), "travel_advisory".to_string(), format!("level:{level_tag}")],
        location,
        raw: json!({"level": level_tag}),
    };
    build_item(new)
}

/// Smartraveller's daily JSON destinations export: `{"destinations": [...]}`.
pub fn normalize_smartraveller_export(source_id: &str, record: &Value) -> Item {
    let country = record.get("name").and_then(Value::as_str).unwrap_or("").to_string();
    let level = record.get("advice_level").and_then(Value::as_str).unwrap_or("");
    let summary = record.get("summary").and_then(Value::as_str).unwrap_or("").to_string();
    let lat = record.get("latitude").and_then(Value::as_f64);
    let lon = record.get("longitude").and_then(Value::as_f64);

    let location = match (lat, lon) {
        (Some(lat), Some(lon)) => Location::exact(None, lat, lon, Some(country.clone()), "Smartraveller export coordinates"),
        _ => Location::country(country.clone(), None, "Smartraveller export country field"),
    };

    let external_id = record
        .get("iso_code")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| country.clone());

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "json_api".to_string(),
        external_id: Some(external_id.clone()),
        url: format!("smartraveller-export:{external_id}"),
        title: format!("{country} travel advice: {level}"),
        summary,
        content: None,
        published_at: record
            .get("last_updated")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        updated_at: None,
        category: Category::TravelAdvisory,
        tags: vec!["smartraveller".to_string(), "travel_advisory".to_string(), format!("level:{level}")],
        location,
        raw: json!({"advice_level": level}),
    };
    build_item(new)
}

/// GOV.UK Content API travel-advice page. Country sourced from `details.country.name`.
pub fn normalize_govuk_travel_advice(source_id: &str, record: &Value) -> Item {
    let title = record.get("title").and_then(Value::as_str).unwrap_or("").to_string();
    let base_path = record.get("base_path").and_then(Value::as_str).unwrap_or("");
    let url = canonicalize_url(&format!("https://www.gov.uk{base_path}"));
    let country = record
        .get("details")
        .and_then(|d| d.get("country"))
        .and_then(|c| c.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let summary = record
        .get("details")
        .and_then(|d| d.get("summary"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let location = match &country {
        Some(c) => Location::country(c.clone(), None, "details.country.name"),
        None => Location::unknown("no details.country.name"),
    };

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "json_api".to_string(),
        external_id: Some(base_path.to_string()),
        url,
        title,
        summary,
        content: None,
        published_at: record
            .get("public_updated_at")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        updated_at: None,
        category: Category::TravelAdvisory,
        tags: vec!["govuk".to_string(), "travel_advisory".to_string()],
        location,
        raw: json!({"base_path": base_path}),
    };
    build_item(new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smartraveller_export_prefers_coordinates_over_country_name() {
        let record = json!({
            "name": "Fiji",
            "iso_code": "FJ",
            "advice_level": "Exercise normal safety precautions",
            "latitude": -17.7,
            "longitude": 178.0,
            "last_updated": "2024-01-01T00:00:00Z",
        });
        let item = normalize_smartraveller_export("smartraveller-export", &record);
        assert_eq!(item.location_confidence, sitmon_model::LocationConfidence::AExact);
    }

    #[test]
    fn govuk_travel_advice_reads_nested_country_name() {
        let record = json!({
            "title": "France travel advice",
            "base_path": "/foreign-travel-advice/france",
            "public_updated_at": "2024-01-01T00:00:00Z",
            "details": {"country": {"name": "France"}, "summary": "Still current."},
        });
        let item = normalize_govuk_travel_advice("govuk-travel-advice", &record);
        assert_eq!(item.location_name.as_deref(), Some("France"));
        assert_eq!(item.location_confidence, sitmon_model::LocationConfidence::CCountry);
    }
}
