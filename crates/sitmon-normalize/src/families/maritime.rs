use serde_json::{json, Value};
use sitmon_geo::extract_coords_centroid;
use sitmon_model::{Category, Item};

use crate::builder::{build_item, NewItem};
use crate::helpers::truncate_300;
use crate::location::Location;

const DISTRESS_KEYWORDS: &[&str] = &["distress", "mayday", "sinking", "adrift", "abandon"];
const HAZARD_KEYWORDS: &[&str] = &["derelict", "wreck", "mine", "obstruction", "unlit buoy"];

fn keyword_tags(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut tags = Vec::new();
    if DISTRESS_KEYWORDS.iter().any(|k| lower.contains(k)) {
        tags.push("distress".to_string());
    }
    if HAZARD_KEYWORDS.iter().any(|k| lower.contains(k)) {
        tags.push("hazard".to_string());
    }
    tags
}

/// NGA Maritime Safety Information broadcast warning: free-text navigational warning
/// with coordinates embedded in the body rather than carried as a structured field, so
/// location comes from `sitmon_geo::extract_coords_centroid` over the warning text.
pub fn normalize_msi_broadcast_warning(source_id: &str, record: &Value) -> Option<Item> {
    let reference = record.get("reference").and_then(Value::as_str)?.to_string();
    let subregion = record.get("subregion").and_then(Value::as_str).unwrap_or("");
    let text = record.get("text").and_then(Value::as_str).unwrap_or("");
    let issued = record.get("issueDate").and_then(Value::as_str).unwrap_or("").to_string();
    let cancel_date = record.get("cancelDate").and_then(Value::as_str).map(str::to_string);

    let location = match extract_coords_centroid(text) {
        Some((lat, lon)) => Location::coords_in_text(lat, lon, None, "coordinates extracted from warning text"),
        None => Location::unknown("no coordinates found in warning text"),
    };

    let mut tags = vec!["nga-msi".to_string(), "maritime_warning".to_string()];
    tags.extend(keyword_tags(text));

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "json_api".to_string(),
        external_id: Some(reference.clone()),
        url: format!("nga-msi:{reference}"),
        title: format!("MSI broadcast warning {reference} ({subregion})"),
        summary: truncate_300(text),
        content: None,
        published_at: issued,
        updated_at: cancel_date,
        category: Category::MaritimeWarning,
        tags,
        location,
        raw: json!({"reference": reference, "subregion": subregion}),
    };
    Some(build_item(new))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_coordinates_and_distress_tag_from_warning_text() {
        let record = json!({
            "reference": "123/24",
            "subregion": "16",
            "text": "Vessel in distress reported adrift at 10.5N 141.2E. Mariners exercise caution.",
            "issueDate": "2024-01-01T00:00:00Z",
        });
        let item = normalize_msi_broadcast_warning("nga-msi", &record).unwrap();
        assert!(item.tags.contains(&"distress".to_string()));
        assert!(item.lat.is_some());
    }

    #[test]
    fn missing_reference_yields_none() {
        let record = json!({"text": "no reference field here"});
        assert!(normalize_msi_broadcast_warning("nga-msi", &record).is_none());
    }
}
