use serde_json::{json, Value};
use sitmon_geo::bbox_from_geojson;
use sitmon_model::{Category, Item};

use crate::builder::{build_item, NewItem};
use crate::error::{NormalizeError, Result};
use crate::location::Location;
use crate::text::canonicalize_url;

/// NWS alerts-API GeoJSON feature. Geometry is optional — polygon-less alerts (most
/// watches/warnings issued by county/zone UGC rather than a drawn polygon) stay
/// `U_unknown`.
pub fn normalize_nws_alert(source_id: &str, feature: &Value) -> Result<Item> {
    let properties = feature.get("properties").ok_or(NormalizeError::MissingField("properties"))?;
    let geometry = feature.get("geometry").filter(|g| !g.is_null());

    let headline = properties.get("headline").and_then(Value::as_str);
    let event = properties.get("event").and_then(Value::as_str);
    let title = headline.or(event).unwrap_or("").to_string();

    let id_field = feature.get("id").and_then(Value::as_str).or_else(|| properties.get("id").and_then(Value::as_str)).unwrap_or("");
    let url = canonicalize_url(id_field);
    let external_id = if id_field.is_empty() { url.clone() } else { id_field.to_string() };

    let description = properties.get("description").and_then(Value::as_str);
    let instruction = properties.get("instruction").and_then(Value::as_str);
    let content = match (description, instruction) {
        (Some(d), Some(i)) => Some(format!("{d}\n\n{i}")),
        (Some(d), None) => Some(d.to_string()),
        (None, Some(i)) => Some(i.to_string()),
        (None, None) => None,
    };

    let published_at = properties
        .get("effective")
        .or_else(|| properties.get("onset"))
        .or_else(|| properties.get("sent"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let updated_at = properties
        .get("sent")
        .or_else(|| properties.get("effective"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let location = match geometry {
        Some(geom) => {
            let centroid = bbox_from_geojson(geom).map(|b| b.centroid());
            Location::exact(
                Some(geom.to_string()),
                centroid.map(|c| c.0).unwrap_or_default(),
                centroid.map(|c| c.1).unwrap_or_default(),
                properties.get("areaDesc").and_then(Value::as_str).map(str::to_string),
                "NWS polygon geometry",
            )
        }
        None => Location::unknown("NWS alert without geometry"),
    };

    let tags = vec![
        "nws".to_string(),
        "weather_alert".to_string(),
        format!("severity:{}", properties.get("severity").and_then(Value::as_str).unwrap_or("")),
        format!("urgency:{}", properties.get("urgency").and_then(Value::as_str).unwrap_or("")),
        format!("certainty:{}", properties.get("certainty").and_then(Value::as_str).unwrap_or("")),
    ];

    let raw = json!({
        "event": properties.get("event"),
        "severity": properties.get("severity"),
        "urgency": properties.get("urgency"),
        "certainty": properties.get("certainty"),
        "areaDesc": properties.get("areaDesc"),
        "expires": properties.get("expires"),
        "ends": properties.get("ends"),
        "headline": properties.get("headline"),
    });

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "geojson_api".to_string(),
        external_id: Some(external_id),
        url,
        title,
        summary: headline.or(event).unwrap_or("").to_string(),
        content,
        published_at,
        updated_at,
        category: Category::WeatherAlert,
        tags,
        location,
        raw,
    };
    Ok(build_item(new))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alerts_without_geometry_are_unknown_location() {
        let feature = json!({
            "id": "https://api.weather.gov/alerts/urn:1",
            "properties": {
                "headline": "Flood Warning issued",
                "event": "Flood Warning",
                "severity": "Severe",
                "urgency": "Expected",
                "certainty": "Likely",
                "effective": "2024-01-01T00:00:00+00:00",
                "areaDesc": "Example County",
            },
            "geometry": null,
        });
        let item = normalize_nws_alert("nws-alerts", &feature).unwrap();
        assert_eq!(item.location_confidence, sitmon_model::LocationConfidence::UUnknown);
        assert!(item.tags.iter().any(|t| t == "severity:Severe"));
    }
}
