use serde_json::{json, Value};
use sitmon_model::{Category, Item};

use crate::builder::{build_item, NewItem};
use crate::error::{NormalizeError, Result};
use crate::helpers::iso_from_epoch_ms;
use crate::location::Location;
use crate::text::canonicalize_url;

/// USGS earthquake GeoJSON feature (`properties`/`geometry` shape, `geometry.coordinates = [lon, lat, depth]`).
pub fn normalize_usgs_earthquake(source_id: &str, feature: &Value) -> Result<Item> {
    let properties = feature.get("properties").ok_or(NormalizeError::MissingField("properties"))?;
    let geometry = feature.get("geometry").ok_or(NormalizeError::MissingField("geometry"))?;
    let coords = geometry
        .get("coordinates")
        .and_then(Value::as_array)
        .ok_or(NormalizeError::BadShape("geometry.coordinates"))?;
    let lon = coords.first().and_then(Value::as_f64).ok_or(NormalizeError::BadShape("geometry.coordinates[0]"))?;
    let lat = coords.get(1).and_then(Value::as_f64).ok_or(NormalizeError::BadShape("geometry.coordinates[1]"))?;

    let title = properties.get("title").and_then(Value::as_str).unwrap_or("").to_string();
    let url = canonicalize_url(properties.get("url").and_then(Value::as_str).unwrap_or(""));
    let time_ms = properties.get("time").and_then(Value::as_i64).ok_or(NormalizeError::MissingField("properties.time"))?;
    let updated_ms = properties.get("updated").and_then(Value::as_i64);
    let mag = properties.get("mag").and_then(Value::as_f64);
    let place = properties.get("place").and_then(Value::as_str).map(str::to_string);

    let summary = place.clone().unwrap_or_default();

    let mut tags = vec!["usgs".to_string(), "earthquake".to_string()];
    if let Some(mag) = mag {
        tags.push(format!("mag:{mag:.1}"));
    }

    let raw = json!({
        "mag": mag,
        "place": place,
        "time": properties.get("time"),
        "updated": properties.get("updated"),
        "usgs_url": properties.get("url"),
    });

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "geojson_api".to_string(),
        external_id: feature.get("id").and_then(Value::as_str).map(str::to_string),
        url,
        title,
        summary: summary.clone(),
        content: None,
        published_at: iso_from_epoch_ms(time_ms),
        updated_at: updated_ms.map(iso_from_epoch_ms),
        category: Category::Earthquake,
        tags,
        location: Location::exact(
            Some(geometry.to_string()),
            lat,
            lon,
            if summary.is_empty() { None } else { Some(summary) },
            "USGS GeoJSON coordinates",
        ),
        raw,
    };
    Ok(build_item(new))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_coordinates_and_magnitude_tag() {
        let feature = json!({
            "id": "us1234",
            "properties": {
                "title": "M 5.1 - offshore Oaxaca",
                "url": "https://earthquake.usgs.gov/x?utm_source=y",
                "time": 1_700_000_000_000i64,
                "updated": 1_700_000_100_000i64,
                "mag": 5.12,
                "place": "offshore Oaxaca, Mexico",
            },
            "geometry": {"type": "Point", "coordinates": [-97.0, 16.0, 10.0]},
        });
        let item = normalize_usgs_earthquake("usgs-significant", &feature).unwrap();
        assert_eq!(item.lat, Some(16.0));
        assert_eq!(item.lon, Some(-97.0));
        assert!(item.tags.contains(&"mag:5.1".to_string()));
        assert_eq!(item.url, "https://earthquake.usgs.gov/x");
    }
}
