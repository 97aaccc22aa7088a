use serde_json::json;
use sitmon_geo::bbox_from_geojson;
use sitmon_model::{Category, Item};
use sitmon_parsers::XmlItem;

use crate::builder::{build_item, NewItem};
use crate::helpers::truncate_300;
use crate::location::Location;
use crate::text::canonicalize_url;

/// NHC GIS advisory/forecast-track feed item.
pub fn normalize_nhc_item(source_id: &str, record: &XmlItem) -> Item {
    let title = record.title.clone().unwrap_or_default();
    let link = record.link.clone().unwrap_or_default();
    let external_id = record.guid.clone().unwrap_or_else(|| link.clone());
    let description = record.description.clone().unwrap_or_default();

    let centroid = record.georss.as_ref().and_then(bbox_from_geojson).map(|b| b.centroid());
    let location = if let Some(geom) = &record.georss {
        Location {
            geom_geojson: Some(geom.to_string()),
            lat: centroid.map(|c| c.0),
            lon: centroid.map(|c| c.1),
            location_name: None,
            confidence: Some(sitmon_model::LocationConfidence::AExact),
            rationale: "NHC GIS GeoRSS geometry".to_string(),
        }
    } else {
        Location {
            confidence: Some(sitmon_model::LocationConfidence::CSourceDefault),
            rationale: "NHC feed (basin-wide)".to_string(),
            ..Default::default()
        }
    };

    let url = if link.is_empty() {
        canonicalize_url(&format!("nhc:{external_id}"))
    } else {
        canonicalize_url(&link)
    };

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "xml_api".to_string(),
        external_id: Some(external_id),
        url,
        title,
        summary: truncate_300(description.trim()),
        content: None,
        published_at: record.published.clone().unwrap_or_default(),
        updated_at: None,
        category: Category::TropicalCyclone,
        tags: vec!["nhc".to_string(), "tropical_cyclone".to_string()],
        location,
        raw: json!({"links": record.links}),
    };
    build_item(new)
}
