use serde_json::json;
use sitmon_geo::bbox_from_geojson;
use sitmon_model::{Category, Item};
use sitmon_parsers::{CapAlert, FeedEntry};

use crate::builder::{build_item, NewItem};
use crate::helpers::truncate_300;
use crate::location::Location;
use crate::text::canonicalize_url;

/// Tsunami warning centers issue basin-wide bulletins without a polygon far more often
/// than not; lacking one, the centroid falls back to the issuing center's own basin so
/// that at least a coarse location survives rather than going fully `U_unknown`.
fn source_default_centroid(source_id: &str) -> Option<(f64, f64, &'static str)> {
    let id = source_id.to_lowercase();
    if id.contains("ntwc") {
        Some((61.0, -150.0, "NOAA National Tsunami Warning Center (Alaska) basin default"))
    } else if id.contains("ptwc") {
        Some((21.3, -157.9, "NOAA Pacific Tsunami Warning Center (Hawaii) basin default"))
    } else {
        None
    }
}

/// Tsunami.gov / NTWC / PTWC Atom feed entry.
pub fn normalize_tsunami_atom(source_id: &str, record: &FeedEntry) -> Item {
    let title = record.title.clone().unwrap_or_default();
    let link = record.link.clone().unwrap_or_default();
    let external_id = record.id.clone().unwrap_or_else(|| link.clone());

    let location = if let Some(geom) = &record.geom {
        let centroid = bbox_from_geojson(geom).map(|b| b.centroid());
        Location::exact(
            Some(geom.to_string()),
            centroid.map(|c| c.0).unwrap_or_default(),
            centroid.map(|c| c.1).unwrap_or_default(),
            None,
            "tsunami bulletin GeoRSS point",
        )
    } else {
        match source_default_centroid(source_id) {
            Some((lat, lon, rationale)) => Location::source_default(lat, lon, None, rationale),
            None => Location::unknown("tsunami bulletin without geometry"),
        }
    };

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "atom".to_string(),
        external_id: Some(external_id),
        url: canonicalize_url(&link),
        title,
        summary: record.summary.clone().unwrap_or_default(),
        content: None,
        published_at: record.published.clone().unwrap_or_default(),
        updated_at: record.updated.clone(),
        category: Category::Tsunami,
        tags: vec!["tsunami".to_string()],
        location,
        raw: json!({}),
    };
    build_item(new)
}

/// Tsunami CAP alert (NWS/NTWC/PTWC CAP feed).
pub fn normalize_tsunami_cap(source_id: &str, record: &CapAlert) -> Item {
    let title = record.headline.clone().or_else(|| record.event.clone()).unwrap_or_default();
    let description = record.description.clone().unwrap_or_default();
    let external_id = record.identifier.clone().unwrap_or_default();

    let location = if let Some(geom) = &record.geom {
        let centroid = bbox_from_geojson(geom).map(|b| b.centroid());
        Location::exact(
            Some(geom.to_string()),
            centroid.map(|c| c.0).unwrap_or_default(),
            centroid.map(|c| c.1).unwrap_or_default(),
            record.area_desc.clone(),
            "CAP alert area polygon",
        )
    } else {
        match source_default_centroid(source_id) {
            Some((lat, lon, rationale)) => Location::source_default(lat, lon, record.area_desc.clone(), rationale),
            None => Location::unknown("CAP tsunami alert without geometry"),
        }
    };

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "cap".to_string(),
        external_id: Some(external_id.clone()),
        url: format!("cap:{external_id}"),
        title,
        summary: truncate_300(&description),
        content: None,
        published_at: record.sent.clone().unwrap_or_default(),
        updated_at: None,
        category: Category::Tsunami,
        tags: vec![
            "tsunami".to_string(),
            format!("status:{}", record.status.clone().unwrap_or_default()),
            format!("msgType:{}", record.msg_type.clone().unwrap_or_default()),
        ],
        location,
        raw: json!({"area_desc": record.area_desc}),
    };
    build_item(new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ntwc_alert_without_geometry_gets_alaska_basin_default() {
        let alert = CapAlert {
            identifier: Some("ntwc-1".to_string()),
            sent: Some("2024-01-01T00:00:00Z".to_string()),
            status: Some("Actual".to_string()),
            msg_type: Some("Alert".to_string()),
            event: Some("Tsunami Warning".to_string()),
            headline: Some("Tsunami Warning issued".to_string()),
            description: Some("Move to high ground.".to_string()),
            area_desc: None,
            geom: None,
        };
        let item = normalize_tsunami_cap("ntwc-cap", &alert);
        assert_eq!(item.lat, Some(61.0));
        assert_eq!(item.lon, Some(-150.0));
        assert_eq!(item.location_confidence, sitmon_model::LocationConfidence::CSourceDefault);
    }

    #[test]
    fn unrelated_source_without_geometry_stays_unknown() {
        let alert = CapAlert {
            identifier: Some("x-1".to_string()),
            sent: Some("2024-01-01T00:00:00Z".to_string()),
            status: Some("Actual".to_string()),
            msg_type: Some("Alert".to_string()),
            event: Some("Tsunami Warning".to_string()),
            headline: None,
            description: Some("Bulletin text.".to_string()),
            area_desc: None,
            geom: None,
        };
        let item = normalize_tsunami_cap("jma-cap", &alert);
        assert_eq!(item.location_confidence, sitmon_model::LocationConfidence::UUnknown);
    }
}
