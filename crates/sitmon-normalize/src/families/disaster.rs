use serde_json::{json, Value};
use sitmon_geo::bbox_from_geojson;
use sitmon_model::{Category, Item};
use sitmon_parsers::XmlItem;

use crate::builder::{build_item, NewItem};
use crate::helpers::truncate_300;
use crate::location::Location;
use crate::text::canonicalize_url;

/// Routes a GDACS/EONET free-text headline to one of the categories those feeds bundle
/// together, falling back to `Disaster` when nothing more specific matches.
fn route_category(haystack: &str) -> Category {
    let haystack = haystack.to_lowercase();
    if haystack.contains("tsunami") {
        Category::Tsunami
    } else if haystack.contains("volcano") || haystack.contains("eruption") {
        Category::Volcano
    } else if haystack.contains("wildfire") || haystack.contains("wild fire") {
        Category::Wildfire
    } else if haystack.contains("cyclone") || haystack.contains("hurricane") || haystack.contains("typhoon") {
        Category::TropicalCyclone
    } else if haystack.contains("earthquake") {
        Category::Earthquake
    } else {
        Category::Disaster
    }
}

/// ReliefWeb `/v1/reports` API record: one humanitarian situation report per field.
pub fn normalize_reliefweb_report(source_id: &str, record: &Value) -> Option<Item> {
    let fields = record.get("fields")?;
    let id = record.get("id").map(|v| v.to_string()).unwrap_or_default();
    let title = fields.get("title").and_then(Value::as_str).unwrap_or("").to_string();
    let url = fields.get("url").and_then(Value::as_str).unwrap_or("").to_string();
    let summary = fields
        .get("body-html")
        .and_then(Value::as_str)
        .or_else(|| fields.get("body").and_then(Value::as_str))
        .unwrap_or("")
        .to_string();
    let country = fields
        .get("primary_country")
        .and_then(|c| c.get("name"))
        .and_then(Value::as_str)
        .or_else(|| {
            fields
                .get("country")
                .and_then(Value::as_array)
                .and_then(|cs| cs.first())
                .and_then(|c| c.get("name"))
                .and_then(Value::as_str)
        })
        .map(str::to_string);
    let published_at = fields.get("date").and_then(|d| d.get("created")).and_then(Value::as_str).unwrap_or("").to_string();

    let location = match &country {
        Some(c) => Location::country(c.clone(), None, "ReliefWeb primary_country/country[0]"),
        None => Location::unknown("ReliefWeb report without a country field"),
    };

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "json_api".to_string(),
        external_id: Some(id.clone()),
        url: canonicalize_url(&url),
        title,
        summary: truncate_300(&summary),
        content: None,
        published_at,
        updated_at: None,
        category: Category::Disaster,
        tags: vec!["reliefweb".to_string(), "report".to_string()],
        location,
        raw: json!({"reliefweb_id": id}),
    };
    Some(build_item(new))
}

/// ReliefWeb `/v1/disasters` API record.
pub fn normalize_reliefweb_disaster(source_id: &str, record: &Value) -> Option<Item> {
    let fields = record.get("fields")?;
    let id = record.get("id").map(|v| v.to_string()).unwrap_or_default();
    let title = fields.get("name").and_then(Value::as_str).unwrap_or("").to_string();
    let url = fields.get("url").and_then(Value::as_str).unwrap_or("").to_string();
    let country = fields
        .get("country")
        .and_then(Value::as_array)
        .and_then(|cs| cs.first())
        .and_then(|c| c.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let glide = fields.get("glide").and_then(Value::as_str).map(str::to_string);
    let published_at = fields.get("date").and_then(|d| d.get("created")).and_then(Value::as_str).unwrap_or("").to_string();
    let status = fields.get("status").and_then(Value::as_str).unwrap_or("").to_string();

    let location = match &country {
        Some(c) => Location::country(c.clone(), None, "ReliefWeb country[0]"),
        None => Location::unknown("ReliefWeb disaster without a country field"),
    };

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "json_api".to_string(),
        external_id: Some(id.clone()),
        url: canonicalize_url(&url),
        title,
        summary: format!("Status: {status}"),
        content: None,
        published_at,
        updated_at: None,
        category: route_category(&title),
        tags: vec!["reliefweb".to_string(), "disaster".to_string()],
        location,
        raw: json!({"reliefweb_id": id, "glide": glide, "status": status}),
    };
    Some(build_item(new))
}

/// GDACS RSS `<item>`, category routed by keyword and geometry taken from GeoRSS when
/// the feed carries it (most GDACS alerts ship a point).
pub fn normalize_gdacs_rss(source_id: &str, record: &XmlItem) -> Item {
    let title = record.title.clone().unwrap_or_default();
    let description = record.description.clone().unwrap_or_default();
    let link = record.link.clone().unwrap_or_default();
    let external_id = record.guid.clone().unwrap_or_else(|| link.clone());
    let category = route_category(&format!("{title} {description}"));

    let location = match &record.georss {
        Some(geom) => {
            let centroid = bbox_from_geojson(geom).map(|b| b.centroid());
            Location::exact(
                Some(geom.to_string()),
                centroid.map(|c| c.0).unwrap_or_default(),
                centroid.map(|c| c.1).unwrap_or_default(),
                None,
                "GDACS GeoRSS point",
            )
        }
        None => Location::unknown("GDACS item without GeoRSS geometry"),
    };

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
        category,
        tags: vec!["gdacs".to_string()],
        location,
        raw: json!({"links": record.links}),
    };
    build_item(new)
}

/// NASA EONET `/api/v3/events` GeoJSON-ish feature: `{"id","title","categories",
/// "geometry": [{"date","coordinates"}, ...]}`. The last (most recent) geometry entry
/// is used, matching how EONET orders its geometry history.
pub fn normalize_eonet_event(source_id: &str, record: &Value) -> Option<Item> {
    let id = record.get("id").and_then(Value::as_str)?.to_string();
    let title = record.get("title").and_then(Value::as_str).unwrap_or("").to_string();
    let link = record.get("link").and_then(Value::as_str).unwrap_or("").to_string();
    let category_name = record
        .get("categories")
        .and_then(Value::as_array)
        .and_then(|cs| cs.first())
        .and_then(|c| c.get("title"))
        .and_then(Value::as_str)
        .unwrap_or("");

    let geometries = record.get("geometry").and_then(Value::as_array);
    let latest = geometries.and_then(|g| g.last());
    let published_at = latest.and_then(|g| g.get("date")).and_then(Value::as_str).unwrap_or("").to_string();
    let coords = latest.and_then(|g| g.get("coordinates")).and_then(Value::as_array);

    let location = match coords.map(|c| c.as_slice()) {
        Some([lon, lat]) => {
            let lon = lon.as_f64().unwrap_or_default();
            let lat = lat.as_f64().unwrap_or_default();
            Location::exact(None, lat, lon, None, "EONET latest geometry entry")
        }
        _ => Location::unknown("EONET event without point geometry"),
    };

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "json_api".to_string(),
        external_id: Some(id.clone()),
        url: canonicalize_url(&link),
        title,
        summary: format!("Category: {category_name}"),
        content: None,
        published_at,
        updated_at: None,
        category: route_category(category_name),
        tags: vec!["eonet".to_string(), category_name.to_lowercase().replace(' ', "_")],
        location,
        raw: json!({"eonet_id": id, "category": category_name}),
    };
    Some(build_item(new))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_wildfire_keyword_in_gdacs_title() {
        let item = XmlItem {
            guid: Some("gdacs-1".to_string()),
            title: Some("Wildfire in California".to_string()),
            link: Some("https://gdacs.org/1".to_string()),
            description: Some("A large wildfire.".to_string()),
            published: Some("2024-01-01T00:00:00Z".to_string()),
            georss: None,
            links: vec![],
        };
        let normalized = normalize_gdacs_rss("gdacs-rss", &item);
        assert_eq!(normalized.category, Category::Wildfire);
    }

    #[test]
    fn eonet_uses_last_geometry_entry() {
        let record = json!({
            "id": "EONET_1",
            "title": "Kilauea",
            "link": "https://eonet.gsfc.nasa.gov/1",
            "categories": [{"title": "Volcanoes"}],
            "geometry": [
                {"date": "2024-01-01T00:00:00Z", "coordinates": [-155.2, 19.4]},
                {"date": "2024-01-02T00:00:00Z", "coordinates": [-155.3, 19.5]},
            ],
        });
        let item = normalize_eonet_event("eonet-events", &record).unwrap();
        assert_eq!(item.lon, Some(-155.3));
        assert_eq!(item.category, Category::Volcano);
    }
}
