use crate::{Category, LocationConfidence};

/// A canonical normalized record (spec.md §3). Immutable after insert.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Item {
    pub item_id: String,
    pub source_id: String,
    pub source_type: String,
    pub external_id: Option<String>,
    pub url: String,
    pub title: String,
    pub summary: String,
    pub content: Option<String>,
    pub published_at: String,
    pub updated_at: Option<String>,
    pub fetched_at: String,
    pub category: Category,
    pub tags: Vec<String>,

    pub geom_geojson: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub location_name: Option<String>,
    pub location_confidence: LocationConfidence,
    pub location_rationale: String,

    pub raw: serde_json::Value,
    pub hash_title: String,
    pub hash_content: String,
    pub simhash: i64,
}
