use chrono::{SecondsFormat, Utc};
use sitmon_model::{Category, Item, LocationConfidence};

use crate::location::Location;
use crate::simhash::{sha256_hex, simhash64, u64_to_i64};
use crate::text::normalize_title;

pub struct NewItem {
    pub source_id: String,
    pub source_type: String,
    pub external_id: Option<String>,
    pub url: String,
    pub title: String,
    pub summary: String,
    pub content: Option<String>,
    pub published_at: String,
    pub updated_at: Option<String>,
    pub category: Category,
    pub tags: Vec<String>,
    pub location: Location,
    pub raw: serde_json::Value,
}

/// Assembles a canonical `Item` from a family normalizer's extracted fields,
/// computing the hash/simhash fingerprints the clusterer keys candidate search on.
pub fn build_item(new: NewItem) -> Item {
    let normalized_title = normalize_title(&new.title);
    let content_for_hash =
        format!("{}\n{}\n{}", normalized_title, new.summary, new.content.as_deref().unwrap_or(""))
            .trim()
            .to_string();
    let truncated_summary: String = new.summary.chars().take(280).collect();
    let sim = simhash64(&format!("{} {}", new.title, truncated_summary));

    let location = new.location;

    Item {
        item_id: uuid::Uuid::new_v4().to_string(),
        source_id: new.source_id,
        source_type: new.source_type,
        external_id: new.external_id,
        url: new.url,
        title: new.title,
        summary: new.summary,
        content: new.content,
        published_at: new.published_at,
        updated_at: new.updated_at,
        fetched_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        category: new.category,
        tags: new.tags,

        geom_geojson: location.geom_geojson,
        lat: location.lat,
        lon: location.lon,
        location_name: location.location_name,
        location_confidence: location.confidence.unwrap_or(LocationConfidence::UUnknown),
        location_rationale: location.rationale,

        raw: new.raw,
        hash_title: sha256_hex(&normalized_title),
        hash_content: sha256_hex(&content_for_hash),
        simhash: u64_to_i64(sim),
    }
}
