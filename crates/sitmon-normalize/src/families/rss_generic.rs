use serde_json::json;
use sitmon_model::{Category, Item};
use sitmon_parsers::FeedEntry;

use crate::builder::{build_item, NewItem};
use crate::location::Location;
use crate::text::canonicalize_url;

/// Bare RSS/Atom entry with no structured geo, tagged by the caller with the feed's
/// fixed category (news wires, generic disaster bulletins, ...).
pub fn normalize_generic_rss(source_id: &str, record: &FeedEntry, category: Category, extra_tags: &[&str]) -> Item {
    let title = record.title.clone().unwrap_or_default();
    let url = canonicalize_url(record.link.as_deref().unwrap_or(""));
    let external_id = record.id.clone().unwrap_or_else(|| url.clone());
    let summary = record.summary.clone().unwrap_or_default();

    let mut tags = vec!["rss".to_string(), source_id.to_string()];
    for tag in extra_tags {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "rss".to_string(),
        external_id: Some(external_id),
        url,
        title,
        summary,
        content: record.content.clone(),
        published_at: record.published.clone().unwrap_or_default(),
        updated_at: record.updated.clone(),
        category,
        tags,
        location: Location::unknown("RSS without structured geo"),
        raw: json!({"feed_id": record.id}),
    };
    build_item(new)
}

/// Country-level RSS (e.g. a feed whose title ends `"... - Country Name"`).
pub fn normalize_country_level_rss(
    source_id: &str,
    record: &FeedEntry,
    category: Category,
    tags: Vec<String>,
) -> Item {
    let title = record.title.clone().unwrap_or_default();
    let url = canonicalize_url(record.link.as_deref().unwrap_or(""));
    let external_id = record.id.clone().unwrap_or_else(|| url.clone());
    let summary = record.summary.clone().unwrap_or_default();

    let country = title.rsplit_once(" - ").map(|(_, tail)| tail.trim().to_string()).filter(|c| !c.is_empty());

    let location = match &country {
        Some(c) => Location::country(c.clone(), None, "Country inferred from title"),
        None => Location::unknown("No country detected"),
    };

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "rss".to_string(),
        external_id: Some(external_id),
        url,
        title,
        summary,
        content: None,
        published_at: record.published.clone().unwrap_or_default(),
        updated_at: record.updated.clone(),
        category,
        tags,
        location,
        raw: json!({"feed_id": record.id}),
    };
    build_item(new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_country_from_title_suffix() {
        let record = FeedEntry {
            title: Some("Cholera outbreak update - Yemen".to_string()),
            link: Some("https://example.com/a".to_string()),
            summary: Some("details".to_string()),
            ..Default::default()
        };
        let item = normalize_country_level_rss(
            "who-don",
            &record,
            Category::Disaster,
            vec!["who".to_string(), "disaster".to_string()],
        );
        assert_eq!(item.location_name.as_deref(), Some("Yemen"));
    }
}
