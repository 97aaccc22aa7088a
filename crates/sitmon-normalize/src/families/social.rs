use serde_json::{json, Value};
use sitmon_model::{Category, Item};

use crate::builder::{build_item, NewItem};
use crate::helpers::truncate_300;
use crate::location::Location;
use crate::text::canonicalize_url;

/// Strips the small set of inline tags Mastodon's server-rendered HTML statuses use
/// (`<p>`, `<br>`, `<a>`) down to plain text. Mastodon content is always this
/// constrained subset, never full HTML.
fn strip_basic_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A Mastodon hashtag-timeline status (`/api/v1/timelines/tag/:hashtag`).
pub fn normalize_mastodon_status(source_id: &str, record: &Value) -> Option<Item> {
    let id = record.get("id").and_then(Value::as_str)?.to_string();
    let url = record.get("url").and_then(Value::as_str).unwrap_or("").to_string();
    let content_html = record.get("content").and_then(Value::as_str).unwrap_or("");
    let content = strip_basic_html(content_html);
    let account = record.get("account").and_then(|a| a.get("acct")).and_then(Value::as_str).unwrap_or("");
    let created_at = record.get("created_at").and_then(Value::as_str).unwrap_or("").to_string();
    let tags: Vec<String> = record
        .get("tags")
        .and_then(Value::as_array)
        .map(|ts| ts.iter().filter_map(|t| t.get("name").and_then(Value::as_str)).map(str::to_string).collect())
        .unwrap_or_default();

    let mut item_tags = vec!["mastodon".to_string(), "social".to_string()];
    item_tags.extend(tags);

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "json_api".to_string(),
        external_id: Some(id.clone()),
        url: canonicalize_url(&url),
        title: truncate_300(&content),
        summary: truncate_300(&content),
        content: Some(content),
        published_at: created_at,
        updated_at: None,
        category: Category::Social,
        tags: item_tags,
        location: Location::unknown("Mastodon statuses carry no structured geography"),
        raw: json!({"account": account, "status_id": id}),
    };
    Some(build_item(new))
}

/// A Bluesky post record surfaced from a firehose/search feed. The public-facing URL
/// isn't present on the record itself; it's reconstructed from the post's `at://` URI
/// and the author's handle, matching `https://bsky.app/profile/<handle>/post/<rkey>`.
pub fn normalize_bluesky_post(source_id: &str, record: &Value) -> Option<Item> {
    let uri = record.get("uri").and_then(Value::as_str)?.to_string();
    let rkey = uri.rsplit('/').next().unwrap_or("").to_string();
    let handle = record.get("author").and_then(|a| a.get("handle")).and_then(Value::as_str).unwrap_or("");
    let text = record.get("record").and_then(|r| r.get("text")).and_then(Value::as_str).unwrap_or("").to_string();
    let created_at = record
        .get("record")
        .and_then(|r| r.get("createdAt"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let url = format!("https://bsky.app/profile/{handle}/post/{rkey}");

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "json_api".to_string(),
        external_id: Some(uri.clone()),
        url,
        title: truncate_300(&text),
        summary: truncate_300(&text),
        content: Some(text),
        published_at: created_at,
        updated_at: None,
        category: Category::Social,
        tags: vec!["bluesky".to_string(), "social".to_string()],
        location: Location::unknown("Bluesky posts carry no structured geography"),
        raw: json!({"uri": uri, "handle": handle}),
    };
    Some(build_item(new))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mastodon_status_strips_html_tags() {
        let record = json!({
            "id": "1",
            "url": "https://mastodon.example/@user/1",
            "content": "<p>Flooding reported <a href=\"#\">here</a></p>",
            "account": {"acct": "user@mastodon.example"},
            "created_at": "2024-01-01T00:00:00Z",
            "tags": [{"name": "flood"}],
        });
        let item = normalize_mastodon_status("mastodon-disaster-tag", &record).unwrap();
        assert!(!item.content.as_deref().unwrap_or_default().contains('<'));
        assert!(item.tags.contains(&"flood".to_string()));
    }

    #[test]
    fn bluesky_post_reconstructs_url_from_uri_and_handle() {
        let record = json!({
            "uri": "at://did:plc:abc123/app.bsky.feed.post/3kexample",
            "author": {"handle": "alice.bsky.social"},
            "record": {"text": "Update from the field.", "createdAt": "2024-01-01T00:00:00Z"},
        });
        let item = normalize_bluesky_post("bluesky-search", &record).unwrap();
        assert_eq!(item.url, "https://bsky.app/profile/alice.bsky.social/post/3kexample");
    }
}
