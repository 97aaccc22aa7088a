use crate::dates::rfc2822_to_iso;
use crate::error::Result;
use crate::record::{FeedEntry, RawRecord};
use crate::xmltree;

/// Parses RSS 2.0 `<item>` entries into `FeedEntry` records. `content:encoded` (local
/// name `encoded`) is preferred for `content` when present, matching `feedparser`'s
/// `entry.content[0].value`.
pub fn parse_rss(data: &[u8]) -> Result<Vec<RawRecord>> {
    let root = xmltree::parse(data)?;
    let mut out = Vec::new();

    for item in root.find_all("item") {
        let link = item.findtext("link").map(str::to_string);
        let id = item
            .findtext("guid")
            .or(link.as_deref())
            .map(str::to_string);
        let published = item.findtext("pubDate").and_then(rfc2822_to_iso);
        let updated = item.findtext("updated").and_then(rfc2822_to_iso);
        let content = item.findtext("encoded").map(str::to_string);

        out.push(RawRecord::Feed(FeedEntry {
            id,
            link,
            title: Some(item.findtext("title").unwrap_or("").to_string()),
            summary: Some(item.findtext("description").unwrap_or("").to_string()),
            content,
            published,
            updated,
            geom: None,
        }));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_item_fields() {
        let data = br#"<rss><channel>
            <item>
                <guid>abc123</guid>
                <link>https://example.com/a</link>
                <title>Storm warning</title>
                <description>Heavy rain expected.</description>
                <pubDate>Mon, 01 Jan 2024 12:00:00 GMT</pubDate>
            </item>
        </channel></rss>"#;
        let records = parse_rss(data).unwrap();
        assert_eq!(records.len(), 1);
        match &records[0] {
            RawRecord::Feed(entry) => {
                assert_eq!(entry.id.as_deref(), Some("abc123"));
                assert_eq!(entry.published.as_deref(), Some("2024-01-01T12:00:00Z"));
            }
            _ => panic!("expected feed entry"),
        }
    }
}
