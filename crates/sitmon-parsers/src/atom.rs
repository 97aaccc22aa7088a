use serde_json::json;

use crate::dates::to_iso;
use crate::error::Result;
use crate::record::{FeedEntry, RawRecord};
use crate::xmltree::{self, Element};

fn alternate_link(entry: &Element) -> Option<String> {
    for link in entry.find_all("link") {
        let Some(href) = link.get("href") else { continue };
        match link.get("rel") {
            None | Some("") | Some("alternate") => return Some(href.to_string()),
            _ => continue,
        }
    }
    None
}

fn georss_point(entry: &Element) -> Option<serde_json::Value> {
    let point = entry.findtext("point")?;
    let mut parts = point.split_whitespace();
    let lat: f64 = parts.next()?.parse().ok()?;
    let lon: f64 = parts.next()?.parse().ok()?;
    Some(json!({"type": "Point", "coordinates": [lon, lat]}))
}

/// Parses Atom `<entry>` elements. `georss:point` is looked up directly among the
/// entry's children rather than namespace-qualified, matching the wildcard-namespace
/// behavior the source's explicit `{georss}` prefix achieves.
pub fn parse_atom(data: &[u8]) -> Result<Vec<RawRecord>> {
    let root = xmltree::parse(data)?;
    let mut out = Vec::new();

    for entry in root.find_all("entry") {
        let link = alternate_link(entry);
        let id = entry.findtext("id").map(str::to_string).or_else(|| link.clone());
        let summary = entry
            .findtext("summary")
            .or_else(|| entry.findtext("content"))
            .unwrap_or("")
            .to_string();

        out.push(RawRecord::Feed(FeedEntry {
            id,
            link,
            title: Some(entry.findtext("title").unwrap_or("").to_string()),
            summary: Some(summary),
            content: None,
            published: entry.findtext("published").and_then(to_iso),
            updated: entry.findtext("updated").and_then(to_iso),
            geom: georss_point(entry),
        }));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_alternate_link_and_point() {
        let data = br#"<feed>
            <entry>
                <id>urn:1</id>
                <title>Quake near coast</title>
                <link rel="self" href="https://example.com/self"/>
                <link rel="alternate" href="https://example.com/a"/>
                <summary>Magnitude 5.0</summary>
                <published>2024-01-01T00:00:00Z</published>
                <georss:point>10.0 20.0</georss:point>
            </entry>
        </feed>"#;
        let records = parse_atom(data).unwrap();
        assert_eq!(records.len(), 1);
        match &records[0] {
            RawRecord::Feed(entry) => {
                assert_eq!(entry.link.as_deref(), Some("https://example.com/a"));
                assert!(entry.geom.is_some());
            }
            _ => panic!("expected feed entry"),
        }
    }
}
