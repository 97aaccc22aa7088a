use serde_json::{json, Value};

use crate::dates::rfc2822_to_iso;
use crate::error::Result;
use crate::record::{RawRecord, XmlItem};
use crate::xmltree;

fn parse_point(text: &str) -> Option<Value> {
    let mut parts = text.split_whitespace();
    let lat: f64 = parts.next()?.parse().ok()?;
    let lon: f64 = parts.next()?.parse().ok()?;
    Some(json!({"type": "Point", "coordinates": [lon, lat]}))
}

fn parse_polygon(text: &str) -> Option<Value> {
    let nums: Vec<f64> = text.split_whitespace().filter_map(|n| n.parse().ok()).collect();
    if nums.len() < 2 {
        return None;
    }
    let mut coords: Vec<[f64; 2]> = nums.chunks(2).map(|c| [c[1], c[0]]).collect();
    if coords.first() != coords.last() {
        let first = coords[0];
        coords.push(first);
    }
    Some(json!({"type": "Polygon", "coordinates": [coords]}))
}

/// Parses generic `<item>`-shaped XML feeds (NHC, GDACS, tsunami/volcano bulletins),
/// preferring a `georss:point` over a `georss:polygon` when both are present.
pub fn parse_xml_georss(data: &[u8]) -> Result<Vec<RawRecord>> {
    let root = xmltree::parse(data)?;
    let mut out = Vec::new();

    for item in root.find_all("item") {
        let published = item.findtext("pubDate").and_then(rfc2822_to_iso);
        let georss = item
            .findtext("point")
            .and_then(parse_point)
            .or_else(|| item.findtext("polygon").and_then(parse_polygon));

        let link = item.findtext("link").map(str::to_string);
        let mut links = Vec::new();
        if let Some(l) = &link {
            links.push(l.clone());
        }
        for enclosure in item.find_all("enclosure") {
            if let Some(url) = enclosure.get("url") {
                links.push(url.to_string());
            }
        }

        out.push(RawRecord::Xml(XmlItem {
            guid: item.findtext("guid").or(link.as_deref()).map(str::to_string),
            title: Some(item.findtext("title").unwrap_or("").to_string()),
            link,
            description: Some(item.findtext("description").unwrap_or("").to_string()),
            published,
            georss,
            links,
        }));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closes_open_polygon_rings() {
        let data = br#"<rss><channel>
            <item>
                <guid>nhc-1</guid>
                <title>Advisory 5</title>
                <link>https://nhc.example/5</link>
                <description>Track forecast</description>
                <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
                <georss:polygon>10.0 20.0 11.0 21.0 12.0 22.0</georss:polygon>
            </item>
        </channel></rss>"#;
        let records = parse_xml_georss(data).unwrap();
        match &records[0] {
            RawRecord::Xml(item) => {
                let geom = item.georss.as_ref().unwrap();
                let coords = geom["coordinates"][0].as_array().unwrap();
                assert_eq!(coords.len(), 4);
                assert_eq!(coords[0], coords[3]);
            }
            _ => panic!("expected xml item"),
        }
    }
}
