use serde_json::{json, Value};

use crate::dates::to_iso;
use crate::error::Result;
use crate::record::{CapAlert, RawRecord};
use crate::xmltree::{self, Element};

fn parse_polygons(area: &Element) -> Option<Value> {
    let mut polygons: Vec<Vec<[f64; 2]>> = Vec::new();
    for polygon_el in area.find_all("polygon") {
        let text = polygon_el.text.trim();
        if text.is_empty() {
            continue;
        }
        let mut coords = Vec::new();
        for pair in text.split_whitespace() {
            let Some((lat_str, lon_str)) = pair.split_once(',') else { continue };
            let (Ok(lat), Ok(lon)) = (lat_str.parse::<f64>(), lon_str.parse::<f64>()) else {
                continue;
            };
            coords.push([lon, lat]);
        }
        if coords.first() != coords.last() {
            if let Some(first) = coords.first().copied() {
                coords.push(first);
            }
        }
        if !coords.is_empty() {
            polygons.push(coords);
        }
    }

    match polygons.len() {
        0 => None,
        1 => Some(json!({"type": "Polygon", "coordinates": [polygons[0]]})),
        _ => Some(json!({
            "type": "MultiPolygon",
            "coordinates": polygons.iter().map(|p| vec![p.clone()]).collect::<Vec<_>>(),
        })),
    }
}

/// Parses a CAP document, either a bare `<alert>` root or a feed wrapping one or more
/// `<alert>` elements. Only the first `<info>` block of each alert is used — every CAP
/// source this aggregator polls emits exactly one.
pub fn parse_cap(data: &[u8]) -> Result<Vec<RawRecord>> {
    let root = xmltree::parse(data)?;

    let doc_root = root.children.first();
    let alert_els: Vec<&Element> = match doc_root {
        Some(el) if el.name == "alert" => vec![el],
        Some(el) => el.find_all("alert"),
        None => Vec::new(),
    };

    let mut out = Vec::new();
    for alert in alert_els {
        let Some(info) = alert.find("info") else { continue };

        let mut area_desc = None;
        let mut geom = None;
        for area in info.find_all("area") {
            if let Some(desc) = area.findtext("areaDesc") {
                area_desc = Some(desc.to_string());
            }
            if geom.is_none() {
                geom = parse_polygons(area);
            }
        }

        out.push(RawRecord::Cap(CapAlert {
            identifier: Some(alert.findtext("identifier").unwrap_or("").to_string()),
            sent: alert.findtext("sent").and_then(to_iso),
            status: alert.findtext("status").map(str::to_string),
            msg_type: alert.findtext("msgType").map(str::to_string),
            event: info.findtext("event").map(str::to_string),
            headline: info.findtext("headline").map(str::to_string),
            description: Some(info.findtext("description").unwrap_or("").to_string()),
            area_desc,
            geom,
        }));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_alert_root() {
        let data = br#"<alert xmlns="urn:oasis:names:tc:emergency:cap:1.2">
            <identifier>NWS-1</identifier>
            <sent>2024-01-01T00:00:00-00:00</sent>
            <status>Actual</status>
            <msgType>Alert</msgType>
            <info>
                <event>Tsunami Warning</event>
                <headline>Tsunami Warning issued</headline>
                <description>Move to high ground.</description>
                <area>
                    <areaDesc>Coastal Zone</areaDesc>
                    <polygon>10.0,20.0 11.0,21.0 12.0,22.0</polygon>
                </area>
            </info>
        </alert>"#;
        let records = parse_cap(data).unwrap();
        assert_eq!(records.len(), 1);
        match &records[0] {
            RawRecord::Cap(alert) => {
                assert_eq!(alert.identifier.as_deref(), Some("NWS-1"));
                assert_eq!(alert.area_desc.as_deref(), Some("Coastal Zone"));
                assert!(alert.geom.is_some());
            }
            _ => panic!("expected cap alert"),
        }
    }
}
