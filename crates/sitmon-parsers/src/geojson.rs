use serde_json::Value;

use crate::error::Result;
use crate::record::RawRecord;

/// Extracts the `features` array of a GeoJSON `FeatureCollection`. Any other GeoJSON
/// type (bare `Feature`, `Point`, ...) yields no records — the feeds that use this
/// format (gazetteer corpora, FIRMS hotspots) always ship collections.
pub fn parse_geojson(data: &[u8]) -> Result<Vec<RawRecord>> {
    let doc: Value = serde_json::from_slice(data)?;
    let features = match doc.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => doc.get("features").and_then(Value::as_array).cloned(),
        _ => None,
    };
    Ok(features
        .unwrap_or_default()
        .into_iter()
        .map(RawRecord::GeoJsonFeature)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_features_from_collection() {
        let data = br#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{"mag":5.1}}]}"#;
        let records = parse_geojson(data).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn non_collection_yields_empty() {
        let data = br#"{"type":"Feature"}"#;
        let records = parse_geojson(data).unwrap();
        assert!(records.is_empty());
    }
}
