use serde_json::Value;

use crate::error::Result;
use crate::record::RawRecord;

const LIST_KEYS: &[&str] = &["destinations", "countries", "items", "events", "vulnerabilities", "data"];

/// Parses a JSON body that is either a bare array of records, or an object carrying
/// the array under one of a handful of well-known keys (Smartraveller exports, NVD
/// CVE feeds, ReliefWeb API responses, ...). Yields nothing if neither shape matches.
pub fn parse_json_records(data: &[u8]) -> Result<Vec<RawRecord>> {
    let doc: Value = serde_json::from_slice(data)?;
    let items = match doc {
        Value::Array(items) => items,
        Value::Object(ref map) => LIST_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array).cloned())
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    Ok(items.into_iter().map(RawRecord::Json).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_array_is_used_directly() {
        let data = br#"[{"a":1},{"a":2}]"#;
        assert_eq!(parse_json_records(data).unwrap().len(), 2);
    }

    #[test]
    fn falls_back_to_known_wrapper_key() {
        let data = br#"{"vulnerabilities":[{"cve":{"id":"CVE-2024-1"}}]}"#;
        assert_eq!(parse_json_records(data).unwrap().len(), 1);
    }

    #[test]
    fn unknown_shape_yields_empty() {
        let data = br#"{"foo":"bar"}"#;
        assert!(parse_json_records(data).unwrap().is_empty());
    }
}
