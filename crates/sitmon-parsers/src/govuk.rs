use serde_json::Value;

use crate::error::Result;
use crate::record::RawRecord;

/// GOV.UK's travel-advice index ships its per-country entries under `links.children`.
pub fn parse_govuk_travel_advice_index(data: &[u8]) -> Result<Vec<RawRecord>> {
    let doc: Value = serde_json::from_slice(data)?;
    let children = doc
        .get("links")
        .and_then(|links| links.get("children"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    Ok(children.into_iter().map(RawRecord::Json).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_children_list() {
        let data = br#"{"links":{"children":[{"title":"France"},{"title":"Spain"}]}}"#;
        assert_eq!(parse_govuk_travel_advice_index(data).unwrap().len(), 2);
    }
}
