use serde_json::{json, Value};
use sitmon_model::{Category, Item};

use crate::builder::{build_item, NewItem};
use crate::helpers::truncate_300;
use crate::location::Location;

/// Walks NVD 2.0's `configurations` tree collecting vendor/product pairs out of
/// `criteria` strings of the form `cpe:2.3:a:<vendor>:<product>:...`.
fn extract_vendor_products(cve: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let Some(configs) = cve.get("configurations").and_then(Value::as_array) else {
        return out;
    };
    for config in configs {
        let Some(nodes) = config.get("nodes").and_then(Value::as_array) else { continue };
        for node in nodes {
            let Some(matches) = node.get("cpeMatch").and_then(Value::as_array) else { continue };
            for m in matches {
                let Some(criteria) = m.get("criteria").and_then(Value::as_str) else { continue };
                let parts: Vec<&str> = criteria.split(':').collect();
                if parts.len() > 4 {
                    let pair = (parts[3].to_string(), parts[4].to_string());
                    if !out.contains(&pair) {
                        out.push(pair);
                    }
                }
            }
        }
    }
    out
}

/// NVD 2.0 JSON vulnerability record: `{"cve": {"id", "descriptions", "metrics", ...}}`.
pub fn normalize_nvd_cve(source_id: &str, record: &Value) -> Option<Item> {
    let cve = record.get("cve")?;
    let id = cve.get("id").and_then(Value::as_str)?.to_string();
    let description = cve
        .get("descriptions")
        .and_then(Value::as_array)
        .and_then(|ds| ds.iter().find(|d| d.get("lang").and_then(Value::as_str) == Some("en")))
        .and_then(|d| d.get("value"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let published = cve.get("published").and_then(Value::as_str).unwrap_or("").to_string();
    let updated = cve.get("lastModified").and_then(Value::as_str).map(str::to_string);

    let vendor_products = extract_vendor_products(cve);
    let mut tags = vec!["nvd".to_string(), "cyber_cve".to_string()];
    for (vendor, product) in vendor_products.iter().take(5) {
        tags.push(format!("{vendor}/{product}"));
    }

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "json_api".to_string(),
        external_id: Some(id.clone()),
        url: format!("https://nvd.nist.gov/vuln/detail/{id}"),
        title: id,
        summary: truncate_300(&description),
        content: None,
        published_at: published,
        updated_at: updated,
        category: Category::CyberCve,
        tags,
        location: Location::unknown("CVE records carry no geography"),
        raw: json!({"vendor_products": vendor_products}),
    };
    Some(build_item(new))
}

/// CISA Known Exploited Vulnerabilities catalog entry.
pub fn normalize_cisa_kev(source_id: &str, record: &Value) -> Option<Item> {
    let cve_id = record.get("cveID").and_then(Value::as_str)?.to_string();
    let vendor = record.get("vendorProject").and_then(Value::as_str).unwrap_or("");
    let product = record.get("product").and_then(Value::as_str).unwrap_or("");
    let vulnerability_name = record.get("vulnerabilityName").and_then(Value::as_str).unwrap_or("");
    let description = record.get("shortDescription").and_then(Value::as_str).unwrap_or("");
    let date_added = record.get("dateAdded").and_then(Value::as_str).unwrap_or("");
    let due_date = record.get("dueDate").and_then(Value::as_str).map(str::to_string);

    let new = NewItem {
        source_id: source_id.to_string(),
        source_type: "json_api".to_string(),
        external_id: Some(cve_id.clone()),
        url: format!("https://nvd.nist.gov/vuln/detail/{cve_id}"),
        title: format!("{cve_id}: {vulnerability_name}"),
        summary: truncate_300(description),
        content: None,
        published_at: format!("{date_added}T00:00:00Z"),
        updated_at: due_date.map(|d| format!("{d}T00:00:00Z")),
        category: Category::CyberKev,
        tags: vec!["cisa".to_string(), "cyber_kev".to_string(), format!("{vendor}/{product}")],
        location: Location::unknown("KEV records carry no geography"),
        raw: json!({"vendor": vendor, "product": product}),
    };
    Some(build_item(new))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_vendor_product_from_cpe_criteria() {
        let cve = json!({
            "cve": {
                "id": "CVE-2024-0001",
                "descriptions": [{"lang": "en", "value": "An issue in Example Widget."}],
                "published": "2024-01-01T00:00:00",
                "configurations": [{
                    "nodes": [{"cpeMatch": [{"criteria": "cpe:2.3:a:example:widget:1.0:*:*:*:*:*:*:*"}]}]
                }],
            }
        });
        let item = normalize_nvd_cve("nvd-cve", &cve).unwrap();
        assert!(item.tags.contains(&"example/widget".to_string()));
    }

    #[test]
    fn kev_title_combines_cve_and_name() {
        let record = json!({
            "cveID": "CVE-2024-0002",
            "vendorProject": "Acme",
            "product": "Gadget",
            "vulnerabilityName": "Remote Code Execution",
            "shortDescription": "Exploited in the wild.",
            "dateAdded": "2024-01-05",
        });
        let item = normalize_cisa_kev("cisa-kev", &record).unwrap();
        assert_eq!(item.title, "CVE-2024-0002: Remote Code Execution");
    }
}
