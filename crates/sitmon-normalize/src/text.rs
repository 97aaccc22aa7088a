use std::sync::OnceLock;

use regex::Regex;
use url::Url;

fn punct_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]+").unwrap())
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Casefolds, strips punctuation, and collapses whitespace, so near-duplicate titles
/// compare equal regardless of styling.
pub fn normalize_title(title: &str) -> String {
    let folded = title.trim().to_lowercase();
    let no_punct = punct_re().replace_all(&folded, " ");
    whitespace_re().replace_all(no_punct.trim(), " ").into_owned()
}

const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_cid", "mc_eid", "mkt_tok"];

/// Lowercases the host, strips the fragment, and drops tracking query parameters
/// (`utm_*` and the fixed tracking-param set) while preserving the rest in order.
pub fn canonicalize_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };

    let host = url.host_str().map(|h| h.to_lowercase());
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| {
            let lower = key.to_lowercase();
            !lower.starts_with("utm_") && !TRACKING_PARAMS.contains(&lower.as_str())
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if let Some(host) = host {
        let _ = url.set_host(Some(&host));
    }
    url.set_fragment(None);
    if kept.is_empty() {
        url.set_query(None);
    } else {
        let query = kept
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding_escape(k), urlencoding_escape(v)))
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&query));
    }
    url.to_string()
}

fn urlencoding_escape(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_strips_punctuation_and_case() {
        assert_eq!(normalize_title("M 5.1 - Offshore, Oaxaca!"), "m 5 1 offshore oaxaca");
    }

    #[test]
    fn url_drops_tracking_params_and_fragment() {
        let out = canonicalize_url("HTTPS://Example.COM/a?utm_source=x&id=1&fbclid=y#frag");
        assert_eq!(out, "https://example.com/a?id=1");
    }
}
