use chrono::{SecondsFormat, TimeZone, Utc};

/// Truncates to 300 chars, appending `...` when truncation occurred — every family
/// that caps free-text summaries uses this exact width.
pub fn truncate_300(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 300 {
        s.to_string()
    } else {
        let mut out: String = chars[..297].iter().collect();
        out.push_str("...");
        out
    }
}

pub fn iso_from_epoch_ms(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now).to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn json_str(v: &serde_json::Value, key: &str) -> Option<String> {
    v.get(key).and_then(|x| x.as_str()).map(str::to_string)
}

pub fn json_f64(v: &serde_json::Value, key: &str) -> Option<f64> {
    v.get(key).and_then(|x| x.as_f64())
}
