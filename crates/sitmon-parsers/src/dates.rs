use chrono::{DateTime, NaiveDateTime, Utc};

/// Parses an RFC-2822 date (`Mon, 02 Jan 2006 15:04:05 GMT`), as found in RSS
/// `pubDate`/Atom-adjacent feeds, into a UTC ISO-8601 string. Returns `None` on any
/// malformed input rather than propagating an error — a single bad timestamp in a
/// feed shouldn't fail the whole fetch.
pub fn rfc2822_to_iso(s: &str) -> Option<String> {
    DateTime::parse_from_rfc2822(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc).to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

/// Parses an ISO-8601 timestamp that may or may not carry a `Z`/offset suffix,
/// treating a naive (offset-less) timestamp as already UTC. Mirrors the Python
/// `_to_iso` helper used by the Atom and CAP parsers.
pub fn to_iso(s: &str) -> Option<String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).to_rfc3339_opts(chrono::SecondsFormat::Secs, true));
    }
    let normalized = s.strip_suffix('Z').unwrap_or(s);
    if let Ok(naive) = NaiveDateTime::parse_from_str(normalized, "%Y-%m-%dT%H:%M:%S") {
        return Some(
            DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        );
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(normalized, "%Y-%m-%d %H:%M:%S") {
        return Some(
            DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        );
    }
    None
}
