//! Conditional HTTP fetching (spec.md §4.2). Pure network boundary: no retries, no
//! knowledge of the store or the scheduler's backoff policy.

mod error;

use std::collections::HashMap;
use std::time::Duration;

pub use error::{FetchError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(15);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a single conditional fetch. `body` is only populated for status 200.
#[derive(Debug)]
pub struct FetchOutcome {
    pub status: u16,
    pub body: Option<Vec<u8>>,
    pub headers: HashMap<String, String>,
    pub elapsed_ms: u64,
}

/// Builds the shared client the scheduler holds for its lifetime. Read timeout doubles as
/// the per-request timeout; connect/pool timeouts are configured separately.
pub fn build_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(READ_TIMEOUT)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
}

/// Fetch `url`, sending conditional headers when the caller has cached validators.
/// Never retries; never inspects the body for anything other than `status == 200`.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    user_agent: &str,
    etag: Option<&str>,
    last_modified: Option<&str>,
    extra_headers: &[(&str, &str)],
) -> Result<FetchOutcome> {
    let mut request = client
        .get(url)
        .header(reqwest::header::USER_AGENT, user_agent)
        .header(
            reqwest::header::ACCEPT,
            "application/json, application/xml, application/rss+xml, text/xml, */*",
        );
    if let Some(etag) = etag {
        request = request.header(reqwest::header::IF_NONE_MATCH, etag);
    }
    if let Some(last_modified) = last_modified {
        request = request.header(reqwest::header::IF_MODIFIED_SINCE, last_modified);
    }
    for (key, value) in extra_headers {
        request = request.header(*key, *value);
    }

    let started = std::time::Instant::now();
    let response = request.send().await.map_err(|source| classify(url, started, source))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
        .collect();

    let body = if status == 200 {
        Some(
            response
                .bytes()
                .await
                .map_err(|source| classify(url, started, source))?
                .to_vec(),
        )
    } else {
        None
    };

    Ok(FetchOutcome {
        status,
        body,
        headers,
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}

fn classify(url: &str, started: std::time::Instant, source: reqwest::Error) -> FetchError {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if source.is_timeout() {
        FetchError::Timeout { url: url.to_string(), elapsed_ms }
    } else {
        FetchError::Request { url: url.to_string(), elapsed_ms, source }
    }
}

/// Parses `max-age=<seconds>` out of a `Cache-Control` header value.
pub fn cache_control_max_age_seconds(cache_control: Option<&str>) -> Option<i64> {
    let cache_control = cache_control?;
    for directive in cache_control.split(',') {
        let directive = directive.trim();
        if let Some(rest) = directive.strip_prefix("max-age=") {
            if let Ok(seconds) = rest.trim().parse::<i64>() {
                return Some(seconds);
            }
        }
    }
    None
}

/// Parses a `Retry-After` header that names a delta-seconds value (the only form the
/// sources in this registry send; HTTP-date `Retry-After` values are not produced by them).
pub fn retry_after_seconds(retry_after: Option<&str>) -> Option<i64> {
    retry_after.and_then(|v| v.trim().parse::<i64>().ok()).filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_age_is_parsed_from_cache_control() {
        assert_eq!(cache_control_max_age_seconds(Some("public, max-age=120")), Some(120));
        assert_eq!(cache_control_max_age_seconds(Some("no-cache")), None);
        assert_eq!(cache_control_max_age_seconds(None), None);
    }

    #[test]
    fn retry_after_rejects_non_positive_values() {
        assert_eq!(retry_after_seconds(Some("120")), Some(120));
        assert_eq!(retry_after_seconds(Some("0")), None);
        assert_eq!(retry_after_seconds(Some("-5")), None);
        assert_eq!(retry_after_seconds(Some("Wed, 21 Oct 2026 07:28:00 GMT")), None);
    }
}
