//! Health tracker (spec.md §4.3): records per-source success/failure and computes the
//! next-fetch time with exponential backoff. Both operations write under the store mutex.

use chrono::{Duration, SecondsFormat, Utc};
use sitmon_store::{queries, Result, Store};

const MAX_BACKOFF_SECONDS: i64 = 60 * 60;

/// `min(3600, poll_interval * 2^failures)`, 0 failures meaning "use the plain interval".
pub fn compute_backoff_seconds(poll_interval_seconds: i64, consecutive_failures: i64) -> i64 {
    if consecutive_failures <= 0 {
        return poll_interval_seconds;
    }
    let exponent = consecutive_failures.min(20) as u32;
    let backoff = poll_interval_seconds.saturating_mul(1i64 << exponent);
    backoff.min(MAX_BACKOFF_SECONDS)
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn offset_iso(seconds: i64) -> String {
    (Utc::now() + Duration::seconds(seconds)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[allow(clippy::too_many_arguments)]
pub fn record_fetch_success(
    store: &Store,
    source_id: &str,
    status_code: Option<i64>,
    fetch_ms: Option<i64>,
    next_fetch_in_seconds: i64,
) -> Result<()> {
    let now = now_iso();
    let next_fetch_at = offset_iso(next_fetch_in_seconds);
    store.with_conn(|conn| {
        queries::sources::record_success(conn, source_id, &now, status_code, fetch_ms, &next_fetch_at)
    })
}

/// Returns the computed backoff in seconds, mirroring the Python reference's return value
/// (the scheduler uses it only to decide whether a `Retry-After` override is larger).
pub fn record_fetch_error(
    store: &Store,
    source_id: &str,
    status_code: Option<i64>,
    fetch_ms: Option<i64>,
    error_kind: &str,
) -> Result<i64> {
    store.with_conn(|conn| {
        let source = queries::sources::get(conn, source_id)?;
        let Some(source) = source else {
            return Ok(300);
        };
        let failures = source.consecutive_failures + 1;
        let backoff = compute_backoff_seconds(source.poll_interval_seconds, failures);
        let now = now_iso();
        let next_fetch_at = offset_iso(backoff);
        queries::sources::record_error(
            conn,
            source_id,
            &now,
            status_code,
            fetch_ms,
            error_kind,
            &next_fetch_at,
        )?;
        Ok(backoff)
    })
}

/// Overrides `next_fetch_at` to `now + retry_after_seconds` when that's further out than
/// the backoff already computed by [`record_fetch_error`] (spec.md §4.6 step 6).
pub fn override_next_fetch_at(store: &Store, source_id: &str, retry_after_seconds: i64) -> Result<()> {
    let next_fetch_at = offset_iso(retry_after_seconds);
    store.with_conn(|conn| {
        conn.execute(
            "UPDATE sources SET next_fetch_at = ?2 WHERE source_id = ?1;",
            rusqlite::params![source_id, next_fetch_at],
        )?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitmon_model::{Source, SourceType};

    fn sample_source(poll_interval_seconds: i64) -> Source {
        Source {
            source_id: "usgs_quake".into(),
            name: "USGS earthquakes".into(),
            source_type: SourceType::GeojsonApi,
            url: "https://example.test/quakes.geojson".into(),
            poll_interval_seconds,
            enabled: true,
            etag: None,
            last_modified: None,
            next_fetch_at: None,
            last_fetch_at: None,
            last_success_at: None,
            last_error_at: None,
            consecutive_failures: 0,
            last_status_code: None,
            last_fetch_ms: None,
            last_error: None,
            success_count: 0,
            error_count: 0,
            cursor: None,
        }
    }

    #[test]
    fn backoff_doubles_per_failure_and_caps_at_an_hour() {
        assert_eq!(compute_backoff_seconds(60, 0), 60);
        assert_eq!(compute_backoff_seconds(60, 1), 120);
        assert_eq!(compute_backoff_seconds(60, 2), 240);
        assert_eq!(compute_backoff_seconds(60, 10), 3600);
    }

    #[test]
    fn success_clears_failures_and_advances_next_fetch() {
        let store = Store::open_in_memory().unwrap();
        store.with_conn(|conn| queries::sources::register(conn, &sample_source(60))).unwrap();
        store
            .with_conn(|conn| {
                queries::sources::record_error(conn, "usgs_quake", "2026-01-01T00:00:00Z", None, None, "timeout", "2026-01-01T00:01:00Z")
            })
            .unwrap();

        record_fetch_success(&store, "usgs_quake", Some(200), Some(120), 60).unwrap();
        let source = store.with_conn(|conn| queries::sources::get(conn, "usgs_quake")).unwrap().unwrap();
        assert_eq!(source.consecutive_failures, 0);
        assert_eq!(source.last_status_code, Some(200));
    }

    #[test]
    fn error_increments_failures_and_grows_backoff() {
        let store = Store::open_in_memory().unwrap();
        store.with_conn(|conn| queries::sources::register(conn, &sample_source(60))).unwrap();

        let first = record_fetch_error(&store, "usgs_quake", Some(500), Some(50), "http_500").unwrap();
        assert_eq!(first, 120);
        let second = record_fetch_error(&store, "usgs_quake", Some(500), Some(50), "http_500").unwrap();
        assert_eq!(second, 240);

        let source = store.with_conn(|conn| queries::sources::get(conn, "usgs_quake")).unwrap().unwrap();
        assert_eq!(source.consecutive_failures, 2);
        assert_eq!(source.last_error.as_deref(), Some("http_500"));
    }

    #[test]
    fn unknown_source_error_falls_back_to_default_backoff() {
        let store = Store::open_in_memory().unwrap();
        let backoff = record_fetch_error(&store, "missing", None, None, "timeout").unwrap();
        assert_eq!(backoff, 300);
    }
}
