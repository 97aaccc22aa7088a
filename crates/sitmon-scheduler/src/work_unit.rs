//! One source, one poll cycle (spec.md §4.6 "Work unit"): fetch, parse, normalize,
//! deduplicate, insert, cluster, publish. Failures at any stage record health and return;
//! they never propagate to the rest of the scheduler.

use chrono::{Duration, Utc};
use sitmon_bus::EventBus;
use sitmon_model::{BusEvent, Category};
use sitmon_store::{queries, Store};

use crate::plugin::{Plugin, SessionAuth};
use crate::PluginRegistry;

/// POSTs `{identifier, password}` to the adapter's login endpoint and pulls the bearer
/// token out of the well-known `accessJwt`/`access_token` response fields (spec.md §4.6
/// work-unit step 2, e.g. Bluesky's `com.atproto.server.createSession`).
async fn obtain_session_token(client: &reqwest::Client, auth: &SessionAuth) -> Result<String, String> {
    let response = client
        .post(&auth.login_url)
        .json(&serde_json::json!({"identifier": auth.identifier, "password": auth.password}))
        .send()
        .await
        .map_err(|_| "request_failed".to_string())?;

    if !response.status().is_success() {
        return Err(format!("http_{}", response.status().as_u16()));
    }
    let body: serde_json::Value = response.json().await.map_err(|_| "bad_response".to_string())?;
    body.get("accessJwt")
        .or_else(|| body.get("access_token"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| "no_token_in_response".to_string())
}

async fn fail(store: &Store, bus: &EventBus, source_id: &str, status: Option<i64>, elapsed_ms: Option<i64>, error_kind: &str) {
    match sitmon_health::record_fetch_error(store, source_id, status, elapsed_ms, error_kind) {
        Ok(backoff) => {
            bus.publish(BusEvent::source_health(source_id, status, Some(backoff))).await;
        }
        Err(error) => tracing::error!(?error, source_id, "failed to record fetch error"),
    }
}

pub async fn run(store: &Store, bus: &EventBus, client: &reqwest::Client, plugin: &Plugin, user_agent: &str) {
    let existing = match store.with_conn(|conn| queries::sources::get(conn, &plugin.source_id)) {
        Ok(Some(source)) => source,
        Ok(None) => {
            tracing::warn!(source_id = %plugin.source_id, "plugin has no source row, skipping cycle");
            return;
        }
        Err(error) => {
            tracing::error!(?error, source_id = %plugin.source_id, "failed to load source row");
            return;
        }
    };

    let url = match &plugin.build_url {
        Some(build) => build(&existing),
        None => plugin.url.clone(),
    };

    let mut extra_headers: Vec<(String, String)> = plugin.headers.clone();
    if let Some(session_auth) = &plugin.session_auth {
        match obtain_session_token(client, session_auth).await {
            Ok(token) => extra_headers.push(("Authorization".to_string(), format!("Bearer {token}"))),
            Err(reason) => {
                fail(store, bus, &plugin.source_id, None, None, &format!("auth_{reason}")).await;
                return;
            }
        }
    }
    let extra_headers: Vec<(&str, &str)> =
        extra_headers.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

    let outcome = sitmon_fetch::fetch(
        client,
        &url,
        user_agent,
        existing.etag.as_deref(),
        existing.last_modified.as_deref(),
        &extra_headers,
    )
    .await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(error) => {
            let elapsed_ms = Some(error.elapsed_ms() as i64);
            fail(store, bus, &plugin.source_id, None, elapsed_ms, &error.error_kind()).await;
            return;
        }
    };

    let elapsed_ms = Some(outcome.elapsed_ms as i64);
    let cache_control = outcome.headers.get("cache-control").map(String::as_str);
    let max_age = sitmon_fetch::cache_control_max_age_seconds(cache_control);

    match outcome.status {
        304 => {
            let next_in = max_age.unwrap_or(plugin.poll_interval_seconds);
            if let Err(error) =
                sitmon_health::record_fetch_success(store, &plugin.source_id, Some(304), elapsed_ms, next_in)
            {
                tracing::error!(?error, source_id = %plugin.source_id, "failed to record 304 success");
            }
            bus.publish(BusEvent::source_health(&plugin.source_id, Some(304), None)).await;
            return;
        }
        429 => {
            let backoff =
                match sitmon_health::record_fetch_error(store, &plugin.source_id, Some(429), elapsed_ms, "http_429") {
                    Ok(b) => b,
                    Err(error) => {
                        tracing::error!(?error, source_id = %plugin.source_id, "failed to record http_429");
                        return;
                    }
                };
            if let Some(retry_after) = sitmon_fetch::retry_after_seconds(outcome.headers.get("retry-after").map(String::as_str))
            {
                if retry_after > backoff {
                    if let Err(error) =
                        sitmon_health::override_next_fetch_at(store, &plugin.source_id, retry_after)
                    {
                        tracing::error!(?error, source_id = %plugin.source_id, "failed to override next_fetch_at");
                    }
                }
            }
            bus.publish(BusEvent::source_health(&plugin.source_id, Some(429), Some(backoff))).await;
            return;
        }
        200 => {}
        other => {
            let error_kind = format!("http_{other}");
            fail(store, bus, &plugin.source_id, Some(other as i64), elapsed_ms, &error_kind).await;
            return;
        }
    }

    let Some(body) = outcome.body else {
        fail(store, bus, &plugin.source_id, Some(200), elapsed_ms, "http_200_empty_body").await;
        return;
    };

    let records = match (plugin.parse)(&body) {
        Ok(records) => records,
        Err(error) => {
            tracing::warn!(?error, source_id = %plugin.source_id, "parse failed");
            fail(store, bus, &plugin.source_id, Some(200), elapsed_ms, "parse_error").await;
            return;
        }
    };

    if let Err(error) = store.with_conn(|conn| {
        queries::sources::set_conditional_cache(
            conn,
            &plugin.source_id,
            outcome.headers.get("etag").map(String::as_str),
            outcome.headers.get("last-modified").map(String::as_str),
        )
    }) {
        tracing::error!(?error, source_id = %plugin.source_id, "failed to persist conditional cache headers");
    }

    let dedup_cutoff = (Utc::now() - Duration::hours(24)).format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let mut newest_cursor: Option<String> = None;
    let mut published_events = Vec::new();

    for record in &records {
        let Some(item) = (plugin.normalize)(record) else { continue };

        if plugin.cursored {
            if newest_cursor.is_none() || item.external_id.as_deref() > newest_cursor.as_deref() {
                newest_cursor = item.external_id.clone();
            }
        }

        let duplicate = store.with_conn(|conn| -> sitmon_store::Result<bool> {
            if item.category == Category::News {
                if let Some(external_id) = &item.external_id {
                    return queries::items::source_external_exists(conn, &item.source_id, external_id);
                }
            }
            queries::items::recent_hash_title_exists(conn, &item.source_id, &item.hash_title, &dedup_cutoff)
        });

        let duplicate = match duplicate {
            Ok(dup) => dup,
            Err(error) => {
                tracing::error!(?error, source_id = %plugin.source_id, "dedup check failed");
                continue;
            }
        };
        if duplicate {
            continue;
        }

        let insert_result = store.with_conn(|conn| queries::items::insert(conn, &item));
        match insert_result {
            Ok(()) => {}
            Err(sitmon_store::Error::DuplicateInsert { .. }) => continue,
            Err(error) => {
                tracing::error!(?error, source_id = %plugin.source_id, "item insert failed");
                continue;
            }
        }

        match sitmon_cluster::assign_item_to_incident(store, &item.item_id) {
            Ok(outcome) => published_events.push(outcome.event),
            Err(error) => {
                tracing::error!(?error, item_id = %item.item_id, "clustering failed for inserted item");
            }
        }
    }

    if plugin.cursored {
        if let Some(cursor) = newest_cursor {
            if let Err(error) = store.with_conn(|conn| queries::sources::set_cursor(conn, &plugin.source_id, Some(&cursor))) {
                tracing::error!(?error, source_id = %plugin.source_id, "failed to persist cursor");
            }
        }
    }

    let next_in = next_fetch_seconds(plugin, max_age, &records);
    if let Err(error) =
        sitmon_health::record_fetch_success(store, &plugin.source_id, Some(200), elapsed_ms, next_in)
    {
        tracing::error!(?error, source_id = %plugin.source_id, "failed to record success");
    }
    bus.publish(BusEvent::source_health(&plugin.source_id, Some(200), None)).await;

    for event in published_events {
        bus.publish(event).await;
    }
}

/// Tsunami feeds shorten their next poll to 90s when the fetch actually returned
/// records, 300s otherwise; every other plugin uses `Cache-Control: max-age` when
/// present, falling back to its configured interval (spec.md §4.6 step 11).
fn next_fetch_seconds(plugin: &Plugin, max_age: Option<i64>, records: &[sitmon_parsers::RawRecord]) -> i64 {
    if plugin.source_id.contains("tsunami") {
        return if records.is_empty() { 300 } else { 90 };
    }
    max_age.unwrap_or(plugin.poll_interval_seconds)
}
