use rusqlite::{params, Connection, OptionalExtension};
use sitmon_model::{Source, SourceType};

use crate::error::Result;

fn row_to_source(row: &rusqlite::Row<'_>) -> rusqlite::Result<Source> {
    Ok(Source {
        source_id: row.get("source_id")?,
        name: row.get("name")?,
        source_type: row.get::<_, SourceType>("source_type")?,
        url: row.get("url")?,
        poll_interval_seconds: row.get("poll_interval_seconds")?,
        enabled: row.get("enabled")?,
        etag: row.get("etag")?,
        last_modified: row.get("last_modified")?,
        next_fetch_at: row.get("next_fetch_at")?,
        last_fetch_at: row.get("last_fetch_at")?,
        last_success_at: row.get("last_success_at")?,
        last_error_at: row.get("last_error_at")?,
        consecutive_failures: row.get("consecutive_failures")?,
        last_status_code: row.get("last_status_code")?,
        last_fetch_ms: row.get("last_fetch_ms")?,
        last_error: row.get("last_error")?,
        success_count: row.get("success_count")?,
        error_count: row.get("error_count")?,
        cursor: row.get("cursor")?,
    })
}

const SOURCE_COLUMNS: &str = "source_id, name, source_type, url, poll_interval_seconds, enabled,
     etag, last_modified, next_fetch_at, last_fetch_at, last_success_at, last_error_at,
     consecutive_failures, last_status_code, last_fetch_ms, last_error,
     success_count, error_count, cursor";

/// Register a source, or leave schedule/health state untouched if it already exists.
pub fn register(conn: &Connection, source: &Source) -> Result<()> {
    conn.execute(
        "INSERT INTO sources (source_id, name, source_type, url, poll_interval_seconds, enabled)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(source_id) DO UPDATE SET
           name = excluded.name,
           source_type = excluded.source_type,
           url = excluded.url,
           poll_interval_seconds = excluded.poll_interval_seconds,
           enabled = excluded.enabled;",
        params![
            source.source_id,
            source.name,
            source.source_type,
            source.url,
            source.poll_interval_seconds,
            source.enabled,
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, source_id: &str) -> Result<Option<Source>> {
    Ok(conn
        .query_row(
            &format!("SELECT {SOURCE_COLUMNS} FROM sources WHERE source_id = ?1;"),
            params![source_id],
            row_to_source,
        )
        .optional()?)
}

pub fn list(conn: &Connection) -> Result<Vec<Source>> {
    let mut stmt = conn.prepare(&format!("SELECT {SOURCE_COLUMNS} FROM sources ORDER BY source_id;"))?;
    let rows = stmt.query_map([], row_to_source)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Sources due for polling, ordered so the most overdue is picked first.
pub fn due(conn: &Connection, now: &str, limit: i64) -> Result<Vec<Source>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SOURCE_COLUMNS} FROM sources
         WHERE enabled = 1 AND (next_fetch_at IS NULL OR next_fetch_at <= ?1)
         ORDER BY next_fetch_at ASC
         LIMIT ?2;"
    ))?;
    let rows = stmt.query_map(params![now, limit], row_to_source)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

pub fn set_cursor(conn: &Connection, source_id: &str, cursor: Option<&str>) -> Result<()> {
    conn.execute(
        "UPDATE sources SET cursor = ?2 WHERE source_id = ?1;",
        params![source_id, cursor],
    )?;
    Ok(())
}

pub fn set_conditional_cache(
    conn: &Connection,
    source_id: &str,
    etag: Option<&str>,
    last_modified: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE sources SET etag = COALESCE(?2, etag), last_modified = COALESCE(?3, last_modified)
         WHERE source_id = ?1;",
        params![source_id, etag, last_modified],
    )?;
    Ok(())
}

/// Health-tracker write: a successful poll. `next_fetch_at` must already be computed by the caller.
pub fn record_success(
    conn: &Connection,
    source_id: &str,
    now: &str,
    status: Option<i64>,
    elapsed_ms: Option<i64>,
    next_fetch_at: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE sources SET
           last_fetch_at = ?2,
           last_success_at = ?2,
           last_status_code = ?3,
           last_fetch_ms = ?4,
           consecutive_failures = 0,
           next_fetch_at = ?5,
           success_count = success_count + 1
         WHERE source_id = ?1;",
        params![source_id, now, status, elapsed_ms, next_fetch_at],
    )?;
    Ok(())
}

/// Health-tracker write: a failed poll. `next_fetch_at` must already be computed by the caller.
pub fn record_error(
    conn: &Connection,
    source_id: &str,
    now: &str,
    status: Option<i64>,
    elapsed_ms: Option<i64>,
    error_kind: &str,
    next_fetch_at: &str,
) -> Result<i64> {
    conn.execute(
        "UPDATE sources SET
           last_fetch_at = ?2,
           last_error_at = ?2,
           last_status_code = ?3,
           last_fetch_ms = ?4,
           last_error = ?5,
           consecutive_failures = consecutive_failures + 1,
           next_fetch_at = ?6,
           error_count = error_count + 1
         WHERE source_id = ?1;",
        params![source_id, now, status, elapsed_ms, error_kind, next_fetch_at],
    )?;
    let failures: i64 = conn.query_row(
        "SELECT consecutive_failures FROM sources WHERE source_id = ?1;",
        params![source_id],
        |row| row.get(0),
    )?;
    Ok(failures)
}
