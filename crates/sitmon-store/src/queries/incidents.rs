use rusqlite::{params, Connection, OptionalExtension};
use sitmon_model::{Category, Incident, IncidentStatus, LocationConfidence};

use crate::error::{Error, Result};

const INCIDENT_COLUMNS: &str = "incident_id, title, summary, category, first_seen_at, last_seen_at,
     last_item_at, status, severity_score, geom_geojson, lat, lon, bbox,
     location_confidence, location_rationale, incident_simhash, token_signature,
     item_count, source_count";

fn row_to_incident(row: &rusqlite::Row<'_>) -> rusqlite::Result<Incident> {
    Ok(Incident {
        incident_id: row.get("incident_id")?,
        title: row.get("title")?,
        summary: row.get("summary")?,
        category: row.get::<_, Category>("category")?,
        first_seen_at: row.get("first_seen_at")?,
        last_seen_at: row.get("last_seen_at")?,
        last_item_at: row.get("last_item_at")?,
        status: row.get::<_, IncidentStatus>("status")?,
        severity_score: row.get("severity_score")?,
        geom_geojson: row.get("geom_geojson")?,
        lat: row.get("lat")?,
        lon: row.get("lon")?,
        bbox: row.get("bbox")?,
        location_confidence: row.get::<_, LocationConfidence>("location_confidence")?,
        location_rationale: row.get("location_rationale")?,
        incident_simhash: row.get("incident_simhash")?,
        token_signature: row.get::<_, Option<String>>("token_signature")?.unwrap_or_default(),
        item_count: row.get("item_count")?,
        source_count: row.get("source_count")?,
    })
}

pub fn get(conn: &Connection, incident_id: &str) -> Result<Option<Incident>> {
    Ok(conn
        .query_row(
            &format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE incident_id = ?1;"),
            params![incident_id],
            row_to_incident,
        )
        .optional()?)
}

pub fn require(conn: &Connection, incident_id: &str) -> Result<Incident> {
    get(conn, incident_id)?.ok_or_else(|| Error::IncidentNotFound {
        incident_id: incident_id.to_owned(),
    })
}

/// Candidate incidents for matching: same category, same SimHash bucket, recent enough.
/// The bucket comparison is done on the raw signed column — SQLite's `>>` on a negative
/// i64 sign-extends, but masking with 0xFFFF after a 48-bit shift recovers exactly the
/// same top 16 bits as shifting the unsigned reinterpretation would.
pub fn candidates_by_bucket(
    conn: &Connection,
    category: Category,
    cutoff: &str,
    bucket: i64,
    limit: i64,
) -> Result<Vec<Incident>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INCIDENT_COLUMNS} FROM incidents
         WHERE category = ?1
           AND last_seen_at >= ?2
           AND ((incident_simhash >> 48) & 65535) = ?3
         ORDER BY last_seen_at DESC
         LIMIT ?4;"
    ))?;
    let rows = stmt.query_map(params![category, cutoff, bucket, limit], row_to_incident)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Same bucket/category/recency search excluding one incident, used by the post-update merge pass.
pub fn merge_candidates(
    conn: &Connection,
    category: Category,
    exclude_incident_id: &str,
    cutoff: &str,
    bucket: i64,
    limit: i64,
) -> Result<Vec<Incident>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INCIDENT_COLUMNS} FROM incidents
         WHERE category = ?1
           AND incident_id <> ?2
           AND last_seen_at >= ?3
           AND ((incident_simhash >> 48) & 65535) = ?4
         LIMIT ?5;"
    ))?;
    let rows = stmt.query_map(
        params![category, exclude_incident_id, cutoff, bucket, limit],
        row_to_incident,
    )?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

pub fn insert(conn: &Connection, incident: &Incident) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO incidents ({INCIDENT_COLUMNS}) VALUES (
               ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19
             );"
        ),
        params![
            incident.incident_id,
            incident.title,
            incident.summary,
            incident.category,
            incident.first_seen_at,
            incident.last_seen_at,
            incident.last_item_at,
            incident.status,
            incident.severity_score,
            incident.geom_geojson,
            incident.lat,
            incident.lon,
            incident.bbox,
            incident.location_confidence,
            incident.location_rationale,
            incident.incident_simhash,
            incident.token_signature,
            incident.item_count,
            incident.source_count,
        ],
    )?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn update_after_match(
    conn: &Connection,
    incident_id: &str,
    summary: &str,
    now: &str,
    last_item_at: &str,
    severity_score: f64,
    geom_geojson: Option<&str>,
    lat: Option<f64>,
    lon: Option<f64>,
    bbox: Option<&str>,
    location_confidence: LocationConfidence,
    location_rationale: &str,
    incident_simhash: i64,
    token_signature: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE incidents SET
           summary = ?2,
           last_seen_at = ?3,
           last_item_at = ?4,
           severity_score = ?5,
           geom_geojson = ?6,
           lat = ?7,
           lon = ?8,
           bbox = ?9,
           location_confidence = ?10,
           location_rationale = ?11,
           incident_simhash = ?12,
           token_signature = ?13
         WHERE incident_id = ?1;",
        params![
            incident_id,
            summary,
            now,
            last_item_at,
            severity_score,
            geom_geojson,
            lat,
            lon,
            bbox,
            location_confidence,
            location_rationale,
            incident_simhash,
            token_signature,
        ],
    )?;
    Ok(())
}

pub fn set_severity(conn: &Connection, incident_id: &str, severity_score: f64) -> Result<()> {
    conn.execute(
        "UPDATE incidents SET severity_score = ?2 WHERE incident_id = ?1;",
        params![incident_id, severity_score],
    )?;
    Ok(())
}

/// Recompute `item_count`/`source_count` from the junction table; returns the new counts.
pub fn recount(conn: &Connection, incident_id: &str) -> Result<(i64, i64)> {
    let (item_count, source_count): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COUNT(DISTINCT i.source_id)
         FROM incident_items ii
         JOIN items i ON i.item_id = ii.item_id
         WHERE ii.incident_id = ?1;",
        params![incident_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    conn.execute(
        "UPDATE incidents SET item_count = ?2, source_count = ?3 WHERE incident_id = ?1;",
        params![incident_id, item_count, source_count],
    )?;
    Ok((item_count, source_count))
}

pub fn link_item(conn: &Connection, incident_id: &str, item_id: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO incident_items (incident_id, item_id) VALUES (?1, ?2);",
        params![incident_id, item_id],
    )?;
    Ok(())
}

pub fn item_ids(conn: &Connection, incident_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT item_id FROM incident_items WHERE incident_id = ?1;")?;
    let rows = stmt.query_map(params![incident_id], |row| row.get(0))?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Reparent every item link from `from_incident_id` to `into_incident_id`, then delete the loser.
pub fn merge_into(conn: &Connection, into_incident_id: &str, from_incident_id: &str) -> Result<()> {
    for item_id in item_ids(conn, from_incident_id)? {
        link_item(conn, into_incident_id, &item_id)?;
    }
    conn.execute(
        "DELETE FROM incidents WHERE incident_id = ?1;",
        params![from_incident_id],
    )?;
    Ok(())
}

pub struct IncidentFilter<'a> {
    pub category: Option<Category>,
    pub since: Option<&'a str>,
    pub until: Option<&'a str>,
    pub min_lon: Option<f64>,
    pub min_lat: Option<f64>,
    pub max_lon: Option<f64>,
    pub max_lat: Option<f64>,
    pub min_severity: Option<f64>,
    pub search: Option<&'a str>,
    pub limit: i64,
}

/// Backs `/api/incidents`. Defaults in the caller should exclude `cyber_cve`/`cyber_kev`
/// from an unfiltered listing (per the reference query's default category exclusion).
pub fn list(conn: &Connection, filter: &IncidentFilter<'_>) -> Result<Vec<Incident>> {
    let sql = "SELECT incident_id, title, summary, category, first_seen_at, last_seen_at,
                      last_item_at, status, severity_score, geom_geojson, lat, lon, bbox,
                      location_confidence, location_rationale, incident_simhash, token_signature,
                      item_count, source_count
               FROM incidents
               WHERE (:search IS NULL OR incidents.rowid IN (
                       SELECT rowid FROM incidents_fts WHERE incidents_fts MATCH :search
                     ))
                 AND (:category IS NULL OR category = :category)
                 AND (:since IS NULL OR last_seen_at >= :since)
                 AND (:until IS NULL OR last_seen_at <= :until)
                 AND (:min_lon IS NULL OR (lon >= :min_lon AND lon <= :max_lon
                                            AND lat >= :min_lat AND lat <= :max_lat))
                 AND (:min_severity IS NULL OR severity_score >= :min_severity)
               ORDER BY last_seen_at DESC
               LIMIT :limit;";
    let mut stmt = conn.prepare(sql)?;
    let category_str = filter.category.map(|c| c.as_str());
    let rows = stmt.query_map(
        rusqlite::named_params! {
            ":search": filter.search,
            ":category": category_str,
            ":since": filter.since,
            ":until": filter.until,
            ":min_lon": filter.min_lon,
            ":max_lon": filter.max_lon,
            ":min_lat": filter.min_lat,
            ":max_lat": filter.max_lat,
            ":min_severity": filter.min_severity,
            ":limit": filter.limit,
        },
        row_to_incident,
    )?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Retention: `active` incidents idle for 24h become `cooling`; idle 72h become `resolved`.
pub fn advance_status(conn: &Connection, cooling_cutoff: &str, resolved_cutoff: &str) -> Result<()> {
    conn.execute(
        "UPDATE incidents SET status = 'cooling'
         WHERE status = 'active' AND last_seen_at < ?1;",
        params![cooling_cutoff],
    )?;
    conn.execute(
        "UPDATE incidents SET status = 'resolved'
         WHERE status <> 'resolved' AND last_seen_at < ?1;",
        params![resolved_cutoff],
    )?;
    Ok(())
}

pub fn delete_resolved_older_than(conn: &Connection, cutoff: &str) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM incidents WHERE status = 'resolved' AND last_seen_at < ?1;",
        params![cutoff],
    )?)
}
