use rusqlite::{params, Connection};

use crate::error::Result;

pub struct PlaceRow {
    pub place_id: i64,
    pub name: String,
    pub normalized_name: String,
    pub kind: String,
    pub country_code: Option<String>,
    pub admin1: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub importance: Option<f64>,
}

/// Seed a single gazetteer entry; duplicates on `(kind, normalized_name)` are ignored.
pub fn insert_ignore(
    conn: &Connection,
    name: &str,
    normalized_name: &str,
    kind: &str,
    country_code: Option<&str>,
    admin1: Option<&str>,
    lat: Option<f64>,
    lon: Option<f64>,
    importance: Option<f64>,
) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO places
           (name, normalized_name, kind, country_code, admin1, lat, lon, importance)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
        params![name, normalized_name, kind, country_code, admin1, lat, lon, importance],
    )?;
    Ok(())
}

pub fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM places;", [], |row| row.get(0))?)
}

pub fn by_normalized_prefix(conn: &Connection, prefix: &str, limit: i64) -> Result<Vec<PlaceRow>> {
    let mut stmt = conn.prepare(
        "SELECT place_id, name, normalized_name, kind, country_code, admin1, lat, lon, importance
         FROM places
         WHERE normalized_name LIKE ?1
         ORDER BY importance DESC NULLS LAST
         LIMIT ?2;",
    )?;
    let like_pattern = format!("{prefix}%");
    let rows = stmt.query_map(params![like_pattern, limit], |row| {
        Ok(PlaceRow {
            place_id: row.get(0)?,
            name: row.get(1)?,
            normalized_name: row.get(2)?,
            kind: row.get(3)?,
            country_code: row.get(4)?,
            admin1: row.get(5)?,
            lat: row.get(6)?,
            lon: row.get(7)?,
            importance: row.get(8)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Batch lookup for gazetteer n-gram matching: every place whose `normalized_name` is one of
/// `names`, across all kinds.
pub fn by_normalized_names(conn: &Connection, names: &[String]) -> Result<Vec<PlaceRow>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = names.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT place_id, name, normalized_name, kind, country_code, admin1, lat, lon, importance
         FROM places
         WHERE normalized_name IN ({placeholders});"
    );
    let mut stmt = conn.prepare(&sql)?;
    let params = rusqlite::params_from_iter(names.iter());
    let rows = stmt.query_map(params, |row| {
        Ok(PlaceRow {
            place_id: row.get(0)?,
            name: row.get(1)?,
            normalized_name: row.get(2)?,
            kind: row.get(3)?,
            country_code: row.get(4)?,
            admin1: row.get(5)?,
            lat: row.get(6)?,
            lon: row.get(7)?,
            importance: row.get(8)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

pub fn by_kind_and_name(conn: &Connection, kind: &str, normalized_name: &str) -> Result<Option<PlaceRow>> {
    use rusqlite::OptionalExtension;
    Ok(conn
        .query_row(
            "SELECT place_id, name, normalized_name, kind, country_code, admin1, lat, lon, importance
             FROM places WHERE kind = ?1 AND normalized_name = ?2;",
            params![kind, normalized_name],
            |row| {
                Ok(PlaceRow {
                    place_id: row.get(0)?,
                    name: row.get(1)?,
                    normalized_name: row.get(2)?,
                    kind: row.get(3)?,
                    country_code: row.get(4)?,
                    admin1: row.get(5)?,
                    lat: row.get(6)?,
                    lon: row.get(7)?,
                    importance: row.get(8)?,
                })
            },
        )
        .optional()?)
}
