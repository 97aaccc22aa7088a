use rusqlite::{params, Connection, OptionalExtension};
use sitmon_model::{Category, Item, LocationConfidence};

use crate::error::{Error, Result};

const ITEM_COLUMNS: &str = "item_id, source_id, source_type, external_id, url, title, summary, content,
     published_at, updated_at, fetched_at, category, tags,
     geom_geojson, lat, lon, location_name, location_confidence, location_rationale,
     raw, hash_title, hash_content, simhash";

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<Item> {
    let tags_json: String = row.get("tags")?;
    let raw_json: String = row.get("raw")?;
    Ok(Item {
        item_id: row.get("item_id")?,
        source_id: row.get("source_id")?,
        source_type: row.get("source_type")?,
        external_id: row.get("external_id")?,
        url: row.get("url")?,
        title: row.get("title")?,
        summary: row.get("summary")?,
        content: row.get("content")?,
        published_at: row.get("published_at")?,
        updated_at: row.get("updated_at")?,
        fetched_at: row.get("fetched_at")?,
        category: row.get::<_, Category>("category")?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        geom_geojson: row.get("geom_geojson")?,
        lat: row.get("lat")?,
        lon: row.get("lon")?,
        location_name: row.get("location_name")?,
        location_confidence: row.get::<_, LocationConfidence>("location_confidence")?,
        location_rationale: row.get("location_rationale")?,
        raw: serde_json::from_str(&raw_json).unwrap_or(serde_json::Value::Null),
        hash_title: row.get("hash_title")?,
        hash_content: row.get("hash_content")?,
        simhash: row.get("simhash")?,
    })
}

pub fn get(conn: &Connection, item_id: &str) -> Result<Option<Item>> {
    Ok(conn
        .query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE item_id = ?1;"),
            params![item_id],
            row_to_item,
        )
        .optional()?)
}

pub fn require(conn: &Connection, item_id: &str) -> Result<Item> {
    get(conn, item_id)?.ok_or_else(|| Error::ItemNotFound {
        item_id: item_id.to_owned(),
    })
}

pub fn list_for_incident(conn: &Connection, incident_id: &str) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM items
         JOIN incident_items ii ON ii.item_id = items.item_id
         WHERE ii.incident_id = ?1
         ORDER BY published_at DESC;"
    ))?;
    let rows = stmt.query_map(params![incident_id], row_to_item)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

pub fn url_exists(conn: &Connection, url: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM items WHERE url = ?1);",
        params![url],
        |row| row.get(0),
    )?)
}

pub fn source_external_exists(conn: &Connection, source_id: &str, external_id: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM items WHERE source_id = ?1 AND external_id = ?2);",
        params![source_id, external_id],
        |row| row.get(0),
    )?)
}

/// `items.category = 'news'` dedup check (spec.md §4.6, "Deduplication on insert").
pub fn recent_hash_title_exists(
    conn: &Connection,
    source_id: &str,
    hash_title: &str,
    published_after: &str,
) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(
           SELECT 1 FROM items
           WHERE source_id = ?1 AND hash_title = ?2 AND published_at >= ?3
         );",
        params![source_id, hash_title, published_after],
        |row| row.get(0),
    )?)
}

pub fn insert(conn: &Connection, item: &Item) -> Result<()> {
    let tags_json = serde_json::to_string(&item.tags)?;
    let raw_json = serde_json::to_string(&item.raw)?;
    let result = conn.execute(
        &format!(
            "INSERT INTO items ({ITEM_COLUMNS}) VALUES (
               ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
               ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23
             );"
        ),
        params![
            item.item_id,
            item.source_id,
            item.source_type,
            item.external_id,
            item.url,
            item.title,
            item.summary,
            item.content,
            item.published_at,
            item.updated_at,
            item.fetched_at,
            item.category,
            tags_json,
            item.geom_geojson,
            item.lat,
            item.lon,
            item.location_name,
            item.location_confidence,
            item.location_rationale,
            raw_json,
            item.hash_title,
            item.hash_content,
            item.simhash,
        ],
    );
    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(Error::DuplicateInsert {
                url: item.url.clone(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

pub struct ItemFilter<'a> {
    pub category: Option<Category>,
    pub since: Option<&'a str>,
    pub until: Option<&'a str>,
    pub min_lon: Option<f64>,
    pub min_lat: Option<f64>,
    pub max_lon: Option<f64>,
    pub max_lat: Option<f64>,
    pub search: Option<&'a str>,
    pub limit: i64,
}

/// Backs the `/api/items` read surface (query shape grounded on the `_query_incidents`
/// filter semantics, adapted for items). Every clause is `(:param IS NULL OR ...)` so a
/// single prepared statement serves every combination of filters.
pub fn list(conn: &Connection, filter: &ItemFilter<'_>) -> Result<Vec<Item>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM items
         WHERE (:search IS NULL OR items.rowid IN (
                 SELECT rowid FROM items_fts WHERE items_fts MATCH :search
               ))
           AND (:category IS NULL OR category = :category)
           AND (:since IS NULL OR published_at >= :since)
           AND (:until IS NULL OR published_at <= :until)
           AND (:min_lon IS NULL OR (lon >= :min_lon AND lon <= :max_lon
                                      AND lat >= :min_lat AND lat <= :max_lat))
         ORDER BY published_at DESC
         LIMIT :limit;"
    );

    let mut stmt = conn.prepare(&sql)?;
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
            ":limit": filter.limit,
        },
        row_to_item,
    )?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Retention: delete items older than `retention_days` whose incident is not active/cooling.
pub fn delete_stale(conn: &Connection, cutoff: &str) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM items
         WHERE published_at < ?1
           AND item_id NOT IN (
             SELECT ii.item_id FROM incident_items ii
             JOIN incidents i ON i.incident_id = ii.incident_id
             WHERE i.status IN ('active', 'cooling')
           );",
        params![cutoff],
    )?)
}
