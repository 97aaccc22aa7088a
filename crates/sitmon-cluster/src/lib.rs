//! Incident clustering (spec.md §4.7): assigns a freshly-inserted item to a new or
//! existing incident, then looks for any same-category incident it should absorb.
//! The whole operation runs inside one store transaction so candidate lookup, the
//! incident write, and the junction insert are never observed half-done.

pub mod error;
mod severity;

use chrono::Utc;
use rusqlite::Connection;
use sitmon_geo::{bbox_from_geojson, haversine_km, Bbox};
use sitmon_model::{BusEvent, Category, Incident, IncidentStatus, Item};
use sitmon_normalize::{hamming_distance, i64_to_u64, simhash64, token_jaccard, u64_to_i64};
use sitmon_store::{queries, Store};

pub use error::{ClusterError, Result};
pub use severity::{incident_summary_from_item, severity_score, token_signature};

const CANDIDATE_LIMIT: i64 = 200;
const MERGE_CANDIDATE_LIMIT: i64 = 50;

/// Outcome of [`assign_item_to_incident`]: the affected incident and the bus event to publish.
pub struct ClusterOutcome {
    pub incident_id: String,
    pub event: BusEvent,
}

fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn bucket_of(simhash: i64) -> i64 {
    ((i64_to_u64(simhash) >> 48) & 0xFFFF) as i64
}

fn candidate_lookback_hours(category: Category) -> i64 {
    if category == Category::News {
        24
    } else {
        48
    }
}

fn item_bbox_of(item: &Item) -> Option<Bbox> {
    let geom = item.geom_geojson.as_ref()?;
    let value: serde_json::Value = serde_json::from_str(geom).ok()?;
    bbox_from_geojson(&value)
}

/// Assigns `item_id` to a matching incident, or creates one. Must be called with an
/// already-inserted item; the item row is read back inside the same transaction.
pub fn assign_item_to_incident(store: &Store, item_id: &str) -> Result<ClusterOutcome> {
    let outcome = store.transaction(|conn| {
        let item = queries::items::require(conn, item_id)?;
        let now = now_iso();
        let item_bbox = item_bbox_of(&item);

        let thresholds = item.category.cluster_thresholds();
        let cutoff = (Utc::now() - chrono::Duration::hours(candidate_lookback_hours(item.category)))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();
        let bucket = bucket_of(item.simhash);

        let candidates = queries::incidents::candidates_by_bucket(
            conn,
            item.category,
            &cutoff,
            bucket,
            CANDIDATE_LIMIT,
        )?;

        let item_simhash_u = i64_to_u64(item.simhash);
        let mut best: Option<&Incident> = None;
        let mut best_distance = u32::MAX;
        for candidate in &candidates {
            let dist = hamming_distance(item_simhash_u, i64_to_u64(candidate.incident_simhash));
            if dist < best_distance {
                best = Some(candidate);
                best_distance = dist;
            }
        }

        let matched_incident_id = match best {
            Some(candidate) if best_distance <= thresholds.tight_dist => {
                Some(candidate.incident_id.clone())
            }
            Some(candidate)
                if best_distance > thresholds.tight_dist && best_distance <= thresholds.loose_dist =>
            {
                let item_text = format!("{} {}", item.title, item.summary);
                let candidate_text = format!("{} {}", candidate.title, candidate.summary);
                if token_jaccard(&item_text, &candidate_text) >= thresholds.jaccard_floor {
                    Some(candidate.incident_id.clone())
                } else {
                    None
                }
            }
            _ => None,
        };

        let item_score = severity_score(item.category, &item.raw);

        let outcome = match matched_incident_id {
            None => create_incident(conn, &item, &now, item_score, item_bbox.as_ref())?,
            Some(incident_id) => {
                update_incident(conn, &incident_id, &item, &now, item_score, item_bbox.as_ref())?
            }
        };

        Ok(outcome)
    });
    outcome.map_err(|e| match e {
        sitmon_store::Error::IncidentNotFound { incident_id } => {
            ClusterError::IncidentMissing { incident_id }
        }
        other => ClusterError::Store(other),
    })
}

fn create_incident(
    conn: &Connection,
    item: &Item,
    now: &str,
    item_score: f64,
    item_bbox: Option<&Bbox>,
) -> sitmon_store::Result<ClusterOutcome> {
    let summary = incident_summary_from_item(item.category, &item.title, &item.summary);
    let sig = token_signature(&summary);
    let token_signature = if sig.is_empty() { None } else { Some(sig) };

    let (bbox, lat, lon) = match item_bbox {
        Some(bbox) => {
            let (lat, lon) = bbox.centroid();
            (Some(bbox.to_column()), Some(lat), Some(lon))
        }
        None => (None, item.lat, item.lon),
    };

    let incident_id = uuid::Uuid::new_v4().to_string();
    let incident = Incident {
        incident_id: incident_id.clone(),
        title: item.title.clone(),
        summary: summary.clone(),
        category: item.category,
        first_seen_at: now.to_owned(),
        last_seen_at: now.to_owned(),
        last_item_at: item.published_at.clone(),
        status: IncidentStatus::Active,
        severity_score: item_score,
        geom_geojson: item.geom_geojson.clone(),
        lat,
        lon,
        bbox,
        location_confidence: item.location_confidence,
        location_rationale: item.location_rationale.clone(),
        incident_simhash: item.simhash,
        token_signature: token_signature.clone().unwrap_or_default(),
        item_count: 1,
        source_count: 1,
    };
    queries::incidents::insert(conn, &incident)?;
    queries::incidents::link_item(conn, &incident_id, &item.item_id)?;

    let event = BusEvent::incident_created(
        &incident_id,
        &item.title,
        &summary,
        now,
        item.category,
        incident.lat,
        incident.lon,
        item_score,
        1,
        1,
    );
    Ok(ClusterOutcome { incident_id, event })
}

fn update_incident(
    conn: &Connection,
    incident_id: &str,
    item: &Item,
    now: &str,
    item_score: f64,
    item_bbox: Option<&Bbox>,
) -> sitmon_store::Result<ClusterOutcome> {
    queries::incidents::link_item(conn, incident_id, &item.item_id)?;
    let incident = queries::incidents::require(conn, incident_id)?;

    let summary = incident_summary_from_item(item.category, &item.title, &item.summary);
    let sig = token_signature(&summary);
    let token_signature = if sig.is_empty() { None } else { Some(sig) };
    let incident_simhash = u64_to_i64(simhash64(&format!("{} {}", incident.title, summary)));

    let last_item_at = if item.published_at > incident.last_item_at {
        item.published_at.clone()
    } else {
        incident.last_item_at.clone()
    };

    let mut geom_out = incident.geom_geojson.clone();
    let mut lat_out = incident.lat;
    let mut lon_out = incident.lon;
    let mut bbox_out = incident.bbox.as_deref().and_then(Bbox::from_column);
    let mut conf_out = incident.location_confidence;
    let mut rationale_out = incident.location_rationale.clone();

    if item.location_confidence.rank() > conf_out.rank() {
        geom_out = item.geom_geojson.clone();
        conf_out = item.location_confidence;
        rationale_out = item.location_rationale.clone();
        lat_out = item.lat;
        lon_out = item.lon;
        if let Some(bbox) = item_bbox {
            bbox_out = Some(*bbox);
            let (lat, lon) = bbox.centroid();
            lat_out = Some(lat);
            lon_out = Some(lon);
        }
    }

    if let (Some(item_bbox), Some(current)) = (item_bbox, bbox_out) {
        let merged = current.merge(item_bbox);
        let (lat, lon) = merged.centroid();
        bbox_out = Some(merged);
        lat_out = Some(lat);
        lon_out = Some(lon);
    }

    let severity_out = incident.severity_score.max(item_score);

    queries::incidents::update_after_match(
        conn,
        incident_id,
        &summary,
        now,
        &last_item_at,
        severity_out,
        geom_out.as_deref(),
        lat_out,
        lon_out,
        bbox_out.map(|b| b.to_column()).as_deref(),
        conf_out,
        &rationale_out,
        incident_simhash,
        token_signature.as_deref(),
    )?;

    let (item_count, source_count) = queries::incidents::recount(conn, incident_id)?;

    let mut severity_out = severity_out;
    if item.category == Category::Wildfire {
        let density_bonus = (item_count / 10).min(20) as f64;
        severity_out = (severity_out + density_bonus).min(100.0);
        queries::incidents::set_severity(conn, incident_id, severity_out)?;
    }

    maybe_merge_incidents(conn, incident_id)?;

    let event = BusEvent::incident_updated(
        incident_id,
        &incident.title,
        &summary,
        now,
        item.category,
        lat_out,
        lon_out,
        severity_out,
        source_count,
        item_count,
    );
    Ok(ClusterOutcome { incident_id: incident_id.to_owned(), event })
}

/// Post-update merge pass: absorbs any other same-category incident within the
/// category's distance/SimHash/recency window, reparenting its items and deleting it.
fn maybe_merge_incidents(conn: &Connection, incident_id: &str) -> sitmon_store::Result<()> {
    let incident = match queries::incidents::get(conn, incident_id)? {
        Some(incident) => incident,
        None => return Ok(()),
    };
    let (lat, lon) = match (incident.lat, incident.lon) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return Ok(()),
    };

    let thresholds = incident.category.cluster_thresholds();
    let cutoff = (Utc::now() - chrono::Duration::hours(thresholds.merge_lookback_hours))
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string();
    let bucket = bucket_of(incident.incident_simhash);
    let incident_simhash_u = i64_to_u64(incident.incident_simhash);

    let others = queries::incidents::merge_candidates(
        conn,
        incident.category,
        incident_id,
        &cutoff,
        bucket,
        MERGE_CANDIDATE_LIMIT,
    )?;

    for other in others {
        let (other_lat, other_lon) = match (other.lat, other.lon) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => continue,
        };
        if haversine_km(lat, lon, other_lat, other_lon) > thresholds.merge_max_km {
            continue;
        }
        let dist = hamming_distance(incident_simhash_u, i64_to_u64(other.incident_simhash));
        if dist > thresholds.merge_max_dist {
            continue;
        }

        queries::incidents::merge_into(conn, incident_id, &other.incident_id)?;
        queries::incidents::recount(conn, incident_id)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitmon_model::{Category, LocationConfidence, Source, SourceType};

    fn store_with_source() -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .with_conn(|conn| {
                queries::sources::register(
                    conn,
                    &Source {
                        source_id: "usgs_quake".into(),
                        name: "USGS earthquakes".into(),
                        source_type: SourceType::GeojsonApi,
                        url: "https://example.test/quakes.geojson".into(),
                        poll_interval_seconds: 60,
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
                    },
                )
            })
            .unwrap();
        store
    }

    fn earthquake_item(url: &str, published_at: &str, lat: f64, lon: f64, title: &str) -> Item {
        Item {
            item_id: uuid::Uuid::new_v4().to_string(),
            source_id: "usgs_quake".into(),
            source_type: "geojson_api".into(),
            external_id: Some(uuid::Uuid::new_v4().to_string()),
            url: url.into(),
            title: title.into(),
            summary: format!("A moderate earthquake struck: {title}"),
            content: None,
            published_at: published_at.into(),
            updated_at: None,
            fetched_at: published_at.into(),
            category: Category::Earthquake,
            tags: vec!["earthquake".into()],
            geom_geojson: None,
            lat: Some(lat),
            lon: Some(lon),
            location_name: Some("Oaxaca".into()),
            location_confidence: LocationConfidence::AExact,
            location_rationale: "explicit coordinates from source".into(),
            raw: serde_json::json!({"mag": 5.0}),
            hash_title: sitmon_normalize::sha256_hex(title),
            hash_content: sitmon_normalize::sha256_hex(title),
            simhash: u64_to_i64(simhash64(&format!("{title} earthquake struck"))),
        }
    }

    #[test]
    fn first_item_creates_an_incident() {
        let store = store_with_source();
        let item = earthquake_item(
            "https://example.test/a",
            "2026-01-01T00:00:00Z",
            16.0,
            -97.0,
            "M 5.0 - 10km NE of Oaxaca",
        );
        store.with_conn(|conn| queries::items::insert(conn, &item)).unwrap();

        let outcome = assign_item_to_incident(&store, &item.item_id).unwrap();
        assert!(matches!(outcome.event.kind, sitmon_model::BusEventKind::IncidentCreated { .. }));

        let incident = store
            .with_conn(|conn| queries::incidents::require(conn, &outcome.incident_id))
            .unwrap();
        assert_eq!(incident.item_count, 1);
        assert_eq!(incident.source_count, 1);
    }

    #[test]
    fn nearby_same_place_item_updates_the_same_incident() {
        let store = store_with_source();
        let title = "M 5.0 - 10km NE of Oaxaca";
        let item_a = earthquake_item("https://example.test/a", "2026-01-01T00:00:00Z", 16.0, -97.0, title);
        let item_b = earthquake_item("https://example.test/b", "2026-01-01T00:30:00Z", 16.2, -97.1, title);
        store.with_conn(|conn| queries::items::insert(conn, &item_a)).unwrap();
        store.with_conn(|conn| queries::items::insert(conn, &item_b)).unwrap();

        let first = assign_item_to_incident(&store, &item_a.item_id).unwrap();
        let second = assign_item_to_incident(&store, &item_b.item_id).unwrap();

        assert_eq!(first.incident_id, second.incident_id);
        assert!(matches!(second.event.kind, sitmon_model::BusEventKind::IncidentUpdated { .. }));

        let incident = store
            .with_conn(|conn| queries::incidents::require(conn, &first.incident_id))
            .unwrap();
        assert_eq!(incident.item_count, 2);
        assert_eq!(incident.source_count, 1);
    }

    #[test]
    fn distinct_far_apart_items_create_separate_incidents() {
        let store = store_with_source();
        let item_a = earthquake_item(
            "https://example.test/a",
            "2026-01-01T00:00:00Z",
            16.0,
            -97.0,
            "M 5.0 - 10km NE of Oaxaca",
        );
        let item_b = earthquake_item(
            "https://example.test/b",
            "2026-01-01T00:05:00Z",
            -33.4,
            -70.6,
            "M 6.2 - Santiago, Chile",
        );
        store.with_conn(|conn| queries::items::insert(conn, &item_a)).unwrap();
        store.with_conn(|conn| queries::items::insert(conn, &item_b)).unwrap();

        let first = assign_item_to_incident(&store, &item_a.item_id).unwrap();
        let second = assign_item_to_incident(&store, &item_b.item_id).unwrap();

        assert_ne!(first.incident_id, second.incident_id);
    }
}
