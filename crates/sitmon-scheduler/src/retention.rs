//! Hourly retention (spec.md §4.6.3). Status advances are keyed on `last_seen_at`;
//! deletes are keyed on `published_at` for items and `last_seen_at` for incidents, per
//! the original implementation's deliberate `items_cutoff` choice (spec.md §9(c)).

use chrono::{Duration, Utc};
use sitmon_store::{queries, Result, Store};

const COOLING_AFTER_HOURS: i64 = 24;
const RESOLVED_AFTER_HOURS: i64 = 72;
const DEFAULT_ITEMS_RETENTION_DAYS: i64 = 30;
const DEFAULT_INCIDENTS_RETENTION_DAYS: i64 = 14;

fn iso(ts: chrono::DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Runs one retention sweep: status transitions, then stale item/incident deletes.
/// `items_retention_days`/`incidents_retention_days` come from `AppConfig`, falling
/// back to the defaults above when unset (spec.md §6 environment keys).
pub fn run(store: &Store) -> Result<()> {
    let (items_days, incidents_days) = store.with_conn(|conn| {
        let items = queries::config::get(conn, "items_retention_days")?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(DEFAULT_ITEMS_RETENTION_DAYS);
        let incidents = queries::config::get(conn, "incidents_retention_days")?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(DEFAULT_INCIDENTS_RETENTION_DAYS);
        Ok((items, incidents))
    })?;

    let now = Utc::now();
    let cooling_cutoff = iso(now - Duration::hours(COOLING_AFTER_HOURS));
    let resolved_cutoff = iso(now - Duration::hours(RESOLVED_AFTER_HOURS));
    let items_cutoff = iso(now - Duration::days(items_days));
    let incidents_cutoff = iso(now - Duration::days(incidents_days));

    store.transaction(|conn| {
        queries::incidents::advance_status(conn, &cooling_cutoff, &resolved_cutoff)?;
        let deleted_items = queries::items::delete_stale(conn, &items_cutoff)?;
        let deleted_incidents = queries::incidents::delete_resolved_older_than(conn, &incidents_cutoff)?;
        tracing::info!(deleted_items, deleted_incidents, "retention sweep complete");
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitmon_model::{Category, Incident, IncidentStatus, LocationConfidence};

    fn sample_incident(id: &str, last_seen_at: &str, status: IncidentStatus) -> Incident {
        Incident {
            incident_id: id.into(),
            title: "Test incident".into(),
            summary: "Summary".into(),
            category: Category::News,
            first_seen_at: last_seen_at.into(),
            last_seen_at: last_seen_at.into(),
            last_item_at: last_seen_at.into(),
            status,
            severity_score: 40.0,
            geom_geojson: None,
            lat: None,
            lon: None,
            bbox: None,
            location_confidence: LocationConfidence::UUnknown,
            location_rationale: String::new(),
            incident_simhash: 0,
            token_signature: String::new(),
            item_count: 0,
            source_count: 0,
        }
    }

    #[test]
    fn stale_active_incidents_cool_then_resolve() {
        let store = Store::open_in_memory().unwrap();
        let old = iso(Utc::now() - Duration::hours(30));
        store
            .with_conn(|conn| queries::incidents::insert(conn, &sample_incident("inc-1", &old, IncidentStatus::Active)))
            .unwrap();

        run(&store).unwrap();

        let incident = store.with_conn(|conn| queries::incidents::require(conn, "inc-1")).unwrap();
        assert_eq!(incident.status, IncidentStatus::Cooling);
    }

    #[test]
    fn resolved_incidents_older_than_retention_are_deleted() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_conn(|conn| queries::config::set(conn, "incidents_retention_days", "1"))
            .unwrap();
        let old = iso(Utc::now() - Duration::days(5));
        store
            .with_conn(|conn| {
                queries::incidents::insert(conn, &sample_incident("inc-old", &old, IncidentStatus::Resolved))
            })
            .unwrap();

        run(&store).unwrap();

        let incident = store.with_conn(|conn| queries::incidents::get(conn, "inc-old")).unwrap();
        assert!(incident.is_none());
    }
}
