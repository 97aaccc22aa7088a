pub mod error;
mod migrations;
pub mod queries;
mod store;

pub use error::{Error, Result};
pub use store::Store;

#[cfg(test)]
mod test {
    use super::*;
    use sitmon_model::{Category, Item, LocationConfidence, Source, SourceType};

    fn sample_source() -> Source {
        Source {
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
        }
    }

    fn sample_item(url: &str) -> Item {
        Item {
            item_id: uuid::Uuid::new_v4().to_string(),
            source_id: "usgs_quake".into(),
            source_type: "geojson_api".into(),
            external_id: Some("us1000abcd".into()),
            url: url.into(),
            title: "M 4.5 - 10km NE of Somewhere".into(),
            summary: "A moderate earthquake struck near Somewhere.".into(),
            content: None,
            published_at: "2026-01-01T00:00:00Z".into(),
            updated_at: None,
            fetched_at: "2026-01-01T00:05:00Z".into(),
            category: Category::Earthquake,
            tags: vec!["earthquake".into()],
            geom_geojson: None,
            lat: Some(35.0),
            lon: Some(139.0),
            location_name: Some("Somewhere".into()),
            location_confidence: LocationConfidence::AExact,
            location_rationale: "explicit coordinates from source".into(),
            raw: serde_json::json!({"mag": 4.5}),
            hash_title: "deadbeef".into(),
            hash_content: "cafebabe".into(),
            simhash: 42,
        }
    }

    #[test]
    fn migrations_are_idempotent_across_reopen() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_conn(|conn| queries::sources::register(conn, &sample_source()))
            .unwrap();
        let got = store
            .with_conn(|conn| queries::sources::get(conn, "usgs_quake"))
            .unwrap();
        assert!(got.is_some());
    }

    #[test]
    fn item_url_uniqueness_is_enforced() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_conn(|conn| queries::sources::register(conn, &sample_source()))
            .unwrap();
        let item = sample_item("https://example.test/a");
        store.with_conn(|conn| queries::items::insert(conn, &item)).unwrap();

        let mut dup = sample_item("https://example.test/a");
        dup.item_id = uuid::Uuid::new_v4().to_string();
        dup.external_id = Some("different".into());
        let err = store
            .with_conn(|conn| queries::items::insert(conn, &dup))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateInsert { .. }));
    }

    #[test]
    fn fts_search_finds_matching_items() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_conn(|conn| queries::sources::register(conn, &sample_source()))
            .unwrap();
        store
            .with_conn(|conn| queries::items::insert(conn, &sample_item("https://example.test/b")))
            .unwrap();

        let filter = queries::items::ItemFilter {
            category: None,
            since: None,
            until: None,
            min_lon: None,
            min_lat: None,
            max_lon: None,
            max_lat: None,
            search: Some("earthquake"),
            limit: 10,
        };
        let found = store.with_conn(|conn| queries::items::list(conn, &filter)).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn incident_merge_reparents_items_and_deletes_loser() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_conn(|conn| queries::sources::register(conn, &sample_source()))
            .unwrap();
        let item_a = sample_item("https://example.test/c");
        let item_b = sample_item("https://example.test/d");
        store.with_conn(|conn| queries::items::insert(conn, &item_a)).unwrap();
        store.with_conn(|conn| queries::items::insert(conn, &item_b)).unwrap();

        store
            .transaction(|conn| {
                let incident_a = sitmon_model::Incident {
                    incident_id: "inc-a".into(),
                    title: "A".into(),
                    summary: "A".into(),
                    category: Category::Earthquake,
                    first_seen_at: "2026-01-01T00:00:00Z".into(),
                    last_seen_at: "2026-01-01T00:00:00Z".into(),
                    last_item_at: "2026-01-01T00:00:00Z".into(),
                    status: sitmon_model::IncidentStatus::Active,
                    severity_score: 40.0,
                    geom_geojson: None,
                    lat: Some(35.0),
                    lon: Some(139.0),
                    bbox: None,
                    location_confidence: LocationConfidence::AExact,
                    location_rationale: "".into(),
                    incident_simhash: 1,
                    token_signature: "".into(),
                    item_count: 1,
                    source_count: 1,
                };
                let mut incident_b = sitmon_model::Incident {
                    incident_id: "inc-b".into(),
                    ..incident_a.clone()
                };
                incident_b.title = "B".into();
                queries::incidents::insert(conn, &incident_a)?;
                queries::incidents::insert(conn, &incident_b)?;
                queries::incidents::link_item(conn, "inc-a", &item_a.item_id)?;
                queries::incidents::link_item(conn, "inc-b", &item_b.item_id)?;
                queries::incidents::merge_into(conn, "inc-a", "inc-b")?;
                queries::incidents::recount(conn, "inc-a")?;
                Ok(())
            })
            .unwrap();

        let survivor = store
            .with_conn(|conn| queries::incidents::require(conn, "inc-a"))
            .unwrap();
        assert_eq!(survivor.item_count, 2);
        let gone = store.with_conn(|conn| queries::incidents::get(conn, "inc-b")).unwrap();
        assert!(gone.is_none());
    }
}
