//! The read API (spec.md §2.1): a thin JSON surface plus an SSE bridge onto the event
//! bus. Stands in for the HTTP UI named as an external collaborator in spec.md §6 — this
//! crate intentionally does not render HTML, apply CSP, serve map tiles, or expose `/metrics`.

mod error;
mod routes;
mod sse;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use sitmon_bus::EventBus;
use sitmon_store::Store;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub bus: Arc<EventBus>,
}

/// Builds the router. The caller owns binding/serving (matches `agent::api::build_router`
/// returning a bare `Router` for `main` to bind and serve).
pub fn build_router(store: Arc<Store>, bus: Arc<EventBus>) -> Router {
    let state = AppState { store, bus };

    Router::new()
        .route("/api/incidents", get(routes::list_incidents))
        .route("/api/incidents/:incident_id", get(routes::get_incident))
        .route("/api/incidents/:incident_id/items", get(routes::list_incident_items))
        .route("/api/items", get(routes::list_items))
        .route("/api/sources", get(routes::list_sources))
        .route("/sse", get(sse::handle))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sitmon_model::{Category, Incident, IncidentStatus, LocationConfidence};
    use sitmon_store::queries;
    use tower::ServiceExt;

    fn sample_incident(id: &str) -> Incident {
        Incident {
            incident_id: id.into(),
            title: "Test incident".into(),
            summary: "Summary".into(),
            category: Category::News,
            first_seen_at: "2026-01-01T00:00:00Z".into(),
            last_seen_at: "2026-01-01T00:00:00Z".into(),
            last_item_at: "2026-01-01T00:00:00Z".into(),
            status: IncidentStatus::Active,
            severity_score: 40.0,
            geom_geojson: None,
            lat: None,
            lon: None,
            bbox: None,
            location_confidence: LocationConfidence::UUnknown,
            location_rationale: String::new(),
            incident_simhash: 0,
            token_signature: String::new(),
            item_count: 1,
            source_count: 1,
        }
    }

    #[tokio::test]
    async fn list_incidents_returns_ok() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        store.with_conn(|conn| queries::incidents::insert(conn, &sample_incident("inc-1"))).unwrap();
        let bus = Arc::new(EventBus::new());
        let app = build_router(store, bus);

        let response = app
            .oneshot(Request::builder().uri("/api/incidents").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_incident_is_404() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let bus = Arc::new(EventBus::new());
        let app = build_router(store, bus);

        let response = app
            .oneshot(Request::builder().uri("/api/incidents/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
