//! JSON read handlers (spec.md §2.1 "HTTP API / SSE surface"). Deliberately excludes
//! HTML templates, CSP headers, `/metrics`, and saved-view CRUD — those are named external
//! collaborators, out of scope per spec.md §1.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use sitmon_model::{Category, Incident, Item, Source};
use sitmon_store::queries;

use crate::error::{ApiError, Result};
use crate::AppState;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

fn parse_category(raw: &str) -> Option<Category> {
    Category::try_from(raw).ok()
}

#[derive(Debug, Deserialize)]
pub struct IncidentsQuery {
    pub category: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub min_lon: Option<f64>,
    pub min_lat: Option<f64>,
    pub max_lon: Option<f64>,
    pub max_lat: Option<f64>,
    pub min_severity: Option<f64>,
    pub q: Option<String>,
    pub limit: Option<i64>,
}

/// `GET /api/incidents`. An unfiltered listing excludes `cyber_cve`/`cyber_kev` the way
/// the reference query's default category exclusion does; pass `category` explicitly to see them.
pub async fn list_incidents(
    State(state): State<AppState>,
    Query(query): Query<IncidentsQuery>,
) -> Result<Json<Vec<Incident>>> {
    let category = query.category.as_deref().and_then(parse_category);
    let limit = clamp_limit(query.limit);

    let incidents = state.store.with_conn(|conn| {
        let filter = queries::incidents::IncidentFilter {
            category,
            since: query.since.as_deref(),
            until: query.until.as_deref(),
            min_lon: query.min_lon,
            min_lat: query.min_lat,
            max_lon: query.max_lon,
            max_lat: query.max_lat,
            min_severity: query.min_severity,
            search: query.q.as_deref(),
            limit,
        };
        queries::incidents::list(conn, &filter)
    })?;

    let incidents = if query.category.is_none() {
        incidents
            .into_iter()
            .filter(|i| !matches!(i.category, Category::CyberCve | Category::CyberKev))
            .collect()
    } else {
        incidents
    };

    Ok(Json(incidents))
}

/// `GET /api/incidents/:id`.
pub async fn get_incident(
    State(state): State<AppState>,
    Path(incident_id): Path<String>,
) -> Result<Json<Incident>> {
    let incident = state
        .store
        .with_conn(|conn| queries::incidents::get(conn, &incident_id))?
        .ok_or_else(|| ApiError::NotFound(format!("incident {incident_id}")))?;
    Ok(Json(incident))
}

/// `GET /api/incidents/:id/items`.
pub async fn list_incident_items(
    State(state): State<AppState>,
    Path(incident_id): Path<String>,
) -> Result<Json<Vec<Item>>> {
    state
        .store
        .with_conn(|conn| queries::incidents::require(conn, &incident_id))
        .map_err(|_| ApiError::NotFound(format!("incident {incident_id}")))?;
    let items = state.store.with_conn(|conn| queries::items::list_for_incident(conn, &incident_id))?;
    Ok(Json(items))
}

#[derive(Debug, Deserialize)]
pub struct ItemsQuery {
    pub category: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub min_lon: Option<f64>,
    pub min_lat: Option<f64>,
    pub max_lon: Option<f64>,
    pub max_lat: Option<f64>,
    pub q: Option<String>,
    pub limit: Option<i64>,
}

/// `GET /api/items`.
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<Vec<Item>>> {
    let category = query.category.as_deref().and_then(parse_category);
    let limit = clamp_limit(query.limit);

    let items = state.store.with_conn(|conn| {
        let filter = queries::items::ItemFilter {
            category,
            since: query.since.as_deref(),
            until: query.until.as_deref(),
            min_lon: query.min_lon,
            min_lat: query.min_lat,
            max_lon: query.max_lon,
            max_lat: query.max_lat,
            search: query.q.as_deref(),
            limit,
        };
        queries::items::list(conn, &filter)
    })?;
    Ok(Json(items))
}

/// `GET /api/sources`.
pub async fn list_sources(State(state): State<AppState>) -> Result<Json<Vec<Source>>> {
    let sources = state.store.with_conn(queries::sources::list)?;
    Ok(Json(sources))
}
