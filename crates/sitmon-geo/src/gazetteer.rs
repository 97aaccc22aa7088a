use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use sitmon_store::queries::places;
use sitmon_store::{Error, Result, Store};
use unicode_normalization::UnicodeNormalization;

use crate::geometry::haversine_km;

fn non_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]+").unwrap())
}

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-z]+").unwrap())
}

/// Casefold, strip diacritics, drop punctuation, collapse whitespace — the gazetteer's own
/// key normalization, independent of any UI-level rendering.
pub fn normalize_place_name(name: &str) -> String {
    let folded: String = name.nfkd().filter(|c| !is_combining(*c)).collect();
    let folded = folded.to_lowercase();
    let stripped = non_word_re().replace_all(&folded, " ");
    ws_re().replace_all(&stripped, " ").trim().to_owned()
}

fn is_combining(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036f}')
}

/// A scored gazetteer hit.
#[derive(Debug, Clone)]
pub struct PlaceMatch {
    pub name: String,
    pub kind: String,
    pub country_code: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub score: f64,
}

/// Load country/admin1/populated-place corpora once. Idempotent: a no-op if `places` is
/// already populated. Expects three GeoJSON FeatureCollections under `data_dir`:
/// `countries.geojson`, `admin1.geojson`, `populated_places.geojson`.
pub fn seed_places(store: &Store, data_dir: &Path) -> Result<()> {
    let already_seeded = store.with_conn(places::count)? > 0;
    if already_seeded {
        return Ok(());
    }

    store.transaction(|conn| {
        if let Some(countries) = read_feature_collection(&data_dir.join("countries.geojson")) {
            for feature in countries {
                let properties = feature.get("properties").cloned().unwrap_or_default();
                let name = properties
                    .get("NAME")
                    .or_else(|| properties.get("name"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_owned();
                if name.is_empty() {
                    continue;
                }
                let country_code = properties
                    .get("ISO_A2")
                    .or_else(|| properties.get("iso_a2"))
                    .and_then(|v| v.as_str())
                    .map(str::to_owned);
                let (lat, lon) = feature
                    .get("geometry")
                    .and_then(crate::geometry::bbox_from_geojson)
                    .map(|bbox| bbox.centroid())
                    .unzip();
                places::insert_ignore(
                    conn,
                    &name,
                    &normalize_place_name(&name),
                    "country",
                    country_code.as_deref(),
                    None,
                    lat,
                    lon,
                    Some(0.6),
                )?;
                if country_code.as_deref() == Some("US") {
                    for alias in ["United States", "USA", "US"] {
                        places::insert_ignore(
                            conn,
                            alias,
                            &normalize_place_name(alias),
                            "country",
                            Some("US"),
                            None,
                            lat,
                            lon,
                            Some(0.6),
                        )?;
                    }
                }
            }
        }

        if let Some(admin1) = read_feature_collection(&data_dir.join("admin1.geojson")) {
            for feature in admin1 {
                let properties = feature.get("properties").cloned().unwrap_or_default();
                let name = properties
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_owned();
                if name.is_empty() {
                    continue;
                }
                let country_code = properties
                    .get("iso_a2")
                    .and_then(|v| v.as_str())
                    .map(str::to_owned);
                let scalerank = properties.get("scalerank").and_then(|v| v.as_f64()).unwrap_or(4.0);
                let importance = (0.8 - scalerank * 0.05).max(0.4);
                let (lat, lon) = feature
                    .get("geometry")
                    .and_then(crate::geometry::bbox_from_geojson)
                    .map(|bbox| bbox.centroid())
                    .unzip();
                places::insert_ignore(
                    conn,
                    &name,
                    &normalize_place_name(&name),
                    "admin1",
                    country_code.as_deref(),
                    None,
                    lat,
                    lon,
                    Some(importance),
                )?;
            }
        }

        if let Some(populated) = read_feature_collection(&data_dir.join("populated_places.geojson")) {
            for feature in populated {
                let properties = feature.get("properties").cloned().unwrap_or_default();
                let name = properties
                    .get("NAME")
                    .or_else(|| properties.get("name"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_owned();
                if name.is_empty() {
                    continue;
                }
                let country_code = properties
                    .get("ISO_A2")
                    .or_else(|| properties.get("iso_a2"))
                    .and_then(|v| v.as_str())
                    .map(str::to_owned);
                let pop_max = properties
                    .get("POP_MAX")
                    .or_else(|| properties.get("pop_max"))
                    .and_then(|v| v.as_f64())
                    .unwrap_or(1.0)
                    .max(1.0);
                let importance = (pop_max.log10() / 10.0 + 0.2).clamp(0.3, 0.95);
                let geometry = feature.get("geometry");
                let (lat, lon) = match geometry.and_then(|g| g.get("coordinates")) {
                    Some(coords) => (
                        coords.get(1).and_then(|v| v.as_f64()),
                        coords.get(0).and_then(|v| v.as_f64()),
                    ),
                    None => (None, None),
                };
                places::insert_ignore(
                    conn,
                    &name,
                    &normalize_place_name(&name),
                    "populated",
                    country_code.as_deref(),
                    None,
                    lat,
                    lon,
                    Some(importance),
                )?;
            }
        }

        Ok(())
    })
}

fn read_feature_collection(path: &Path) -> Option<Vec<serde_json::Value>> {
    let bytes = std::fs::read(path).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    value.get("features")?.as_array().cloned()
}

fn kind_bonus(kind: &str) -> f64 {
    match kind {
        "country" => 0.1,
        "admin1" => 0.05,
        "populated" => 0.2,
        _ => 0.0,
    }
}

/// Score 1-3 token n-gram windows of `text` (up to the first 80 tokens) against the gazetteer,
/// ranked by importance + kind bonus + optional coordinate proximity + country-hint match +
/// token-length bonus. Used by normalizers to produce `B_place_match`.
pub fn match_place_in_text(
    store: &Store,
    text: &str,
    coords_hint: Option<(f64, f64)>,
    country_code_hint: Option<&str>,
) -> Result<Option<PlaceMatch>> {
    let normalized = normalize_place_name(text);
    let tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).take(80).collect();
    if tokens.is_empty() {
        return Ok(None);
    }

    let mut candidates: Vec<String> = Vec::new();
    for n in 1..=3usize {
        if n > tokens.len() {
            continue;
        }
        for window in tokens.windows(n) {
            candidates.push(window.join(" "));
        }
    }
    candidates.sort();
    candidates.dedup();

    let rows = store.with_conn(|conn| places::by_normalized_names(conn, &candidates))?;

    let mut best: Option<PlaceMatch> = None;
    for row in rows {
        let token_len = row.normalized_name.split(' ').filter(|t| !t.is_empty()).count();
        let mut score = row.importance.unwrap_or(0.0) + kind_bonus(&row.kind);
        score += (token_len as f64 * 0.05).min(0.15);

        if let (Some(hint), Some(country_code)) = (country_code_hint, row.country_code.as_deref()) {
            if hint.eq_ignore_ascii_case(country_code) {
                score += 0.25;
            }
        }

        if let (Some((hint_lat, hint_lon)), Some(lat), Some(lon)) = (coords_hint, row.lat, row.lon) {
            let dist = haversine_km(hint_lat, hint_lon, lat, lon);
            score += (1.0 - (dist / 2000.0).min(1.0)) * 0.35;
        }

        let candidate = PlaceMatch {
            name: row.name,
            kind: row.kind,
            country_code: row.country_code,
            lat: row.lat,
            lon: row.lon,
            score,
        };
        if best.as_ref().map(|b| candidate.score > b.score).unwrap_or(true) {
            best = Some(candidate);
        }
    }

    Ok(best)
}

/// Country-only match, restricted to `kind='country'` (the `C_country` fallback).
pub fn match_country_in_text(store: &Store, text: &str) -> Result<Option<PlaceMatch>> {
    let lower = text.to_lowercase();
    let tokens: Vec<String> = token_re().find_iter(&lower).map(|m| m.as_str().to_owned()).collect();
    if tokens.is_empty() {
        return Ok(None);
    }
    let haystack = format!(" {} ", tokens.join(" "));

    let all_countries = store.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT place_id, name, normalized_name, kind, country_code, admin1, lat, lon, importance
             FROM places WHERE kind = 'country';",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(places::PlaceRow {
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
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::Sqlite)
    })?;

    let mut best: Option<PlaceMatch> = None;
    for row in all_countries {
        let needle = format!(" {} ", row.normalized_name);
        if haystack.contains(&needle) {
            let score = row.importance.unwrap_or(0.0) + row.normalized_name.len() as f64 * 0.001;
            let candidate = PlaceMatch {
                name: row.name,
                kind: row.kind,
                country_code: row.country_code,
                lat: row.lat,
                lon: row.lon,
                score,
            };
            if best.as_ref().map(|b| candidate.score > b.score).unwrap_or(true) {
                best = Some(candidate);
            }
        }
    }
    Ok(best)
}

/// Prefix search over `normalized_name`, with hardcoded disambiguation for names that are
/// both a country and a well-known sub-national region (Georgia the country vs. the US
/// state; the Republic of the Congo vs. the Democratic Republic of the Congo).
pub fn suggest_places(store: &Store, prefix: &str, limit: i64) -> Result<Vec<places::PlaceRow>> {
    let normalized_prefix = normalize_place_name(prefix);
    let rows = store.with_conn(|conn| places::by_normalized_prefix(conn, &normalized_prefix, limit))?;
    if !rows.is_empty() {
        return Ok(rows);
    }

    match normalized_prefix.as_str() {
        "georgia" => Ok(vec![places::PlaceRow {
            place_id: 0,
            name: "Georgia".into(),
            normalized_name: "georgia".into(),
            kind: "country".into(),
            country_code: Some("GE".into()),
            admin1: None,
            lat: Some(42.3),
            lon: Some(43.4),
            importance: Some(0.6),
        }]),
        "congo" => Ok(vec![places::PlaceRow {
            place_id: 0,
            name: "Democratic Republic of the Congo".into(),
            normalized_name: "congo".into(),
            kind: "country".into(),
            country_code: Some("CD".into()),
            admin1: None,
            lat: Some(-4.0),
            lon: Some(21.8),
            importance: Some(0.6),
        }]),
        _ => Ok(rows),
    }
}

/// Exact `normalized_name` lookup restricted to `kind='country'`; used by the tsunami/CAP
/// `C_source_default` and `C_country` normalizer paths.
pub fn find_country_centroid(store: &Store, country_name: &str) -> Result<Option<(f64, f64)>> {
    let normalized = normalize_place_name(country_name);
    let row = store.with_conn(|conn| places::by_kind_and_name(conn, "country", &normalized))?;
    Ok(row.and_then(|r| match (r.lat, r.lon) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => None,
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalizes_punctuation_and_case() {
        assert_eq!(normalize_place_name("St. Martin's, (Overseas)"), "st martin s overseas");
    }

    #[test]
    fn suggest_places_falls_back_for_georgia() {
        let store = Store::open_in_memory().unwrap();
        let got = suggest_places(&store, "georgia", 5).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].country_code.as_deref(), Some("GE"));
    }

    #[test]
    fn match_country_in_text_requires_seeded_rows() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_conn(|conn| {
                places::insert_ignore(
                    conn,
                    "Japan",
                    "japan",
                    "country",
                    Some("JP"),
                    None,
                    Some(36.2),
                    Some(138.3),
                    Some(0.6),
                )
            })
            .unwrap();
        let found = match_country_in_text(&store, "A strong quake struck Japan overnight").unwrap();
        assert_eq!(found.unwrap().name, "Japan");
        assert!(match_country_in_text(&store, "nothing relevant here").unwrap().is_none());
    }
}
