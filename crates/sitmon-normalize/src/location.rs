use sitmon_model::LocationConfidence;

/// The five location-related fields an `Item` carries, built up by each family
/// normalizer according to what evidence of place it actually found.
#[derive(Debug, Clone, Default)]
pub struct Location {
    pub geom_geojson: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub location_name: Option<String>,
    pub confidence: Option<LocationConfidence>,
    pub rationale: String,
}

impl Location {
    pub fn unknown(rationale: impl Into<String>) -> Self {
        Location {
            confidence: Some(LocationConfidence::UUnknown),
            rationale: rationale.into(),
            ..Default::default()
        }
    }

    pub fn exact(geom_geojson: Option<String>, lat: f64, lon: f64, name: Option<String>, rationale: impl Into<String>) -> Self {
        Location {
            geom_geojson,
            lat: Some(lat),
            lon: Some(lon),
            location_name: name,
            confidence: Some(LocationConfidence::AExact),
            rationale: rationale.into(),
        }
    }

    pub fn coords_in_text(lat: f64, lon: f64, name: Option<String>, rationale: impl Into<String>) -> Self {
        Location {
            lat: Some(lat),
            lon: Some(lon),
            location_name: name,
            confidence: Some(LocationConfidence::BCoordsInText),
            rationale: rationale.into(),
            ..Default::default()
        }
    }

    pub fn place_match(lat: f64, lon: f64, name: String, rationale: impl Into<String>) -> Self {
        Location {
            lat: Some(lat),
            lon: Some(lon),
            location_name: Some(name),
            confidence: Some(LocationConfidence::BPlaceMatch),
            rationale: rationale.into(),
            ..Default::default()
        }
    }

    pub fn country(name: String, coords: Option<(f64, f64)>, rationale: impl Into<String>) -> Self {
        Location {
            lat: coords.map(|c| c.0),
            lon: coords.map(|c| c.1),
            location_name: Some(name),
            confidence: Some(LocationConfidence::CCountry),
            rationale: rationale.into(),
            ..Default::default()
        }
    }

    pub fn source_default(lat: f64, lon: f64, name: Option<String>, rationale: impl Into<String>) -> Self {
        Location {
            lat: Some(lat),
            lon: Some(lon),
            location_name: name,
            confidence: Some(LocationConfidence::CSourceDefault),
            rationale: rationale.into(),
            ..Default::default()
        }
    }
}
