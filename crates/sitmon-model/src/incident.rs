use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use std::convert::TryFrom;
use std::fmt;

use crate::{Category, LocationConfidence};

/// Lifecycle stage of an incident, advanced only by retention (spec.md §4.6.3).
#[derive(Debug, Copy, Clone, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Active,
    Cooling,
    Resolved,
}

#[derive(Debug)]
pub struct InvalidIncidentStatus(String);

impl std::error::Error for InvalidIncidentStatus {}

impl fmt::Display for InvalidIncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} is not a valid incident status", self.0)
    }
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Active => "active",
            IncidentStatus::Cooling => "cooling",
            IncidentStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for IncidentStatus {
    type Error = InvalidIncidentStatus;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(match value {
            "active" => IncidentStatus::Active,
            "cooling" => IncidentStatus::Cooling,
            "resolved" => IncidentStatus::Resolved,
            other => return Err(InvalidIncidentStatus(other.to_owned())),
        })
    }
}

impl ToSql for IncidentStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.as_str().to_sql()
    }
}

impl FromSql for IncidentStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        IncidentStatus::try_from(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A cluster of related items describing one real-world event (spec.md §3).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Incident {
    pub incident_id: String,
    pub title: String,
    pub summary: String,
    pub category: Category,
    pub first_seen_at: String,
    pub last_seen_at: String,
    pub last_item_at: String,
    pub status: IncidentStatus,
    pub severity_score: f64,

    pub geom_geojson: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub bbox: Option<String>,
    pub location_confidence: LocationConfidence,
    pub location_rationale: String,

    pub incident_simhash: i64,
    pub token_signature: String,
    pub item_count: i64,
    pub source_count: i64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        for status in [
            IncidentStatus::Active,
            IncidentStatus::Cooling,
            IncidentStatus::Resolved,
        ] {
            let s = status.as_str();
            assert_eq!(IncidentStatus::try_from(s).unwrap(), status);
        }
        assert!(IncidentStatus::try_from("bogus").is_err());
    }
}
