use crate::Category;

/// Discriminant for messages carried on the event bus (spec.md §6).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEventKind {
    #[serde(rename = "incident.created")]
    IncidentCreated {
        incident_id: String,
        title: String,
        summary: String,
        last_seen_at: String,
        category: Category,
        lat: Option<f64>,
        lon: Option<f64>,
        severity_score: f64,
        source_count: i64,
        item_count: i64,
    },
    #[serde(rename = "incident.updated")]
    IncidentUpdated {
        incident_id: String,
        title: String,
        summary: String,
        last_seen_at: String,
        category: Category,
        lat: Option<f64>,
        lon: Option<f64>,
        severity_score: f64,
        source_count: i64,
        item_count: i64,
    },
    #[serde(rename = "source.health")]
    SourceHealth {
        data: SourceHealthData,
    },
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SourceHealthData {
    pub source_id: String,
    pub status: Option<i64>,
    pub backoff: Option<i64>,
}

/// Opaque envelope published on and received from the bus.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BusEvent {
    #[serde(flatten)]
    pub kind: BusEventKind,
}

impl BusEvent {
    pub fn incident_created(
        incident_id: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
        last_seen_at: impl Into<String>,
        category: Category,
        lat: Option<f64>,
        lon: Option<f64>,
        severity_score: f64,
        source_count: i64,
        item_count: i64,
    ) -> Self {
        BusEvent {
            kind: BusEventKind::IncidentCreated {
                incident_id: incident_id.into(),
                title: title.into(),
                summary: summary.into(),
                last_seen_at: last_seen_at.into(),
                category,
                lat,
                lon,
                severity_score,
                source_count,
                item_count,
            },
        }
    }

    pub fn incident_updated(
        incident_id: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
        last_seen_at: impl Into<String>,
        category: Category,
        lat: Option<f64>,
        lon: Option<f64>,
        severity_score: f64,
        source_count: i64,
        item_count: i64,
    ) -> Self {
        BusEvent {
            kind: BusEventKind::IncidentUpdated {
                incident_id: incident_id.into(),
                title: title.into(),
                summary: summary.into(),
                last_seen_at: last_seen_at.into(),
                category,
                lat,
                lon,
                severity_score,
                source_count,
                item_count,
            },
        }
    }

    pub fn source_health(source_id: impl Into<String>, status: Option<i64>, backoff: Option<i64>) -> Self {
        BusEvent {
            kind: BusEventKind::SourceHealth {
                data: SourceHealthData {
                    source_id: source_id.into(),
                    status,
                    backoff,
                },
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn incident_created_serializes_with_type_tag() {
        let event = BusEvent::incident_created(
            "abc", "Title", "Summary", "2026-01-01T00:00:00Z", Category::News, None, None, 40.0, 1, 1,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "incident.created");
        assert_eq!(json["incident_id"], "abc");
    }

    #[test]
    fn source_health_serializes_with_nested_data() {
        let event = BusEvent::source_health("usgs_quake", Some(200), None);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "source.health");
        assert_eq!(json["data"]["source_id"], "usgs_quake");
    }
}
