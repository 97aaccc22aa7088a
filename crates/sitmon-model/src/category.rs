use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use std::convert::TryFrom;
use std::fmt;

/// The closed set of item/incident categories (spec.md §3).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Earthquake,
    WeatherAlert,
    TropicalCyclone,
    Tsunami,
    Volcano,
    Wildfire,
    AviationDisruption,
    HealthAdvisory,
    TravelAdvisory,
    CyberCve,
    CyberKev,
    Disaster,
    MaritimeWarning,
    News,
    Social,
}

#[derive(Debug)]
pub struct InvalidCategory(String);

impl std::error::Error for InvalidCategory {}

impl fmt::Display for InvalidCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} is not a valid category", self.0)
    }
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Earthquake => "earthquake",
            Category::WeatherAlert => "weather_alert",
            Category::TropicalCyclone => "tropical_cyclone",
            Category::Tsunami => "tsunami",
            Category::Volcano => "volcano",
            Category::Wildfire => "wildfire",
            Category::AviationDisruption => "aviation_disruption",
            Category::HealthAdvisory => "health_advisory",
            Category::TravelAdvisory => "travel_advisory",
            Category::CyberCve => "cyber_cve",
            Category::CyberKev => "cyber_kev",
            Category::Disaster => "disaster",
            Category::MaritimeWarning => "maritime_warning",
            Category::News => "news",
            Category::Social => "social",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Category {
    type Error = InvalidCategory;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(match value {
            "earthquake" => Category::Earthquake,
            "weather_alert" => Category::WeatherAlert,
            "tropical_cyclone" => Category::TropicalCyclone,
            "tsunami" => Category::Tsunami,
            "volcano" => Category::Volcano,
            "wildfire" => Category::Wildfire,
            "aviation_disruption" => Category::AviationDisruption,
            "health_advisory" => Category::HealthAdvisory,
            "travel_advisory" => Category::TravelAdvisory,
            "cyber_cve" => Category::CyberCve,
            "cyber_kev" => Category::CyberKev,
            "disaster" => Category::Disaster,
            "maritime_warning" => Category::MaritimeWarning,
            "news" => Category::News,
            "social" => Category::Social,
            other => return Err(InvalidCategory(other.to_owned())),
        })
    }
}

impl std::str::FromStr for Category {
    type Err = InvalidCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::try_from(s)
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.as_str().to_sql()
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Category::try_from(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Category-dependent clustering parameters (spec.md §4.7).
pub struct ClusterThresholds {
    pub tight_dist: u32,
    pub loose_dist: u32,
    pub jaccard_floor: f64,
    pub candidate_lookback_hours: i64,
    pub merge_max_km: f64,
    pub merge_max_dist: u32,
    /// Recency window for the post-update merge pass. Distinct from
    /// `candidate_lookback_hours`: merging tolerates a wider gap than initial matching
    /// for categories whose incidents stay live longer (earthquake/volcano/tsunami/cyclone).
    pub merge_lookback_hours: i64,
}

impl Category {
    pub fn cluster_thresholds(&self) -> ClusterThresholds {
        match self {
            Category::News => ClusterThresholds {
                tight_dist: 4,
                loose_dist: 10,
                jaccard_floor: 0.60,
                candidate_lookback_hours: 24,
                merge_max_km: 40.0,
                merge_max_dist: 2,
                merge_lookback_hours: 24,
            },
            Category::Earthquake => ClusterThresholds {
                tight_dist: 8,
                loose_dist: 14,
                jaccard_floor: 0.40,
                candidate_lookback_hours: 48,
                merge_max_km: 120.0,
                merge_max_dist: 4,
                merge_lookback_hours: 72,
            },
            Category::Volcano => ClusterThresholds {
                tight_dist: 8,
                loose_dist: 14,
                jaccard_floor: 0.40,
                candidate_lookback_hours: 48,
                merge_max_km: 120.0,
                merge_max_dist: 4,
                merge_lookback_hours: 72,
            },
            Category::Tsunami => ClusterThresholds {
                tight_dist: 8,
                loose_dist: 14,
                jaccard_floor: 0.40,
                candidate_lookback_hours: 48,
                merge_max_km: 2500.0,
                merge_max_dist: 4,
                merge_lookback_hours: 72,
            },
            Category::Wildfire => ClusterThresholds {
                tight_dist: 6,
                loose_dist: 12,
                jaccard_floor: 0.45,
                candidate_lookback_hours: 48,
                merge_max_km: 50.0,
                merge_max_dist: 3,
                merge_lookback_hours: 48,
            },
            Category::AviationDisruption => ClusterThresholds {
                tight_dist: 6,
                loose_dist: 12,
                jaccard_floor: 0.45,
                candidate_lookback_hours: 48,
                merge_max_km: 30.0,
                merge_max_dist: 3,
                merge_lookback_hours: 24,
            },
            Category::WeatherAlert => ClusterThresholds {
                tight_dist: 6,
                loose_dist: 12,
                jaccard_floor: 0.45,
                candidate_lookback_hours: 48,
                merge_max_km: 120.0,
                merge_max_dist: 3,
                merge_lookback_hours: 48,
            },
            Category::TropicalCyclone => ClusterThresholds {
                tight_dist: 6,
                loose_dist: 12,
                jaccard_floor: 0.45,
                candidate_lookback_hours: 48,
                merge_max_km: 500.0,
                merge_max_dist: 3,
                merge_lookback_hours: 72,
            },
            _ => ClusterThresholds {
                tight_dist: 6,
                loose_dist: 12,
                jaccard_floor: 0.45,
                candidate_lookback_hours: 48,
                merge_max_km: 150.0,
                merge_max_dist: 3,
                merge_lookback_hours: 48,
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        let all = [
            Category::Earthquake,
            Category::WeatherAlert,
            Category::TropicalCyclone,
            Category::Tsunami,
            Category::Volcano,
            Category::Wildfire,
            Category::AviationDisruption,
            Category::HealthAdvisory,
            Category::TravelAdvisory,
            Category::CyberCve,
            Category::CyberKev,
            Category::Disaster,
            Category::MaritimeWarning,
            Category::News,
            Category::Social,
        ];
        for cat in all {
            let s = cat.as_str();
            assert_eq!(Category::try_from(s).unwrap(), cat);
        }
        assert!(Category::try_from("not_a_category").is_err());
    }
}
