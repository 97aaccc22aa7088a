use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use std::convert::TryFrom;
use std::fmt;

/// `source_type` tag (spec.md §3).
#[derive(Debug, Copy, Clone, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Rss,
    GeojsonApi,
    JsonApi,
    XmlApi,
    CsvApi,
    Social,
}

#[derive(Debug)]
pub struct InvalidSourceType(String);

impl std::error::Error for InvalidSourceType {}

impl fmt::Display for InvalidSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} is not a valid source type", self.0)
    }
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Rss => "rss",
            SourceType::GeojsonApi => "geojson_api",
            SourceType::JsonApi => "json_api",
            SourceType::XmlApi => "xml_api",
            SourceType::CsvApi => "csv_api",
            SourceType::Social => "social",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SourceType {
    type Error = InvalidSourceType;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(match value {
            "rss" => SourceType::Rss,
            "geojson_api" => SourceType::GeojsonApi,
            "json_api" => SourceType::JsonApi,
            "xml_api" => SourceType::XmlApi,
            "csv_api" => SourceType::CsvApi,
            "social" => SourceType::Social,
            other => return Err(InvalidSourceType(other.to_owned())),
        })
    }
}

impl ToSql for SourceType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.as_str().to_sql()
    }
}

impl FromSql for SourceType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        SourceType::try_from(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A polled feed descriptor (spec.md §3). Mutated only by the Scheduler/Health tracker.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Source {
    pub source_id: String,
    pub name: String,
    pub source_type: SourceType,
    pub url: String,
    pub poll_interval_seconds: i64,
    pub enabled: bool,

    pub etag: Option<String>,
    pub last_modified: Option<String>,

    pub next_fetch_at: Option<String>,
    pub last_fetch_at: Option<String>,
    pub last_success_at: Option<String>,
    pub last_error_at: Option<String>,
    pub consecutive_failures: i64,
    pub last_status_code: Option<i64>,
    pub last_fetch_ms: Option<i64>,
    pub last_error: Option<String>,

    pub success_count: i64,
    pub error_count: i64,
    pub cursor: Option<String>,
}
