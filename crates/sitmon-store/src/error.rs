#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("store database error")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to (de)serialize JSON payload")]
    Json(#[from] serde_json::Error),
    #[error("failed to create database directory")]
    Io(#[from] std::io::Error),
    #[error("duplicate insert for item {url:?}")]
    DuplicateInsert { url: String },
    #[error("incident {incident_id} not found")]
    IncidentNotFound { incident_id: String },
    #[error("item {item_id} not found")]
    ItemNotFound { item_id: String },
}

pub type Result<T> = std::result::Result<T, Error>;
