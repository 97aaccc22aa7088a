#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed xml: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid utf-8 body")]
    Utf8,
}

pub type Result<T> = std::result::Result<T, ParseError>;
