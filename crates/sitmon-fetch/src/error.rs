#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {elapsed_ms}ms")]
    Timeout { url: String, elapsed_ms: u64 },
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        elapsed_ms: u64,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// The `error_kind` string the Health tracker records (spec.md §7).
    pub fn error_kind(&self) -> String {
        match self {
            FetchError::Timeout { .. } => "timeout".to_string(),
            FetchError::Request { source, .. } => {
                let class = if source.is_connect() {
                    "connect"
                } else if source.is_body() || source.is_decode() {
                    "body"
                } else if source.is_redirect() {
                    "redirect"
                } else {
                    "other"
                };
                format!("request_error:{class}")
            }
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        match self {
            FetchError::Timeout { elapsed_ms, .. } => *elapsed_ms,
            FetchError::Request { elapsed_ms, .. } => *elapsed_ms,
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
