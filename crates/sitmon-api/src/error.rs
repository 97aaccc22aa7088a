use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// The thin error type the read API's handlers return. Deliberately flat: every failure
/// this surface can hit is either "not found" or "the store blew up".
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] sitmon_store::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };
        if matches!(self, ApiError::Store(_)) {
            tracing::error!(error = %self, "api request failed");
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
