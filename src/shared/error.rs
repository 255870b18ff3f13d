use axum::{response::IntoResponse, Json};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// Metadata exists but the blob is gone from disk. Surfaced as 404 like
    /// `NotFound`, but logged separately at the call site for diagnosis.
    #[error("File missing: {0}")]
    FileMissing(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) | Self::FileMissing(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Storage(msg) | Self::Database(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
