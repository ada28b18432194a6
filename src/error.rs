use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors that reach the HTTP boundary. Everything recoverable (store
/// outages, strategy misses, exhausted filters) is handled inside the
/// pipeline and never shows up here.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Search failed: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl SearchError {
    pub fn invalid(message: impl Into<String>) -> Self {
        SearchError::InvalidRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SearchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            SearchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_maps_to_400() {
        let resp = SearchError::invalid("q must be a string").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_maps_to_500_with_message() {
        let err = SearchError::from(anyhow::anyhow!("boom"));
        assert_eq!(err.to_string(), "Search failed: boom");
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
