use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::ConfigError;

/// Failures that stop the proxy from starting or serving.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot build upstream client : {0}")]
    Http(#[from] reqwest::Error),
    #[error("server i/o failed : {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported to the browser as `{error}` or `{error, details}`.
#[derive(Debug)]
pub enum ApiError {
    Unauthenticated,
    BadRequest(&'static str),
    Internal(&'static str),
    /// Classification failure with upstream detail.
    Analysis(Value),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) | Self::Analysis(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Unauthenticated => json!({ "error": "Not authenticated with Twitter" }),
            Self::BadRequest(msg) | Self::Internal(msg) => json!({ "error": msg }),
            Self::Analysis(details) => json!({
                "error": "AI analysis failed",
                "details": details,
            }),
        };
        (status, Json(body)).into_response()
    }
}
