use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorBody;

/// Every failure the gateway can surface to a caller.
/// Each variant maps to exactly one status code in [`AppError::status`].
#[derive(Debug, Error)]
pub enum AppError {
    // ── Validation errors ────────────────────────────────────────────────────
    #[error("{message}")]
    InvalidRequest { status: StatusCode, message: String },

    #[error("Header '{header}' must contain visible ASCII characters only")]
    InvalidHeader { header: &'static str },

    // ── Configuration errors ─────────────────────────────────────────────────
    #[error("{field} is not configured. {hint}")]
    NotConfigured { field: &'static str, hint: &'static str },

    #[error("Invalid value for {field}: '{value}'")]
    InvalidConfig { field: &'static str, value: String },

    // ── Upstream errors ──────────────────────────────────────────────────────
    #[error("Upstream request to {url} failed with status {status}")]
    UpstreamStatus { status: u16, url: String },

    #[error("Upstream request timed out after {seconds}s")]
    UpstreamTimeout { seconds: u64 },

    #[error("Upstream service unavailable: {message}")]
    UpstreamUnavailable { message: String },

    #[error("Upstream returned an unreadable response: {message}")]
    UpstreamDecode { message: String },

    // ── Routing ──────────────────────────────────────────────────────────────
    #[error("No route for {method} {path}")]
    RouteNotFound { method: String, path: String },

    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },

    // ── System errors ────────────────────────────────────────────────────────
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::InvalidRequest { .. } | AppError::InvalidHeader { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, AppError::NotConfigured { .. } | AppError::InvalidConfig { .. })
    }

    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::UpstreamStatus { .. }
                | AppError::UpstreamTimeout { .. }
                | AppError::UpstreamUnavailable { .. }
                | AppError::UpstreamDecode { .. }
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest { status, .. } => *status,
            AppError::InvalidHeader { .. } => StatusCode::BAD_REQUEST,
            AppError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps a transport-level `reqwest` failure onto the upstream error kinds.
    pub fn from_upstream(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            AppError::UpstreamTimeout { seconds: timeout_secs }
        } else if err.is_decode() {
            AppError::UpstreamDecode { message: err.to_string() }
        } else if let Some(status) = err.status() {
            AppError::UpstreamStatus {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            AppError::UpstreamUnavailable { message: err.to_string() }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        error!(status = status.as_u16(), "Error during request: {self}");
        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
