//! One-off provisioning against the Rippletide APIs: SDK agent creation,
//! knowledge seeding, evaluation agents and evaluation loops.

pub mod agent_config;
pub mod eval_client;
pub mod flows;
pub mod sdk_client;

use std::path::PathBuf;

use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use thiserror::Error;

use crate::config::API_KEY_PLACEHOLDER;

#[derive(Debug, Error)]
pub enum ProvisionError {
    // ── Local preconditions ──────────────────────────────────────────────────
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("PDF file not found: {}", .0.display())]
    PdfNotFound(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file {}: {source}", .path.display())]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("API key not configured. Pass --api-key or set RIPPLETIDE_API_KEY")]
    MissingApiKey,

    #[error("Header value for '{0}' is not valid")]
    InvalidHeaderValue(&'static str),

    #[error("Agent must be created before chatting")]
    AgentNotCreated,

    // ── Remote failures ──────────────────────────────────────────────────────
    #[error("Response from {endpoint} is missing required field '{field}'")]
    MissingField { endpoint: String, field: &'static str },

    #[error("No Q&A pairs extracted from PDF")]
    NoQuestions,

    #[error("{url} answered {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ProvisionError {
    pub(crate) fn http(url: &str) -> impl FnOnce(reqwest::Error) -> Self + '_ {
        move |source| ProvisionError::Http { url: url.to_string(), source }
    }
}

/// Rejects absent, empty and placeholder keys.
pub fn resolve_api_key(api_key: Option<String>) -> Result<String, ProvisionError> {
    api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && k != API_KEY_PLACEHOLDER)
        .ok_or(ProvisionError::MissingApiKey)
}

/// Sends the request and returns the raw response, whatever its status.
pub(crate) async fn send(request: RequestBuilder, url: &str) -> Result<Response, ProvisionError> {
    request.send().await.map_err(ProvisionError::http(url))
}

/// Sends the request and fails on non-success statuses, ignoring the body.
pub(crate) async fn send_ok(request: RequestBuilder, url: &str) -> Result<(), ProvisionError> {
    let response = send(request, url).await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProvisionError::Status { url: url.to_string(), status: status.as_u16(), body });
    }
    Ok(())
}

/// Sends the request, fails on non-success statuses, decodes a JSON body.
pub(crate) async fn send_json(request: RequestBuilder, url: &str) -> Result<Value, ProvisionError> {
    let response = send(request, url).await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProvisionError::Status { url: url.to_string(), status: status.as_u16(), body });
    }
    response.json::<Value>().await.map_err(ProvisionError::http(url))
}

/// Reads the `id` of a freshly created resource, accepting string or numeric ids.
pub(crate) fn required_id(data: &Value, endpoint: &str) -> Result<String, ProvisionError> {
    match data.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ProvisionError::MissingField { endpoint: endpoint.to_string(), field: "id" }),
    }
}
