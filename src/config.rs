//! Process configuration, resolved once at startup.
//!
//! Values come from the environment (a `.env` file is loaded by `main`).
//! Vendor credentials are resolved into a [`CredentialState`] so request
//! handlers only ever look at a typed result.

use std::time::Duration;

use crate::errors::AppError;

pub const API_KEY_VAR: &str = "RIPPLETIDE_API_KEY";
pub const AGENT_ID_VAR: &str = "RIPPLETIDE_AGENT_ID";
pub const BASE_URL_VAR: &str = "RIPPLETIDE_BASE_URL";
pub const TIMEOUT_VAR: &str = "RIPPLETIDE_TIMEOUT_SECS";
pub const HOST_VAR: &str = "BL_SERVER_HOST";
pub const PORT_VAR: &str = "BL_SERVER_PORT";

pub const API_KEY_PLACEHOLDER: &str = "your-api-key-here";
pub const AGENT_ID_PLACEHOLDER: &str = "your-agent-id-here";

pub const DEFAULT_BASE_URL: &str = "https://agent.rippletide.com/api/sdk";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 1338;
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(360);

const CREDENTIAL_HINT: &str = "Set it in the environment or .env before serving traffic";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub agent_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialState {
    Configured(Credentials),
    Missing { field: &'static str },
}

impl CredentialState {
    /// Empty values and the shipped placeholders count as missing.
    /// The API key is reported before the agent id.
    pub fn resolve(api_key: Option<String>, agent_id: Option<String>) -> Self {
        let api_key = match usable(api_key, API_KEY_PLACEHOLDER) {
            Some(v) => v,
            None => return CredentialState::Missing { field: API_KEY_VAR },
        };
        let agent_id = match usable(agent_id, AGENT_ID_PLACEHOLDER) {
            Some(v) => v,
            None => return CredentialState::Missing { field: AGENT_ID_VAR },
        };
        CredentialState::Configured(Credentials { api_key, agent_id })
    }

    pub fn credentials(&self) -> Result<&Credentials, AppError> {
        match self {
            CredentialState::Configured(c) => Ok(c),
            CredentialState::Missing { field } => Err(AppError::NotConfigured {
                field: *field,
                hint: CREDENTIAL_HINT,
            }),
        }
    }
}

fn usable(value: Option<String>, placeholder: &str) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != placeholder)
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub upstream_timeout: Duration,
    pub credentials: CredentialState,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(HOST_VAR)
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup(PORT_VAR).filter(|p| !p.is_empty()) {
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| AppError::InvalidConfig { field: PORT_VAR, value: p })?,
            None => DEFAULT_PORT,
        };

        let upstream_timeout = match lookup(TIMEOUT_VAR).filter(|t| !t.is_empty()) {
            Some(t) => t
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(AppError::InvalidConfig { field: TIMEOUT_VAR, value: t })?,
            None => DEFAULT_UPSTREAM_TIMEOUT,
        };

        let base_url = lookup(BASE_URL_VAR)
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let credentials = CredentialState::resolve(lookup(API_KEY_VAR), lookup(AGENT_ID_VAR));

        Ok(Self { host, port, base_url, upstream_timeout, credentials })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
