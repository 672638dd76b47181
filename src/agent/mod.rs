use std::time::Duration;

use tracing::{debug, error, instrument};

use crate::config::Credentials;
use crate::errors::AppError;
use crate::models::{ConversationId, UpstreamAnswer, UpstreamChatPayload};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const AGENT_ID_HEADER: &str = "x-rippletide-agent-id";
pub const CONVERSATION_ID_HEADER: &str = "x-rippletide-conversation-id";

/// Client for the Rippletide chat endpoint.
///
/// Holds one pooled [`reqwest::Client`]; clones share the pool, so the service
/// can be cloned into every request task.
#[derive(Clone)]
pub struct RippletideAgentService {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RippletideAgentService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn chat_url(&self, agent_id: &str) -> String {
        format!("{}/chat/{}", self.base_url, agent_id)
    }

    /// Forwards one user message and returns the parsed vendor answer.
    /// No retries: any non-success status fails the call.
    #[instrument(
        name = "agent-request",
        skip_all,
        fields(agent_id = %credentials.agent_id, conversation_id = %conversation_id)
    )]
    pub async fn chat(
        &self,
        credentials: &Credentials,
        conversation_id: &ConversationId,
        user_message: &str,
    ) -> Result<UpstreamAnswer, AppError> {
        let url = self.chat_url(&credentials.agent_id);
        let payload = UpstreamChatPayload {
            user_message,
            conversation_uuid: conversation_id.as_str(),
        };

        debug!("Forwarding {} bytes to {url}", user_message.len());

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &credentials.api_key)
            .header(AGENT_ID_HEADER, &credentials.agent_id)
            .header(CONVERSATION_ID_HEADER, conversation_id.as_str())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!("Rippletide request failed: {e}");
                AppError::from_upstream(e, self.timeout.as_secs())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Rippletide answered {status} for {url}");
            return Err(AppError::UpstreamStatus { status: status.as_u16(), url });
        }

        response
            .json::<UpstreamAnswer>()
            .await
            .map_err(|e| AppError::from_upstream(e, self.timeout.as_secs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_url_is_parameterised_by_agent() {
        let svc = RippletideAgentService::new(
            "https://agent.rippletide.com/api/sdk/",
            Duration::from_secs(360),
        )
        .unwrap();
        assert_eq!(
            svc.chat_url("agent-42"),
            "https://agent.rippletide.com/api/sdk/chat/agent-42"
        );
    }
}
