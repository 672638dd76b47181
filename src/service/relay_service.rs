use tracing::{info, warn};

use crate::agent::RippletideAgentService;
use crate::config::{CredentialState, Credentials, GatewayConfig};
use crate::errors::AppError;
use crate::models::{ChatRequest, ConversationId};

/// Relays chat turns to Rippletide. Cheap to clone: one per request task.
#[derive(Clone)]
pub struct RelayService {
    agent: RippletideAgentService,
    credentials: CredentialState,
}

impl RelayService {
    pub fn new(agent: RippletideAgentService, credentials: CredentialState) -> Self {
        Self { agent, credentials }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, AppError> {
        let agent = RippletideAgentService::new(&config.base_url, config.upstream_timeout)?;
        Ok(Self::new(agent, config.credentials.clone()))
    }

    /// Fails with a configuration error while a credential is missing.
    pub fn credentials(&self) -> Result<&Credentials, AppError> {
        self.credentials.credentials()
    }

    pub async fn relay(
        &self,
        credentials: &Credentials,
        request: &ChatRequest,
        conversation_id: &ConversationId,
    ) -> Result<String, AppError> {
        let mut guard = InflightGuard::new(conversation_id);
        let answer = self
            .agent
            .chat(credentials, conversation_id, &request.inputs)
            .await;
        guard.finish();

        let text = answer?.into_text();
        info!(conversation_id = %conversation_id, "Relayed answer of {} bytes", text.len());
        Ok(text)
    }
}

/// Dropping the relay future (the caller hung up) drops the outbound request
/// with it; this guard records that it happened.
struct InflightGuard<'a> {
    conversation_id: &'a ConversationId,
    finished: bool,
}

impl<'a> InflightGuard<'a> {
    fn new(conversation_id: &'a ConversationId) -> Self {
        Self { conversation_id, finished: false }
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                conversation_id = %self.conversation_id,
                "Caller went away before Rippletide answered; upstream call aborted"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn missing_credentials_surface_as_configuration_error() {
        let agent =
            RippletideAgentService::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let svc = RelayService::new(
            agent,
            CredentialState::resolve(Some("your-api-key-here".into()), Some("agent".into())),
        );
        let err = svc.credentials().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("RIPPLETIDE_API_KEY"));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_an_upstream_error() {
        // Port 9 (discard) is closed on test hosts; the connect fails fast.
        let agent =
            RippletideAgentService::new("http://127.0.0.1:9", Duration::from_secs(5)).unwrap();
        let svc = RelayService::new(
            agent,
            CredentialState::resolve(Some("key".into()), Some("agent".into())),
        );
        let creds = svc.credentials().unwrap().clone();
        let err = svc
            .relay(
                &creds,
                &ChatRequest { inputs: "hello".into() },
                &ConversationId::generate(),
            )
            .await
            .unwrap_err();
        assert!(err.is_upstream());
    }
}
