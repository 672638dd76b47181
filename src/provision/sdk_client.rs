use reqwest::RequestBuilder;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use super::agent_config::AgentConfig;
use super::{required_id, send, send_json, send_ok, ProvisionError};
use crate::agent::{AGENT_ID_HEADER, API_KEY_HEADER, CONVERSATION_ID_HEADER};
use crate::config::DEFAULT_BASE_URL;

const UNNAMED_TOOL_CALL: &str = "unnamed_tool_call";

/// Outcome of one knowledge item pushed to the SDK API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Configured,
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct KnowledgeStep {
    pub kind: &'static str,
    pub label: String,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeReport {
    pub steps: Vec<KnowledgeStep>,
}

impl KnowledgeReport {
    fn record(&mut self, kind: &'static str, label: impl Into<String>, outcome: StepOutcome) {
        self.steps.push(KnowledgeStep { kind, label: label.into(), outcome });
    }

    pub fn configured(&self, kind: &str) -> usize {
        self.steps
            .iter()
            .filter(|s| s.kind == kind && s.outcome == StepOutcome::Configured)
            .count()
    }

    pub fn rejected(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Rejected { .. }))
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct CreatedAgent {
    pub id: String,
    pub data: Value,
}

/// Client for the SDK agent API (agent creation, knowledge, chat).
pub struct SdkAgentClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    agent_id: Option<String>,
    conversation_id: String,
}

impl SdkAgentClient {
    pub fn new(api_key: impl Into<String>, base_url: Option<&str>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            agent_id: None,
            conversation_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref()
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, &self.api_key)
    }

    /// Adds the agent and conversation headers the SDK expects on scoped calls.
    fn scoped(&self, request: RequestBuilder, agent_id: &str, conversation_id: &str) -> RequestBuilder {
        self.authed(request)
            .header(AGENT_ID_HEADER, agent_id)
            .header(CONVERSATION_ID_HEADER, conversation_id)
    }

    pub async fn create_agent(&mut self, name: &str, prompt: &str) -> Result<CreatedAgent, ProvisionError> {
        let url = self.url("/agent");
        let request = self
            .authed(self.http.post(&url))
            .json(&json!({ "name": name, "prompt": prompt }));
        let data = send_json(request, &url).await?;
        let id = required_id(&data, &url)?;
        self.agent_id = Some(id.clone());
        Ok(CreatedAgent { id, data })
    }

    /// Pushes every non-empty knowledge section of `config`.
    ///
    /// State predicate and Q&A failures abort; the remaining sections are
    /// best-effort and land in the report as rejected steps.
    pub async fn setup_agent_knowledge(
        &self,
        agent_id: &str,
        config: &AgentConfig,
    ) -> Result<KnowledgeReport, ProvisionError> {
        let mut report = KnowledgeReport::default();

        if let Some(predicate) = config.state_predicate() {
            let url = self.url(&format!("/state-predicate/{agent_id}"));
            let request = self
                .authed(self.http.put(&url))
                .json(&json!({ "state_predicate": predicate }));
            send_ok(request, &url).await?;
            report.record("state_predicate", "state predicate", StepOutcome::Configured);
        }

        for qa in &config.qa_pairs {
            let url = self.url("/q-and-a");
            let request = self.authed(self.http.post(&url)).json(&json!({
                "question": qa.question,
                "answer": qa.answer,
                "agent_id": agent_id,
            }));
            send_ok(request, &url).await?;
            report.record("qa_pair", qa.question.clone(), StepOutcome::Configured);
        }

        if !config.user_input_collection.is_empty() {
            let url = self.url(&format!("/agent/{agent_id}/user-inputs"));
            let request = self
                .authed(self.http.post(&url))
                .json(&config.user_input_collection);
            let outcome = outcome_of(send(request, &url).await?).await;
            for field in &config.user_input_collection {
                report.record(
                    "user_input",
                    format!("{}: {}", field.label, field.description),
                    outcome.clone(),
                );
            }
        }

        for tool_call in &config.tool_calls {
            let label = tool_call.label.as_deref().unwrap_or(UNNAMED_TOOL_CALL);
            let url = self.url("/add-tool-call");
            let body = json!({
                "label": label,
                "description": tool_call.description.as_deref().unwrap_or(""),
                "api_call_config": tool_call.api_call_config.clone().unwrap_or_else(|| json!({})),
                "required_user_inputs": tool_call.required_user_inputs.clone().unwrap_or_default(),
            });
            let request = self
                .scoped(self.http.post(&url), agent_id, &self.conversation_id)
                .json(&body);
            let outcome = outcome_of(send(request, &url).await?).await;
            report.record("tool_call", label, outcome);
        }

        if let Some(format_answer) = config.format_answer() {
            let url = self.url(&format!("/tool-calls/agent/{agent_id}/add-format-answer"));
            let request = self
                .scoped(self.http.post(&url), agent_id, &self.conversation_id)
                .json(&json!({ "format_answer": format_answer }));
            let outcome = outcome_of(send(request, &url).await?).await;
            let preview: String = format_answer.chars().take(50).collect();
            report.record("format_answer", preview, outcome);
        }

        for guardrail in &config.guardrails {
            let url = self.url(&format!("/tool-calls/agent/{agent_id}/add-guardrail-variable"));
            let label = guardrail.label.clone().unwrap_or_default();
            let request = self
                .scoped(self.http.post(&url), agent_id, &self.conversation_id)
                .json(&json!({
                    "guardrail_variable_config": {
                        "label": label,
                        "description": guardrail.description.as_deref().unwrap_or(""),
                    }
                }));
            let outcome = outcome_of(send(request, &url).await?).await;
            report.record("guardrail", if label.is_empty() { "N/A".to_string() } else { label }, outcome);
        }

        debug!(
            "Knowledge setup for {agent_id}: {} steps, {} rejected",
            report.steps.len(),
            report.rejected()
        );
        Ok(report)
    }

    /// Sends one message to the created agent.
    pub async fn chat(&self, message: &str, conversation_id: Option<&str>) -> Result<Value, ProvisionError> {
        let agent_id = self.agent_id.as_deref().ok_or(ProvisionError::AgentNotCreated)?;
        let conversation_id = conversation_id.unwrap_or(&self.conversation_id);
        let url = self.url(&format!("/chat/{agent_id}"));
        let request = self
            .scoped(self.http.post(&url), agent_id, conversation_id)
            .json(&json!({ "user_message": message, "conversation_uuid": conversation_id }));
        send_json(request, &url).await
    }
}

async fn outcome_of(response: reqwest::Response) -> StepOutcome {
    let status = response.status();
    if status.as_u16() == 200 {
        StepOutcome::Configured
    } else {
        let body = response.text().await.unwrap_or_default();
        warn!("Knowledge step rejected with {status}: {body}");
        StepOutcome::Rejected { status: status.as_u16(), body }
    }
}
