use std::collections::HashMap;
use std::path::Path;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::sdk_client::CreatedAgent;
use super::{required_id, send_json, ProvisionError};
use crate::agent::API_KEY_HEADER;

pub const DEFAULT_EVAL_BASE_URL: &str = "http://localhost:3001";
pub const SESSION_ID_HEADER: &str = "x-session-id";
const DEFAULT_NUM_NODES: u32 = 100;
const MAX_SEED: u32 = 1_000_000;

/// Parameters for a new evaluation agent.
#[derive(Debug, Clone)]
pub struct NewEvalAgent {
    pub name: String,
    pub seed: Option<u32>,
    pub num_nodes: u32,
    pub public_url: Option<String>,
    pub advanced_payload: Option<HashMap<String, String>>,
    pub parent_agent_id: Option<String>,
}

impl NewEvalAgent {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seed: None,
            num_nodes: DEFAULT_NUM_NODES,
            public_url: None,
            advanced_payload: None,
            parent_agent_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EvalAgentPayload<'a> {
    name: &'a str,
    seed: u32,
    num_nodes: u32,
    label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    public_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    advanced_payload: Option<&'a HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_agent_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluatePayload<'a> {
    question: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_answer: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    answer: Option<&'a str>,
}

/// Client for the evaluation API.
///
/// Authenticates with an API key when one is given, otherwise runs as an
/// anonymous session identified by `X-Session-Id`.
pub struct EvalClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    session_id: Option<String>,
}

impl EvalClient {
    pub fn new(
        api_key: Option<String>,
        session_id: Option<String>,
        base_url: Option<&str>,
    ) -> Result<Self, ProvisionError> {
        let api_key = api_key.filter(|k| !k.is_empty());
        let session_id = match (&api_key, session_id) {
            (None, None) => Some(Uuid::new_v4().to_string()),
            (_, session) => session,
        };

        let mut headers = HeaderMap::new();
        if let Some(key) = &api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|_| ProvisionError::InvalidHeaderValue(API_KEY_HEADER))?;
            headers.insert(API_KEY_HEADER, value);
        }
        if let Some(session) = &session_id {
            let value = HeaderValue::from_str(session)
                .map_err(|_| ProvisionError::InvalidHeaderValue(SESSION_ID_HEADER))?;
            headers.insert(SESSION_ID_HEADER, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(ProvisionError::http(base_url.unwrap_or(DEFAULT_EVAL_BASE_URL)))?;

        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or(DEFAULT_EVAL_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            session_id,
        })
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn is_anonymous(&self) -> bool {
        self.api_key.is_none() && self.session_id.is_some()
    }

    pub async fn create_agent(&self, agent: &NewEvalAgent) -> Result<CreatedAgent, ProvisionError> {
        let endpoint = if self.is_anonymous() { "/api/agents/anonymous" } else { "/api/agents" };
        let url = self.url(endpoint);
        let seed = agent
            .seed
            .unwrap_or_else(|| rand::rng().random_range(0..=MAX_SEED));
        let payload = EvalAgentPayload {
            name: &agent.name,
            seed,
            num_nodes: agent.num_nodes,
            label: "eval",
            public_url: agent.public_url.as_deref(),
            advanced_payload: agent.advanced_payload.as_ref(),
            parent_agent_id: agent.parent_agent_id.as_deref(),
        };
        let data = send_json(self.http.post(&url).json(&payload), &url).await?;
        let id = required_id(&data, &url)?;
        Ok(CreatedAgent { id, data })
    }

    /// Uploads a PDF; the service extracts questions and expected answers from it.
    pub async fn extract_questions_from_pdf(
        &self,
        agent_id: &str,
        pdf_path: &Path,
    ) -> Result<Value, ProvisionError> {
        if !pdf_path.exists() {
            return Err(ProvisionError::PdfNotFound(pdf_path.to_path_buf()));
        }
        let bytes = tokio::fs::read(pdf_path)
            .await
            .map_err(|source| ProvisionError::Io { path: pdf_path.to_path_buf(), source })?;
        let file_name = pdf_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        let url = self.url(&format!("/api/agents/{agent_id}/upload-pdf"));
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(ProvisionError::http(&url))?;
        let form = Form::new().part("file", part);

        send_json(self.http.post(&url).multipart(form), &url).await
    }

    pub async fn get_test_prompts(&self, agent_id: &str) -> Result<Vec<Value>, ProvisionError> {
        let url = self.url(&format!("/api/agents/{agent_id}/test-prompts"));
        match send_json(self.http.get(&url), &url).await? {
            Value::Array(prompts) => Ok(prompts),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }

    pub async fn chat(&self, agent_id: &str, message: &str) -> Result<Value, ProvisionError> {
        let url = self.url(&format!("/api/agents/{agent_id}/chat"));
        let request = self.http.post(&url).json(&json!({ "message": message }));
        send_json(request, &url).await
    }

    /// Grades `answer` (or the knowledge base alone) for `question`.
    pub async fn evaluate(
        &self,
        agent_id: &str,
        question: &str,
        expected_answer: Option<&str>,
        answer: Option<&str>,
    ) -> Result<Value, ProvisionError> {
        let url = self.url(&format!("/api/agents/{agent_id}/evaluate"));
        let payload = EvaluatePayload { question, expected_answer, answer };
        send_json(self.http.post(&url).json(&payload), &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_client_gets_a_session() {
        let client = EvalClient::new(None, None, None).unwrap();
        assert!(client.session_id().is_some());
        assert!(client.is_anonymous());
        assert_eq!(client.url("/api/agents"), "http://localhost:3001/api/agents");
    }

    #[test]
    fn api_key_client_has_no_session() {
        let client = EvalClient::new(Some("key".into()), None, Some("http://eval.local/")).unwrap();
        assert!(client.session_id().is_none());
        assert!(!client.is_anonymous());
        assert_eq!(client.url("/x"), "http://eval.local/x");
    }

    #[test]
    fn payloads_use_camel_case_and_skip_absent_fields() {
        let payload = EvalAgentPayload {
            name: "Evaluation Agent",
            seed: 3,
            num_nodes: 100,
            label: "eval",
            public_url: None,
            advanced_payload: None,
            parent_agent_id: Some("parent"),
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "name": "Evaluation Agent",
                "seed": 3,
                "numNodes": 100,
                "label": "eval",
                "parentAgentId": "parent"
            })
        );

        let payload = EvaluatePayload { question: "Q", expected_answer: Some("A"), answer: None };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({ "question": "Q", "expectedAnswer": "A" })
        );
    }

    #[tokio::test]
    async fn missing_pdf_is_reported_before_any_request() {
        let client = EvalClient::new(Some("key".into()), None, Some("http://127.0.0.1:9")).unwrap();
        let err = client
            .extract_questions_from_pdf("agent", Path::new("/no/such/file.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::PdfNotFound(_)));
    }
}
