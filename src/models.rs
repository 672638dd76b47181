use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned to the caller when the upstream answer carries no `answer` field.
pub const NO_ANSWER_PLACEHOLDER: &str = "No answer provided";

/// Inbound body of `POST /`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub inputs: String,
}

/// Vendor-scoped conversation token, forwarded on every upstream call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Uses `value` when it is non-empty, otherwise generates a fresh id.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Self(v.to_string()),
            _ => Self::generate(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body sent to `POST {base_url}/chat/{agent_id}`.
#[derive(Debug, Serialize)]
pub struct UpstreamChatPayload<'a> {
    pub user_message: &'a str,
    pub conversation_uuid: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpstreamAnswer {
    #[serde(default)]
    pub answer: Option<String>,
}

impl UpstreamAnswer {
    pub fn into_text(self) -> String {
        self.answer
            .unwrap_or_else(|| NO_ANSWER_PLACEHOLDER.to_string())
    }
}

/// JSON shape of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_id_prefers_the_supplied_header() {
        let id = ConversationId::from_header(Some("conv-123"));
        assert_eq!(id.as_str(), "conv-123");
    }

    #[test]
    fn conversation_id_is_generated_when_missing_or_blank() {
        let a = ConversationId::from_header(None);
        let b = ConversationId::from_header(Some("   "));
        assert!(Uuid::parse_str(a.as_str()).is_ok());
        assert!(Uuid::parse_str(b.as_str()).is_ok());
        assert_ne!(a, b);
    }

    #[test]
    fn answer_falls_back_to_placeholder() {
        let answer: UpstreamAnswer = serde_json::from_str(r#"{"other": 1}"#).unwrap();
        assert_eq!(answer.into_text(), NO_ANSWER_PLACEHOLDER);

        let answer: UpstreamAnswer = serde_json::from_str(r#"{"answer": null}"#).unwrap();
        assert_eq!(answer.into_text(), NO_ANSWER_PLACEHOLDER);

        let answer: UpstreamAnswer =
            serde_json::from_str(r#"{"answer": "Paris is the capital of France."}"#).unwrap();
        assert_eq!(answer.into_text(), "Paris is the capital of France.");
    }

    #[test]
    fn chat_request_requires_string_inputs() {
        assert!(serde_json::from_str::<ChatRequest>("{}").is_err());
        assert!(serde_json::from_str::<ChatRequest>(r#"{"inputs": 5}"#).is_err());
        let req: ChatRequest =
            serde_json::from_str(r#"{"inputs": "hi", "extra": true}"#).unwrap();
        assert_eq!(req.inputs, "hi");
    }
}
