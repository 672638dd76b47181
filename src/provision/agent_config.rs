use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ProvisionError;

pub const DEFAULT_AGENT_NAME: &str = "rippletide-agent";
pub const DEFAULT_AGENT_PURPOSE: &str = "You are a helpful assistant.";

/// Agent description file consumed by the `agent` and `sdk-agent` flows.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
    #[serde(default = "default_agent_purpose")]
    pub agent_purpose: String,
    #[serde(default)]
    pub state_predicate: Option<Value>,
    #[serde(default)]
    pub qa_pairs: Vec<QaPair>,
    #[serde(default)]
    pub user_input_collection: Vec<UserInputField>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallConfig>,
    #[serde(default)]
    pub format_answer: Option<String>,
    #[serde(default)]
    pub guardrails: Vec<GuardrailConfig>,
}

fn default_agent_name() -> String {
    DEFAULT_AGENT_NAME.to_string()
}

fn default_agent_purpose() -> String {
    DEFAULT_AGENT_PURPOSE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

/// Forwarded as-is; only `label` and `description` are read locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInputField {
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallConfig {
    pub label: Option<String>,
    pub description: Option<String>,
    pub api_call_config: Option<Value>,
    pub required_user_inputs: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuardrailConfig {
    pub label: Option<String>,
    pub description: Option<String>,
}

impl AgentConfig {
    pub fn load(path: &Path) -> Result<Self, ProvisionError> {
        if !path.exists() {
            return Err(ProvisionError::ConfigNotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ProvisionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ProvisionError::InvalidConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The state predicate, unless it is null or empty.
    pub fn state_predicate(&self) -> Option<&Value> {
        self.state_predicate.as_ref().filter(|v| is_present(v))
    }

    pub fn format_answer(&self) -> Option<&str> {
        self.format_answer.as_deref().filter(|s| !s.is_empty())
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_object_uses_defaults() {
        let config: AgentConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.agent_name, DEFAULT_AGENT_NAME);
        assert_eq!(config.agent_purpose, DEFAULT_AGENT_PURPOSE);
        assert!(config.state_predicate().is_none());
        assert!(config.format_answer().is_none());
        assert!(config.qa_pairs.is_empty());
    }

    #[test]
    fn full_config_round_trips_user_input_extras() {
        let config: AgentConfig = serde_json::from_value(serde_json::json!({
            "agent_name": "support",
            "state_predicate": {"transition_kind": "branch"},
            "qa_pairs": [{"question": "Q", "answer": "A"}],
            "user_input_collection": [
                {"label": "order_id", "description": "Order number", "type": "string"}
            ],
            "tool_calls": [{"description": "lookup"}],
            "format_answer": "",
            "guardrails": [{"label": "no_refunds"}]
        }))
        .unwrap();

        assert!(config.state_predicate().is_some());
        assert!(config.format_answer().is_none());
        let field = serde_json::to_value(&config.user_input_collection[0]).unwrap();
        assert_eq!(field["type"], "string");
        assert_eq!(config.tool_calls[0].label, None);
        assert_eq!(config.guardrails[0].label.as_deref(), Some("no_refunds"));
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let missing = Path::new("/definitely/not/here.json");
        assert!(matches!(
            AgentConfig::load(missing),
            Err(ProvisionError::ConfigNotFound(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            AgentConfig::load(file.path()),
            Err(ProvisionError::InvalidConfig { .. })
        ));
    }
}
