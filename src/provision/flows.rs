//! The three provisioning flows run by `rippletide-provision`.
//!
//! Progress goes to stdout; the caller prints the returned summaries.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::agent_config::AgentConfig;
use super::eval_client::{EvalClient, NewEvalAgent};
use super::sdk_client::{KnowledgeReport, SdkAgentClient, StepOutcome};
use super::ProvisionError;
use crate::models::NO_ANSWER_PLACEHOLDER;

pub const EVAL_AGENT_NAME: &str = "Evaluation Agent";
pub const SDK_PROBE_QUESTION: &str = "How can I track my order?";
pub const EVAL_PROBE_QUESTION: &str = "What is the capital of France?";
pub const EVAL_PROBE_ANSWER: &str = "Paris";

/// Where the flows send their requests.
#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    pub sdk_base_url: Option<String>,
    pub eval_base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionPair {
    pub question: String,
    pub expected_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRecord {
    pub question: String,
    pub expected_answer: Option<String>,
    pub agent_answer: String,
    pub report: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary {
    pub sdk_agent_id: String,
    pub eval_agent_id: String,
    pub total_evaluated: usize,
    pub reports: Vec<EvaluationRecord>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalAgentOutcome {
    pub agent_id: String,
    pub report: Value,
}

/// Q&A pairs from a PDF extraction result, whichever key the service used.
pub fn extracted_pairs(result: &Value) -> Vec<Value> {
    ["qaPairs", "qa_pairs", "questions"]
        .iter()
        .find_map(|key| result.get(*key).and_then(Value::as_array))
        .cloned()
        .unwrap_or_default()
}

/// Reads a question and its optional expected answer; `None` without a question.
pub fn question_pair(entry: &Value) -> Option<QuestionPair> {
    let first = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| entry.get(*k).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let question = first(&["question", "prompt"])?;
    let expected_answer = first(&["answer", "expectedAnswer", "expected_answer"]);
    Some(QuestionPair { question, expected_answer })
}

fn banner(title: &str) {
    let rule = "=".repeat(60);
    println!("\n{rule}\n{title}\n{rule}");
}

fn print_knowledge(report: &KnowledgeReport) {
    for step in &report.steps {
        match &step.outcome {
            StepOutcome::Configured => println!("   [SUCCESS] {}: {}", step.kind, step.label),
            StepOutcome::Rejected { status, body } => {
                println!("   [ERROR] {} {}: {status} - {body}", step.kind, step.label)
            }
        }
    }
    println!(
        "{} Q&A pairs, {} tool calls, {} guardrails configured ({} rejected)",
        report.configured("qa_pair"),
        report.configured("tool_call"),
        report.configured("guardrail"),
        report.rejected()
    );
}

async fn create_sdk_agent(
    api_key: &str,
    endpoints: &Endpoints,
    config: &AgentConfig,
) -> Result<(SdkAgentClient, String), ProvisionError> {
    let mut agent = SdkAgentClient::new(api_key, endpoints.sdk_base_url.as_deref());
    let created = agent.create_agent(&config.agent_name, &config.agent_purpose).await?;
    println!("Created SDK agent with ID: {}", created.id);

    println!("Setting up agent knowledge from config...");
    let report = agent.setup_agent_knowledge(&created.id, config).await?;
    print_knowledge(&report);
    Ok((agent, created.id))
}

/// Creates an SDK agent, extracts Q&A pairs from `pdf_path` through an
/// evaluation agent, then asks and grades every question.
pub async fn setup_agent(
    api_key: &str,
    endpoints: &Endpoints,
    config_path: &Path,
    pdf_path: &Path,
) -> Result<EvaluationSummary, ProvisionError> {
    let config = AgentConfig::load(config_path)?;
    if !pdf_path.exists() {
        return Err(ProvisionError::PdfNotFound(pdf_path.to_path_buf()));
    }

    banner("Step 1: Creating SDK Agent");
    let (agent, sdk_agent_id) = create_sdk_agent(api_key, endpoints, &config).await?;

    banner("Step 2: Creating Evaluation Agent and Extracting Questions from PDF");
    let eval = EvalClient::new(Some(api_key.to_string()), None, endpoints.eval_base_url.as_deref())?;
    let eval_agent_id = eval.create_agent(&NewEvalAgent::named(EVAL_AGENT_NAME)).await?.id;
    println!("Created evaluation agent with ID: {eval_agent_id}");

    println!("Extracting questions from PDF: {}", pdf_path.display());
    let extraction = eval.extract_questions_from_pdf(&eval_agent_id, pdf_path).await?;
    let mut pairs = extracted_pairs(&extraction);
    if pairs.is_empty() {
        println!("No Q&A pairs found in extraction result, trying test prompts...");
        match eval.get_test_prompts(&eval_agent_id).await {
            Ok(prompts) => pairs = prompts,
            Err(e) => println!("Could not get test prompts: {e}"),
        }
    }
    println!("Extracted {} Q&A pairs from PDF", pairs.len());
    if pairs.is_empty() {
        return Err(ProvisionError::NoQuestions);
    }

    banner("Step 3: Asking SDK Agent Questions and Evaluating Answers");
    let total = pairs.len();
    let mut reports = Vec::new();
    for (i, entry) in pairs.iter().enumerate() {
        let Some(pair) = question_pair(entry) else {
            println!("\nSkipping Q&A pair {}: no question found", i + 1);
            continue;
        };

        println!("\n--- Question {}/{total} ---", i + 1);
        println!("Question: {}", pair.question);
        if let Some(expected) = &pair.expected_answer {
            println!("Expected Answer: {expected}");
        }

        let response = agent.chat(&pair.question, None).await?;
        let agent_answer = response
            .get("answer")
            .and_then(Value::as_str)
            .unwrap_or(NO_ANSWER_PLACEHOLDER)
            .to_string();
        println!("Agent Answer: {agent_answer}");

        let report = match eval
            .evaluate(
                &eval_agent_id,
                &pair.question,
                pair.expected_answer.as_deref(),
                Some(agent_answer.as_str()),
            )
            .await
        {
            Ok(report) => report,
            Err(e) => {
                warn!("Evaluation failed for question {}: {e}", i + 1);
                println!("Error evaluating answer: {e}");
                continue;
            }
        };
        println!(
            "Evaluation Label: {}",
            report.get("label").and_then(Value::as_str).unwrap_or("N/A")
        );

        reports.push(EvaluationRecord {
            question: pair.question,
            expected_answer: pair.expected_answer,
            agent_answer,
            report,
        });
    }

    banner("Step 4: Evaluation Summary");
    Ok(EvaluationSummary {
        sdk_agent_id,
        eval_agent_id,
        total_evaluated: reports.len(),
        reports,
        generated_at: Utc::now(),
    })
}

/// Creates an SDK agent with its knowledge and sends one probe question.
pub async fn setup_sdk_agent(
    api_key: &str,
    endpoints: &Endpoints,
    config_path: &Path,
) -> Result<Value, ProvisionError> {
    let config = AgentConfig::load(config_path)?;
    let (agent, _) = create_sdk_agent(api_key, endpoints, &config).await?;
    agent.chat(SDK_PROBE_QUESTION, None).await
}

/// Creates an evaluation agent, optionally seeds it with a PDF, and grades
/// a fixed probe question.
pub async fn setup_eval_agent(
    api_key: Option<String>,
    endpoints: &Endpoints,
    pdf_path: Option<&Path>,
) -> Result<EvalAgentOutcome, ProvisionError> {
    let eval = EvalClient::new(api_key, None, endpoints.eval_base_url.as_deref())?;
    let agent_id = eval.create_agent(&NewEvalAgent::named(EVAL_AGENT_NAME)).await?.id;

    if let Some(pdf) = pdf_path {
        eval.extract_questions_from_pdf(&agent_id, pdf).await?;
    }

    let report = eval
        .evaluate(&agent_id, EVAL_PROBE_QUESTION, Some(EVAL_PROBE_ANSWER), None)
        .await?;
    Ok(EvalAgentOutcome { agent_id, report })
}
