use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use rippletide_gateway::provision::eval_client::DEFAULT_EVAL_BASE_URL;
use rippletide_gateway::provision::flows::{self, Endpoints};
use rippletide_gateway::provision::resolve_api_key;

#[derive(Parser, Debug)]
#[command(name = "rippletide-provision")]
#[command(about = "Create, seed and evaluate Rippletide agents")]
struct Cli {
    /// Rippletide API key
    #[arg(long, env = "RIPPLETIDE_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Base URL of the SDK agent API
    #[arg(long, env = "RIPPLETIDE_BASE_URL", global = true)]
    sdk_base_url: Option<String>,

    /// Base URL of the evaluation API
    #[arg(long, env = "RIPPLETIDE_EVAL_BASE_URL", default_value = DEFAULT_EVAL_BASE_URL, global = true)]
    eval_base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an SDK agent, extract questions from a PDF and evaluate its answers
    Agent {
        /// Agent configuration JSON file
        config: PathBuf,
        /// PDF used to extract questions for the evaluation agent
        #[arg(long)]
        pdf: PathBuf,
    },
    /// Create an SDK agent with its knowledge and send a probe question
    SdkAgent {
        /// Agent configuration JSON file
        config: PathBuf,
    },
    /// Create an evaluation agent and grade a probe question
    EvalAgent {
        /// PDF used to seed the evaluation agent's knowledge
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let endpoints = Endpoints {
        sdk_base_url: cli.sdk_base_url,
        eval_base_url: Some(cli.eval_base_url),
    };

    match cli.command {
        Command::Agent { config, pdf } => {
            let api_key = resolve_api_key(cli.api_key)?;
            let summary = flows::setup_agent(&api_key, &endpoints, &config, &pdf).await?;

            println!("SDK Agent ID: {}", summary.sdk_agent_id);
            println!("Evaluation Agent ID: {}", summary.eval_agent_id);
            println!("Total Questions Evaluated: {}", summary.total_evaluated);
            println!("\nDetailed Reports:");
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to render summary")?
            );
            println!("\nAdd this to your .env file: RIPPLETIDE_AGENT_ID={}", summary.sdk_agent_id);
        }
        Command::SdkAgent { config } => {
            let api_key = resolve_api_key(cli.api_key)?;
            let response = flows::setup_sdk_agent(&api_key, &endpoints, &config).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&response).context("Failed to render response")?
            );
        }
        Command::EvalAgent { pdf } => {
            let api_key = cli.api_key.filter(|k| !k.trim().is_empty());
            let outcome = flows::setup_eval_agent(api_key, &endpoints, pdf.as_deref()).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome).context("Failed to render report")?
            );
        }
    }

    Ok(())
}
