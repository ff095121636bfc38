//! sentiment-cli
//!
//! Command-line client for a running sentiment service. Every command prints
//! the service's JSON reply, pretty-printed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::{Client, Method};
use serde_json::{json, Value};

use config_rs::{DEFAULT_PORT, SERVICE_ENV_PREFIX};

#[derive(Parser, Debug)]
#[command(name = "sentiment-cli", version, about = "Client for the sentiment prediction service")]
struct Cli {
    /// Service base URL (defaults to SENTIMENT_SERVICE_ADDR or http://localhost:8000)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show service health
    Health,

    /// Show request metrics
    Metrics {
        /// Reset the counters instead of reading them
        #[arg(long)]
        reset: bool,
    },

    /// Classify a single text
    Predict {
        text: String,

        /// Include class probabilities
        #[arg(long)]
        probabilities: bool,

        /// Request an explanation
        #[arg(long)]
        enhanced: bool,

        /// groq, gemini, auto or offline
        #[arg(long)]
        provider: Option<String>,

        #[arg(long)]
        request_id: Option<String>,
    },

    /// Classify several texts in one request
    Batch {
        texts: Vec<String>,

        /// Read additional texts from a file, one per line
        #[arg(long)]
        file: Option<PathBuf>,

        #[arg(long)]
        probabilities: bool,

        #[arg(long)]
        enhanced: bool,

        #[arg(long)]
        provider: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let base_url = cli
        .url
        .clone()
        .unwrap_or_else(|| config_rs::get_client_address(SERVICE_ENV_PREFIX, DEFAULT_PORT, None));
    let client = Client::builder()
        .timeout(Duration::from_secs(cli.timeout))
        .build()
        .context("failed to build HTTP client")?;

    let (method, path, body) = match cli.command {
        Command::Health => (Method::GET, "/health", None),
        Command::Metrics { reset: false } => (Method::GET, "/metrics", None),
        Command::Metrics { reset: true } => (Method::POST, "/metrics/reset", None),
        Command::Predict {
            text,
            probabilities,
            enhanced,
            provider,
            request_id,
        } => (
            Method::POST,
            "/api/v1/predict",
            Some(json!({
                "text": text,
                "return_probabilities": probabilities,
                "enhanced": enhanced,
                "llm_provider": provider,
                "request_id": request_id,
            })),
        ),
        Command::Batch {
            mut texts,
            file,
            probabilities,
            enhanced,
            provider,
        } => {
            if let Some(path) = file {
                texts.extend(read_texts(&path)?);
            }
            if texts.is_empty() {
                bail!("no texts given; pass them as arguments or with --file");
            }
            (
                Method::POST,
                "/api/v1/predict/batch",
                Some(json!({
                    "texts": texts,
                    "return_probabilities": probabilities,
                    "enhanced": enhanced,
                    "llm_provider": provider,
                })),
            )
        }
    };

    let url = format!("{}{}", base_url.trim_end_matches('/'), path);
    let mut request = client.request(method, &url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request
        .send()
        .await
        .with_context(|| format!("cannot reach {}", url))?;
    let status = response.status();
    let reply: Value = response.json().await.context("service returned a non-JSON body")?;

    println!("{}", serde_json::to_string_pretty(&reply)?);
    if !status.is_success() {
        bail!("request failed with status {}", status);
    }
    Ok(())
}

fn read_texts(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
