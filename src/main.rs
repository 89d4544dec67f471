//! # SEO Analysis Agent
//!
//! Runs the four-stage analysis pipeline for one website and prints the
//! report.
//!
//! ```bash
//! cargo run -- example.com
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use seo_analysis_agent::output::{present, render_progress};
use seo_analysis_agent::{Config, RigExecutor, SeoPipeline};

#[derive(Parser, Debug)]
#[command(
    name = "seo-analysis-agent",
    version,
    about = "Analyze a website's SEO, find and research its competitors, and write a report",
    long_about = r#"
Runs four LLM agents one after another against a website:
  1. Website analyst      - audits the site
  2. Competitor analyst   - lists competing sites
  3. Competitor researcher - researches those competitors
  4. Report writer        - writes the final SEO report

PREREQUISITES:
  1. Install Ollama: https://ollama.ai
  2. Pull a model: ollama pull llama3.2
  3. Start Ollama: ollama serve

EXAMPLES:
  seo-analysis-agent example.com
  seo-analysis-agent --model qwen2.5 --output report.md example.com
  seo-analysis-agent --json example.com > run.json
"#
)]
struct Args {
    /// Website to analyze
    #[arg(value_name = "WEBSITE")]
    website: String,

    /// Ollama model to use (overrides OLLAMA_MODEL)
    #[arg(short = 'm', long = "model", env = "OLLAMA_MODEL")]
    model: Option<String>,

    /// Write the report to this file
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print the whole run state as JSON instead of the framed report
    #[arg(long = "json", default_value = "false")]
    json: bool,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", default_value = "false")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(model) = args.model {
        config.model = model;
    }

    init_logging(&config, args.verbose)?;
    config.validate()?;

    info!(
        model = %config.model,
        host = %config.ollama_host,
        website = %args.website,
        "Configuration loaded"
    );

    let mut pipeline = SeoPipeline::new(RigExecutor::new(config), args.website.as_str());
    let result = pipeline.kickoff().await;
    let state = pipeline.into_state();

    if let Err(e) = result {
        error!(error = %e, phase = %state.phase(), "Pipeline failed");
        eprintln!("\nAnalysis of {} failed: {}", state.website(), e);
        eprintln!("\nProgress:\n{}", render_progress(&state));
        if e.to_string().contains("connection refused") {
            eprintln!("\nTip: make sure Ollama is running (ollama serve)");
        }
        return Err(e.into());
    }

    present(&state, args.json, args.output.as_deref(), &mut std::io::stdout().lock())
}

/// Install the global tracing subscriber. `--verbose` forces debug output;
/// otherwise the configured log filter applies.
fn init_logging(config: &Config, verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
