//! baton: run a goal from JSON files and print the final envelope.
//!
//! No live producers are wired in here. Steps supplied as pre-computed
//! `{data, meta}` envelopes are replayed; any other step degrades to
//! `no producer registered`.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use baton_core::{BatonConfig, Budget, Goal, OrchestratorBuilder};

/// Run pipeline goals from JSON files and print the final envelope.
#[derive(Debug, Parser)]
#[command(name = "baton")]
#[command(about = "Pipeline orchestration and handoff contracts", long_about = None)]
#[command(after_help = "Environment: BATON_INFERENCE_BACKEND, BATON_API_KEY, BATON_INTERNAL_PREFIX, RUST_LOG")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a goal and print the final envelope.
    Run(RunArgs),

    /// List goals and their steps.
    Goals,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Goal name (see `baton goals`).
    goal: String,

    /// JSON object keyed by step id: raw parameters or `{data, meta}` envelopes.
    #[arg(long, value_name = "FILE")]
    inputs: Option<PathBuf>,

    /// JSON budget `{max_web_requests?, max_items?, max_words?}`.
    #[arg(long, value_name = "FILE")]
    budget: Option<PathBuf>,

    /// JSON config; defaults to the environment.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<BatonConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            BatonConfig::from_json(&text)?
        }
        None => BatonConfig::from_env()?,
    };
    Ok(config)
}

async fn run_goal(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;

    let inputs: Map<String, Value> = match &args.inputs {
        Some(path) => match read_json(path)? {
            Value::Object(map) => map,
            other => bail!("inputs must be a JSON object keyed by step id, got {other}"),
        },
        None => Map::new(),
    };

    let budget: Option<Budget> = match &args.budget {
        Some(path) => Some(
            serde_json::from_value(read_json(path)?)
                .with_context(|| format!("invalid budget in {}", path.display()))?,
        ),
        None => None,
    };

    info!(
        goal = %args.goal,
        backend = %config.inference_backend,
        steps_supplied = inputs.len(),
        "starting run"
    );

    let orchestrator = OrchestratorBuilder::new().with_config(config).build()?;
    let envelope = orchestrator
        .run(&args.goal, &inputs, budget.as_ref())
        .await;

    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn list_goals() {
    for goal in Goal::ALL {
        let steps: Vec<String> = goal
            .steps()
            .iter()
            .map(|s| {
                let label = format!("{}:{}", s.step_id, s.agent);
                if s.is_conditional() {
                    format!("[{label}]")
                } else {
                    label
                }
            })
            .collect();
        println!("{:<20} {}", goal.as_str(), steps.join(" -> "));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays pure JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_goal(args).await,
        Commands::Goals => {
            list_goals();
            Ok(())
        }
    }
}
