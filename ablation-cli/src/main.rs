//! ablation-bench CLI: plan ablations, judge generated plans, and evaluate judges.

mod commands;

use ablation_core::types::{DatasetName, DatasetSplit, ReasoningEffort};
use ablation_judge::{JudgeKind, PlannerKind};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// ablation-bench: benchmark LM-generated ablation plans
#[derive(Parser, Debug)]
#[command(name = "ablation-bench", version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Score generated ablation plans with a judge
    Eval(EvalArgs),
    /// Generate ablation plans
    Plan(PlanArgs),
    /// Score a judge's decisions against human labels
    EvalJudge(EvalJudgeArgs),
}

#[derive(clap::Args, Debug)]
struct EvalArgs {
    /// Judge: simple_lm, external_agent, majority
    #[arg(long, env = "ABLATIONS_JUDGE")]
    judge: JudgeKind,

    /// Judge configuration (YAML)
    #[arg(long, env = "ABLATIONS_JUDGE_CONFIG")]
    judge_config: PathBuf,

    /// Model the judge uses
    #[arg(long, env = "ABLATIONS_MODEL_NAME")]
    model_name: Option<String>,

    /// Dataset: researcher or reviewer
    #[arg(long, env = "ABLATIONS_DATASET")]
    dataset: DatasetName,

    /// Dataset split: dev or test
    #[arg(long, default_value = "dev", env = "ABLATIONS_SPLIT")]
    split: DatasetSplit,

    /// Directory holding one `<task_id>.jsonl` plan per task
    #[arg(long, env = "ABLATIONS_GENERATED_PLANS_PATH")]
    generated_plans_path: PathBuf,

    /// Only consider the first K plan items
    #[arg(long, env = "ABLATIONS_TOP_K")]
    top_k: Option<usize>,

    /// Number of tasks evaluated concurrently
    #[arg(long, env = "ABLATIONS_PARALLELISM")]
    parallelism: Option<usize>,

    /// Output directory (default: runs/<timestamp>)
    #[arg(long, env = "ABLATIONS_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Reasoning effort for reasoning models: low, medium, high
    #[arg(long, env = "ABLATIONS_REASONING_EFFORT")]
    reasoning_effort: Option<ReasoningEffort>,

    /// Seed for shuffling and side assignment
    #[arg(long, env = "ABLATIONS_SEED")]
    seed: Option<u64>,

    /// Root directory of the datasets
    #[arg(long, default_value = "data", env = "ABLATIONS_DATA_DIR")]
    data_dir: PathBuf,
}

#[derive(clap::Args, Debug)]
struct PlanArgs {
    /// Planner: simple_lm, external_agent
    #[arg(long, env = "ABLATIONS_PLANNER")]
    planner: PlannerKind,

    /// Planner configuration (YAML)
    #[arg(long, env = "ABLATIONS_PLANNER_CONFIG")]
    planner_config: PathBuf,

    /// Model the planner uses
    #[arg(long, env = "ABLATIONS_MODEL_NAME")]
    model_name: Option<String>,

    /// Dataset: researcher or reviewer
    #[arg(long, default_value = "researcher", env = "ABLATIONS_DATASET")]
    dataset: DatasetName,

    /// Dataset split: dev or test
    #[arg(long, default_value = "dev", env = "ABLATIONS_SPLIT")]
    split: DatasetSplit,

    /// Number of ablations to plan per paper
    #[arg(long, env = "ABLATIONS_NUM_ABLATIONS")]
    num_ablations: Option<usize>,

    /// Number of tasks planned concurrently
    #[arg(long, env = "ABLATIONS_PARALLELISM")]
    parallelism: Option<usize>,

    /// Output directory (default: runs/<timestamp>)
    #[arg(long, env = "ABLATIONS_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Reasoning effort for reasoning models: low, medium, high
    #[arg(long, env = "ABLATIONS_REASONING_EFFORT")]
    reasoning_effort: Option<ReasoningEffort>,

    /// Root directory of the datasets
    #[arg(long, default_value = "data", env = "ABLATIONS_DATA_DIR")]
    data_dir: PathBuf,
}

#[derive(clap::Args, Debug)]
struct EvalJudgeArgs {
    /// Judge-eval dataset: researcher or reviewer
    #[arg(long, env = "ABLATIONS_DATASET")]
    dataset: DatasetName,

    /// Directory holding the judge runs being evaluated
    #[arg(long, env = "ABLATIONS_JUDGE_EVALUATIONS_PATH")]
    judge_evaluations_path: PathBuf,

    /// Root directory of the datasets
    #[arg(long, default_value = "data", env = "ABLATIONS_DATA_DIR")]
    data_dir: PathBuf,
}

impl Commands {
    /// Directory the run writes into, resolved once so logs and outputs agree.
    fn resolve_output_dir(&mut self) -> Option<PathBuf> {
        let slot = match self {
            Commands::Eval(args) => &mut args.output_dir,
            Commands::Plan(args) => &mut args.output_dir,
            Commands::EvalJudge(_) => return None,
        };
        Some(
            slot.get_or_insert_with(ablation_core::config::default_output_dir)
                .clone(),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let mut cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // JSON logs go next to the run outputs; eval-judge writes no outputs of its own
    let log_dir = match cli.command.resolve_output_dir() {
        Some(output_dir) => output_dir.join("logs"),
        None => directories::ProjectDirs::from("dev", "ablation-bench", "ablation-bench")
            .map(|d| d.data_dir().join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs")),
    };
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "ablation-bench.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    commands::handle_command(cli.command).await
}
