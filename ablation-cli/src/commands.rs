//! CLI subcommand handlers.

use crate::{Commands, EvalArgs, EvalJudgeArgs, PlanArgs};
use ablation_core::config::{ConfigOverrides, load_config};
use ablation_core::dataset::Dataset;
use ablation_core::types::{EvalMode, EvaluationResult};
use ablation_judge::{Judge, JudgeEvaluator, Planner};
use anyhow::Context;
use tracing::info;

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Eval(args) => handle_eval(args).await,
        Commands::Plan(args) => handle_plan(args).await,
        Commands::EvalJudge(args) => handle_eval_judge(args),
    }
}

fn print_result(result: &EvaluationResult) {
    println!("Precision: {}", result.precision);
    println!("Recall:    {}", result.recall);
    println!("F1:        {}", result.f1_score);
    if let Some(ndcg) = &result.ndcg_score {
        println!("NDCG:      {}", ndcg);
    }
    println!("Cost:      {:.4}", result.cost);
    if result.num_failed > 0 {
        println!(
            "Failed:    {} of {} tasks scored as zero",
            result.num_failed, result.num_tasks
        );
    }
}

async fn handle_eval(args: EvalArgs) -> anyhow::Result<()> {
    let overrides = ConfigOverrides {
        model_name: args.model_name,
        reasoning_effort: args.reasoning_effort,
        parallelism: args.parallelism,
        output_dir: args.output_dir,
        seed: args.seed,
        ..Default::default()
    };
    let config = load_config(&args.judge_config, &overrides)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    let judge = Judge::from_config(args.judge, config)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    let dataset = Dataset::load(&args.data_dir, args.dataset, args.split)?;
    info!(
        judge = %judge.kind(),
        dataset = %args.dataset,
        split = %args.split,
        plans = %args.generated_plans_path.display(),
        output_dir = %judge.output_dir().display(),
        "Evaluating generated plans"
    );

    let result = judge
        .evaluate(&args.generated_plans_path, &dataset, args.top_k)
        .await
        .with_context(|| format!("{} judge failed", judge.kind()))?;
    info!(%result, "Evaluation completed");
    print_result(&result);
    println!("Results written to {}", judge.output_dir().display());
    Ok(())
}

async fn handle_plan(args: PlanArgs) -> anyhow::Result<()> {
    if args.dataset.mode() != EvalMode::PaperMatching {
        anyhow::bail!(
            "Configuration error: planning requires the researcher dataset, got {}",
            args.dataset
        );
    }
    let overrides = ConfigOverrides {
        model_name: args.model_name,
        reasoning_effort: args.reasoning_effort,
        parallelism: args.parallelism,
        output_dir: args.output_dir,
        num_ablations: args.num_ablations,
        ..Default::default()
    };
    let config = load_config(&args.planner_config, &overrides)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    let planner = Planner::from_config(args.planner, config)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    let dataset = Dataset::load(&args.data_dir, args.dataset, args.split)?;
    let summary = planner
        .plan(&dataset)
        .await
        .with_context(|| format!("{} planner failed", planner.kind()))?;

    let empty = summary.values().filter(|e| e.predictions.is_empty()).count();
    let cost: f64 = summary.values().map(|e| e.cost).sum();
    println!(
        "Planned {} tasks ({} empty), total cost {:.4}",
        summary.len(),
        empty,
        cost
    );
    println!("Plans written to {}", planner.output_dir().display());
    Ok(())
}

fn handle_eval_judge(args: EvalJudgeArgs) -> anyhow::Result<()> {
    let evaluator = JudgeEvaluator::new(args.dataset, &args.judge_evaluations_path);
    let result = evaluator.run(&args.data_dir).with_context(|| {
        format!(
            "Judge evaluation failed for {}",
            args.judge_evaluations_path.display()
        )
    })?;
    print_result(&result);
    Ok(())
}
