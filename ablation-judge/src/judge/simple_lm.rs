//! Single-call LM judge.

use ablation_core::brain::LlmProvider;
use ablation_core::cache::{CachedResponse, FileResponseCache, ResponseCache, cached_or_else};
use ablation_core::config::BenchConfig;
use ablation_core::dataset::{Dataset, Task};
use ablation_core::prompt::{PromptRenderer, parse_prediction_lines, parse_tagged_response};
use ablation_core::types::{EvalMode, EvaluationResult, MissingItem, SideAssignment, TaskEvaluation};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Instrument, Span, info, info_span, warn};

use super::{
    JudgeKind, REVIEW_SEPARATOR, collect_records, finish, into_record, load_plan_text,
    parse_side_lines, plan_lines, plan_names, present_sides, restore_sides, score_paper_task,
    score_review_task, store_predictions, task_rng,
};
use crate::error::Result;
use crate::llm::complete;
use crate::pool::run_bounded;

/// Asks the model once per task to match plan items against the ground truth.
///
/// Responses are cached under the output directory keyed by task id, so re-running
/// a partially completed evaluation only calls the model for the missing tasks.
/// Responses that do not parse are never cached and are requested again next run.
#[derive(Clone)]
pub struct SimpleLmJudge {
    config: Arc<BenchConfig>,
    provider: Arc<dyn LlmProvider>,
    cache: Arc<dyn ResponseCache>,
    renderer: Arc<PromptRenderer>,
    span: Span,
}

impl SimpleLmJudge {
    pub fn new(config: BenchConfig, provider: Arc<dyn LlmProvider>) -> Result<Self> {
        let renderer = PromptRenderer::new(&config.prompts)?;
        let cache = Arc::new(FileResponseCache::new(&config.output_dir));
        let span = info_span!("judge", judge = "simple_lm", model = %config.model.name);
        Ok(Self {
            config: Arc::new(config),
            provider,
            cache,
            renderer: Arc::new(renderer),
            span,
        })
    }

    /// Replace the response cache.
    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    pub async fn evaluate(
        &self,
        predictions_path: &Path,
        dataset: &Dataset,
        top_k: Option<usize>,
    ) -> Result<EvaluationResult> {
        std::fs::create_dir_all(self.output_dir())?;
        let mode = dataset.mode();
        info!(
            parent: &self.span,
            tasks = dataset.len(),
            ?mode,
            parallelism = self.config.parallelism,
            "Starting evaluation"
        );

        let predictions_path: Arc<PathBuf> = Arc::new(predictions_path.to_path_buf());
        let results = run_bounded(dataset.tasks.clone(), self.config.parallelism, |task| {
            let judge = self.clone();
            let predictions_path = predictions_path.clone();
            let span = info_span!(parent: &self.span, "task", task_id = %task.id);
            async move {
                let outcome = match mode {
                    EvalMode::PaperMatching => {
                        judge.paper_task(&task, &predictions_path, top_k).await
                    }
                    EvalMode::ReviewMatching => {
                        judge.review_task(&task, &predictions_path, top_k).await
                    }
                };
                into_record(&task.id, outcome)
            }
            .instrument(span)
        })
        .await;

        let records = collect_records(&dataset.tasks, results);
        finish(JudgeKind::SimpleLm, self.output_dir(), mode, &records)
    }

    async fn paper_task(
        &self,
        task: &Task,
        predictions_path: &Path,
        top_k: Option<usize>,
    ) -> Result<TaskEvaluation> {
        let plan_text = load_plan_text(predictions_path, &task.id).await?;
        let plan = plan_names(&task.id, &plan_text)?;
        let paper_ablations = task.paper_ablations()?;
        let paper = task.paper_ablation_names()?;

        let parses = |entry: &CachedResponse| {
            let tagged = parse_tagged_response(&entry.response.content);
            parse_side_lines(&task.id, &tagged.predictions).is_ok()
        };
        let cached = cached_or_else(self.cache.as_ref(), &task.id, parses, || async {
            let mut rng = task_rng(self.config.seed, &task.id);
            let sides = present_sides(&paper_ablations, &plan_lines(&plan_text), &mut rng);
            let vars = json!({
                "plan": plan_text,
                "paper_title": task.paper_title,
                "abstract": task.paper_abstract,
                "problem_statement": task.ablations_in_paper,
                "side_a": sides.side_a,
                "side_b": sides.side_b,
            });
            complete(
                &self.config,
                self.provider.as_ref(),
                &self.renderer,
                &vars,
                Some(sides.assignment),
            )
            .await
        })
        .await?;

        let tagged = parse_tagged_response(&cached.response.content);
        let items = match parse_side_lines(&task.id, &tagged.predictions) {
            Ok(items) => items,
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Could not parse judge response");
                return Ok(TaskEvaluation::failed(&task.id, cached.cost, e.to_string()));
            }
        };
        // Entries cached before sides were randomized always showed the paper first
        let assignment = cached.sides.unwrap_or(SideAssignment::PaperFirst);
        let predictions = restore_sides(&items, assignment);
        store_predictions(self.output_dir(), &task.id, &predictions).await?;

        Ok(score_paper_task(
            &task.id,
            &predictions,
            &paper,
            plan,
            top_k,
            cached.cost,
        ))
    }

    async fn review_task(
        &self,
        task: &Task,
        predictions_path: &Path,
        top_k: Option<usize>,
    ) -> Result<TaskEvaluation> {
        let plan_text = load_plan_text(predictions_path, &task.id).await?;
        let num_ablations = task.num_ablations()?;

        if plan_text.trim().is_empty() {
            warn!(task_id = %task.id, "Empty plan; nothing to match against the reviews");
            store_predictions::<MissingItem>(self.output_dir(), &task.id, &[]).await?;
            return Ok(score_review_task(&task.id, Vec::new(), num_ablations, top_k, 0.0));
        }

        let reviews = task.reviews()?;
        let parses = |entry: &CachedResponse| {
            let tagged = parse_tagged_response(&entry.response.content);
            parse_prediction_lines::<MissingItem>(&tagged.predictions).is_ok()
        };
        let cached = cached_or_else(self.cache.as_ref(), &task.id, parses, || async {
            let vars = json!({
                "problem_statement": plan_text,
                "paper_title": task.paper_title,
                "abstract": task.paper_abstract,
                "official_reviews": reviews.join(REVIEW_SEPARATOR),
            });
            complete(
                &self.config,
                self.provider.as_ref(),
                &self.renderer,
                &vars,
                None,
            )
            .await
        })
        .await?;

        let tagged = parse_tagged_response(&cached.response.content);
        let predictions: Vec<MissingItem> = match parse_prediction_lines(&tagged.predictions) {
            Ok(predictions) => predictions,
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Could not parse judge response");
                return Ok(TaskEvaluation::failed(&task.id, cached.cost, e.to_string()));
            }
        };
        store_predictions(self.output_dir(), &task.id, &predictions).await?;

        Ok(score_review_task(
            &task.id,
            predictions,
            num_ablations,
            top_k,
            cached.cost,
        ))
    }
}
