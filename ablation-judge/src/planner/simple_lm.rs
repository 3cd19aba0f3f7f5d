//! Single-call LM planner.

use ablation_core::brain::LlmProvider;
use ablation_core::cache::{CachedResponse, FileResponseCache, ResponseCache, cached_or_else};
use ablation_core::config::BenchConfig;
use ablation_core::dataset::{Dataset, Task};
use ablation_core::error::DatasetError;
use ablation_core::prompt::{PromptRenderer, parse_prediction_lines, parse_tagged_response};
use ablation_core::types::AblationSuggestion;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{Instrument, Span, info, info_span, warn};
use walkdir::WalkDir;

use super::{PlanEntry, PlanSummary, PlannerKind, store_plan, write_summary};
use crate::error::Result;
use crate::llm::complete;
use crate::pool::run_bounded;

/// Paper source extensions included in the prompt, in inclusion order.
pub const PAPER_SOURCE_EXTENSIONS: [&str; 5] = ["tex", "txt", "bib", "bbl", "md"];

/// Concatenate the paper's text sources, each wrapped in a `<file>` element named by
/// its path relative to `paper_path`.
pub fn paper_source(paper_path: &Path) -> String {
    let mut source = String::new();
    for extension in PAPER_SOURCE_EXTENSIONS {
        for entry in WalkDir::new(paper_path)
            .sort_by_file_name()
            .into_iter()
            .flatten()
        {
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(extension)
            {
                continue;
            }
            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable paper file");
                    continue;
                }
            };
            let name = path.strip_prefix(paper_path).unwrap_or(path);
            source.push_str(&format!("<file name=\"{}\">\n", name.display()));
            source.push_str(&content);
            source.push_str("\n</file>\n");
        }
    }
    source
}

#[derive(Clone)]
pub struct SimpleLmPlanner {
    config: Arc<BenchConfig>,
    provider: Arc<dyn LlmProvider>,
    cache: Arc<dyn ResponseCache>,
    renderer: Arc<PromptRenderer>,
    span: Span,
}

impl SimpleLmPlanner {
    pub fn new(config: BenchConfig, provider: Arc<dyn LlmProvider>) -> Result<Self> {
        let renderer = PromptRenderer::new(&config.prompts)?;
        let cache = Arc::new(FileResponseCache::new(&config.output_dir));
        let span = info_span!("planner", planner = "simple_lm", model = %config.model.name);
        Ok(Self {
            config: Arc::new(config),
            provider,
            cache,
            renderer: Arc::new(renderer),
            span,
        })
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    pub async fn plan(&self, dataset: &Dataset) -> Result<PlanSummary> {
        std::fs::create_dir_all(self.output_dir())?;
        info!(
            parent: &self.span,
            tasks = dataset.len(),
            num_ablations = self.config.num_ablations,
            "Starting planning"
        );

        let results = run_bounded(dataset.tasks.clone(), self.config.parallelism, |task| {
            let planner = self.clone();
            let span = info_span!(parent: &self.span, "task", task_id = %task.id);
            async move {
                match planner.plan_task(&task).await {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(task_id = %task.id, error = %e, "Planning failed; writing an empty plan");
                        if let Err(e) = store_plan(planner.output_dir(), &task.id, "").await {
                            warn!(task_id = %task.id, error = %e, "Could not write empty plan");
                        }
                        PlanEntry::default()
                    }
                }
            }
            .instrument(span)
        })
        .await;

        let summary: PlanSummary = dataset
            .tasks
            .iter()
            .zip(results)
            .map(|(task, result)| (task.id.clone(), result.unwrap_or_default()))
            .collect();
        write_summary(PlannerKind::SimpleLm, self.output_dir(), &summary)?;
        Ok(summary)
    }

    async fn plan_task(&self, task: &Task) -> Result<PlanEntry> {
        let paper_path = task
            .paper_path
            .as_deref()
            .ok_or_else(|| DatasetError::MissingField {
                id: task.id.clone(),
                field: "paper_path",
            })?;

        let parses = |entry: &CachedResponse| {
            let tagged = parse_tagged_response(&entry.response.content);
            parse_prediction_lines::<AblationSuggestion>(&tagged.predictions).is_ok()
        };
        let cached = cached_or_else(self.cache.as_ref(), &task.id, parses, || async {
            let root = paper_path.to_path_buf();
            let source = tokio::task::spawn_blocking(move || paper_source(&root))
                .await
                .map_err(std::io::Error::from)?;
            let vars = json!({
                "paper_title": task.paper_title,
                "abstract": task.paper_abstract,
                "problem_statement": task.paper_abstract,
                "num_ablations": self.config.num_ablations,
                "paper_source": source,
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
        let suggestions: Vec<AblationSuggestion> = parse_prediction_lines(&tagged.predictions)?;
        let predictions = suggestions
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?
            .join("\n");
        store_plan(self.output_dir(), &task.id, &predictions).await?;

        Ok(PlanEntry {
            predictions,
            cost: cached.cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paper_source_orders_by_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("sections")).unwrap();
        std::fs::write(dir.path().join("refs.bib"), "@article{x}").unwrap();
        std::fs::write(dir.path().join("sections/intro.tex"), "Intro").unwrap();
        std::fs::write(dir.path().join("figure.png"), [0u8, 1, 2]).unwrap();

        let source = paper_source(dir.path());
        let tex = source.find("<file name=\"sections/intro.tex\">").unwrap();
        let bib = source.find("<file name=\"refs.bib\">").unwrap();
        assert!(tex < bib);
        assert!(source.contains("Intro\n</file>\n"));
        assert!(!source.contains("figure.png"));
    }

    #[test]
    fn test_paper_source_missing_dir_is_empty() {
        assert_eq!(paper_source(Path::new("/nonexistent/paper")), "");
    }
}
