//! Plan generation, and feeding generated plans straight into a judge.

use ablation_core::brain::MockLlmProvider;
use ablation_core::cache::InMemoryResponseCache;
use ablation_core::config::{BenchConfig, ModelConfig, PromptConfig, RetryConfig};
use ablation_core::dataset::{Dataset, Task};
use ablation_core::types::{DatasetName, DatasetSplit};
use ablation_judge::planner::PLANS_FILE;
use ablation_judge::{PlanSummary, SimpleLmJudge, SimpleLmPlanner};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const PLAN_RESPONSE: &str = "<discussion>\nTwo regularizers are worth removing.\n</discussion>\n\
<predictions>\n\
{\"name\": \"no-dropout\", \"ablated_part\": \"dropout\", \"action\": \"REMOVE\", \"metrics\": [\"accuracy\"]}\n\
{\"name\": \"swap-norm\", \"ablated_part\": \"batchnorm\", \"action\": \"REPLACE\", \"replacement\": [\"layernorm\"]}\n\
</predictions>";

fn config(output_dir: &Path, user: &str) -> BenchConfig {
    BenchConfig {
        model: ModelConfig {
            name: "gpt-4o".into(),
            ..Default::default()
        },
        retry: RetryConfig {
            max_retries: 0,
            ..Default::default()
        },
        prompts: PromptConfig {
            system: "You are a careful researcher.".into(),
            user: user.into(),
        },
        output_dir: output_dir.to_path_buf(),
        num_ablations: 2,
        seed: Some(11),
        ..Default::default()
    }
}

fn task(id: &str, paper_path: Option<PathBuf>) -> Task {
    Task {
        id: id.into(),
        paper_title: "Regularizing Deep Nets".into(),
        paper_abstract: "We study regularizers.".into(),
        ablations_in_paper: Some(r#"[{"name": "dropout"}, {"name": "batchnorm"}]"#.into()),
        num_ablation_suggestions: None,
        review_text: None,
        paper_path,
        docker_image: None,
    }
}

fn paper_dir(root: &Path) -> PathBuf {
    let dir = root.join("paper");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("main.tex"), "\\section{Method} We use dropout.").unwrap();
    std::fs::write(dir.join("refs.bib"), "@article{srivastava2014}").unwrap();
    std::fs::write(dir.join("figure.pdf"), [0u8, 159, 146, 150]).unwrap();
    dir
}

#[tokio::test]
async fn test_simple_planner_writes_plans_and_summary() {
    let root = TempDir::new().unwrap();
    let paper = paper_dir(root.path());
    let out = root.path().join("plans");

    let provider = Arc::new(MockLlmProvider::with_response(PLAN_RESPONSE).with_cost(0.001, 0.002));
    let planner = SimpleLmPlanner::new(
        config(&out, "Propose {{num_ablations}} ablations for {{paper_title}}.\n{{paper_source}}"),
        provider.clone(),
    )
    .unwrap();
    let dataset = Dataset::from_tasks(
        DatasetName::ResearcherAssist,
        DatasetSplit::Dev,
        vec![task("t1", Some(paper)), task("t2", None)],
    )
    .unwrap();
    let summary = planner.plan(&dataset).await.unwrap();

    // t2 has no paper sources and never reaches the model
    assert_eq!(provider.call_count(), 1);
    let prompt = &provider.requests()[0].messages[1].content;
    assert!(prompt.starts_with("Propose 2 ablations for Regularizing Deep Nets."));
    assert!(prompt.contains("<file name=\"main.tex\">\n\\section{Method} We use dropout.\n</file>"));
    assert!(prompt.contains("<file name=\"refs.bib\">"));
    assert!(!prompt.contains("figure.pdf"));

    let plan = std::fs::read_to_string(out.join("t1.jsonl")).unwrap();
    let lines: Vec<&str> = plan.lines().collect();
    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["name"], "no-dropout");
    assert_eq!(first["action"], "REMOVE");
    assert_eq!(std::fs::read_to_string(out.join("t2.jsonl")).unwrap(), "");

    assert!((summary["t1"].cost - 0.2).abs() < 1e-9);
    assert_eq!(summary["t2"].predictions, "");
    let on_disk: PlanSummary =
        serde_json::from_str(&std::fs::read_to_string(out.join(PLANS_FILE)).unwrap()).unwrap();
    assert_eq!(on_disk, summary);
}

#[tokio::test]
async fn test_generated_plans_feed_the_judge() {
    let root = TempDir::new().unwrap();
    let paper = paper_dir(root.path());
    let plans = root.path().join("plans");
    let dataset = Dataset::from_tasks(
        DatasetName::ResearcherAssist,
        DatasetSplit::Dev,
        vec![task("t1", Some(paper))],
    )
    .unwrap();

    let planner = SimpleLmPlanner::new(
        config(&plans, "{{paper_source}}"),
        Arc::new(MockLlmProvider::with_response(PLAN_RESPONSE)),
    )
    .unwrap();
    planner.plan(&dataset).await.unwrap();

    let verdict = "<predictions>\n\
                   {\"name_in_paper\": \"dropout\", \"name_in_plan\": \"no-dropout\"}\n\
                   {\"name_in_paper\": \"batchnorm\", \"name_in_plan\": [\"swap-norm\"]}\n\
                   </predictions>";
    let judged = root.path().join("judged");
    let judge = SimpleLmJudge::new(
        config(&judged, "{{side_a}}\n{{side_b}}"),
        Arc::new(MockLlmProvider::with_response(verdict)),
    )
    .unwrap();
    let result = judge.evaluate(&plans, &dataset, None).await.unwrap();

    assert_eq!(result.precision.result, 1.0);
    assert_eq!(result.recall.result, 1.0);
    assert_eq!(result.ndcg_score.unwrap().result, 1.0);
}

#[tokio::test]
async fn test_planner_cache_skips_unusable_responses() {
    let root = TempDir::new().unwrap();
    let paper = paper_dir(root.path());
    let dataset = Dataset::from_tasks(
        DatasetName::ResearcherAssist,
        DatasetSplit::Dev,
        vec![task("t1", Some(paper))],
    )
    .unwrap();
    let cache = Arc::new(InMemoryResponseCache::new());

    let garbled = Arc::new(MockLlmProvider::with_response(
        "<predictions>\n{\"name\": \"no-dropout\", \"action\": \"DELETE\"}\n</predictions>",
    ));
    let planner = SimpleLmPlanner::new(
        config(&root.path().join("a"), "{{paper_source}}"),
        garbled.clone(),
    )
    .unwrap()
    .with_cache(cache.clone());
    let summary = planner.plan(&dataset).await.unwrap();
    assert_eq!(summary["t1"].predictions, "");
    assert_eq!(garbled.call_count(), 1);
    assert!(cache.is_empty());

    let healthy = Arc::new(MockLlmProvider::with_response(PLAN_RESPONSE));
    let planner = SimpleLmPlanner::new(
        config(&root.path().join("b"), "{{paper_source}}"),
        healthy.clone(),
    )
    .unwrap()
    .with_cache(cache.clone());
    let summary = planner.plan(&dataset).await.unwrap();
    assert_eq!(healthy.call_count(), 1);
    assert_eq!(summary["t1"].predictions.lines().count(), 2);
    assert_eq!(cache.len(), 1);
    assert!(!root.path().join("b").join("t1.json.log").exists());
}
