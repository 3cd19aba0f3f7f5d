//! Consensus judge over saved judge outputs on disk.

use ablation_core::config::BenchConfig;
use ablation_core::dataset::{Dataset, Task};
use ablation_core::types::{DatasetName, DatasetSplit, TaskEvaluation};
use ablation_judge::{Judge, JudgeKind};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn task(id: &str) -> Task {
    Task {
        id: id.into(),
        paper_title: "Regularizing Deep Nets".into(),
        paper_abstract: String::new(),
        ablations_in_paper: Some(r#"[{"name": "dropout"}, {"name": "batchnorm"}]"#.into()),
        num_ablation_suggestions: Some(2),
        review_text: Some(r#"["Ablate the schedule."]"#.into()),
        paper_path: None,
        docker_image: None,
    }
}

fn write_lines(path: PathBuf, items: &[Value]) {
    let body: String = items.iter().map(|v| format!("{v}\n")).collect();
    std::fs::write(path, body).unwrap();
}

/// A judge run directory with one prediction file per task and an evaluations ledger.
fn judge_dir(
    root: &Path,
    name: &str,
    predictions: &[(&str, Vec<Value>)],
    costs: Option<&[(&str, f64)]>,
) -> PathBuf {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    for (task_id, items) in predictions {
        write_lines(dir.join(format!("{task_id}.jsonl")), items);
    }
    if let Some(costs) = costs {
        let rows: Vec<Value> = costs
            .iter()
            .map(|(id, cost)| json!({"id": id, "precision": 0.0, "cost": cost}))
            .collect();
        std::fs::write(dir.join("evaluations.json"), serde_json::to_string(&rows).unwrap()).unwrap();
    }
    dir
}

fn majority(output_dir: &Path, judge_output_dirs: Vec<PathBuf>) -> Judge {
    let config = BenchConfig {
        output_dir: output_dir.to_path_buf(),
        judge_output_dirs,
        parallelism: 2,
        ..Default::default()
    };
    Judge::from_config(JudgeKind::Majority, config).unwrap()
}

fn read_evaluations(dir: &Path) -> Vec<TaskEvaluation> {
    serde_json::from_str(&std::fs::read_to_string(dir.join("evaluations.json")).unwrap()).unwrap()
}

#[tokio::test]
async fn test_paper_consensus_scores_and_sums_costs() {
    let root = TempDir::new().unwrap();
    let plans = root.path().join("plans");
    std::fs::create_dir_all(&plans).unwrap();
    write_lines(
        plans.join("t1.jsonl"),
        &[json!({"name": "no-dropout"}), json!({"name": "extra-layer"})],
    );

    let j1 = judge_dir(
        root.path(),
        "j1",
        &[(
            "t1",
            vec![
                json!({"name_in_paper": "dropout", "name_in_plan": "no-dropout"}),
                json!({"name_in_paper": "batchnorm", "name_in_plan": null}),
            ],
        )],
        Some(&[("t1", 0.1)][..]),
    );
    let j2 = judge_dir(
        root.path(),
        "j2",
        &[(
            "t1",
            vec![
                json!({"name_in_paper": "dropout", "name_in_plan": ["no-dropout"]}),
                json!({"name_in_paper": "batchnorm", "name_in_plan": "extra-layer"}),
            ],
        )],
        Some(&[("t1", 0.2)][..]),
    );
    // No ledger: contributes no cost
    let j3 = judge_dir(
        root.path(),
        "j3",
        &[(
            "t1",
            vec![
                json!({"name_in_paper": "dropout", "name_in_plan": "extra-layer"}),
                json!({"name_in_paper": "batchnorm", "name_in_plan": null}),
            ],
        )],
        None,
    );

    let out = root.path().join("out");
    let judge = majority(&out, vec![j1, j2, j3]);
    assert_eq!(judge.kind(), JudgeKind::Majority);

    let dataset =
        Dataset::from_tasks(DatasetName::ResearcherAssist, DatasetSplit::Dev, vec![task("t1")])
            .unwrap();
    let result = judge.evaluate(&plans, &dataset, None).await.unwrap();

    assert!((result.precision.result - 0.5).abs() < 1e-9);
    assert!((result.recall.result - 0.5).abs() < 1e-9);
    assert!((result.cost - 0.3).abs() < 1e-9);

    let consensus = std::fs::read_to_string(out.join("t1.jsonl")).unwrap();
    assert_eq!(
        consensus,
        "{\"name_in_paper\":\"dropout\",\"name_in_plan\":\"no-dropout\"}\n\
         {\"name_in_paper\":\"batchnorm\",\"name_in_plan\":null}\n"
    );
    let rows = read_evaluations(&out);
    assert_eq!(rows[0].true_labels, vec![true, true, false]);
    assert_eq!(rows[0].pred_labels, vec![true, false, true]);
}

#[tokio::test]
async fn test_task_without_votes_is_failed() {
    let root = TempDir::new().unwrap();
    let plans = root.path().join("plans");
    std::fs::create_dir_all(&plans).unwrap();
    write_lines(plans.join("t1.jsonl"), &[json!({"name": "no-dropout"})]);
    write_lines(plans.join("t2.jsonl"), &[json!({"name": "no-dropout"})]);

    let j1 = judge_dir(
        root.path(),
        "j1",
        &[("t1", vec![json!({"name_in_paper": "dropout", "name_in_plan": "no-dropout"})])],
        Some(&[("t1", 0.5)][..]),
    );

    let out = root.path().join("out");
    let judge = majority(&out, vec![j1]);
    let dataset = Dataset::from_tasks(
        DatasetName::ResearcherAssist,
        DatasetSplit::Dev,
        vec![task("t1"), task("t2")],
    )
    .unwrap();
    let result = judge.evaluate(&plans, &dataset, None).await.unwrap();

    assert_eq!(result.num_tasks, 2);
    assert_eq!(result.num_failed, 1);
    let rows = read_evaluations(&out);
    assert!(rows[0].error.is_none());
    assert_eq!(rows[0].cost, 0.5);
    assert!(rows[1].error.as_deref().unwrap().contains("No judge produced predictions"));
}

#[tokio::test]
async fn test_review_consensus_truncates_before_writing() {
    let root = TempDir::new().unwrap();
    let votes = |a: Value, b: Value| {
        vec![
            json!({"name_in_plan": "lr-schedule", "appears_in_review": a}),
            json!({"name_in_plan": "no-attn", "appears_in_review": b}),
        ]
    };
    let j1 = judge_dir(root.path(), "j1", &[("r1", votes(json!(true), json!(false)))], None);
    let j2 = judge_dir(root.path(), "j2", &[("r1", votes(json!(true), json!(true)))], None);
    let j3 = judge_dir(
        root.path(),
        "j3",
        &[("r1", vec![json!({"name_in_plan": "lr-schedule"}), json!({"name_in_plan": "no-attn"})])],
        None,
    );

    let dataset =
        Dataset::from_tasks(DatasetName::ReviewerAssist, DatasetSplit::Dev, vec![task("r1")])
            .unwrap();

    let out = root.path().join("full");
    let judge = majority(&out, vec![j1.clone(), j2.clone(), j3.clone()]);
    let result = judge.evaluate(root.path(), &dataset, None).await.unwrap();
    // lr-schedule: 2 of 3 yes; no-attn: 1 of 3 yes
    assert!((result.precision.result - 0.5).abs() < 1e-9);
    assert!((result.recall.result - 0.5).abs() < 1e-9);
    assert!(result.ndcg_score.is_none());
    assert_eq!(result.cost, 0.0);

    let out_k = root.path().join("top1");
    let judge = majority(&out_k, vec![j1, j2, j3]);
    let result = judge.evaluate(root.path(), &dataset, Some(1)).await.unwrap();
    assert!((result.precision.result - 1.0).abs() < 1e-9);
    let written = std::fs::read_to_string(out_k.join("r1.jsonl")).unwrap();
    assert_eq!(written, "{\"name_in_plan\":\"lr-schedule\",\"appears_in_review\":true}\n");
}

#[test]
fn test_majority_requires_judge_dirs() {
    let config = BenchConfig {
        output_dir: PathBuf::from("unused"),
        ..Default::default()
    };
    let err = Judge::from_config(JudgeKind::Majority, config).err().unwrap();
    assert!(err.to_string().contains("judge_output_dirs"));
}
