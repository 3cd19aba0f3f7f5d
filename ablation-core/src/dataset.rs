//! Local benchmark datasets stored as JSON-lines files.
//!
//! Layout: `<data_dir>/<dataset-slug>/<split>.jsonl`, one task per line.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{DatasetError, Result};
use crate::types::{DatasetName, DatasetSplit, EvalMode};

/// One benchmark task. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub paper_title: String,
    #[serde(default)]
    pub paper_abstract: String,
    /// JSON-serialized array of ablation objects, each with at least `name`.
    #[serde(default, deserialize_with = "json_text")]
    pub ablations_in_paper: Option<String>,
    #[serde(default)]
    pub num_ablation_suggestions: Option<usize>,
    /// JSON-serialized array of review strings.
    #[serde(default, deserialize_with = "json_text")]
    pub review_text: Option<String>,
    #[serde(default)]
    pub paper_path: Option<PathBuf>,
    #[serde(default)]
    pub docker_image: Option<String>,
}

/// Accept either a JSON string or an inline JSON value and keep the serialized text.
fn json_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl Task {
    /// Ground-truth ablation objects from the paper, in dataset order.
    pub fn paper_ablations(&self) -> std::result::Result<Vec<serde_json::Value>, DatasetError> {
        let raw = self
            .ablations_in_paper
            .as_deref()
            .ok_or_else(|| DatasetError::MissingField {
                id: self.id.clone(),
                field: "ablations_in_paper",
            })?;
        serde_json::from_str(raw).map_err(|e| DatasetError::InvalidField {
            id: self.id.clone(),
            field: "ablations_in_paper",
            message: e.to_string(),
        })
    }

    /// Names of the paper ablations. Non-string names are stringified.
    pub fn paper_ablation_names(&self) -> std::result::Result<Vec<String>, DatasetError> {
        self.paper_ablations()?
            .iter()
            .map(|ablation| match ablation.get("name") {
                Some(serde_json::Value::String(name)) => Ok(name.clone()),
                Some(serde_json::Value::Null) | None => Err(DatasetError::InvalidField {
                    id: self.id.clone(),
                    field: "ablations_in_paper",
                    message: "ablation without a name".into(),
                }),
                Some(other) => Ok(other.to_string()),
            })
            .collect()
    }

    /// Official peer reviews of the paper.
    pub fn reviews(&self) -> std::result::Result<Vec<String>, DatasetError> {
        let raw = self
            .review_text
            .as_deref()
            .ok_or_else(|| DatasetError::MissingField {
                id: self.id.clone(),
                field: "review_text",
            })?;
        serde_json::from_str(raw).map_err(|e| DatasetError::InvalidField {
            id: self.id.clone(),
            field: "review_text",
            message: e.to_string(),
        })
    }

    /// Number of ablations the reviewers asked for.
    pub fn num_ablations(&self) -> std::result::Result<usize, DatasetError> {
        self.num_ablation_suggestions
            .ok_or_else(|| DatasetError::MissingField {
                id: self.id.clone(),
                field: "num_ablation_suggestions",
            })
    }
}

/// A loaded dataset split.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: DatasetName,
    pub split: DatasetSplit,
    pub tasks: Vec<Task>,
}

impl Dataset {
    /// Path of a split file under `data_dir`.
    pub fn path_for(data_dir: &Path, name: DatasetName, split: DatasetSplit) -> PathBuf {
        data_dir.join(name.slug()).join(format!("{split}.jsonl"))
    }

    pub fn load(data_dir: &Path, name: DatasetName, split: DatasetSplit) -> Result<Self> {
        let path = Self::path_for(data_dir, name, split);
        let tasks: Vec<Task> = read_jsonl(&path)?;
        let dataset = Self::from_tasks(name, split, tasks)?;
        tracing::info!(
            dataset = %name,
            split = %split,
            tasks = dataset.tasks.len(),
            path = %path.display(),
            "Loaded dataset"
        );
        Ok(dataset)
    }

    /// Build a dataset from in-memory tasks, rejecting duplicate ids.
    pub fn from_tasks(
        name: DatasetName,
        split: DatasetSplit,
        tasks: Vec<Task>,
    ) -> std::result::Result<Self, DatasetError> {
        let mut seen = HashSet::new();
        for task in &tasks {
            if !seen.insert(task.id.as_str()) {
                return Err(DatasetError::DuplicateTask {
                    id: task.id.clone(),
                });
            }
        }
        Ok(Self { name, split, tasks })
    }

    pub fn mode(&self) -> EvalMode {
        self.name.mode()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Read a JSON-lines file, skipping blank lines.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.is_file() {
        return Err(DatasetError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(parse_jsonl(&content)?)
}

/// Parse JSON-lines text, skipping blank lines. Line numbers in errors are 1-based.
pub fn parse_jsonl<T: DeserializeOwned>(content: &str) -> std::result::Result<Vec<T>, DatasetError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|e| DatasetError::MalformedRecord {
                line: idx + 1,
                message: e.to_string(),
            })
        })
        .collect()
}
