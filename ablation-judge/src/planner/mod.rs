//! Planners: generate ablation plans for the researcher-assist tasks.
//!
//! Each planner writes `<output_dir>/<task_id>.jsonl` (one ablation suggestion per line,
//! possibly empty when planning failed) and a `plans.json` summary mapping every task
//! id to its raw predictions and cost.

pub mod external_agent;
pub mod simple_lm;

pub use external_agent::ExternalAgentPlanner;
pub use simple_lm::SimpleLmPlanner;

use ablation_core::config::BenchConfig;
use ablation_core::dataset::Dataset;
use ablation_core::error::ConfigError;
use ablation_core::providers::create_provider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::error::Result;

/// File name of the run summary written next to the plans.
pub const PLANS_FILE: &str = "plans.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlannerKind {
    SimpleLm,
    ExternalAgent,
}

impl PlannerKind {
    pub const ALL: [PlannerKind; 2] = [PlannerKind::SimpleLm, PlannerKind::ExternalAgent];

    pub fn as_str(self) -> &'static str {
        match self {
            PlannerKind::SimpleLm => "simple_lm",
            PlannerKind::ExternalAgent => "external_agent",
        }
    }
}

impl fmt::Display for PlannerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlannerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple_lm" | "simple-lm" => Ok(PlannerKind::SimpleLm),
            "external_agent" | "external-agent" | "sweagent" => Ok(PlannerKind::ExternalAgent),
            _ => Err(ConfigError::UnknownName {
                kind: "planner",
                name: s.to_string(),
                available: PlannerKind::ALL.map(PlannerKind::as_str).join(", "),
            }),
        }
    }
}

/// One task's entry in `plans.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// The plan as written to `<task_id>.jsonl`.
    pub predictions: String,
    pub cost: f64,
}

/// Per-task plans keyed by task id.
pub type PlanSummary = BTreeMap<String, PlanEntry>;

/// A configured planner.
pub enum Planner {
    SimpleLm(SimpleLmPlanner),
    ExternalAgent(ExternalAgentPlanner),
}

impl Planner {
    pub fn from_config(kind: PlannerKind, config: BenchConfig) -> Result<Self> {
        match kind {
            PlannerKind::SimpleLm => {
                config.require_prompts()?;
                let provider = create_provider(&config)?;
                Ok(Planner::SimpleLm(SimpleLmPlanner::new(config, provider)?))
            }
            PlannerKind::ExternalAgent => {
                Ok(Planner::ExternalAgent(ExternalAgentPlanner::new(config)?))
            }
        }
    }

    pub fn kind(&self) -> PlannerKind {
        match self {
            Planner::SimpleLm(_) => PlannerKind::SimpleLm,
            Planner::ExternalAgent(_) => PlannerKind::ExternalAgent,
        }
    }

    pub fn output_dir(&self) -> &Path {
        match self {
            Planner::SimpleLm(p) => p.output_dir(),
            Planner::ExternalAgent(p) => p.output_dir(),
        }
    }

    pub async fn plan(&self, dataset: &Dataset) -> Result<PlanSummary> {
        match self {
            Planner::SimpleLm(p) => p.plan(dataset).await,
            Planner::ExternalAgent(p) => p.plan(dataset).await,
        }
    }
}

/// Write one task's plan file.
pub(crate) fn write_plan(output_dir: &Path, task_id: &str, predictions: &str) -> Result<()> {
    std::fs::write(output_dir.join(format!("{task_id}.jsonl")), predictions)?;
    Ok(())
}

/// [`write_plan`] for async task bodies.
pub(crate) async fn store_plan(output_dir: &Path, task_id: &str, predictions: &str) -> Result<()> {
    tokio::fs::write(output_dir.join(format!("{task_id}.jsonl")), predictions).await?;
    Ok(())
}

/// Persist `plans.json`.
pub(crate) fn write_summary(
    kind: PlannerKind,
    output_dir: &Path,
    summary: &PlanSummary,
) -> Result<()> {
    std::fs::write(
        output_dir.join(PLANS_FILE),
        serde_json::to_string_pretty(summary)?,
    )?;
    let total_cost: f64 = summary.values().map(|e| e.cost).sum();
    let empty = summary.values().filter(|e| e.predictions.is_empty()).count();
    info!(
        planner = %kind,
        tasks = summary.len(),
        empty,
        total_cost,
        output_dir = %output_dir.display(),
        "Planning finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planner_kind_parsing() {
        assert_eq!("simple_lm".parse::<PlannerKind>().unwrap(), PlannerKind::SimpleLm);
        assert_eq!(
            "sweagent".parse::<PlannerKind>().unwrap(),
            PlannerKind::ExternalAgent
        );
        assert!("majority".parse::<PlannerKind>().is_err());
    }

    #[test]
    fn test_plan_entry_serialization() {
        let mut summary = PlanSummary::new();
        summary.insert(
            "t1".into(),
            PlanEntry {
                predictions: "{\"name\": \"a\"}".into(),
                cost: 0.5,
            },
        );
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["t1"]["cost"], 0.5);
        assert_eq!(json["t1"]["predictions"], "{\"name\": \"a\"}");
    }
}
