//! Layered configuration: YAML file, then `ABLATIONS_` environment, then CLI overrides.
//!
//! Kept in its own test binary because it mutates the process environment.

use ablation_core::config::{ConfigOverrides, load_config};
use ablation_core::types::ReasoningEffort;
use tempfile::TempDir;

#[test]
fn test_environment_sits_between_file_and_overrides() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("planner.yaml");
    std::fs::write(
        &path,
        "model:\n  name: from-file\n  temperature: 0.7\nnum_ablations: 3\nparallelism: 2\n",
    )
    .unwrap();

    unsafe {
        std::env::set_var("ABLATIONS_MODEL__TEMPERATURE", "0.2");
        std::env::set_var("ABLATIONS_NUM_ABLATIONS", "9");
        std::env::set_var("ABLATIONS_PARALLELISM", "6");
    }

    let from_env = load_config(&path, &ConfigOverrides::default()).unwrap();
    assert_eq!(from_env.model.name, "from-file");
    assert!((from_env.model.temperature - 0.2).abs() < f32::EPSILON);
    assert_eq!(from_env.num_ablations, 9);
    assert_eq!(from_env.parallelism, 6);

    let overrides = ConfigOverrides {
        model_name: Some("from-cli".into()),
        reasoning_effort: Some(ReasoningEffort::Low),
        num_ablations: Some(4),
        seed: Some(42),
        ..Default::default()
    };
    let from_cli = load_config(&path, &overrides).unwrap();
    assert_eq!(from_cli.model.name, "from-cli");
    assert_eq!(from_cli.model.reasoning_effort, Some(ReasoningEffort::Low));
    assert_eq!(from_cli.num_ablations, 4);
    assert_eq!(from_cli.seed, Some(42));
    // Fields the CLI left unset keep their environment value
    assert_eq!(from_cli.parallelism, 6);

    unsafe {
        std::env::remove_var("ABLATIONS_MODEL__TEMPERATURE");
        std::env::remove_var("ABLATIONS_NUM_ABLATIONS");
        std::env::remove_var("ABLATIONS_PARALLELISM");
    }
}
