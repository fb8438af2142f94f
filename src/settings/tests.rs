//! Tests for settings loading.

use std::collections::HashMap;
use std::path::PathBuf;

use super::*;
use crate::agents::AgentKind;
use crate::core::{DraftError, PickOrderKind};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.log_level, "info");
    assert_eq!(settings.draft.team_count, 10);
    assert_eq!(settings.data.pool_path, PathBuf::from("data/players.csv"));
    assert_eq!(settings.trainer.episodes, 1000);
    assert_eq!(settings.thunderdome.drafts, 100);
    assert_eq!(settings.agents.policy_version, "v1");
    assert!(settings.validate().is_ok());
}

#[test]
fn test_default_lineup_cycles_learning_kinds() {
    let settings = Settings::default();
    let kinds = settings.lineup_kinds();
    assert_eq!(kinds.len(), 10);
    assert_eq!(&kinds[..4], &AgentKind::LEARNING);
    assert_eq!(kinds[4], AgentKind::TabularQ);
}

#[test]
fn test_partial_file() {
    let settings = parse_settings(
        r#"
        log_level = "debug"
        lineup = ["ppo", "greedy"]

        [draft]
        team_count = 2
        rounds = 16
        pick_order = "linear"

        [trainer]
        episodes = 50

        [agents.deep_q]
        batch_size = 8
        "#,
    )
    .unwrap();

    assert_eq!(settings.log_level, "debug");
    assert_eq!(settings.draft.team_count, 2);
    assert_eq!(settings.draft.pick_order, PickOrderKind::Linear);
    assert_eq!(settings.draft.reward.terminal_scale, 0.01);
    assert_eq!(settings.trainer.episodes, 50);
    assert!(settings.trainer.shuffle_seats);
    assert_eq!(settings.agents.deep_q.batch_size, 8);
    assert_eq!(settings.lineup_kinds(), vec![AgentKind::Ppo, AgentKind::Greedy]);
    assert!(settings.validate().is_ok());
}

#[test]
fn test_malformed_file() {
    let err = parse_settings("[draft]\nteam_count = \"many\"").unwrap_err();
    assert!(matches!(err, DraftError::Settings(_)));
}

#[test]
fn test_env_overrides() {
    let vars = lookup(&[
        ("DRAFT_DRAFT_TEAMS", "12"),
        ("DRAFT_TRAINER_EPISODES", " 250 "),
        ("DRAFT_DATA_HISTORY_PATH", "data/history.csv"),
        ("DRAFT_AGENTS_POLICY_VERSION", "v2"),
        ("DRAFT_THUNDERDOME_OUTPUT_PATH", "out/standings.csv"),
    ]);
    let settings = apply_overrides(Settings::default(), vars).unwrap();

    assert_eq!(settings.draft.team_count, 12);
    assert_eq!(settings.trainer.episodes, 250);
    assert_eq!(settings.data.history_path, Some(PathBuf::from("data/history.csv")));
    assert_eq!(settings.agents.policy_version, "v2");
    assert_eq!(settings.thunderdome.output_path, Some(PathBuf::from("out/standings.csv")));
    assert_eq!(settings.draft.rounds, 20);
}

#[test]
fn test_bad_override_is_an_error() {
    let err = apply_overrides(Settings::default(), lookup(&[("DRAFT_TRAINER_SEED", "soon")])).unwrap_err();
    assert!(matches!(err, DraftError::Settings(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_lineup_must_fill_draft() {
    let mut settings = Settings::default();
    settings.lineup = vec![AgentKind::Ppo, AgentKind::DeepQ];
    assert!(matches!(settings.validate(), Err(DraftError::Settings(_))));

    settings.draft.team_count = 2;
    settings.draft.rounds = 16;
    assert!(settings.validate().is_ok());

    settings.lineup = vec![AgentKind::Ppo, AgentKind::Replay];
    assert!(settings.validate().is_err());
    settings.data.history_path = Some(PathBuf::from("history.csv"));
    assert!(settings.validate().is_ok());
}

#[test]
fn test_load_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("draft_optimizer.toml");
    std::fs::write(&path, "[draft]\nteam_count = 4\nrounds = 15\n").unwrap();

    let settings = load_from_path(&path).unwrap();
    assert_eq!(settings.draft.team_count, 4);
    assert_eq!(settings.source.as_deref(), Some(path.as_path()));

    std::fs::write(&path, "[draft]\nteam_count = 4\nrounds = 2\n").unwrap();
    assert!(matches!(load_from_path(&path), Err(DraftError::Config(_))));
}
