//! Settings loading.
//!
//! Reads the TOML file, then applies `DRAFT_*` environment overrides and
//! validates the result.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::structs::Settings;
use crate::core::{DraftError, Result};

/// Environment variable naming an explicit settings file.
pub const CONFIG_ENV: &str = "DRAFT_OPTIMIZER_CONFIG";

/// Settings file looked up in the working directory.
pub const CONFIG_FILE: &str = "draft_optimizer.toml";

/// Load settings for this process.
///
/// Search order:
/// 1. The path in `DRAFT_OPTIMIZER_CONFIG`
/// 2. `draft_optimizer.toml` in the working directory
/// 3. Built-in defaults
///
/// Environment overrides apply in every case.
pub fn load_settings() -> Result<Settings> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return load_from_path(&path);
        }
        warn!("{CONFIG_ENV}={} not found, searching defaults", path.display());
    }

    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return load_from_path(&local);
    }

    debug!("no {CONFIG_FILE} found, using built-in defaults");
    let settings = apply_env_overrides(Settings::default())?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings from a specific file.
pub fn load_from_path(path: &Path) -> Result<Settings> {
    let text = std::fs::read_to_string(path)?;
    let mut settings = parse_settings(&text)
        .map_err(|e| DraftError::Settings(format!("{}: {e}", path.display())))?;
    settings.source = Some(path.to_path_buf());
    let settings = apply_env_overrides(settings)?;
    settings.validate()?;
    Ok(settings)
}

/// Parse settings TOML without overrides or validation.
pub fn parse_settings(text: &str) -> Result<Settings> {
    toml::from_str(text).map_err(|e| DraftError::Settings(e.to_string()))
}

macro_rules! env_override {
    // String or path field
    ($lookup:expr, $target:expr, $key:expr) => {
        if let Some(v) = $lookup($key) {
            $target = v.into();
        }
    };
    // Parseable field
    ($lookup:expr, $target:expr, $key:expr, parse) => {
        if let Some(v) = $lookup($key) {
            $target = v
                .trim()
                .parse()
                .map_err(|_| DraftError::Settings(format!("{}={v:?} is not a valid value", $key)))?;
        }
    };
    // Optional string or path field
    ($lookup:expr, $target:expr, $key:expr, optional) => {
        if let Some(v) = $lookup($key) {
            $target = Some(v.into());
        }
    };
}

/// Apply `DRAFT_*` overrides from the process environment.
pub fn apply_env_overrides(settings: Settings) -> Result<Settings> {
    apply_overrides(settings, |key| std::env::var(key).ok())
}

/// Apply `DRAFT_*` overrides from an arbitrary lookup.
///
/// Variables follow the pattern `DRAFT_<SECTION>_<KEY>`. Unparsable values
/// are a `Settings` error rather than being ignored.
pub fn apply_overrides(mut settings: Settings, lookup: impl Fn(&str) -> Option<String>) -> Result<Settings> {
    env_override!(lookup, settings.log_level, "DRAFT_LOG_LEVEL");

    // Draft
    env_override!(lookup, settings.draft.team_count, "DRAFT_DRAFT_TEAMS", parse);
    env_override!(lookup, settings.draft.rounds, "DRAFT_DRAFT_ROUNDS", parse);

    // Data
    env_override!(lookup, settings.data.pool_path, "DRAFT_DATA_POOL_PATH");
    env_override!(lookup, settings.data.history_path, "DRAFT_DATA_HISTORY_PATH", optional);
    env_override!(lookup, settings.data.policy_dir, "DRAFT_DATA_POLICY_DIR");

    // Trainer
    env_override!(lookup, settings.trainer.episodes, "DRAFT_TRAINER_EPISODES", parse);
    env_override!(lookup, settings.trainer.seed, "DRAFT_TRAINER_SEED", parse);
    env_override!(lookup, settings.trainer.log_interval, "DRAFT_TRAINER_LOG_INTERVAL", parse);
    env_override!(lookup, settings.trainer.metrics_path, "DRAFT_TRAINER_METRICS_PATH", optional);

    // Agents
    env_override!(lookup, settings.agents.policy_version, "DRAFT_AGENTS_POLICY_VERSION");

    // Thunderdome
    env_override!(lookup, settings.thunderdome.drafts, "DRAFT_THUNDERDOME_DRAFTS", parse);
    env_override!(lookup, settings.thunderdome.seed, "DRAFT_THUNDERDOME_SEED", parse);
    env_override!(lookup, settings.thunderdome.output_path, "DRAFT_THUNDERDOME_OUTPUT_PATH", optional);

    Ok(settings)
}
