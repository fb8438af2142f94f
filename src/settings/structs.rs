//! Settings file layout.
//!
//! Every section is optional in the file; missing keys take the defaults
//! of the corresponding library config.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::agents::{AgentKind, AgentSettings};
use crate::core::{DraftConfig, DraftError, Result};
use crate::training::{ThunderdomeConfig, TrainerConfig};

/// Input and output locations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Player pool CSV.
    pub pool_path: PathBuf,
    /// Recorded drafts for replay agents.
    pub history_path: Option<PathBuf>,
    /// Directory for saved policies.
    pub policy_dir: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            pool_path: PathBuf::from("data/players.csv"),
            history_path: None,
            policy_dir: PathBuf::from("policies"),
        }
    }
}

/// Everything a run reads from `draft_optimizer.toml`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_level: String,
    pub draft: DraftConfig,
    pub data: DataSettings,
    /// Agent kind per training seat. Empty means one of each learning kind,
    /// repeated to fill the draft.
    pub lineup: Vec<AgentKind>,
    pub trainer: TrainerConfig,
    pub agents: AgentSettings,
    pub thunderdome: ThunderdomeConfig,
    /// File the settings were read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            draft: DraftConfig::default(),
            data: DataSettings::default(),
            lineup: Vec::new(),
            trainer: TrainerConfig::default(),
            agents: AgentSettings::default(),
            thunderdome: ThunderdomeConfig::default(),
            source: None,
        }
    }
}

impl Settings {
    /// Training lineup with the empty default expanded.
    #[must_use]
    pub fn lineup_kinds(&self) -> Vec<AgentKind> {
        if !self.lineup.is_empty() {
            return self.lineup.clone();
        }
        let kinds = AgentKind::LEARNING;
        (0..self.draft.team_count).map(|i| kinds[i % kinds.len()]).collect()
    }

    /// Check cross-section consistency.
    pub fn validate(&self) -> Result<()> {
        self.draft.validate()?;
        if !self.lineup.is_empty() && self.lineup.len() != self.draft.team_count {
            return Err(DraftError::Settings(format!(
                "lineup names {} agents but the draft has {} teams",
                self.lineup.len(),
                self.draft.team_count
            )));
        }
        if self.lineup_kinds().contains(&AgentKind::Replay) && self.data.history_path.is_none() {
            return Err(DraftError::Settings(
                "lineup includes a replay agent but data.history_path is not set".into(),
            ));
        }
        if self.agents.policy_version.trim().is_empty() {
            return Err(DraftError::Settings("agents.policy_version must not be empty".into()));
        }
        Ok(())
    }
}
