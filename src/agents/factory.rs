//! Build agents by kind from one settings bundle.

use serde::{Deserialize, Serialize};

use super::actor_critic::{ActorCriticAgent, ActorCriticConfig};
use super::baseline::{GreedyAgent, RandomAgent, ReplayAgent};
use super::dqn::{DeepQAgent, DeepQConfig};
use super::persistence::DEFAULT_POLICY_VERSION;
use super::ppo::{PpoAgent, PpoConfig};
use super::tabular::{TabularQAgent, TabularQConfig};
use super::{Agent, AgentKind};
use crate::core::{DraftError, DraftRng, Result};
use crate::nn::{EncodeScope, ObservationEncoder};
use crate::pool::RealDraft;

/// Hyperparameters for every agent kind plus the shared policy version tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub tabular_q: TabularQConfig,
    pub deep_q: DeepQConfig,
    pub actor_critic: ActorCriticConfig,
    pub ppo: PpoConfig,
    /// Version tag on saved policies; loading a different tag fails.
    pub policy_version: String,
    /// Recorded drafts for `Replay` agents.
    #[serde(skip)]
    pub history: Vec<RealDraft>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            tabular_q: TabularQConfig::default(),
            deep_q: DeepQConfig::default(),
            actor_critic: ActorCriticConfig::default(),
            ppo: PpoConfig::default(),
            policy_version: DEFAULT_POLICY_VERSION.to_string(),
            history: Vec::new(),
        }
    }
}

impl AgentSettings {
    /// Set the policy version tag.
    #[must_use]
    pub fn with_policy_version(mut self, version: impl Into<String>) -> Self {
        self.policy_version = version.into();
        self
    }

    /// Provide recorded drafts for replay agents.
    #[must_use]
    pub fn with_history(mut self, history: Vec<RealDraft>) -> Self {
        self.history = history;
        self
    }

    /// Build a fresh agent of `kind`.
    ///
    /// Network input widths come from `encoder`. Replay agents pick a
    /// recorded draft by `seed` and fail with `Config` when none is loaded.
    pub fn build(&self, kind: AgentKind, encoder: &ObservationEncoder, seed: u64) -> Result<Box<dyn Agent>> {
        let full = encoder.len(EncodeScope::Full);
        let version = self.policy_version.clone();
        let agent: Box<dyn Agent> = match kind {
            AgentKind::TabularQ => {
                Box::new(TabularQAgent::new(self.tabular_q.clone(), seed).with_version(version))
            }
            AgentKind::DeepQ => Box::new(DeepQAgent::new(self.deep_q.clone(), full, seed).with_version(version)),
            AgentKind::ActorCritic => Box::new(
                ActorCriticAgent::new(self.actor_critic.clone(), full, seed).with_version(version),
            ),
            AgentKind::Ppo => Box::new(PpoAgent::new(self.ppo.clone(), full, seed).with_version(version)),
            AgentKind::Greedy => Box::new(GreedyAgent::new()),
            AgentKind::Random => Box::new(RandomAgent::new(seed)),
            AgentKind::Replay => {
                if self.history.is_empty() {
                    return Err(DraftError::config("replay agent requested but no draft history is loaded"));
                }
                let draft = &self.history[(seed % self.history.len() as u64) as usize];
                Box::new(ReplayAgent::new(draft.clone()))
            }
        };
        Ok(agent)
    }

    /// Build one agent per kind. Seat `i` draws its seed from the
    /// `"<kind>:<i>"` stream of `seed`, so lineups sharing a base seed never
    /// share agent streams.
    pub fn build_all(&self, kinds: &[AgentKind], encoder: &ObservationEncoder, seed: u64) -> Result<Vec<Box<dyn Agent>>> {
        let base = DraftRng::new(seed);
        kinds
            .iter()
            .enumerate()
            .map(|(i, &kind)| {
                let stream = base.for_context(&format!("{}:{i}", kind.label()));
                self.build(kind, encoder, stream.seed())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DraftConfig;

    #[test]
    fn test_build_every_learning_kind() {
        let encoder = ObservationEncoder::new(&DraftConfig::new(4, 10));
        let settings = AgentSettings::default();
        for kind in AgentKind::LEARNING {
            let agent = settings.build(kind, &encoder, 1).unwrap();
            assert_eq!(agent.kind(), kind);
            assert!(agent.is_training());
        }
    }

    #[test]
    fn test_build_all_seeds_each_seat() {
        let encoder = ObservationEncoder::new(&DraftConfig::new(3, 4));
        let settings = AgentSettings::default();
        let kinds = [AgentKind::DeepQ, AgentKind::DeepQ, AgentKind::Ppo];

        let payloads = |seed| -> Vec<Vec<u8>> {
            settings
                .build_all(&kinds, &encoder, seed)
                .unwrap()
                .iter()
                .map(|a| a.save_policy().unwrap().payload)
                .collect()
        };
        let first = payloads(5);
        assert_eq!(first, payloads(5));
        assert_ne!(first[0], first[1]);
        assert_ne!(first, payloads(6));
    }

    #[test]
    fn test_replay_requires_history() {
        let encoder = ObservationEncoder::new(&DraftConfig::new(2, 2));
        let err = AgentSettings::default()
            .build(AgentKind::Replay, &encoder, 0)
            .err()
            .unwrap();
        assert!(matches!(err, DraftError::Config(_)));
    }

    #[test]
    fn test_settings_partial_toml() {
        let settings: AgentSettings = toml::from_str(
            r#"
            policy_version = "v7"

            [tabular_q]
            learning_rate = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(settings.policy_version, "v7");
        assert_eq!(settings.tabular_q.learning_rate, 0.5);
        assert_eq!(settings.tabular_q.discount, 0.9);
        assert_eq!(settings.deep_q, DeepQConfig::default());
    }
}
