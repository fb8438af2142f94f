//! Drafting agents behind one interface.
//!
//! Every agent, learning or not, implements [`Agent`]. The trainer and the
//! tournament only ever see `Box<dyn Agent>`, so adding an algorithm never
//! touches orchestration code.
//!
//! ## Learning agents
//!
//! Act over the five position categories. A chosen category resolves to the
//! best legal player at that position (see `LegalActions::best_in`).
//!
//! - `TabularQAgent`: Q-table over the self-only observation
//! - `DeepQAgent`: Q-network with replay and a target network
//! - `ActorCriticAgent`: masked softmax policy with a value baseline
//! - `PpoAgent`: clipped-surrogate policy optimization
//!
//! ## Baselines
//!
//! `GreedyAgent`, `RandomAgent`, `ReplayAgent` act on concrete players and
//! never learn.

pub mod actor_critic;
pub mod baseline;
pub mod dqn;
pub mod exploration;
pub mod factory;
pub mod persistence;
pub mod ppo;
pub mod tabular;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{DraftError, DraftState, PlayerId, Position, Result};
use crate::nn::{ActionMask, EncodeScope, Observation};
use crate::rules::{LegalActions, RewardScheme};
use crate::training::Transition;

pub use actor_critic::{ActorCriticAgent, ActorCriticConfig};
pub use baseline::{GreedyAgent, RandomAgent, ReplayAgent};
pub use dqn::{DeepQAgent, DeepQConfig};
pub use exploration::{Exploration, ExplorationSchedule};
pub use factory::AgentSettings;
pub use persistence::PolicySnapshot;
pub use ppo::{PpoAgent, PpoConfig};
pub use tabular::{TabularQAgent, TabularQConfig};

/// Agent algorithm tag. Also the key for saved policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    TabularQ,
    DeepQ,
    ActorCritic,
    Ppo,
    Greedy,
    Random,
    Replay,
}

impl AgentKind {
    /// The four learning algorithms.
    pub const LEARNING: [AgentKind; 4] = [
        AgentKind::TabularQ,
        AgentKind::DeepQ,
        AgentKind::ActorCritic,
        AgentKind::Ppo,
    ];

    /// Stable snake_case label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            AgentKind::TabularQ => "tabular_q",
            AgentKind::DeepQ => "deep_q",
            AgentKind::ActorCritic => "actor_critic",
            AgentKind::Ppo => "ppo",
            AgentKind::Greedy => "greedy",
            AgentKind::Random => "random",
            AgentKind::Replay => "replay",
        }
    }

    /// Whether this kind updates its policy during training.
    #[must_use]
    pub fn is_learning(self) -> bool {
        Self::LEARNING.contains(&self)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AgentKind {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "tabular_q" | "tabular" | "q" => Ok(AgentKind::TabularQ),
            "deep_q" | "dqn" => Ok(AgentKind::DeepQ),
            "actor_critic" | "a2c" => Ok(AgentKind::ActorCritic),
            "ppo" => Ok(AgentKind::Ppo),
            "greedy" => Ok(AgentKind::Greedy),
            "random" => Ok(AgentKind::Random),
            "replay" => Ok(AgentKind::Replay),
            _ => Err(DraftError::config(format!("unknown agent kind '{s}'"))),
        }
    }
}

/// When the trainer calls `learn()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LearnSchedule {
    /// After every delivered transition.
    PerStep,
    /// Once the episode finishes.
    PerEpisode,
}

/// Summary of one learning update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnStats {
    /// Mean loss over the update.
    pub loss: f32,
    /// Samples the update consumed.
    pub samples: usize,
}

/// Everything an agent may look at when choosing a pick.
///
/// The state is a read-only view; only the environment mutates it.
pub struct AgentInput<'a> {
    /// Observation at the agent's own scope.
    pub observation: &'a Observation,
    /// Legal players for the agent's team.
    pub legal: &'a LegalActions,
    /// Read-only draft state.
    pub state: &'a DraftState,
}

impl AgentInput<'_> {
    /// Category mask derived from the legal player set.
    #[must_use]
    pub fn mask(&self) -> ActionMask {
        ActionMask::from(self.legal)
    }
}

/// Shared capability set for every drafting agent.
pub trait Agent: Send {
    /// Algorithm tag.
    fn kind(&self) -> AgentKind;

    /// Display label used in logs and reports.
    fn label(&self) -> String {
        self.kind().label().to_string()
    }

    /// Observation scope the agent consumes.
    fn scope(&self) -> EncodeScope {
        EncodeScope::Full
    }

    /// Reward components the agent trains on.
    fn reward_scheme(&self) -> RewardScheme {
        RewardScheme::Shaped
    }

    /// When the trainer should call `learn()`.
    fn learn_schedule(&self) -> LearnSchedule {
        LearnSchedule::PerEpisode
    }

    /// Choose a legal player.
    fn select_action(&mut self, input: &AgentInput<'_>) -> Result<PlayerId>;

    /// Receive a completed transition for one of this agent's picks.
    fn observe_transition(&mut self, _transition: Transition) {}

    /// Run a learning update. `None` when nothing was learned.
    fn learn(&mut self) -> Option<LearnStats> {
        None
    }

    /// Called after a finished episode (exploration decay, target sync).
    fn end_episode(&mut self) {}

    /// Discard any partial-episode data after a failed episode.
    fn abort_episode(&mut self) {}

    /// Switch between training and evaluation behaviour.
    fn set_training(&mut self, training: bool);

    /// Whether the agent is in training mode.
    fn is_training(&self) -> bool;

    /// Export the current policy.
    fn save_policy(&self) -> Result<PolicySnapshot>;

    /// Replace the current policy. On error the live policy is unchanged.
    fn load_policy(&mut self, snapshot: &PolicySnapshot) -> Result<()>;
}

/// Resolve a category action to the best legal player at that position.
pub fn resolve_category(legal: &LegalActions, action: usize) -> Result<PlayerId> {
    Position::from_index(action)
        .and_then(|pos| legal.best_in(pos))
        .ok_or_else(|| DraftError::IllegalAction {
            team: legal.team,
            player: PlayerId::new(u32::MAX),
            reason: format!("no legal player in category {action}"),
        })
}

/// Category index of a drafted player, defaulting to `Other` for unknowns.
#[must_use]
pub fn category_of(state: &DraftState, player: PlayerId) -> usize {
    state
        .pool()
        .get(player)
        .map_or(Position::Other.index(), |p| p.position.index())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels_round_trip() {
        for kind in [
            AgentKind::TabularQ,
            AgentKind::DeepQ,
            AgentKind::ActorCritic,
            AgentKind::Ppo,
            AgentKind::Greedy,
            AgentKind::Random,
            AgentKind::Replay,
        ] {
            assert_eq!(kind.label().parse::<AgentKind>().unwrap(), kind);
        }
        assert_eq!("DQN".parse::<AgentKind>().unwrap(), AgentKind::DeepQ);
        assert!("alphazero".parse::<AgentKind>().is_err());
    }

    #[test]
    fn test_is_learning() {
        assert!(AgentKind::Ppo.is_learning());
        assert!(!AgentKind::Greedy.is_learning());
    }

    #[test]
    fn test_kind_serde() {
        let json = serde_json::to_string(&AgentKind::ActorCritic).unwrap();
        assert_eq!(json, "\"actor_critic\"");
    }
}
