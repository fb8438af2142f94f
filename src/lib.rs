//! # draft-optimizer
//!
//! A fantasy-football draft simulator and multi-agent reinforcement-learning
//! environment.
//!
//! ## Design Principles
//!
//! 1. **One Environment**: `DraftEnvironment` owns the draft state and is the
//!    only thing that mutates it. Encoders and agents get read-only views.
//!
//! 2. **N-Team First**: Every API takes the team count from `DraftConfig`.
//!    Nothing assumes two teams.
//!
//! 3. **Explicit Configuration**: Seeds, hyperparameters and rewards are
//!    plain config values passed into constructors. No global state.
//!
//! ## Architecture
//!
//! - **Category actions**: learning agents choose among five position
//!   categories; a category resolves deterministically to the best legal
//!   player at that position.
//!
//! - **Persistent Data Structures**: O(1) state snapshots via `im`.
//!
//! - **Canonical rewards**: shaping and terminal rewards are computed once in
//!   the environment; each agent picks the components it trains on.
//!
//! ## Modules
//!
//! - `core`: players, teams, draft state, RNG, configuration, errors
//! - `pool`: the player catalog and CSV loaders
//! - `rules`: pick order, lineup scoring, the draft environment
//! - `nn`: observation encoding, masks, MLPs and optimizers
//! - `agents`: tabular Q, deep Q, actor-critic, PPO and baselines
//! - `training`: episode runner, trainer, metrics, Thunderdome
//! - `settings`: TOML settings with environment overrides

pub mod agents;
pub mod core;
pub mod nn;
pub mod pool;
pub mod rules;
pub mod settings;
pub mod training;

// Re-export commonly used types
pub use crate::core::{
    DraftConfig, DraftError, DraftRng, DraftState, PickOrderKind, Player, PlayerId, Position, Result,
    RewardConfig, RosterConfig, Team, TeamId, TeamMap,
};

pub use crate::pool::{load_history, load_pool, PlayerPool, RealDraft};

pub use crate::rules::{DraftEnvironment, LegalActions, PickOrder, RewardScheme, StepOutcome};

pub use crate::nn::{ActionMask, EncodeScope, Observation, ObservationEncoder};

pub use crate::agents::{
    ActorCriticAgent, Agent, AgentKind, AgentSettings, DeepQAgent, GreedyAgent, PolicySnapshot, PpoAgent,
    RandomAgent, ReplayAgent, TabularQAgent,
};

pub use crate::training::{
    run_episode, EpisodeMode, EpisodeReport, Thunderdome, ThunderdomeConfig, ThunderdomeReport, Trainer,
    TrainerConfig, Transition,
};
