//! Core draft types: players, teams, state, RNG, configuration, errors.
//!
//! These are the building blocks every other module consumes. Runs configure
//! them through `DraftConfig` rather than global settings.

pub mod config;
pub mod error;
pub mod player;
pub mod rng;
pub mod state;
pub mod team;

pub use config::{DraftConfig, PickOrderKind, RewardConfig, RosterConfig};
pub use error::{DraftError, Result};
pub use player::{Player, PlayerId, Position};
pub use rng::DraftRng;
pub use state::{DraftState, PickRecord};
pub use team::{Team, TeamId, TeamMap};
