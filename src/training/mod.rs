//! Experience collection, training loops and tournaments.
//!
//! ## Overview
//!
//! - **Trajectory**: `Transition`, uniform `ReplayBuffer`, on-policy `Rollout`
//!   plus return/advantage helpers
//! - **Episode**: `run_episode` plays one draft and routes transitions
//! - **Trainer**: repeated episodes, metrics and parallel populations
//! - **Thunderdome**: no-learning evaluation and ranking
//!
//! ## Usage
//!
//! ```rust,ignore
//! use draft_optimizer::training::{Trainer, TrainerConfig, Thunderdome, ThunderdomeConfig};
//!
//! let agents = settings.build_all(&kinds, &encoder, 7)?;
//! let mut trainer = Trainer::new(draft.clone(), pool.clone(), agents, TrainerConfig::default())?;
//! trainer.train()?;
//!
//! let mut arena = Thunderdome::new(draft, pool, trainer.into_agents(), ThunderdomeConfig::default())?;
//! let report = arena.run()?;
//! ```

pub mod episode;
pub mod metrics;
pub mod tournament;
pub mod trainer;
pub mod trajectory;

pub use episode::{run_episode, EpisodeMode, EpisodeReport};
pub use metrics::{read_metrics, AgentEpisodeMetrics, EpisodeMetrics, MetricsLog, MovingAverage};
pub use tournament::{Standing, Thunderdome, ThunderdomeConfig, ThunderdomeReport};
pub use trainer::{population_seeds, train_populations, AgentAverage, Trainer, TrainerConfig, TrainingSummary};
pub use trajectory::{discounted_returns, gae, normalize, ReplayBuffer, Rollout, RolloutStep, Transition};
