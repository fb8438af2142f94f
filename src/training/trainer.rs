//! Repeated episodes over a fixed agent population.
//!
//! ## Loop
//!
//! 1. Seat the agents (shuffled from the trainer's RNG when configured)
//! 2. Play one draft with learning enabled
//! 3. Record per-agent scores, rewards and losses; update the moving
//!    average of each agent kind with the scores of all its seats
//! 4. Every `log_interval` episodes, log the per-kind averages
//!
//! A failed episode is discarded: every agent gets `abort_episode()`, a
//! warning is logged and no metrics are recorded. Configuration and data
//! errors stop the run.
//!
//! Independent populations train in parallel with `train_populations`,
//! each on a private pool copy seeded by a fork of the configured seed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::episode::{run_episode, EpisodeMode, EpisodeReport};
use super::metrics::{AgentEpisodeMetrics, EpisodeMetrics, MetricsLog, MovingAverage};
use crate::agents::{Agent, AgentKind, PolicySnapshot};
use crate::core::{DraftConfig, DraftError, DraftRng, Result, TeamId};
use crate::nn::ObservationEncoder;
use crate::pool::PlayerPool;
use crate::rules::DraftEnvironment;

/// Training loop configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub episodes: usize,
    pub seed: u64,
    /// Reseat agents every episode.
    pub shuffle_seats: bool,
    pub moving_average_window: usize,
    /// Episodes between progress logs; 0 disables them.
    pub log_interval: usize,
    /// JSON-lines metrics output.
    pub metrics_path: Option<PathBuf>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            episodes: 1000,
            seed: 0,
            shuffle_seats: true,
            moving_average_window: 100,
            log_interval: 100,
            metrics_path: None,
        }
    }
}

impl TrainerConfig {
    #[must_use]
    pub fn with_episodes(mut self, episodes: usize) -> Self {
        self.episodes = episodes;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_shuffle_seats(mut self, shuffle: bool) -> Self {
        self.shuffle_seats = shuffle;
        self
    }

    #[must_use]
    pub fn with_moving_average_window(mut self, window: usize) -> Self {
        self.moving_average_window = window;
        self
    }

    #[must_use]
    pub fn with_log_interval(mut self, interval: usize) -> Self {
        self.log_interval = interval;
        self
    }

    #[must_use]
    pub fn with_metrics_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.metrics_path = Some(path.into());
        self
    }
}

/// Final moving average for one agent kind, pooled over its seats.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentAverage {
    pub label: String,
    pub kind: AgentKind,
    /// Agents of this kind in the population.
    pub seats: usize,
    pub score_average: f32,
}

/// Outcome of a training run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub episodes_completed: usize,
    pub episodes_failed: usize,
    pub averages: Vec<AgentAverage>,
}

/// Drives training episodes for one population of agents.
pub struct Trainer {
    config: TrainerConfig,
    env: DraftEnvironment,
    encoder: ObservationEncoder,
    pool: Arc<PlayerPool>,
    agents: Vec<Box<dyn Agent>>,
    averages: BTreeMap<AgentKind, MovingAverage>,
    rng: DraftRng,
    episode: usize,
}

impl Trainer {
    /// Create a trainer. The agent count must equal the draft's team count.
    pub fn new(
        draft: DraftConfig,
        pool: Arc<PlayerPool>,
        agents: Vec<Box<dyn Agent>>,
        config: TrainerConfig,
    ) -> Result<Self> {
        if agents.len() != draft.team_count {
            return Err(DraftError::config(format!(
                "{} agents for a {}-team draft",
                agents.len(),
                draft.team_count
            )));
        }
        let encoder = ObservationEncoder::new(&draft);
        let env = DraftEnvironment::new(draft)?;
        let averages = agents
            .iter()
            .map(|a| (a.kind(), MovingAverage::new(config.moving_average_window)))
            .collect();
        Ok(Self {
            rng: DraftRng::new(config.seed),
            config,
            env,
            encoder,
            pool,
            agents,
            averages,
            episode: 0,
        })
    }

    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    #[must_use]
    pub fn encoder(&self) -> &ObservationEncoder {
        &self.encoder
    }

    #[must_use]
    pub fn agents(&self) -> &[Box<dyn Agent>] {
        &self.agents
    }

    pub fn agents_mut(&mut self) -> &mut [Box<dyn Agent>] {
        &mut self.agents
    }

    /// Hand the trained agents back.
    #[must_use]
    pub fn into_agents(self) -> Vec<Box<dyn Agent>> {
        self.agents
    }

    /// Episodes attempted so far.
    #[must_use]
    pub fn episodes_run(&self) -> usize {
        self.episode
    }

    /// Seat order for the next episode.
    fn next_seating(&mut self) -> Vec<usize> {
        let mut seating: Vec<usize> = (0..self.agents.len()).collect();
        if self.config.shuffle_seats {
            self.rng.shuffle(&mut seating);
        }
        seating
    }

    fn composition(&self, seating: &[usize]) -> String {
        seating
            .iter()
            .map(|&i| self.agents[i].label())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Play one training episode.
    ///
    /// On failure every agent discards its partial episode and the error is
    /// returned.
    pub fn run_training_episode(&mut self) -> Result<EpisodeReport> {
        let seating = self.next_seating();
        let index = self.episode;
        self.episode += 1;

        let result = run_episode(
            &mut self.env,
            &self.encoder,
            Arc::clone(&self.pool),
            &mut self.agents,
            &seating,
            EpisodeMode::Train,
        );
        if let Err(err) = &result {
            for agent in &mut self.agents {
                agent.abort_episode();
            }
            warn!(
                episode = index,
                agents = %self.composition(&seating),
                error = %err,
                "episode failed; discarded"
            );
        }
        result
    }

    /// Moving average of `kind`, `0.0` before its first finished episode.
    #[must_use]
    pub fn kind_average(&self, kind: AgentKind) -> f32 {
        self.averages.get(&kind).map_or(0.0, MovingAverage::mean)
    }

    fn record(&mut self, index: usize, report: &EpisodeReport) -> EpisodeMetrics {
        let seated: Vec<(usize, usize, TeamId)> = (0..self.agents.len())
            .filter_map(|i| {
                let seat = report.seating.iter().position(|&a| a == i)?;
                Some((i, seat, TeamId::new(seat as u8)))
            })
            .collect();

        for &(i, _, team) in &seated {
            if let Some(avg) = self.averages.get_mut(&self.agents[i].kind()) {
                avg.push(report.final_scores[team]);
            }
        }

        let agents = seated
            .into_iter()
            .map(|(i, seat, team)| {
                let agent = &self.agents[i];
                AgentEpisodeMetrics {
                    label: agent.label(),
                    kind: agent.kind(),
                    seat,
                    score: report.final_scores[team],
                    reward: report.rewards[team],
                    loss: report.losses.get(i).copied().flatten(),
                    score_average: self.kind_average(agent.kind()),
                }
            })
            .collect();
        EpisodeMetrics {
            episode: index,
            picks: report.picks,
            agents,
        }
    }

    fn log_progress(&self, episode: usize, metrics: &EpisodeMetrics) {
        for (&kind, avg) in &self.averages {
            let losses: Vec<f32> = metrics
                .agents
                .iter()
                .filter(|m| m.kind == kind)
                .filter_map(|m| m.loss)
                .collect();
            let loss = if losses.is_empty() {
                f32::NAN
            } else {
                losses.iter().sum::<f32>() / losses.len() as f32
            };
            info!(
                episode,
                kind = %kind,
                score_average = avg.mean(),
                loss,
                "training progress"
            );
        }
    }

    /// Run the configured number of training episodes.
    pub fn train(&mut self) -> Result<TrainingSummary> {
        let mut log = match &self.config.metrics_path {
            Some(path) => Some(MetricsLog::create(path)?),
            None => None,
        };
        let mut completed = 0;
        let mut failed = 0;

        for _ in 0..self.config.episodes {
            let index = self.episode;
            match self.run_training_episode() {
                Ok(report) => {
                    completed += 1;
                    let metrics = self.record(index, &report);
                    if let Some(log) = log.as_mut() {
                        log.append(&metrics)?;
                    }
                    if self.config.log_interval > 0 && (index + 1) % self.config.log_interval == 0 {
                        self.log_progress(index + 1, &metrics);
                    }
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(_) => failed += 1,
            }
        }

        if let Some(log) = log.as_mut() {
            log.flush()?;
        }
        Ok(TrainingSummary {
            episodes_completed: completed,
            episodes_failed: failed,
            averages: self.summary_averages(),
        })
    }

    fn summary_averages(&self) -> Vec<AgentAverage> {
        self.averages
            .iter()
            .map(|(&kind, avg)| AgentAverage {
                label: kind.label().to_string(),
                kind,
                seats: self.agents.iter().filter(|a| a.kind() == kind).count(),
                score_average: avg.mean(),
            })
            .collect()
    }

    /// Play `episodes` drafts with learning off; training flags are restored
    /// afterwards.
    pub fn evaluate(&mut self, episodes: usize) -> Result<Vec<EpisodeReport>> {
        let flags: Vec<bool> = self.agents.iter().map(|a| a.is_training()).collect();
        for agent in &mut self.agents {
            agent.set_training(false);
        }

        let mut reports = Vec::with_capacity(episodes);
        let mut outcome = Ok(());
        for _ in 0..episodes {
            let seating = self.next_seating();
            match run_episode(
                &mut self.env,
                &self.encoder,
                Arc::clone(&self.pool),
                &mut self.agents,
                &seating,
                EpisodeMode::Evaluate,
            ) {
                Ok(report) => reports.push(report),
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }

        for (agent, flag) in self.agents.iter_mut().zip(flags) {
            agent.set_training(flag);
        }
        outcome.map(|()| reports)
    }

    /// Save every learning agent's policy under `dir`.
    pub fn save_policies(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.agents
            .iter()
            .filter(|a| a.kind().is_learning())
            .map(|a| a.save_policy()?.save(dir))
            .collect()
    }

    /// Load each learning agent's policy from `dir` using its own kind and
    /// version tag.
    pub fn load_policies(&mut self, dir: &Path) -> Result<()> {
        for agent in self.agents.iter_mut().filter(|a| a.kind().is_learning()) {
            let current = agent.save_policy()?;
            let snapshot = PolicySnapshot::load_from_dir(dir, current.kind, &current.version)?;
            agent.load_policy(&snapshot)?;
        }
        Ok(())
    }
}

/// Metrics path for population `index`: `<stem>-<index>.<ext>`.
fn population_metrics_path(path: &Path, index: usize) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("metrics");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}-{index}.{ext}"),
        None => format!("{stem}-{index}"),
    };
    path.with_file_name(name)
}

/// Seeds for `count` populations: successive forks of `seed`.
#[must_use]
pub fn population_seeds(seed: u64, count: usize) -> Vec<u64> {
    let mut base = DraftRng::new(seed);
    (0..count).map(|_| base.fork().seed()).collect()
}

/// Train independent populations in parallel.
///
/// Population `i` gets a private copy of the pool and the `i`-th seed from
/// `population_seeds`. Results come back in input order together with the
/// trained agents.
pub fn train_populations(
    draft: &DraftConfig,
    pool: &PlayerPool,
    populations: Vec<Vec<Box<dyn Agent>>>,
    config: &TrainerConfig,
) -> Vec<Result<(TrainingSummary, Vec<Box<dyn Agent>>)>> {
    let seeds = population_seeds(config.seed, populations.len());
    populations
        .into_par_iter()
        .zip(seeds)
        .enumerate()
        .map(|(i, (agents, seed))| {
            let mut local = config.clone().with_seed(seed);
            local.metrics_path = config.metrics_path.as_deref().map(|p| population_metrics_path(p, i));
            let mut trainer = Trainer::new(draft.clone(), Arc::new(pool.clone()), agents, local)?;
            let summary = trainer.train()?;
            Ok((summary, trainer.into_agents()))
        })
        .collect()
}
