//! Thunderdome: fixed-population evaluation with learning switched off.
//!
//! Every seated agent plays `drafts` complete drafts in evaluation mode.
//! Seats rotate by one each draft so no agent keeps the first pick. Final
//! best-lineup scores are summed per agent label (duplicates of one kind
//! share a label and pool their totals) and ranked.
//!
//! Any error aborts the run; there is no partial ranking.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::episode::{run_episode, EpisodeMode, EpisodeReport};
use crate::agents::{Agent, AgentKind, AgentSettings, PolicySnapshot};
use crate::core::{DraftConfig, DraftError, Result, TeamId};
use crate::nn::ObservationEncoder;
use crate::pool::PlayerPool;
use crate::rules::DraftEnvironment;

/// Tournament configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThunderdomeConfig {
    /// Complete drafts to play.
    pub drafts: usize,
    /// Seed for stochastic agents built by `standard_lineup`.
    pub seed: u64,
    /// Where to write the ranked table, if anywhere.
    pub output_path: Option<PathBuf>,
}

impl Default for ThunderdomeConfig {
    fn default() -> Self {
        Self {
            drafts: 100,
            seed: 0,
            output_path: None,
        }
    }
}

impl ThunderdomeConfig {
    #[must_use]
    pub fn with_drafts(mut self, drafts: usize) -> Self {
        self.drafts = drafts;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }
}

/// One row of the ranked table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub rank: usize,
    pub label: String,
    pub kind: AgentKind,
    /// Seats held by agents with this label.
    pub seats: usize,
    pub total_score: f32,
    /// Total divided by seat-drafts played.
    pub mean_score: f32,
    /// Drafts in which one of these agents had the top score.
    pub wins: usize,
}

/// Ranked result of a completed tournament.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThunderdomeReport {
    pub drafts: usize,
    pub standings: Vec<Standing>,
}

impl ThunderdomeReport {
    /// Top-ranked standing.
    #[must_use]
    pub fn winner(&self) -> Option<&Standing> {
        self.standings.first()
    }

    /// Standing for `label`.
    #[must_use]
    pub fn standing(&self, label: &str) -> Option<&Standing> {
        self.standings.iter().find(|s| s.label == label)
    }

    /// Write the ranked table as CSV, creating parent directories.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        for standing in &self.standings {
            writer.serialize(standing)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[derive(Default)]
struct Tally {
    kind: Option<AgentKind>,
    seats: usize,
    total: f64,
    wins: usize,
}

/// Evaluation arena for a fixed set of agents.
pub struct Thunderdome {
    config: ThunderdomeConfig,
    env: DraftEnvironment,
    encoder: ObservationEncoder,
    pool: Arc<PlayerPool>,
    agents: Vec<Box<dyn Agent>>,
}

impl Thunderdome {
    /// Create an arena. The agent count must equal the draft's team count.
    pub fn new(
        draft: DraftConfig,
        pool: Arc<PlayerPool>,
        agents: Vec<Box<dyn Agent>>,
        config: ThunderdomeConfig,
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
        Ok(Self {
            config,
            env,
            encoder,
            pool,
            agents,
        })
    }

    /// One agent of every learning kind, remaining seats filled by cycling
    /// through the kinds again. Needs at least one seat per kind.
    pub fn standard_lineup(settings: &AgentSettings, draft: &DraftConfig, seed: u64) -> Result<Vec<Box<dyn Agent>>> {
        let kinds = AgentKind::LEARNING;
        if draft.team_count < kinds.len() {
            return Err(DraftError::config(format!(
                "thunderdome needs at least {} teams, got {}",
                kinds.len(),
                draft.team_count
            )));
        }
        let seats: Vec<AgentKind> = (0..draft.team_count).map(|i| kinds[i % kinds.len()]).collect();
        settings.build_all(&seats, &ObservationEncoder::new(draft), seed)
    }

    #[must_use]
    pub fn config(&self) -> &ThunderdomeConfig {
        &self.config
    }

    #[must_use]
    pub fn agents(&self) -> &[Box<dyn Agent>] {
        &self.agents
    }

    /// Hand the agents back.
    #[must_use]
    pub fn into_agents(self) -> Vec<Box<dyn Agent>> {
        self.agents
    }

    /// Load each learning agent's saved policy from `dir`.
    pub fn load_policies(&mut self, dir: &Path) -> Result<()> {
        for agent in self.agents.iter_mut().filter(|a| a.kind().is_learning()) {
            let current = agent.save_policy()?;
            let snapshot = PolicySnapshot::load_from_dir(dir, current.kind, &current.version)?;
            agent.load_policy(&snapshot)?;
        }
        Ok(())
    }

    /// Seat order for draft `index`: agent `(team + index) % n` in seat `team`.
    fn seating(&self, index: usize) -> Vec<usize> {
        let n = self.agents.len();
        (0..n).map(|team| (team + index) % n).collect()
    }

    /// Play every draft and rank the agents.
    ///
    /// Agents are put in evaluation mode for the run and their previous
    /// training flags restored afterwards, whether or not the run succeeds.
    /// The CSV table is written once, after the last draft.
    pub fn run(&mut self) -> Result<ThunderdomeReport> {
        let flags: Vec<bool> = self.agents.iter().map(|a| a.is_training()).collect();
        for agent in &mut self.agents {
            agent.set_training(false);
        }
        let result = self.play_all();
        for (agent, flag) in self.agents.iter_mut().zip(flags) {
            agent.set_training(flag);
        }

        let report = result?;
        if let Some(path) = &self.config.output_path {
            report.write_csv(path)?;
        }
        if let Some(winner) = report.winner() {
            info!(
                drafts = report.drafts,
                winner = %winner.label,
                total_score = winner.total_score,
                "thunderdome complete"
            );
        }
        Ok(report)
    }

    fn play_all(&mut self) -> Result<ThunderdomeReport> {
        let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
        for agent in &self.agents {
            let tally = tallies.entry(agent.label()).or_default();
            tally.kind = Some(agent.kind());
            tally.seats += 1;
        }

        for index in 0..self.config.drafts {
            let seating = self.seating(index);
            let report = run_episode(
                &mut self.env,
                &self.encoder,
                Arc::clone(&self.pool),
                &mut self.agents,
                &seating,
                EpisodeMode::Evaluate,
            )?;
            self.accumulate(&report, &mut tallies);
            debug!(draft = index, "thunderdome draft finished");
        }

        Ok(ThunderdomeReport {
            drafts: self.config.drafts,
            standings: rank(tallies, self.config.drafts),
        })
    }

    fn accumulate(&self, report: &EpisodeReport, tallies: &mut BTreeMap<String, Tally>) {
        let top = report
            .final_scores
            .iter()
            .map(|(_, &score)| score)
            .fold(f32::NEG_INFINITY, f32::max);
        let mut winners: Vec<String> = Vec::new();

        for (team, &agent) in report.seating.iter().enumerate() {
            let label = self.agents[agent].label();
            let score = report.final_scores[TeamId::new(team as u8)];
            if score == top && !winners.contains(&label) {
                winners.push(label.clone());
            }
            if let Some(tally) = tallies.get_mut(&label) {
                tally.total += f64::from(score);
            }
        }
        for label in winners {
            if let Some(tally) = tallies.get_mut(&label) {
                tally.wins += 1;
            }
        }
    }
}

/// Order by total score descending, ties by label ascending.
fn rank(tallies: BTreeMap<String, Tally>, drafts: usize) -> Vec<Standing> {
    let mut rows: Vec<Standing> = tallies
        .into_iter()
        .filter_map(|(label, tally)| {
            let kind = tally.kind?;
            let played = (tally.seats * drafts).max(1);
            Some(Standing {
                rank: 0,
                label,
                kind,
                seats: tally.seats,
                total_score: tally.total as f32,
                mean_score: (tally.total / played as f64) as f32,
                wins: tally.wins,
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total_score
            .total_cmp(&a.total_score)
            .then_with(|| a.label.cmp(&b.label))
    });
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }
    rows
}
