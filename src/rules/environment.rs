//! The draft environment: turn-based simulator over a `DraftState`.
//!
//! ## Contract
//!
//! - `reset(pool, seat_count, order)`: fresh state, validated configuration
//! - `legal_actions()`: undrafted players under the active team's caps, or
//!   the whole remaining pool when nothing fits
//! - `step(player)`: validate, commit, advance, score
//!
//! The environment is the only owner that mutates draft state. Rewards come
//! from one canonical computation here; agents pick the components they use
//! through `RewardScheme`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::pick_order::PickOrder;
use super::scoring::{best_lineup, shaping_reward, Lineup};
use crate::core::{
    DraftConfig, DraftError, DraftState, PickRecord, Player, PlayerId, Position, Result,
    RosterConfig, TeamId, TeamMap,
};
use crate::pool::PlayerPool;

/// Legal picks for the team on the clock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegalActions {
    /// Team on the clock.
    pub team: TeamId,
    /// Legal players in pool order.
    pub players: Vec<PlayerId>,
    /// True when no player fit under the caps and the whole pool is offered.
    pub fallback: bool,
    best_by_position: [Option<PlayerId>; Position::COUNT],
}

impl LegalActions {
    /// Compute the legal set for the active team of `state`.
    ///
    /// Returns `None` when the draft is done.
    #[must_use]
    pub fn compute(state: &DraftState, roster: &RosterConfig) -> Option<Self> {
        let team = state.active_team()?;
        let counts = state.team(team).position_counts();
        let under_cap = |p: &Player| counts[p.position.index()] < roster.cap(p.position);

        let mut capped: Vec<&Player> = state.available_players().filter(|p| under_cap(p)).collect();
        let fallback = capped.is_empty();
        if fallback {
            capped = state.available_players().collect();
        }

        let mut best_by_position: [Option<&Player>; Position::COUNT] = [None; Position::COUNT];
        for player in &capped {
            let slot = &mut best_by_position[player.position.index()];
            let better = match *slot {
                Some(best) => player.rank_cmp(best).is_lt(),
                None => true,
            };
            if better {
                *slot = Some(*player);
            }
        }

        Some(Self {
            team,
            players: capped.iter().map(|p| p.id).collect(),
            fallback,
            best_by_position: best_by_position.map(|b| b.map(|p| p.id)),
        })
    }

    /// Whether a player is legal.
    #[must_use]
    pub fn contains(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }

    /// Number of legal players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether no pick is possible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Best legal player at a position: highest projection, then lower ADP,
    /// then lower ID.
    #[must_use]
    pub fn best_in(&self, position: Position) -> Option<PlayerId> {
        self.best_by_position[position.index()]
    }

    /// Which position categories have at least one legal player.
    #[must_use]
    pub fn category_mask(&self) -> [bool; Position::COUNT] {
        self.best_by_position.map(|b| b.is_some())
    }
}

/// Result of one committed pick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub pick: PickRecord,
    /// Canonical shaping reward for the picking team.
    pub shaping_reward: f32,
    pub done: bool,
    /// Raw best-lineup points per team, present once the draft is done.
    pub final_scores: Option<TeamMap<f32>>,
    /// Scaled terminal reward per team, present once the draft is done.
    pub terminal_rewards: Option<TeamMap<f32>>,
}

impl StepOutcome {
    /// Terminal reward for a team, zero before the draft ends.
    #[must_use]
    pub fn terminal_reward(&self, team: TeamId) -> f32 {
        self.terminal_rewards.as_ref().map_or(0.0, |r| r[team])
    }
}

/// Turn-based draft simulator.
#[derive(Clone, Debug)]
pub struct DraftEnvironment {
    config: DraftConfig,
    state: Option<DraftState>,
}

impl DraftEnvironment {
    /// Create an environment, validating the configuration.
    pub fn new(config: DraftConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, state: None })
    }

    /// The environment's configuration.
    #[must_use]
    pub fn config(&self) -> &DraftConfig {
        &self.config
    }

    /// The configured pick order for a full draft.
    #[must_use]
    pub fn default_order(&self) -> PickOrder {
        PickOrder::for_kind(self.config.pick_order, self.config.team_count, self.config.rounds)
    }

    /// Start a new draft.
    ///
    /// Fails with `Config` when `seat_count` differs from the configured team
    /// count or `order` is inconsistent with `team_count * rounds` picks.
    pub fn reset(&mut self, pool: Arc<PlayerPool>, seat_count: usize, order: PickOrder) -> Result<&DraftState> {
        if seat_count != self.config.team_count {
            return Err(DraftError::config(format!(
                "{seat_count} agents registered for {} seats",
                self.config.team_count
            )));
        }
        order.validate(self.config.team_count, self.config.rounds)?;

        let state = DraftState::new(pool, self.config.team_count, self.config.rounds, order);
        Ok(self.state.insert(state))
    }

    /// Current state.
    pub fn state(&self) -> Result<&DraftState> {
        self.state
            .as_ref()
            .ok_or_else(|| DraftError::config("environment has not been reset"))
    }

    /// Whether the current draft is finished.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state.as_ref().map_or(true, DraftState::is_done)
    }

    /// Legal picks for the team on the clock.
    pub fn legal_actions(&self) -> Result<LegalActions> {
        let state = self.state()?;
        LegalActions::compute(state, &self.config.roster).ok_or(DraftError::DraftComplete)
    }

    /// Best lineup a team holds right now.
    pub fn lineup(&self, team: TeamId) -> Result<Lineup> {
        let state = self.state()?;
        Ok(best_lineup(state.pool(), state.team(team).roster(), &self.config.roster))
    }

    /// Commit a pick for the team on the clock.
    ///
    /// On error the state is untouched.
    pub fn step(&mut self, player: PlayerId) -> Result<StepOutcome> {
        let legal = self.legal_actions()?;
        let team = legal.team;
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| DraftError::config("environment has not been reset"))?;

        if !legal.contains(player) {
            let reason = if !state.pool().contains(player) {
                "not in the player pool"
            } else if !state.is_available(player) {
                "already drafted"
            } else {
                "position cap reached"
            };
            return Err(DraftError::IllegalAction {
                team,
                player,
                reason: reason.to_string(),
            });
        }

        let pool = state.pool_handle();
        let drafted = pool.get(player).ok_or_else(|| DraftError::IllegalAction {
            team,
            player,
            reason: "not in the player pool".to_string(),
        })?;

        let pick = state.commit_pick(team, drafted);
        let lineup = best_lineup(&pool, state.team(team).roster(), &self.config.roster);
        let shaping = shaping_reward(drafted, &lineup, &self.config.reward);

        debug!(
            turn = pick.turn,
            round = pick.round,
            team = %team,
            player = %drafted.name,
            position = %drafted.position,
            fallback = legal.fallback,
            "pick committed"
        );

        let done = state.is_done();
        let (final_scores, terminal_rewards) = if done {
            let roster = &self.config.roster;
            let scores = state
                .teams()
                .map(|_, t| best_lineup(&pool, t.roster(), roster).points);
            state.set_scores(&scores);
            let scale = self.config.reward.terminal_scale;
            let rewards = scores.map(|_, s| s * scale);
            (Some(scores), Some(rewards))
        } else {
            (None, None)
        };

        Ok(StepOutcome {
            pick,
            shaping_reward: shaping,
            done,
            final_scores,
            terminal_rewards,
        })
    }
}
