//! State encoding for agent input.
//!
//! Transforms a `DraftState` into a fixed-length observation from one team's
//! perspective. Every encoder is a pure function of the state and the
//! observing team: calling it twice yields bit-identical output.
//!
//! ## Scopes
//!
//! - `SelfOnly`: `[QB, RB, WR, TE, Other counts, rounds remaining]` as small
//!   integers. Discrete, so tabular agents can key on it directly.
//! - `Full`: own roster, every opponent's roster, and a pool summary, each
//!   normalized to roughly `[0, 1]`. Length `5 * team_count + 17`.

use serde::{Deserialize, Serialize};

use crate::core::{DraftConfig, DraftState, Position, TeamId};
use crate::nn::traits::Observation;

/// How much of the draft an observation covers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncodeScope {
    /// Own roster counts and rounds remaining.
    SelfOnly,
    /// Own roster, opponents, and pool summary.
    #[default]
    Full,
}

/// Encodes draft state into observations.
pub trait StateEncoder: Send + Sync {
    /// Encode the state from a team's perspective.
    fn encode(&self, state: &DraftState, perspective: TeamId) -> Observation;

    /// Shape of every observation this encoder produces.
    fn output_shape(&self) -> Vec<usize>;

    /// Which scope this encoder implements.
    fn scope(&self) -> EncodeScope;
}

/// Compact, discretized view of the observer's own roster.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelfOnlyEncoder;

impl SelfOnlyEncoder {
    const LEN: usize = Position::COUNT + 1;
}

impl StateEncoder for SelfOnlyEncoder {
    fn encode(&self, state: &DraftState, perspective: TeamId) -> Observation {
        let team = state.team(perspective);
        let mut tensor = Vec::with_capacity(Self::LEN);
        tensor.extend(team.position_counts().iter().map(|&c| f32::from(c)));
        tensor.push(state.rounds_remaining(perspective) as f32);
        Observation::new(tensor, vec![Self::LEN])
    }

    fn output_shape(&self) -> Vec<usize> {
        vec![Self::LEN]
    }

    fn scope(&self) -> EncodeScope {
        EncodeScope::SelfOnly
    }
}

/// Full-information view used by the function-approximation agents.
#[derive(Clone, Debug)]
pub struct FullEncoder {
    team_count: usize,
    caps: [u8; Position::COUNT],
}

impl FullEncoder {
    /// Pool summary features per position: remaining, best, top-3 mean.
    const POOL_FEATURES: usize = 3;
    /// Draft progress and own fill fraction.
    const PROGRESS_FEATURES: usize = 2;

    /// Create an encoder for a draft configuration.
    #[must_use]
    pub fn new(config: &DraftConfig) -> Self {
        Self {
            team_count: config.team_count,
            caps: config.roster.caps,
        }
    }

    /// Observation length for `team_count` seats.
    #[must_use]
    pub fn len_for(team_count: usize) -> usize {
        Position::COUNT * team_count + Position::COUNT * Self::POOL_FEATURES + Self::PROGRESS_FEATURES
    }

    fn push_roster(&self, tensor: &mut Vec<f32>, counts: [u8; Position::COUNT]) {
        for (count, cap) in counts.iter().zip(self.caps.iter()) {
            tensor.push(f32::from(*count) / f32::from((*cap).max(1)));
        }
    }
}

/// Remaining-pool aggregates for one position.
#[derive(Clone, Copy, Default)]
struct PositionSummary {
    remaining: usize,
    top: [f32; 3],
    top_len: usize,
}

impl PositionSummary {
    fn add(&mut self, points: f32) {
        self.remaining += 1;
        // Insertion into a descending top-3
        let mut value = points;
        for slot in self.top.iter_mut().take(self.top_len) {
            if value > *slot {
                std::mem::swap(slot, &mut value);
            }
        }
        if self.top_len < self.top.len() {
            self.top[self.top_len] = value;
            self.top_len += 1;
        }
    }

    fn best(&self) -> f32 {
        if self.top_len == 0 {
            0.0
        } else {
            self.top[0]
        }
    }

    fn top_mean(&self) -> f32 {
        if self.top_len == 0 {
            0.0
        } else {
            self.top[..self.top_len].iter().sum::<f32>() / self.top_len as f32
        }
    }
}

fn ratio(numerator: f32, denominator: f32) -> f32 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

impl StateEncoder for FullEncoder {
    fn encode(&self, state: &DraftState, perspective: TeamId) -> Observation {
        let len = Self::len_for(self.team_count);
        let mut tensor = Vec::with_capacity(len);

        // Own roster, then opponents in seat order after the observer
        self.push_roster(&mut tensor, state.team(perspective).position_counts());
        for offset in 1..self.team_count {
            let seat = (perspective.index() + offset) % self.team_count;
            let counts = state.team(TeamId::new(seat as u8)).position_counts();
            self.push_roster(&mut tensor, counts);
        }

        let mut summary = [PositionSummary::default(); Position::COUNT];
        for player in state.available_players() {
            summary[player.position.index()].add(player.projected_points);
        }

        let pool = state.pool();
        for pos in Position::ALL {
            let total = pool.position_total(pos) as f32;
            tensor.push(ratio(summary[pos.index()].remaining as f32, total));
        }
        for pos in Position::ALL {
            tensor.push(ratio(summary[pos.index()].best(), pool.max_projected(pos)));
        }
        for pos in Position::ALL {
            tensor.push(ratio(summary[pos.index()].top_mean(), pool.max_projected(pos)));
        }

        tensor.push(ratio(state.turn() as f32, state.total_turns() as f32));
        tensor.push(ratio(state.team(perspective).len() as f32, state.rounds() as f32));

        debug_assert_eq!(tensor.len(), len);
        Observation::new(tensor, vec![len])
    }

    fn output_shape(&self) -> Vec<usize> {
        vec![Self::len_for(self.team_count)]
    }

    fn scope(&self) -> EncodeScope {
        EncodeScope::Full
    }
}

/// Dispatches to the encoder for a requested scope.
#[derive(Clone, Debug)]
pub struct ObservationEncoder {
    self_only: SelfOnlyEncoder,
    full: FullEncoder,
}

impl ObservationEncoder {
    /// Create encoders for a draft configuration.
    #[must_use]
    pub fn new(config: &DraftConfig) -> Self {
        Self {
            self_only: SelfOnlyEncoder,
            full: FullEncoder::new(config),
        }
    }

    /// Encode `state` for `team` at `scope`.
    #[must_use]
    pub fn encode(&self, state: &DraftState, team: TeamId, scope: EncodeScope) -> Observation {
        self.encoder(scope).encode(state, team)
    }

    /// Observation length at `scope`.
    #[must_use]
    pub fn len(&self, scope: EncodeScope) -> usize {
        self.encoder(scope).output_shape().iter().product()
    }

    fn encoder(&self, scope: EncodeScope) -> &dyn StateEncoder {
        match scope {
            EncodeScope::SelfOnly => &self.self_only,
            EncodeScope::Full => &self.full,
        }
    }
}
