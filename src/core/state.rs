//! Draft state: the single authoritative object for one episode.
//!
//! ## DraftState
//!
//! - Shared, immutable `PlayerPool` catalog
//! - Undrafted players in pool order
//! - One `Team` per seat
//! - The fixed pick order and the current turn index
//! - Pick history
//!
//! Only `DraftEnvironment` mutates a `DraftState`. Encoders, agents, and
//! trainers receive `&DraftState` or an O(1) clone.
//!
//! ## Conservation
//!
//! At every point, `available.len() + sum(team.len())` equals the pool size
//! and no player appears twice. See [`DraftState::check_conservation`].

use im::Vector;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::player::{Player, PlayerId};
use super::team::{Team, TeamId, TeamMap};
use crate::pool::PlayerPool;
use crate::rules::PickOrder;

/// One committed pick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickRecord {
    /// Turn index at which the pick was made (0-based).
    pub turn: usize,
    /// Round index (0-based).
    pub round: usize,
    pub team: TeamId,
    pub player: PlayerId,
}

/// Complete state of one draft.
///
/// Uses `im` persistent vectors so snapshots are cheap.
#[derive(Clone, Debug)]
pub struct DraftState {
    pool: Arc<PlayerPool>,
    available: Vector<PlayerId>,
    teams: TeamMap<Team>,
    order: PickOrder,
    rounds: usize,
    turn: usize,
    history: Vector<PickRecord>,
    done: bool,
}

impl DraftState {
    /// Create a fresh state with empty teams and the whole pool available.
    ///
    /// `order` is expected to be validated by the caller.
    pub(crate) fn new(pool: Arc<PlayerPool>, team_count: usize, rounds: usize, order: PickOrder) -> Self {
        let available: Vector<PlayerId> = pool.ids().collect();
        let done = available.is_empty() || order.is_empty();
        Self {
            pool,
            available,
            teams: TeamMap::new(team_count, Team::new),
            order,
            rounds,
            turn: 0,
            history: Vector::new(),
            done,
        }
    }

    // === Catalog ===

    /// The full player catalog for this run.
    #[must_use]
    pub fn pool(&self) -> &PlayerPool {
        &self.pool
    }

    /// Shared handle to the catalog.
    #[must_use]
    pub fn pool_handle(&self) -> Arc<PlayerPool> {
        Arc::clone(&self.pool)
    }

    /// Undrafted players in pool order.
    #[must_use]
    pub fn available(&self) -> &Vector<PlayerId> {
        &self.available
    }

    /// Iterate undrafted players with their attributes.
    pub fn available_players(&self) -> impl Iterator<Item = &Player> {
        self.available.iter().filter_map(|id| self.pool.get(*id))
    }

    /// Whether a player is still undrafted.
    #[must_use]
    pub fn is_available(&self, player: PlayerId) -> bool {
        self.available.iter().any(|&id| id == player)
    }

    // === Teams ===

    /// Number of seats.
    #[must_use]
    pub fn team_count(&self) -> usize {
        self.teams.team_count()
    }

    /// All teams.
    #[must_use]
    pub fn teams(&self) -> &TeamMap<Team> {
        &self.teams
    }

    /// One team.
    #[must_use]
    pub fn team(&self, id: TeamId) -> &Team {
        &self.teams[id]
    }

    // === Progression ===

    /// Picks per team.
    #[must_use]
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Current turn index (number of picks committed so far).
    #[must_use]
    pub fn turn(&self) -> usize {
        self.turn
    }

    /// Length of the pick order.
    #[must_use]
    pub fn total_turns(&self) -> usize {
        self.order.len()
    }

    /// Current round (0-based).
    #[must_use]
    pub fn round(&self) -> usize {
        self.turn / self.team_count().max(1)
    }

    /// Rounds not yet started by the active team, counting the current pick.
    #[must_use]
    pub fn rounds_remaining(&self, team: TeamId) -> usize {
        self.rounds.saturating_sub(self.teams[team].len())
    }

    /// The full pick order.
    #[must_use]
    pub fn pick_order(&self) -> &PickOrder {
        &self.order
    }

    /// Team on the clock, or `None` once the draft is done.
    #[must_use]
    pub fn active_team(&self) -> Option<TeamId> {
        if self.done {
            None
        } else {
            self.order.get(self.turn)
        }
    }

    /// Whether the draft has finished.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Committed picks in order.
    #[must_use]
    pub fn history(&self) -> &Vector<PickRecord> {
        &self.history
    }

    /// Verify that pool and rosters partition the catalog.
    #[must_use]
    pub fn check_conservation(&self) -> bool {
        let rostered: usize = self.teams.values().map(Team::len).sum();
        if self.available.len() + rostered != self.pool.len() {
            return false;
        }
        let mut seen = rustc_hash::FxHashSet::default();
        let all = self
            .available
            .iter()
            .chain(self.teams.values().flat_map(|t| t.roster().iter()));
        for id in all {
            if !seen.insert(*id) || !self.pool.contains(*id) {
                return false;
            }
        }
        true
    }

    // === Mutation (environment only) ===

    /// Commit a validated pick for the active team and advance the turn.
    pub(crate) fn commit_pick(&mut self, team: TeamId, player: &Player) -> PickRecord {
        if let Some(pos) = self.available.iter().position(|&id| id == player.id) {
            self.available.remove(pos);
        }
        self.teams[team].push(player.id, player.position);

        let record = PickRecord {
            turn: self.turn,
            round: self.round(),
            team,
            player: player.id,
        };
        self.history.push_back(record);
        self.turn += 1;

        let rounds = self.rounds;
        let all_full = self.teams.values().all(|t| t.is_full(rounds));
        if self.available.is_empty() || all_full || self.turn >= self.order.len() {
            self.done = true;
        }
        record
    }

    /// Record final scores on every team.
    pub(crate) fn set_scores(&mut self, scores: &TeamMap<f32>) {
        for (id, score) in scores.iter() {
            self.teams[id].score = Some(*score);
        }
    }
}
