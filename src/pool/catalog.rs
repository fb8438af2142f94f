//! The immutable player catalog for one run.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{DraftError, Player, PlayerId, Position, Result};

/// Immutable catalog of draftable players.
///
/// Keeps input order, indexes players by ID, and caches per-position
/// aggregates used by the encoder and reward normalization.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerPool {
    players: Vec<Player>,
    #[serde(skip)]
    index: FxHashMap<PlayerId, usize>,
    max_projected: [f32; Position::COUNT],
    position_totals: [usize; Position::COUNT],
}

impl PlayerPool {
    /// Build a catalog, rejecting duplicate IDs and non-finite attributes.
    ///
    /// Row numbers in errors are 1-based positions in `players`.
    pub fn new(players: Vec<Player>) -> Result<Self> {
        let mut index = FxHashMap::default();
        let mut max_projected = [0.0_f32; Position::COUNT];
        let mut position_totals = [0_usize; Position::COUNT];

        for (i, player) in players.iter().enumerate() {
            let row = i + 1;
            if !player.projected_points.is_finite() {
                return Err(DraftError::data(row, "projected_points is not finite"));
            }
            if !player.adp.is_finite() {
                return Err(DraftError::data(row, "adp is not finite"));
            }
            if !player.vor.is_finite() {
                return Err(DraftError::data(row, "vor is not finite"));
            }
            if index.insert(player.id, i).is_some() {
                return Err(DraftError::data(row, format!("duplicate player id {}", player.id.raw())));
            }
            let slot = player.position.index();
            max_projected[slot] = max_projected[slot].max(player.projected_points);
            position_totals[slot] += 1;
        }

        Ok(Self {
            players,
            index,
            max_projected,
            position_totals,
        })
    }

    /// Rebuild the ID index after deserialization.
    #[must_use]
    pub fn reindexed(mut self) -> Self {
        self.index = self
            .players
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();
        self
    }

    /// Number of players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Look up a player.
    #[must_use]
    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.index.get(&id).map(|&i| &self.players[i])
    }

    /// Whether the catalog contains a player.
    #[must_use]
    pub fn contains(&self, id: PlayerId) -> bool {
        self.index.contains_key(&id)
    }

    /// Players in input order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    /// IDs in input order.
    pub fn ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.iter().map(|p| p.id)
    }

    /// Highest projection at a position across the whole catalog.
    #[must_use]
    pub fn max_projected(&self, position: Position) -> f32 {
        self.max_projected[position.index()]
    }

    /// Number of catalog players at a position.
    #[must_use]
    pub fn position_total(&self, position: Position) -> usize {
        self.position_totals[position.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: u32, pos: Position, points: f32) -> Player {
        Player::new(PlayerId::new(id), format!("P{id}"), pos, points, id as f32, points / 2.0)
    }

    #[test]
    fn test_new_and_lookup() {
        let pool = PlayerPool::new(vec![
            player(1, Position::QB, 300.0),
            player(2, Position::RB, 250.0),
            player(3, Position::RB, 200.0),
        ])
        .unwrap();

        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get(PlayerId::new(2)).unwrap().position, Position::RB);
        assert!(pool.get(PlayerId::new(9)).is_none());
        assert_eq!(pool.max_projected(Position::RB), 250.0);
        assert_eq!(pool.position_total(Position::RB), 2);
        assert_eq!(pool.position_total(Position::TE), 0);
        assert_eq!(pool.ids().collect::<Vec<_>>(), vec![PlayerId(1), PlayerId(2), PlayerId(3)]);
    }

    #[test]
    fn test_rejects_duplicates() {
        let err = PlayerPool::new(vec![player(1, Position::QB, 1.0), player(1, Position::WR, 2.0)])
            .unwrap_err();
        assert!(matches!(err, DraftError::DataValidation { row: 2, .. }));
    }

    #[test]
    fn test_rejects_non_finite() {
        let err = PlayerPool::new(vec![player(1, Position::QB, f32::NAN)]).unwrap_err();
        assert!(matches!(err, DraftError::DataValidation { row: 1, .. }));
    }

    #[test]
    fn test_reindexed_after_serde() {
        let pool = PlayerPool::new(vec![player(5, Position::TE, 90.0)]).unwrap();
        let bytes = bincode::serialize(&pool).unwrap();
        let back: PlayerPool = bincode::deserialize::<PlayerPool>(&bytes).unwrap().reindexed();
        assert!(back.contains(PlayerId::new(5)));
    }
}
