//! Drafting teams and per-team data storage.
//!
//! ## TeamId
//!
//! Seat identifier supporting 1-255 teams. Seats are 0-based.
//!
//! ## TeamMap
//!
//! Per-team storage backed by `Vec` for O(1) access, indexed by `TeamId`.
//!
//! ## Team
//!
//! One drafting participant: ordered roster, per-position counts, and the
//! final score once the draft ends.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

use super::player::{PlayerId, Position};

/// Team (seat) identifier supporting 1-255 teams.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub u8);

impl TeamId {
    /// Create a new team ID.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Get the seat index (0-based).
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Iterate over all team IDs for a draft with `team_count` teams.
    ///
    /// ```
    /// use draft_optimizer::core::TeamId;
    ///
    /// let teams: Vec<_> = TeamId::all(3).collect();
    /// assert_eq!(teams, vec![TeamId::new(0), TeamId::new(1), TeamId::new(2)]);
    /// ```
    pub fn all(team_count: usize) -> impl Iterator<Item = TeamId> {
        (0..team_count.min(u8::MAX as usize + 1)).map(|i| TeamId(i as u8))
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Team {}", self.0)
    }
}

/// Per-team data storage with O(1) access.
///
/// ## Example
///
/// ```
/// use draft_optimizer::core::{TeamId, TeamMap};
///
/// let mut scores: TeamMap<f32> = TeamMap::with_value(2, 0.0);
/// scores[TeamId::new(1)] += 12.5;
/// assert_eq!(scores[TeamId::new(1)], 12.5);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamMap<T> {
    data: Vec<T>,
}

impl<T> TeamMap<T> {
    /// Create a new TeamMap with values from a factory function.
    ///
    /// Callers validate `team_count` (see `DraftConfig::validate`); counts
    /// above 255 are truncated.
    pub fn new(team_count: usize, factory: impl Fn(TeamId) -> T) -> Self {
        let data = TeamId::all(team_count).map(factory).collect();
        Self { data }
    }

    /// Create a new TeamMap with all entries set to the same value.
    pub fn with_value(team_count: usize, value: T) -> Self
    where
        T: Clone,
    {
        Self::new(team_count, |_| value.clone())
    }

    /// Create a new TeamMap with default values.
    pub fn with_default(team_count: usize) -> Self
    where
        T: Default,
    {
        Self::new(team_count, |_| T::default())
    }

    /// Get the number of teams.
    #[must_use]
    pub fn team_count(&self) -> usize {
        self.data.len()
    }

    /// Get a reference to a team's data.
    #[must_use]
    pub fn get(&self, team: TeamId) -> &T {
        &self.data[team.index()]
    }

    /// Get a mutable reference to a team's data.
    pub fn get_mut(&mut self, team: TeamId) -> &mut T {
        &mut self.data[team.index()]
    }

    /// Iterate over (TeamId, &T) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (TeamId, &T)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, v)| (TeamId(i as u8), v))
    }

    /// Iterate over values in seat order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    /// Map every entry into a new TeamMap.
    pub fn map<U>(&self, f: impl Fn(TeamId, &T) -> U) -> TeamMap<U> {
        TeamMap {
            data: self.iter().map(|(id, v)| f(id, v)).collect(),
        }
    }

    /// Iterate over all team IDs.
    pub fn team_ids(&self) -> impl Iterator<Item = TeamId> {
        TeamId::all(self.data.len())
    }
}

impl<T> Index<TeamId> for TeamMap<T> {
    type Output = T;

    fn index(&self, team: TeamId) -> &Self::Output {
        self.get(team)
    }
}

impl<T> IndexMut<TeamId> for TeamMap<T> {
    fn index_mut(&mut self, team: TeamId) -> &mut Self::Output {
        self.get_mut(team)
    }
}

/// A drafting team.
///
/// Created empty at draft start and mutated only by the environment when it
/// commits a pick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    roster: Vec<PlayerId>,
    position_counts: [u8; Position::COUNT],
    /// Best-lineup score, set when the draft finishes.
    pub score: Option<f32>,
}

impl Team {
    /// Create an empty team.
    #[must_use]
    pub fn new(id: TeamId) -> Self {
        Self {
            id,
            roster: Vec::new(),
            position_counts: [0; Position::COUNT],
            score: None,
        }
    }

    /// Drafted players in pick order.
    #[must_use]
    pub fn roster(&self) -> &[PlayerId] {
        &self.roster
    }

    /// Number of drafted players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roster.len()
    }

    /// Whether no player has been drafted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// Number of drafted players at a position.
    #[must_use]
    pub fn count(&self, position: Position) -> u8 {
        self.position_counts[position.index()]
    }

    /// Counts for all positions in `Position::index` order.
    #[must_use]
    pub fn position_counts(&self) -> [u8; Position::COUNT] {
        self.position_counts
    }

    /// Whether the roster holds `rounds` players.
    #[must_use]
    pub fn is_full(&self, rounds: usize) -> bool {
        self.roster.len() >= rounds
    }

    /// Whether the roster contains a player.
    #[must_use]
    pub fn contains(&self, player: PlayerId) -> bool {
        self.roster.contains(&player)
    }

    pub(crate) fn push(&mut self, player: PlayerId, position: Position) {
        self.roster.push(player);
        let count = &mut self.position_counts[position.index()];
        *count = count.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_id_basics() {
        let t = TeamId::new(2);
        assert_eq!(t.index(), 2);
        assert_eq!(t.to_string(), "Team 2");
        assert_eq!(TeamId::all(4).count(), 4);
    }

    #[test]
    fn test_team_map_new() {
        let map: TeamMap<usize> = TeamMap::new(3, |t| t.index() * 10);
        assert_eq!(map[TeamId::new(0)], 0);
        assert_eq!(map[TeamId::new(2)], 20);
        assert_eq!(map.team_count(), 3);
    }

    #[test]
    fn test_team_map_mutation_and_map() {
        let mut map: TeamMap<i32> = TeamMap::with_value(2, 1);
        map[TeamId::new(1)] = 5;

        let doubled = map.map(|_, v| v * 2);
        assert_eq!(doubled[TeamId::new(0)], 2);
        assert_eq!(doubled[TeamId::new(1)], 10);

        let pairs: Vec<_> = map.iter().collect();
        assert_eq!(pairs, vec![(TeamId::new(0), &1), (TeamId::new(1), &5)]);
    }

    #[test]
    fn test_team_map_serialization() {
        let map: TeamMap<f32> = TeamMap::new(2, |t| t.index() as f32 + 0.5);
        let json = serde_json::to_string(&map).unwrap();
        let back: TeamMap<f32> = serde_json::from_str(&json).unwrap();
        assert_eq!(map, back);
    }

    #[test]
    fn test_team_push() {
        let mut team = Team::new(TeamId::new(0));
        assert!(team.is_empty());

        team.push(PlayerId::new(10), Position::RB);
        team.push(PlayerId::new(11), Position::RB);
        team.push(PlayerId::new(12), Position::QB);

        assert_eq!(team.len(), 3);
        assert_eq!(team.count(Position::RB), 2);
        assert_eq!(team.count(Position::QB), 1);
        assert_eq!(team.count(Position::TE), 0);
        assert_eq!(team.roster(), &[PlayerId::new(10), PlayerId::new(11), PlayerId::new(12)]);
        assert!(team.contains(PlayerId::new(11)));
        assert!(team.is_full(3));
        assert!(!team.is_full(4));
    }
}
