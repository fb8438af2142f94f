//! Draftable players and their positions.
//!
//! ## PlayerId
//!
//! Stable identifier from the pool input. Unique within a pool.
//!
//! ## Position
//!
//! Five position categories. The category index doubles as the action index
//! for the learning agents (see `nn::ActionMask`).

use serde::{Deserialize, Serialize};

/// Player identifier, unique within a `PlayerPool`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// Create a new player ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Player#{}", self.0)
    }
}

/// Position category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    /// Kickers, defenses, and anything else the pool carries.
    Other,
}

impl Position {
    /// Number of position categories.
    pub const COUNT: usize = 5;

    /// All categories in index order.
    pub const ALL: [Position; Position::COUNT] =
        [Position::QB, Position::RB, Position::WR, Position::TE, Position::Other];

    /// Category index in `0..Position::COUNT`.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Position::QB => 0,
            Position::RB => 1,
            Position::WR => 2,
            Position::TE => 3,
            Position::Other => 4,
        }
    }

    /// Inverse of [`Position::index`].
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Parse a position label as it appears in draft boards.
    ///
    /// Trailing rank digits ("WR12") are ignored. Empty labels are rejected;
    /// unrecognized non-empty labels ("K", "DST") map to `Other`.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        let trimmed = label
            .trim()
            .trim_end_matches(|c: char| c.is_ascii_digit())
            .to_ascii_uppercase();
        match trimmed.as_str() {
            "" => None,
            "QB" => Some(Position::QB),
            "RB" | "HB" => Some(Position::RB),
            "WR" => Some(Position::WR),
            "TE" => Some(Position::TE),
            _ => Some(Position::Other),
        }
    }

    /// Short label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
            Position::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A draftable player with static projections.
///
/// Immutable once its pool is constructed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    /// Season-long projected fantasy points.
    pub projected_points: f32,
    /// Average draft position (lower = drafted earlier).
    pub adp: f32,
    /// Value over a replacement-level player at the same position.
    pub vor: f32,
}

impl Player {
    /// Create a player with the given projections.
    pub fn new(
        id: PlayerId,
        name: impl Into<String>,
        position: Position,
        projected_points: f32,
        adp: f32,
        vor: f32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            projected_points,
            adp,
            vor,
        }
    }

    /// Ordering used to resolve "best player" ties: projection descending,
    /// then ADP ascending, then ID ascending.
    #[must_use]
    pub fn rank_cmp(&self, other: &Player) -> std::cmp::Ordering {
        other
            .projected_points
            .total_cmp(&self.projected_points)
            .then(self.adp.total_cmp(&other.adp))
            .then(self.id.cmp(&other.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_index_round_trip() {
        for (i, pos) in Position::ALL.iter().enumerate() {
            assert_eq!(pos.index(), i);
            assert_eq!(Position::from_index(i), Some(*pos));
        }
        assert_eq!(Position::from_index(Position::COUNT), None);
    }

    #[test]
    fn test_position_parse() {
        assert_eq!(Position::parse("QB"), Some(Position::QB));
        assert_eq!(Position::parse(" wr12 "), Some(Position::WR));
        assert_eq!(Position::parse("TE1"), Some(Position::TE));
        assert_eq!(Position::parse("DST"), Some(Position::Other));
        assert_eq!(Position::parse(""), None);
        assert_eq!(Position::parse("  "), None);
    }

    #[test]
    fn test_rank_cmp() {
        let a = Player::new(PlayerId(1), "A", Position::RB, 200.0, 10.0, 50.0);
        let b = Player::new(PlayerId(2), "B", Position::RB, 180.0, 5.0, 40.0);
        let c = Player::new(PlayerId(3), "C", Position::RB, 200.0, 8.0, 50.0);

        let mut players = vec![b.clone(), a.clone(), c.clone()];
        players.sort_by(|x, y| x.rank_cmp(y));

        // Equal projection: lower ADP first
        assert_eq!(players[0].id, c.id);
        assert_eq!(players[1].id, a.id);
        assert_eq!(players[2].id, b.id);
    }

    #[test]
    fn test_display() {
        assert_eq!(PlayerId(4).to_string(), "Player#4");
        assert_eq!(Position::Other.to_string(), "OTHER");
    }
}
