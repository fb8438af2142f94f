//! Draft configuration types.
//!
//! A run configures the environment at startup by providing:
//! - `RosterConfig`: positional caps and the starting lineup shape
//! - `RewardConfig`: terminal and shaping reward scales
//! - `DraftConfig`: team count, rounds, pick order, plus the two above
//!
//! All configs are plain values passed into constructors. Nothing here is
//! global.

use serde::{Deserialize, Serialize};

use super::error::{DraftError, Result};
use super::player::Position;

/// How the pick order progresses between rounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickOrderKind {
    /// Direction reverses at every round boundary.
    #[default]
    Snake,
    /// Every round uses the same seat order.
    Linear,
}

/// Roster constraints and the starting lineup used for scoring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Hard cap per position, indexed by `Position::index`.
    pub caps: [u8; Position::COUNT],
    /// Dedicated starter slots per position.
    pub starters: [u8; Position::COUNT],
    /// Number of FLEX starter slots.
    pub flex_slots: u8,
    /// Positions eligible for a FLEX slot.
    pub flex_positions: Vec<Position>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            caps: [3, 7, 8, 3, 2],
            starters: [1, 2, 3, 1, 0],
            flex_slots: 1,
            flex_positions: vec![Position::RB, Position::WR, Position::TE],
        }
    }
}

impl RosterConfig {
    /// Cap for a position.
    #[must_use]
    pub fn cap(&self, position: Position) -> u8 {
        self.caps[position.index()]
    }

    /// Dedicated starter slots for a position.
    #[must_use]
    pub fn starter_slots(&self, position: Position) -> u8 {
        self.starters[position.index()]
    }

    /// Total starting lineup size including FLEX.
    #[must_use]
    pub fn lineup_size(&self) -> usize {
        self.starters.iter().map(|&s| s as usize).sum::<usize>() + self.flex_slots as usize
    }

    /// Whether a position may fill a FLEX slot.
    #[must_use]
    pub fn is_flex_eligible(&self, position: Position) -> bool {
        self.flex_positions.contains(&position)
    }

    /// Set the cap for one position.
    #[must_use]
    pub fn with_cap(mut self, position: Position, cap: u8) -> Self {
        self.caps[position.index()] = cap;
        self
    }

    /// Set all caps at once.
    #[must_use]
    pub fn with_caps(mut self, caps: [u8; Position::COUNT]) -> Self {
        self.caps = caps;
        self
    }

    /// Set dedicated starter slots.
    #[must_use]
    pub fn with_starters(mut self, starters: [u8; Position::COUNT]) -> Self {
        self.starters = starters;
        self
    }

    /// Set FLEX slots and eligibility.
    #[must_use]
    pub fn with_flex(mut self, slots: u8, positions: Vec<Position>) -> Self {
        self.flex_slots = slots;
        self.flex_positions = positions;
        self
    }
}

/// Reward scales applied by the environment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Multiplier on final lineup points for the terminal reward.
    pub terminal_scale: f32,
    /// Multiplier on a drafted starter's positive VOR for the shaping reward.
    pub vor_scale: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            terminal_scale: 0.01,
            vor_scale: 0.01,
        }
    }
}

/// Complete draft configuration.
///
/// ## Example
///
/// ```
/// use draft_optimizer::core::{DraftConfig, PickOrderKind};
///
/// let config = DraftConfig::new(2, 3).with_pick_order(PickOrderKind::Snake);
/// assert!(config.validate().is_err()); // default lineup needs 8 starters
///
/// let config = DraftConfig::new(2, 16);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.total_picks(), 32);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftConfig {
    /// Number of drafting seats.
    pub team_count: usize,
    /// Picks per team.
    pub rounds: usize,
    /// Snake or linear progression.
    pub pick_order: PickOrderKind,
    pub roster: RosterConfig,
    pub reward: RewardConfig,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self::new(10, 20)
    }
}

impl DraftConfig {
    /// Create a configuration with default roster and reward settings.
    #[must_use]
    pub fn new(team_count: usize, rounds: usize) -> Self {
        Self {
            team_count,
            rounds,
            pick_order: PickOrderKind::Snake,
            roster: RosterConfig::default(),
            reward: RewardConfig::default(),
        }
    }

    /// Set the pick order kind.
    #[must_use]
    pub fn with_pick_order(mut self, kind: PickOrderKind) -> Self {
        self.pick_order = kind;
        self
    }

    /// Set the roster configuration.
    #[must_use]
    pub fn with_roster(mut self, roster: RosterConfig) -> Self {
        self.roster = roster;
        self
    }

    /// Set the reward configuration.
    #[must_use]
    pub fn with_reward(mut self, reward: RewardConfig) -> Self {
        self.reward = reward;
        self
    }

    /// Total picks in a full draft.
    #[must_use]
    pub fn total_picks(&self) -> usize {
        self.team_count * self.rounds
    }

    /// Check the configuration before any episode runs.
    pub fn validate(&self) -> Result<()> {
        if self.team_count == 0 {
            return Err(DraftError::config("team_count must be at least 1"));
        }
        if self.team_count > u8::MAX as usize {
            return Err(DraftError::config(format!(
                "team_count {} exceeds the maximum of {}",
                self.team_count,
                u8::MAX
            )));
        }
        if self.rounds == 0 {
            return Err(DraftError::config("rounds must be at least 1"));
        }
        let lineup = self.roster.lineup_size();
        if lineup > self.rounds {
            return Err(DraftError::config(format!(
                "starting lineup needs {lineup} players but teams only draft {}",
                self.rounds
            )));
        }
        if !self.reward.terminal_scale.is_finite() || !self.reward.vor_scale.is_finite() {
            return Err(DraftError::config("reward scales must be finite"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roster() {
        let roster = RosterConfig::default();
        assert_eq!(roster.cap(Position::RB), 7);
        assert_eq!(roster.cap(Position::Other), 2);
        assert_eq!(roster.lineup_size(), 8);
        assert!(roster.is_flex_eligible(Position::TE));
        assert!(!roster.is_flex_eligible(Position::QB));
    }

    #[test]
    fn test_validate() {
        assert!(DraftConfig::default().validate().is_ok());
        assert!(DraftConfig::new(0, 20).validate().is_err());
        assert!(DraftConfig::new(256, 20).validate().is_err());
        assert!(DraftConfig::new(4, 0).validate().is_err());

        let tiny = DraftConfig::new(2, 3).with_roster(
            RosterConfig::default()
                .with_starters([1, 1, 1, 0, 0])
                .with_flex(0, Vec::new()),
        );
        assert!(tiny.validate().is_ok());
    }

    #[test]
    fn test_pick_order_kind_serde() {
        let json = serde_json::to_string(&PickOrderKind::Linear).unwrap();
        assert_eq!(json, "\"linear\"");
        assert_eq!(PickOrderKind::default(), PickOrderKind::Snake);
    }
}
