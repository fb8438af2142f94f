//! Lineup scoring and reward schemes.
//!
//! A team's score is the projected points of its best legal starting
//! lineup: dedicated slots first (best players at each position), then FLEX
//! slots from the best remaining eligible players. Bench players score zero.
//!
//! Filling dedicated slots greedily and then FLEX from the leftovers is
//! optimal: any FLEX-eligible player displaced from a dedicated slot could
//! only move to FLEX, where the greedy pass already considers them.

use serde::{Deserialize, Serialize};

use crate::core::{Player, PlayerId, RewardConfig, RosterConfig};
use crate::pool::PlayerPool;

/// A team's best starting lineup.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Lineup {
    pub starters: Vec<PlayerId>,
    pub points: f32,
}

impl Lineup {
    /// Whether a player starts in this lineup.
    #[must_use]
    pub fn starts(&self, player: PlayerId) -> bool {
        self.starters.contains(&player)
    }
}

/// Compute the best starting lineup from a roster.
///
/// Unknown IDs are ignored.
#[must_use]
pub fn best_lineup(pool: &PlayerPool, roster: &[PlayerId], config: &RosterConfig) -> Lineup {
    let mut players: Vec<&Player> = roster.iter().filter_map(|id| pool.get(*id)).collect();
    players.sort_by(|a, b| a.rank_cmp(b));

    let mut open = config.starters;
    let mut lineup = Lineup::default();
    let mut bench: Vec<&Player> = Vec::new();

    for player in players {
        let slot = &mut open[player.position.index()];
        if *slot > 0 {
            *slot -= 1;
            lineup.starters.push(player.id);
            lineup.points += player.projected_points;
        } else {
            bench.push(player);
        }
    }

    // `bench` is still in rank order
    let flex = bench
        .into_iter()
        .filter(|p| config.is_flex_eligible(p.position))
        .take(config.flex_slots as usize);
    for player in flex {
        lineup.starters.push(player.id);
        lineup.points += player.projected_points;
    }

    lineup
}

/// Which rewards an agent receives from the environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewardScheme {
    /// Zero until the draft ends, then the scaled final score.
    TerminalOnly,
    /// Per-pick VOR shaping plus the scaled final score.
    #[default]
    Shaped,
}

impl RewardScheme {
    /// Combine the canonical reward components for this scheme.
    #[must_use]
    pub fn combine(self, shaping: f32, terminal: f32) -> f32 {
        match self {
            RewardScheme::TerminalOnly => terminal,
            RewardScheme::Shaped => shaping + terminal,
        }
    }
}

/// Shaping reward for a pick: scaled positive VOR if the drafted player made
/// the team's best lineup, zero otherwise.
#[must_use]
pub fn shaping_reward(player: &Player, lineup_after: &Lineup, reward: &RewardConfig) -> f32 {
    if lineup_after.starts(player.id) {
        reward.vor_scale * player.vor.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Position;

    fn pool() -> PlayerPool {
        let players = vec![
            Player::new(PlayerId(1), "QB1", Position::QB, 300.0, 1.0, 50.0),
            Player::new(PlayerId(2), "QB2", Position::QB, 280.0, 2.0, 30.0),
            Player::new(PlayerId(3), "RB1", Position::RB, 250.0, 3.0, 60.0),
            Player::new(PlayerId(4), "RB2", Position::RB, 200.0, 4.0, 20.0),
            Player::new(PlayerId(5), "RB3", Position::RB, 190.0, 5.0, 10.0),
            Player::new(PlayerId(6), "WR1", Position::WR, 240.0, 6.0, 40.0),
            Player::new(PlayerId(7), "TE1", Position::TE, 150.0, 7.0, -5.0),
            Player::new(PlayerId(8), "K1", Position::Other, 130.0, 8.0, 5.0),
        ];
        PlayerPool::new(players).unwrap()
    }

    fn roster_config() -> RosterConfig {
        RosterConfig::default()
            .with_starters([1, 1, 1, 1, 0])
            .with_flex(1, vec![Position::RB, Position::WR, Position::TE])
    }

    #[test]
    fn test_best_lineup_uses_flex() {
        let pool = pool();
        let roster: Vec<_> = (1..=8).map(PlayerId).collect();
        let lineup = best_lineup(&pool, &roster, &roster_config());

        // QB1, RB1, WR1, TE1 + FLEX RB2. QB2, RB3, K1 sit.
        assert_eq!(lineup.starters.len(), 5);
        assert!(lineup.starts(PlayerId(4)));
        assert!(!lineup.starts(PlayerId(2)));
        assert!(!lineup.starts(PlayerId(8)));
        assert_eq!(lineup.points, 300.0 + 250.0 + 240.0 + 150.0 + 200.0);
    }

    #[test]
    fn test_partial_roster() {
        let pool = pool();
        let lineup = best_lineup(&pool, &[PlayerId(4), PlayerId(3)], &roster_config());
        assert_eq!(lineup.points, 450.0);
        assert_eq!(lineup.starters, vec![PlayerId(3), PlayerId(4)]);
    }

    #[test]
    fn test_shaping_reward() {
        let pool = pool();
        let reward = RewardConfig {
            terminal_scale: 0.01,
            vor_scale: 0.1,
        };
        let lineup = best_lineup(&pool, &[PlayerId(1), PlayerId(7)], &roster_config());

        let qb = pool.get(PlayerId(1)).unwrap();
        assert!((shaping_reward(qb, &lineup, &reward) - 5.0).abs() < 1e-6);

        // Negative VOR clamps to zero
        let te = pool.get(PlayerId(7)).unwrap();
        assert_eq!(shaping_reward(te, &lineup, &reward), 0.0);

        // Bench player gets nothing
        let qb2 = pool.get(PlayerId(2)).unwrap();
        assert_eq!(shaping_reward(qb2, &lineup, &reward), 0.0);
    }

    #[test]
    fn test_reward_scheme() {
        assert_eq!(RewardScheme::TerminalOnly.combine(0.5, 2.0), 2.0);
        assert_eq!(RewardScheme::Shaped.combine(0.5, 2.0), 2.5);
    }
}
