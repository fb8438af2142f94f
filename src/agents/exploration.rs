//! Exploration schedules for value-based agents.

use serde::{Deserialize, Serialize};

use crate::core::DraftRng;
use crate::nn::{masked_argmax, masked_softmax, ActionMask};

/// Multiplicative per-episode decay with a floor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExplorationSchedule {
    pub start: f32,
    pub decay: f32,
    pub min: f32,
}

impl ExplorationSchedule {
    /// Value after `episodes` decays.
    #[must_use]
    pub fn after(&self, episodes: u32) -> f32 {
        (self.start * self.decay.powi(episodes as i32)).max(self.min)
    }

    /// One decay step from `current`.
    #[must_use]
    pub fn next(&self, current: f32) -> f32 {
        (current * self.decay).max(self.min)
    }
}

impl Default for ExplorationSchedule {
    fn default() -> Self {
        Self {
            start: 1.0,
            decay: 0.999,
            min: 0.05,
        }
    }
}

/// How a value-based agent explores while training.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Exploration {
    /// Uniform legal action with probability ε, else greedy.
    EpsilonGreedy(ExplorationSchedule),
    /// Sample from a masked Boltzmann distribution over Q-values.
    Softmax(ExplorationSchedule),
}

impl Default for Exploration {
    fn default() -> Self {
        Exploration::EpsilonGreedy(ExplorationSchedule::default())
    }
}

impl Exploration {
    /// The schedule driving this strategy.
    #[must_use]
    pub fn schedule(&self) -> ExplorationSchedule {
        match self {
            Exploration::EpsilonGreedy(s) | Exploration::Softmax(s) => *s,
        }
    }

    /// Choose a legal action given Q-values and the current ε / temperature.
    pub fn choose(&self, values: &[f32], mask: &ActionMask, level: f32, rng: &mut DraftRng) -> Option<usize> {
        match self {
            Exploration::EpsilonGreedy(_) => {
                if rng.gen_unit() < level {
                    let legal: Vec<usize> = mask.legal_indices().collect();
                    rng.choose(&legal).copied()
                } else {
                    masked_argmax(values, mask)
                }
            }
            Exploration::Softmax(_) => {
                let probs = masked_softmax(values, mask, level);
                rng.choose_weighted(&probs).or_else(|| masked_argmax(values, mask))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_decay() {
        let s = ExplorationSchedule::default();
        assert_eq!(s.after(0), 1.0);
        assert!((s.next(1.0) - 0.999).abs() < 1e-6);
        assert_eq!(s.after(100_000), 0.05);
    }

    #[test]
    fn test_epsilon_zero_is_greedy() {
        let mut rng = DraftRng::new(1);
        let mask = ActionMask([true, true, false, false, false]);
        let e = Exploration::default();
        for _ in 0..20 {
            assert_eq!(e.choose(&[0.0, 1.0, 5.0, 0.0, 0.0], &mask, 0.0, &mut rng), Some(1));
        }
    }

    #[test]
    fn test_exploration_respects_mask() {
        let mut rng = DraftRng::new(2);
        let mask = ActionMask([false, false, true, false, true]);
        for explore in [Exploration::default(), Exploration::Softmax(ExplorationSchedule::default())] {
            for _ in 0..50 {
                let a = explore.choose(&[9.0, 9.0, 0.0, 9.0, 0.0], &mask, 1.0, &mut rng).unwrap();
                assert!(mask.is_legal(a));
            }
        }
    }
}
