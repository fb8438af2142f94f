//! Transitions, replay storage, and on-policy rollouts.
//!
//! - `Transition`: one team's (observation, action, reward, next observation,
//!   done) tuple, the unit every learning agent consumes
//! - `ReplayBuffer`: bounded FIFO of transitions with uniform sampling
//! - `Rollout`: on-policy steps with the log-probabilities and value
//!   estimates recorded at acting time
//! - `discounted_returns` / `gae`: return and advantage estimators

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::{DraftRng, PlayerId};
use crate::nn::{ActionMask, Observation};

/// One completed decision for one team.
///
/// `next_observation` is the team's view at its next turn (or at the end of
/// the draft when `done`), so opponents' picks in between are part of the
/// environment dynamics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub observation: Observation,
    /// Legal categories when the action was taken.
    pub legal: ActionMask,
    /// Category index of the drafted player.
    pub action: usize,
    /// The concrete player drafted.
    pub player: PlayerId,
    pub reward: f32,
    pub next_observation: Observation,
    /// Legal categories at the next decision (all false when `done`).
    pub next_legal: ActionMask,
    pub done: bool,
}

/// Bounded FIFO replay memory.
///
/// When full, the oldest transition is evicted.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    transitions: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayBuffer {
    /// Create a buffer holding at most `capacity` transitions.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            transitions: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a transition, evicting the oldest if full.
    pub fn push(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.transitions.len() >= self.capacity {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    /// Number of stored transitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Maximum capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.transitions.clear();
    }

    /// Drop up to `n` of the most recently pushed transitions.
    pub fn truncate_back(&mut self, n: usize) {
        let keep = self.transitions.len().saturating_sub(n);
        self.transitions.truncate(keep);
    }

    /// Sample up to `batch_size` distinct transitions uniformly.
    pub fn sample(&self, batch_size: usize, rng: &mut DraftRng) -> Vec<&Transition> {
        let n = self.transitions.len();
        if n == 0 || batch_size == 0 {
            return Vec::new();
        }

        // Partial Fisher-Yates over indices
        let mut indices: Vec<usize> = (0..n).collect();
        let limit = batch_size.min(n);
        for i in 0..limit {
            let j = i + rng.gen_range_usize(0..n - i);
            indices.swap(i, j);
        }

        indices
            .into_iter()
            .take(limit)
            .map(|i| &self.transitions[i])
            .collect()
    }
}

impl Default for ReplayBuffer {
    fn default() -> Self {
        Self::new(2400)
    }
}

/// One on-policy step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RolloutStep {
    pub observation: Observation,
    pub mask: ActionMask,
    pub action: usize,
    pub reward: f32,
    /// Log-probability of `action` under the acting policy.
    pub log_prob: f32,
    /// Value estimate at acting time.
    pub value: f32,
    pub done: bool,
}

/// Ordered on-policy steps, possibly spanning several episodes.
#[derive(Clone, Debug, Default)]
pub struct Rollout {
    steps: Vec<RolloutStep>,
}

impl Rollout {
    /// Create an empty rollout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn push(&mut self, step: RolloutStep) {
        self.steps.push(step);
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the rollout is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// All steps.
    #[must_use]
    pub fn steps(&self) -> &[RolloutStep] {
        &self.steps
    }

    /// Number of finished episodes contained.
    #[must_use]
    pub fn completed_episodes(&self) -> usize {
        self.steps.iter().filter(|s| s.done).count()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// Drop steps after the last finished episode.
    pub fn truncate_to_completed(&mut self) {
        let keep = self.steps.iter().rposition(|s| s.done).map_or(0, |i| i + 1);
        self.steps.truncate(keep);
    }

    /// Monte-Carlo returns, reset at episode boundaries.
    #[must_use]
    pub fn returns(&self, gamma: f32) -> Vec<f32> {
        let rewards: Vec<f32> = self.steps.iter().map(|s| s.reward).collect();
        let dones: Vec<bool> = self.steps.iter().map(|s| s.done).collect();
        discounted_returns(&rewards, &dones, gamma)
    }

    /// GAE(λ) advantages and value targets (`advantage + value`).
    #[must_use]
    pub fn advantages(&self, gamma: f32, lambda: f32) -> (Vec<f32>, Vec<f32>) {
        let rewards: Vec<f32> = self.steps.iter().map(|s| s.reward).collect();
        let values: Vec<f32> = self.steps.iter().map(|s| s.value).collect();
        let dones: Vec<bool> = self.steps.iter().map(|s| s.done).collect();
        let advantages = gae(&rewards, &values, &dones, gamma, lambda, 0.0);
        let targets = advantages.iter().zip(&values).map(|(a, v)| a + v).collect();
        (advantages, targets)
    }
}

/// Discounted cumulative rewards, restarting after each `done`.
#[must_use]
pub fn discounted_returns(rewards: &[f32], dones: &[bool], gamma: f32) -> Vec<f32> {
    let mut returns = vec![0.0; rewards.len()];
    let mut running = 0.0;
    for i in (0..rewards.len()).rev() {
        if dones.get(i).copied().unwrap_or(false) {
            running = 0.0;
        }
        running = rewards[i] + gamma * running;
        returns[i] = running;
    }
    returns
}

/// Generalized advantage estimation.
///
/// `next_value` bootstraps the final step when it is not terminal.
#[must_use]
pub fn gae(rewards: &[f32], values: &[f32], dones: &[bool], gamma: f32, lambda: f32, next_value: f32) -> Vec<f32> {
    let n = rewards.len();
    let mut advantages = vec![0.0; n];
    let mut running = 0.0;

    for i in (0..n).rev() {
        let done = dones.get(i).copied().unwrap_or(false);
        let not_done = if done { 0.0 } else { 1.0 };
        let next = if i + 1 < n { values[i + 1] } else { next_value };

        // delta = r + gamma * V(s') - V(s)
        let delta = rewards[i] + gamma * next * not_done - values[i];
        running = delta + gamma * lambda * not_done * running;
        advantages[i] = running;
    }
    advantages
}

/// Normalize to zero mean and unit variance in place.
pub fn normalize(values: &mut [f32]) {
    if values.len() < 2 {
        return;
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    let std = var.sqrt().max(1e-8);
    for v in values.iter_mut() {
        *v = (*v - mean) / std;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(reward: f32) -> Transition {
        Transition {
            observation: Observation::zeros(vec![4]),
            legal: ActionMask::all(),
            action: 0,
            player: PlayerId::new(1),
            reward,
            next_observation: Observation::zeros(vec![4]),
            next_legal: ActionMask::all(),
            done: false,
        }
    }

    fn step(reward: f32, value: f32, done: bool) -> RolloutStep {
        RolloutStep {
            observation: Observation::zeros(vec![2]),
            mask: ActionMask::all(),
            action: 0,
            reward,
            log_prob: 0.0,
            value,
            done,
        }
    }

    #[test]
    fn test_replay_capacity() {
        let mut buffer = ReplayBuffer::new(3);
        for r in 0..4 {
            buffer.push(transition(r as f32));
        }
        assert_eq!(buffer.len(), 3);

        let mut rng = DraftRng::new(0);
        let rewards: Vec<f32> = buffer.sample(10, &mut rng).iter().map(|t| t.reward).collect();
        assert_eq!(rewards.len(), 3);
        assert!(!rewards.contains(&0.0));
    }

    #[test]
    fn test_truncate_back_keeps_oldest() {
        let mut buffer = ReplayBuffer::new(10);
        for r in 0..5 {
            buffer.push(transition(r as f32));
        }
        buffer.truncate_back(2);
        assert_eq!(buffer.len(), 3);
        let mut rng = DraftRng::new(0);
        let mut rewards: Vec<i32> = buffer.sample(10, &mut rng).iter().map(|t| t.reward as i32).collect();
        rewards.sort_unstable();
        assert_eq!(rewards, vec![0, 1, 2]);

        buffer.truncate_back(7);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_sample_distinct() {
        let mut buffer = ReplayBuffer::new(50);
        for r in 0..50 {
            buffer.push(transition(r as f32));
        }
        let mut rng = DraftRng::new(1);
        let mut rewards: Vec<i32> = buffer.sample(20, &mut rng).iter().map(|t| t.reward as i32).collect();
        rewards.sort_unstable();
        rewards.dedup();
        assert_eq!(rewards.len(), 20);
    }

    #[test]
    fn test_discounted_returns_reset_at_done() {
        let returns = discounted_returns(&[1.0, 1.0, 2.0, 3.0], &[false, true, false, true], 0.5);
        assert_eq!(returns, vec![1.5, 1.0, 3.5, 3.0]);
    }

    #[test]
    fn test_gae_lambda_one_matches_mc_advantage() {
        let rewards = [0.0, 0.0, 1.0];
        let values = [0.2, 0.4, 0.6];
        let dones = [false, false, true];
        let adv = gae(&rewards, &values, &dones, 0.9, 1.0, 0.0);
        let returns = discounted_returns(&rewards, &dones, 0.9);
        for i in 0..3 {
            assert!((adv[i] - (returns[i] - values[i])).abs() < 1e-6);
        }
    }

    #[test]
    fn test_gae_lambda_zero_is_td_error() {
        let adv = gae(&[1.0, 2.0], &[0.5, 0.5], &[false, true], 1.0, 0.0, 0.0);
        assert!((adv[0] - (1.0 + 0.5 - 0.5)).abs() < 1e-6);
        assert!((adv[1] - (2.0 - 0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_rollout_helpers() {
        let mut rollout = Rollout::new();
        rollout.push(step(0.0, 0.0, false));
        rollout.push(step(1.0, 0.0, true));
        rollout.push(step(5.0, 0.0, false));
        assert_eq!(rollout.completed_episodes(), 1);

        rollout.truncate_to_completed();
        assert_eq!(rollout.len(), 2);
        assert_eq!(rollout.returns(1.0), vec![1.0, 1.0]);

        let (adv, targets) = rollout.advantages(1.0, 1.0);
        assert_eq!(adv, targets);
    }

    #[test]
    fn test_normalize() {
        let mut v = vec![1.0, 2.0, 3.0];
        normalize(&mut v);
        assert!(v.iter().sum::<f32>().abs() < 1e-6);
        assert!(v[2] > 0.0 && v[0] < 0.0);
    }
}
