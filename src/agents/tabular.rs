//! Tabular Q-learning over the self-only observation.
//!
//! The table maps a discretized roster state (position counts plus rounds
//! remaining) and a position category to an expected-return estimate.
//! Updates use the one-step TD rule:
//!
//! ```text
//! Q(s, a) += α · (r + γ · max_a' Q(s', a') − Q(s, a))
//! ```
//!
//! with the max taken over legal categories only and zero at terminal
//! transitions. Rewards are terminal-only.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::exploration::{Exploration, ExplorationSchedule};
use super::persistence::{PolicySnapshot, DEFAULT_POLICY_VERSION};
use super::{resolve_category, Agent, AgentInput, AgentKind, LearnSchedule, LearnStats};
use crate::core::{DraftRng, PlayerId, Result};
use crate::nn::{masked_argmax, masked_max, EncodeScope, Observation, ACTION_SPACE};
use crate::rules::RewardScheme;
use crate::training::Transition;

/// Discretized observation used as a table key.
pub type StateKey = SmallVec<[u8; 8]>;

/// Tabular Q-learning hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabularQConfig {
    /// α in the TD update.
    pub learning_rate: f32,
    /// γ in the TD target.
    pub discount: f32,
    /// ε-greedy schedule, decayed once per episode.
    pub epsilon: ExplorationSchedule,
}

impl Default for TabularQConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.2,
            discount: 0.9,
            epsilon: ExplorationSchedule::default(),
        }
    }
}

impl TabularQConfig {
    /// Set α.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set γ.
    #[must_use]
    pub fn with_discount(mut self, discount: f32) -> Self {
        self.discount = discount;
        self
    }

    /// Set the ε schedule.
    #[must_use]
    pub fn with_epsilon(mut self, epsilon: ExplorationSchedule) -> Self {
        self.epsilon = epsilon;
        self
    }
}

#[derive(Serialize, Deserialize)]
struct TabularParams {
    table: FxHashMap<StateKey, [f32; ACTION_SPACE]>,
    epsilon: f32,
}

/// Q-table agent.
pub struct TabularQAgent {
    config: TabularQConfig,
    table: FxHashMap<StateKey, [f32; ACTION_SPACE]>,
    epsilon: f32,
    training: bool,
    rng: DraftRng,
    version: String,
    pending: Vec<Transition>,
}

impl TabularQAgent {
    /// Create an agent with an empty table.
    #[must_use]
    pub fn new(config: TabularQConfig, seed: u64) -> Self {
        let epsilon = config.epsilon.start;
        Self {
            config,
            table: FxHashMap::default(),
            epsilon,
            training: true,
            rng: DraftRng::new(seed),
            version: DEFAULT_POLICY_VERSION.to_string(),
            pending: Vec::new(),
        }
    }

    /// Tag saved and expected policies with a version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Current ε.
    #[must_use]
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Number of visited states.
    #[must_use]
    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// Q-values for an observation, if the state has been visited.
    #[must_use]
    pub fn q_values(&self, observation: &Observation) -> Option<[f32; ACTION_SPACE]> {
        self.table.get(&state_key(observation)).copied()
    }

    fn td_update(&mut self, t: &Transition) -> f32 {
        let next = if t.done {
            0.0
        } else {
            self.table
                .get(&state_key(&t.next_observation))
                .map_or(0.0, |q| masked_max(q, &t.next_legal))
        };
        let target = t.reward + self.config.discount * next;

        let q = self
            .table
            .entry(state_key(&t.observation))
            .or_insert([0.0; ACTION_SPACE]);
        let error = target - q[t.action];
        q[t.action] += self.config.learning_rate * error;
        error * error
    }
}

/// Discretize a self-only observation into a table key.
#[must_use]
pub fn state_key(observation: &Observation) -> StateKey {
    observation
        .tensor
        .iter()
        .map(|v| v.round().clamp(0.0, f32::from(u8::MAX)) as u8)
        .collect()
}

impl Agent for TabularQAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::TabularQ
    }

    fn scope(&self) -> EncodeScope {
        EncodeScope::SelfOnly
    }

    fn reward_scheme(&self) -> RewardScheme {
        RewardScheme::TerminalOnly
    }

    fn learn_schedule(&self) -> LearnSchedule {
        LearnSchedule::PerStep
    }

    fn select_action(&mut self, input: &AgentInput<'_>) -> Result<PlayerId> {
        let mask = input.mask();
        let values = self
            .table
            .get(&state_key(input.observation))
            .copied()
            .unwrap_or([0.0; ACTION_SPACE]);

        let action = if self.training {
            Exploration::EpsilonGreedy(self.config.epsilon).choose(&values, &mask, self.epsilon, &mut self.rng)
        } else {
            masked_argmax(&values, &mask)
        };
        resolve_category(input.legal, action.unwrap_or(ACTION_SPACE))
    }

    fn observe_transition(&mut self, transition: Transition) {
        if self.training {
            self.pending.push(transition);
        }
    }

    fn learn(&mut self) -> Option<LearnStats> {
        if !self.training || self.pending.is_empty() {
            return None;
        }
        let batch = std::mem::take(&mut self.pending);
        let total: f32 = batch.iter().map(|t| self.td_update(t)).sum();
        Some(LearnStats {
            loss: total / batch.len() as f32,
            samples: batch.len(),
        })
    }

    fn end_episode(&mut self) {
        if self.training {
            self.epsilon = self.config.epsilon.next(self.epsilon);
        }
    }

    fn abort_episode(&mut self) {
        self.pending.clear();
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn save_policy(&self) -> Result<PolicySnapshot> {
        let params = TabularParams {
            table: self.table.clone(),
            epsilon: self.epsilon,
        };
        PolicySnapshot::encode(self.kind(), self.version.clone(), &params)
    }

    fn load_policy(&mut self, snapshot: &PolicySnapshot) -> Result<()> {
        let params: TabularParams = snapshot.decode(self.kind(), &self.version)?;
        self.table = params.table;
        self.epsilon = params.epsilon;
        self.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::ActionMask;

    fn obs(values: &[f32]) -> Observation {
        Observation::flat(values.to_vec())
    }

    fn transition(state: &[f32], action: usize, reward: f32, next: &[f32], done: bool) -> Transition {
        Transition {
            observation: obs(state),
            legal: ActionMask::all(),
            action,
            player: PlayerId::new(0),
            reward,
            next_observation: obs(next),
            next_legal: if done { ActionMask::default() } else { ActionMask::all() },
            done,
        }
    }

    #[test]
    fn test_state_key() {
        let key = state_key(&obs(&[0.0, 2.0, 1.0, 0.0, 0.0, 13.0]));
        assert_eq!(key.as_slice(), &[0, 2, 1, 0, 0, 13]);
    }

    #[test]
    fn test_td_update_terminal() {
        let mut agent = TabularQAgent::new(TabularQConfig::default(), 0);
        agent.observe_transition(transition(&[0.0, 1.0], 2, 10.0, &[0.0, 0.0], true));
        let stats = agent.learn().unwrap();
        assert_eq!(stats.samples, 1);

        let q = agent.q_values(&obs(&[0.0, 1.0])).unwrap();
        assert!((q[2] - 2.0).abs() < 1e-6); // 0.2 * 10
        assert!(agent.learn().is_none());
    }

    #[test]
    fn test_td_update_bootstraps_on_legal_max() {
        let mut agent = TabularQAgent::new(TabularQConfig::default().with_learning_rate(1.0), 0);
        agent.table.insert(state_key(&obs(&[1.0])), [5.0, 100.0, 0.0, 0.0, 0.0]);

        let mut t = transition(&[0.0], 0, 1.0, &[1.0], false);
        // Category 1 is illegal next turn, so its 100 must not leak in
        t.next_legal = ActionMask([true, false, false, false, false]);
        agent.observe_transition(t);
        agent.learn();

        let q = agent.q_values(&obs(&[0.0])).unwrap();
        assert!((q[0] - (1.0 + 0.9 * 5.0)).abs() < 1e-5);
    }

    #[test]
    fn test_epsilon_decays_per_episode() {
        let mut agent = TabularQAgent::new(TabularQConfig::default(), 0);
        agent.end_episode();
        assert!((agent.epsilon() - 0.999).abs() < 1e-6);

        agent.set_training(false);
        agent.end_episode();
        assert!((agent.epsilon() - 0.999).abs() < 1e-6);
    }

    #[test]
    fn test_eval_mode_ignores_transitions() {
        let mut agent = TabularQAgent::new(TabularQConfig::default(), 0);
        agent.set_training(false);
        agent.observe_transition(transition(&[0.0], 0, 1.0, &[1.0], true));
        assert!(agent.learn().is_none());
        assert_eq!(agent.table_len(), 0);
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut agent = TabularQAgent::new(TabularQConfig::default(), 0);
        agent.observe_transition(transition(&[3.0], 1, 4.0, &[0.0], true));
        agent.learn();
        let snap = agent.save_policy().unwrap();

        let mut fresh = TabularQAgent::new(TabularQConfig::default(), 1);
        fresh.load_policy(&snap).unwrap();
        assert_eq!(fresh.q_values(&obs(&[3.0])), agent.q_values(&obs(&[3.0])));
    }
}
