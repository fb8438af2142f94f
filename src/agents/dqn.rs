//! Deep Q-learning with experience replay and a target network.
//!
//! ## Update
//!
//! Each `learn()` samples a minibatch from the replay buffer and regresses
//! the online network's Q(s, a) toward
//!
//! ```text
//! r + γ · max_{a' legal in s'} Q_target(s', a')      (0 when done)
//! ```
//!
//! under a Huber loss. Gradients are clipped to a global norm before the
//! AdamW step. The target network is re-synced every
//! `target_sync_episodes` episodes and the learning rate decays on a step
//! schedule counted in episodes.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::exploration::{Exploration, ExplorationSchedule};
use super::persistence::{PolicySnapshot, DEFAULT_POLICY_VERSION};
use super::{resolve_category, Agent, AgentInput, AgentKind, LearnSchedule, LearnStats};
use crate::core::{DraftError, DraftRng, PlayerId, Result};
use crate::nn::{masked_argmax, masked_max, Adam, Mlp, Observation, StepDecay, ACTION_SPACE};
use crate::training::{ReplayBuffer, Transition};

/// Deep Q hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepQConfig {
    pub hidden: Vec<usize>,
    pub learning_rate: f32,
    pub discount: f32,
    pub weight_decay: f32,
    pub lr_schedule: StepDecay,
    pub max_grad_norm: f32,
    pub replay_capacity: usize,
    pub batch_size: usize,
    /// Episodes between target-network syncs.
    pub target_sync_episodes: u32,
    pub huber_delta: f32,
    pub exploration: Exploration,
}

impl Default for DeepQConfig {
    fn default() -> Self {
        Self {
            hidden: vec![64, 64],
            learning_rate: 5e-3,
            discount: 0.8,
            weight_decay: 0.01,
            lr_schedule: StepDecay {
                step_size: 2000,
                gamma: 0.25,
            },
            max_grad_norm: 1.0,
            replay_capacity: 2400,
            batch_size: 32,
            target_sync_episodes: 10,
            huber_delta: 1.0,
            exploration: Exploration::default(),
        }
    }
}

impl DeepQConfig {
    /// Set hidden layer sizes.
    #[must_use]
    pub fn with_hidden(mut self, hidden: Vec<usize>) -> Self {
        self.hidden = hidden;
        self
    }

    /// Set the initial learning rate.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the minibatch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the exploration strategy.
    #[must_use]
    pub fn with_exploration(mut self, exploration: Exploration) -> Self {
        self.exploration = exploration;
        self
    }

    /// Boltzmann exploration: temperature 1.0 decaying to 0.1.
    #[must_use]
    pub fn softmax_exploration() -> Exploration {
        Exploration::Softmax(ExplorationSchedule {
            start: 1.0,
            decay: 0.999,
            min: 0.1,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct DeepQParams {
    online: Mlp,
    exploration_level: f32,
}

/// Q-network agent.
pub struct DeepQAgent {
    config: DeepQConfig,
    online: Mlp,
    target: Mlp,
    optimizer: Adam,
    replay: ReplayBuffer,
    /// Transitions pushed since the last finished episode.
    pending: usize,
    exploration_level: f32,
    episodes: u32,
    training: bool,
    rng: DraftRng,
    version: String,
}

impl DeepQAgent {
    /// Create an agent for observations `input_size` wide.
    #[must_use]
    pub fn new(config: DeepQConfig, input_size: usize, seed: u64) -> Self {
        let mut rng = DraftRng::new(seed);
        let mut sizes = Vec::with_capacity(config.hidden.len() + 2);
        sizes.push(input_size);
        sizes.extend_from_slice(&config.hidden);
        sizes.push(ACTION_SPACE);

        let online = Mlp::new(&sizes, &mut rng);
        let target = online.clone();
        let optimizer = Adam::new(&online, config.learning_rate)
            .with_weight_decay(config.weight_decay)
            .with_schedule(config.lr_schedule);

        Self {
            replay: ReplayBuffer::new(config.replay_capacity),
            pending: 0,
            exploration_level: config.exploration.schedule().start,
            online,
            target,
            optimizer,
            episodes: 0,
            training: true,
            rng,
            version: DEFAULT_POLICY_VERSION.to_string(),
            config,
        }
    }

    /// Tag saved and expected policies with a version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Online-network Q-values.
    #[must_use]
    pub fn q_values(&self, observation: &Observation) -> Vec<f32> {
        self.online.forward(&observation.tensor)
    }

    /// Current ε or temperature.
    #[must_use]
    pub fn exploration_level(&self) -> f32 {
        self.exploration_level
    }

    /// Current optimizer learning rate.
    #[must_use]
    pub fn learning_rate(&self) -> f32 {
        self.optimizer.learning_rate()
    }

    /// Stored transitions.
    #[must_use]
    pub fn replay_len(&self) -> usize {
        self.replay.len()
    }

    fn huber(&self, error: f32) -> (f32, f32) {
        let delta = self.config.huber_delta;
        if error.abs() <= delta {
            (0.5 * error * error, error)
        } else {
            (delta * (error.abs() - 0.5 * delta), delta * error.signum())
        }
    }
}

impl Agent for DeepQAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::DeepQ
    }

    fn learn_schedule(&self) -> LearnSchedule {
        LearnSchedule::PerStep
    }

    fn select_action(&mut self, input: &AgentInput<'_>) -> Result<PlayerId> {
        let mask = input.mask();
        let values = self.q_values(input.observation);
        let action = if self.training {
            self.config
                .exploration
                .choose(&values, &mask, self.exploration_level, &mut self.rng)
        } else {
            masked_argmax(&values, &mask)
        };
        resolve_category(input.legal, action.unwrap_or(ACTION_SPACE))
    }

    fn observe_transition(&mut self, transition: Transition) {
        if self.training {
            self.replay.push(transition);
            self.pending += 1;
        }
    }

    fn learn(&mut self) -> Option<LearnStats> {
        let batch_size = self.config.batch_size.max(1);
        if !self.training || self.replay.len() < batch_size {
            return None;
        }

        let batch = self.replay.sample(batch_size, &mut self.rng);
        let mut grads = self.online.zero_grads();
        let mut total_loss = 0.0;

        for t in &batch {
            let bootstrap = if t.done {
                0.0
            } else {
                masked_max(&self.target.forward(&t.next_observation.tensor), &t.next_legal)
            };
            let target = t.reward + self.config.discount * bootstrap;

            let cache = self.online.forward_cached(&t.observation.tensor);
            let error = cache.output()[t.action] - target;
            let (loss, d_loss) = self.huber(error);
            total_loss += loss;

            let mut grad_out = [0.0; ACTION_SPACE];
            grad_out[t.action] = d_loss;
            self.online.backward(&cache, &grad_out, &mut grads);
        }

        let samples = batch.len();
        grads.scale(1.0 / samples as f32);
        let norm = grads.clip_norm(self.config.max_grad_norm);
        self.optimizer.step(&mut self.online, &grads);
        trace!(loss = total_loss / samples as f32, grad_norm = norm, "deep q update");

        Some(LearnStats {
            loss: total_loss / samples as f32,
            samples,
        })
    }

    fn end_episode(&mut self) {
        self.pending = 0;
        if !self.training {
            return;
        }
        self.episodes += 1;
        self.optimizer.advance_schedule();
        self.exploration_level = self.config.exploration.schedule().next(self.exploration_level);
        if self.config.target_sync_episodes > 0 && self.episodes % self.config.target_sync_episodes == 0 {
            self.target.copy_from(&self.online);
        }
    }

    fn abort_episode(&mut self) {
        self.replay.truncate_back(self.pending);
        self.pending = 0;
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn save_policy(&self) -> Result<PolicySnapshot> {
        let params = DeepQParams {
            online: self.online.clone(),
            exploration_level: self.exploration_level,
        };
        PolicySnapshot::encode(self.kind(), self.version.clone(), &params)
    }

    fn load_policy(&mut self, snapshot: &PolicySnapshot) -> Result<()> {
        let params: DeepQParams = snapshot.decode(self.kind(), &self.version)?;
        if params.online.input_size() != self.online.input_size()
            || params.online.output_size() != ACTION_SPACE
        {
            return Err(DraftError::IncompatiblePolicy(format!(
                "deep_q network expects {} inputs, snapshot has {}",
                self.online.input_size(),
                params.online.input_size()
            )));
        }
        self.online = params.online;
        self.target.copy_from(&self.online);
        self.optimizer = Adam::new(&self.online, self.config.learning_rate)
            .with_weight_decay(self.config.weight_decay)
            .with_schedule(self.config.lr_schedule);
        self.exploration_level = params.exploration_level;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::ActionMask;

    fn transition(action: usize, reward: f32) -> Transition {
        Transition {
            observation: Observation::flat(vec![1.0, 0.5]),
            legal: ActionMask::all(),
            action,
            player: PlayerId::new(0),
            reward,
            next_observation: Observation::flat(vec![0.0, 0.0]),
            next_legal: ActionMask::default(),
            done: true,
        }
    }

    fn small_config() -> DeepQConfig {
        DeepQConfig::default().with_hidden(vec![16]).with_batch_size(8)
    }

    #[test]
    fn test_learn_waits_for_batch() {
        let mut agent = DeepQAgent::new(small_config(), 2, 0);
        for _ in 0..7 {
            agent.observe_transition(transition(1, 1.0));
        }
        assert!(agent.learn().is_none());
        agent.observe_transition(transition(1, 1.0));
        assert_eq!(agent.learn().unwrap().samples, 8);
    }

    #[test]
    fn test_regresses_toward_terminal_reward() {
        let mut agent = DeepQAgent::new(small_config(), 2, 3);
        let obs = Observation::flat(vec![1.0, 0.5]);
        let before = (agent.q_values(&obs)[1] - 1.0).abs();

        for _ in 0..16 {
            agent.observe_transition(transition(1, 1.0));
        }
        for _ in 0..300 {
            agent.learn();
        }
        let after = (agent.q_values(&obs)[1] - 1.0).abs();
        assert!(after < before);
        assert!(after < 0.2);
    }

    #[test]
    fn test_abort_drops_partial_episode() {
        let mut agent = DeepQAgent::new(small_config(), 2, 0);
        agent.observe_transition(transition(0, 1.0));
        agent.end_episode();

        for _ in 0..3 {
            let mut t = transition(1, 0.0);
            t.done = false;
            agent.observe_transition(t);
        }
        assert_eq!(agent.replay_len(), 4);
        agent.abort_episode();
        assert_eq!(agent.replay_len(), 1);

        agent.abort_episode();
        assert_eq!(agent.replay_len(), 1);
    }

    #[test]
    fn test_huber_gradient_is_clipped() {
        let agent = DeepQAgent::new(small_config(), 2, 0);
        assert_eq!(agent.huber(0.5), (0.125, 0.5));
        assert_eq!(agent.huber(-3.0), (2.5, -1.0));
    }

    #[test]
    fn test_target_sync_and_schedule() {
        let mut agent = DeepQAgent::new(small_config(), 2, 0);
        for _ in 0..8 {
            agent.observe_transition(transition(2, 5.0));
        }
        agent.learn();
        assert_ne!(agent.online, agent.target);

        for _ in 0..10 {
            agent.end_episode();
        }
        assert_eq!(agent.online, agent.target);
        assert!(agent.exploration_level() < 1.0);
    }

    #[test]
    fn test_load_rejects_wrong_input_width() {
        let wide = DeepQAgent::new(small_config(), 4, 0);
        let mut narrow = DeepQAgent::new(small_config(), 2, 0);
        let before = narrow.q_values(&Observation::flat(vec![1.0, 1.0]));

        let err = narrow.load_policy(&wide.save_policy().unwrap()).unwrap_err();
        assert!(matches!(err, DraftError::IncompatiblePolicy(_)));
        assert_eq!(narrow.q_values(&Observation::flat(vec![1.0, 1.0])), before);
    }
}
