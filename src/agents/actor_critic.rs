//! Advantage actor-critic.
//!
//! The policy network's logits are masked to legal categories before the
//! softmax; the value network is a baseline. After each finished episode:
//!
//! - `R_t`: discounted Monte-Carlo return
//! - `A_t = R_t - V(s_t)`
//! - policy loss `-A_t · log π(a_t | s_t) - β · H(π(· | s_t))`
//! - value loss `½ (V(s_t) - R_t)²`
//!
//! Each head has its own Adam optimizer and gradient-norm clip.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::persistence::{PolicySnapshot, DEFAULT_POLICY_VERSION};
use super::{resolve_category, Agent, AgentInput, AgentKind, LearnStats};
use crate::core::{DraftError, DraftRng, PlayerId, Result};
use crate::nn::{
    masked_argmax, masked_entropy, masked_softmax, policy_logit_grad, Adam, PolicyNetwork,
    PolicyValueModel, ACTION_SPACE,
};
use crate::training::{Rollout, RolloutStep, Transition};

/// Actor-critic hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorCriticConfig {
    pub hidden: Vec<usize>,
    pub policy_learning_rate: f32,
    pub value_learning_rate: f32,
    pub discount: f32,
    /// β on the entropy bonus.
    pub entropy_coef: f32,
    pub max_grad_norm: f32,
}

impl Default for ActorCriticConfig {
    fn default() -> Self {
        Self {
            hidden: vec![64, 64],
            policy_learning_rate: 1e-3,
            value_learning_rate: 1e-3,
            discount: 0.99,
            entropy_coef: 0.01,
            max_grad_norm: 1.0,
        }
    }
}

impl ActorCriticConfig {
    /// Set hidden layer sizes for both heads.
    #[must_use]
    pub fn with_hidden(mut self, hidden: Vec<usize>) -> Self {
        self.hidden = hidden;
        self
    }

    /// Set both learning rates.
    #[must_use]
    pub fn with_learning_rates(mut self, policy: f32, value: f32) -> Self {
        self.policy_learning_rate = policy;
        self.value_learning_rate = value;
        self
    }

    /// Set β.
    #[must_use]
    pub fn with_entropy_coef(mut self, entropy_coef: f32) -> Self {
        self.entropy_coef = entropy_coef;
        self
    }
}

/// Masked-softmax policy with a learned value baseline.
pub struct ActorCriticAgent {
    config: ActorCriticConfig,
    model: PolicyValueModel,
    policy_optimizer: Adam,
    value_optimizer: Adam,
    rollout: Rollout,
    training: bool,
    rng: DraftRng,
    version: String,
}

impl ActorCriticAgent {
    /// Create an agent for observations `input_size` wide.
    #[must_use]
    pub fn new(config: ActorCriticConfig, input_size: usize, seed: u64) -> Self {
        let mut rng = DraftRng::new(seed);
        let model = PolicyValueModel::new(input_size, &config.hidden, &mut rng);
        let policy_optimizer = Adam::new(&model.policy, config.policy_learning_rate);
        let value_optimizer = Adam::new(&model.value, config.value_learning_rate);
        Self {
            config,
            model,
            policy_optimizer,
            value_optimizer,
            rollout: Rollout::new(),
            training: true,
            rng,
            version: DEFAULT_POLICY_VERSION.to_string(),
        }
    }

    /// Tag saved and expected policies with a version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// The policy and value networks.
    #[must_use]
    pub fn model(&self) -> &PolicyValueModel {
        &self.model
    }

    /// Steps buffered for the next update.
    #[must_use]
    pub fn buffered_steps(&self) -> usize {
        self.rollout.len()
    }
}

impl Agent for ActorCriticAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::ActorCritic
    }

    fn select_action(&mut self, input: &AgentInput<'_>) -> Result<PlayerId> {
        let mask = input.mask();
        let probs = self.model.action_probs(input.observation, &mask);
        let action = if self.training {
            self.rng.choose_weighted(&probs).or_else(|| masked_argmax(&probs, &mask))
        } else {
            masked_argmax(&probs, &mask)
        };
        resolve_category(input.legal, action.unwrap_or(ACTION_SPACE))
    }

    fn observe_transition(&mut self, transition: Transition) {
        if !self.training {
            return;
        }
        // Acting-time statistics are recomputed at update time
        self.rollout.push(RolloutStep {
            observation: transition.observation,
            mask: transition.legal,
            action: transition.action,
            reward: transition.reward,
            log_prob: 0.0,
            value: 0.0,
            done: transition.done,
        });
    }

    fn learn(&mut self) -> Option<LearnStats> {
        if !self.training {
            return None;
        }
        self.rollout.truncate_to_completed();
        if self.rollout.is_empty() {
            return None;
        }

        let returns = self.rollout.returns(self.config.discount);
        let mut policy_grads = self.model.policy.zero_grads();
        let mut value_grads = self.model.value.zero_grads();
        let mut total_loss = 0.0;

        for (step, &ret) in self.rollout.steps().iter().zip(&returns) {
            let value_cache = self.model.value.forward_cached(&step.observation.tensor);
            let value = value_cache.output().first().copied().unwrap_or(0.0);
            let advantage = ret - value;

            let policy_cache = self.model.policy.forward_cached(&step.observation.tensor);
            let probs = masked_softmax(policy_cache.output(), &step.mask, 1.0);
            let log_prob = probs[step.action].max(1e-8).ln();
            let grad = policy_logit_grad(&probs, &step.mask, step.action, advantage, self.config.entropy_coef);
            self.model.policy.backward(&policy_cache, &grad, &mut policy_grads);
            self.model.value.backward(&value_cache, &[value - ret], &mut value_grads);

            total_loss += -advantage * log_prob - self.config.entropy_coef * masked_entropy(&probs)
                + 0.5 * advantage * advantage;
        }

        let samples = self.rollout.len();
        let scale = 1.0 / samples as f32;
        policy_grads.scale(scale);
        value_grads.scale(scale);
        policy_grads.clip_norm(self.config.max_grad_norm);
        value_grads.clip_norm(self.config.max_grad_norm);
        self.policy_optimizer.step(&mut self.model.policy, &policy_grads);
        self.value_optimizer.step(&mut self.model.value, &value_grads);
        self.rollout.clear();

        let loss = total_loss * scale;
        trace!(loss, samples, "actor-critic update");
        Some(LearnStats { loss, samples })
    }

    fn abort_episode(&mut self) {
        self.rollout.truncate_to_completed();
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn save_policy(&self) -> Result<PolicySnapshot> {
        PolicySnapshot::encode(self.kind(), self.version.clone(), &self.model)
    }

    fn load_policy(&mut self, snapshot: &PolicySnapshot) -> Result<()> {
        let model: PolicyValueModel = snapshot.decode(self.kind(), &self.version)?;
        if model.input_size() != self.model.input_size() {
            return Err(DraftError::IncompatiblePolicy(format!(
                "actor_critic network expects {} inputs, snapshot has {}",
                self.model.input_size(),
                model.input_size()
            )));
        }
        self.policy_optimizer = Adam::new(&model.policy, self.config.policy_learning_rate);
        self.value_optimizer = Adam::new(&model.value, self.config.value_learning_rate);
        self.model = model;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{ActionMask, Observation, ValueNetwork};

    fn transition(action: usize, reward: f32, done: bool) -> Transition {
        Transition {
            observation: Observation::flat(vec![1.0, 0.0, 0.5]),
            legal: ActionMask([true, true, false, false, false]),
            action,
            player: PlayerId::new(0),
            reward,
            next_observation: Observation::flat(vec![0.0; 3]),
            next_legal: ActionMask::default(),
            done,
        }
    }

    fn agent() -> ActorCriticAgent {
        ActorCriticAgent::new(
            ActorCriticConfig::default()
                .with_hidden(vec![16])
                .with_learning_rates(1e-2, 1e-2),
            3,
            11,
        )
    }

    #[test]
    fn test_learns_only_completed_episodes() {
        let mut agent = agent();
        agent.observe_transition(transition(0, 0.0, false));
        assert!(agent.learn().is_none());
        assert_eq!(agent.buffered_steps(), 0);

        agent.observe_transition(transition(0, 0.0, false));
        agent.observe_transition(transition(1, 1.0, true));
        assert_eq!(agent.learn().unwrap().samples, 2);
        assert_eq!(agent.buffered_steps(), 0);
    }

    #[test]
    fn test_policy_moves_toward_rewarded_action() {
        let mut agent = agent();
        let obs = Observation::flat(vec![1.0, 0.0, 0.5]);
        let mask = ActionMask([true, true, false, false, false]);
        let before = agent.model().action_probs(&obs, &mask)[1];

        for _ in 0..100 {
            agent.observe_transition(transition(1, 1.0, true));
            agent.observe_transition(transition(0, -1.0, true));
            agent.learn();
        }
        let after = agent.model().action_probs(&obs, &mask)[1];
        assert!(after > before);
        assert!(after > 0.7);
        assert!(agent.model().value(&obs).abs() < 0.5);
    }

    #[test]
    fn test_abort_drops_partial_episode() {
        let mut agent = agent();
        agent.observe_transition(transition(0, 0.0, true));
        agent.observe_transition(transition(1, 0.0, false));
        agent.abort_episode();
        assert_eq!(agent.buffered_steps(), 1);
    }

    #[test]
    fn test_eval_mode_is_inert() {
        let mut agent = agent();
        agent.set_training(false);
        agent.observe_transition(transition(0, 1.0, true));
        assert_eq!(agent.buffered_steps(), 0);
        assert!(agent.learn().is_none());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let source = agent();
        let mut target = ActorCriticAgent::new(ActorCriticConfig::default().with_hidden(vec![16]), 3, 99);
        target.load_policy(&source.save_policy().unwrap()).unwrap();
        assert_eq!(target.model(), source.model());
    }
}
