//! Proximal policy optimization.
//!
//! ## Data flow
//!
//! 1. Acting records each step's observation, mask, and value estimate
//! 2. Once `episodes_per_update` full episodes are buffered, the current
//!    policy is snapshotted as the old policy
//! 3. GAE(λ) advantages are normalized across the batch
//! 4. `epochs` passes over shuffled minibatches minimize
//!    `-min(ρ·A, clip(ρ, 1-ε, 1+ε)·A) - β·H + c·½(V - target)²`
//!    with `ρ = π(a|s) / π_old(a|s)`
//! 5. The batch is discarded; nothing is reused across updates

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::persistence::{PolicySnapshot, DEFAULT_POLICY_VERSION};
use super::{resolve_category, Agent, AgentInput, AgentKind, LearnStats};
use crate::core::{DraftError, DraftRng, PlayerId, Result};
use crate::nn::{
    masked_argmax, masked_entropy, masked_softmax, policy_logit_grad, Adam, Mlp, PolicyNetwork,
    PolicyValueModel, ValueNetwork, ACTION_SPACE,
};
use crate::training::{normalize, Rollout, RolloutStep, Transition};

/// PPO hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PpoConfig {
    pub hidden: Vec<usize>,
    pub policy_learning_rate: f32,
    pub value_learning_rate: f32,
    pub discount: f32,
    pub gae_lambda: f32,
    /// ε in the clipped ratio.
    pub clip_epsilon: f32,
    pub epochs: usize,
    pub minibatch_size: usize,
    /// Full episodes collected before each update.
    pub episodes_per_update: usize,
    pub entropy_coef: f32,
    pub value_coef: f32,
    pub max_grad_norm: f32,
}

impl Default for PpoConfig {
    fn default() -> Self {
        Self {
            hidden: vec![64, 64],
            policy_learning_rate: 3e-4,
            value_learning_rate: 1e-3,
            discount: 0.99,
            gae_lambda: 0.95,
            clip_epsilon: 0.2,
            epochs: 4,
            minibatch_size: 64,
            episodes_per_update: 4,
            entropy_coef: 0.01,
            value_coef: 0.5,
            max_grad_norm: 0.5,
        }
    }
}

impl PpoConfig {
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

    /// Set episodes per update.
    #[must_use]
    pub fn with_episodes_per_update(mut self, episodes: usize) -> Self {
        self.episodes_per_update = episodes;
        self
    }

    /// Set epochs and minibatch size.
    #[must_use]
    pub fn with_epochs(mut self, epochs: usize, minibatch_size: usize) -> Self {
        self.epochs = epochs;
        self.minibatch_size = minibatch_size;
        self
    }
}

/// Clipped surrogate for one sample.
///
/// Returns the loss and the effective weight on `-log π(a|s)` for the
/// gradient; the weight is zero when the clipped branch is active.
#[must_use]
pub fn clipped_surrogate(ratio: f32, advantage: f32, epsilon: f32) -> (f32, f32) {
    let unclipped = ratio * advantage;
    let clipped = ratio.clamp(1.0 - epsilon, 1.0 + epsilon) * advantage;
    if clipped < unclipped {
        (-clipped, 0.0)
    } else {
        (-unclipped, unclipped)
    }
}

/// Clipped-surrogate policy-gradient agent.
pub struct PpoAgent {
    config: PpoConfig,
    model: PolicyValueModel,
    old_policy: Mlp,
    policy_optimizer: Adam,
    value_optimizer: Adam,
    rollout: Rollout,
    updates: u64,
    training: bool,
    rng: DraftRng,
    version: String,
}

impl PpoAgent {
    /// Create an agent for observations `input_size` wide.
    #[must_use]
    pub fn new(config: PpoConfig, input_size: usize, seed: u64) -> Self {
        let mut rng = DraftRng::new(seed);
        let model = PolicyValueModel::new(input_size, &config.hidden, &mut rng);
        Self {
            old_policy: model.policy.clone(),
            policy_optimizer: Adam::new(&model.policy, config.policy_learning_rate),
            value_optimizer: Adam::new(&model.value, config.value_learning_rate),
            model,
            config,
            rollout: Rollout::new(),
            updates: 0,
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

    /// Completed updates.
    #[must_use]
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Steps buffered for the next update.
    #[must_use]
    pub fn buffered_steps(&self) -> usize {
        self.rollout.len()
    }
}

impl Agent for PpoAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Ppo
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
        // The policy only changes inside learn(), so these match acting time
        let probs = self.model.action_probs(&transition.observation, &transition.legal);
        let log_prob = probs
            .get(transition.action)
            .map_or(f32::MIN, |p| p.max(1e-8).ln());
        let value = self.model.value(&transition.observation);
        self.rollout.push(RolloutStep {
            observation: transition.observation,
            mask: transition.legal,
            action: transition.action,
            reward: transition.reward,
            log_prob,
            value,
            done: transition.done,
        });
    }

    fn learn(&mut self) -> Option<LearnStats> {
        if !self.training || self.rollout.completed_episodes() < self.config.episodes_per_update.max(1) {
            return None;
        }
        self.rollout.truncate_to_completed();

        self.old_policy.copy_from(&self.model.policy);
        let steps = self.rollout.steps();
        let old_log_probs: Vec<f32> = steps
            .iter()
            .map(|s| {
                let probs = masked_softmax(&self.old_policy.forward(&s.observation.tensor), &s.mask, 1.0);
                probs[s.action].max(1e-8).ln()
            })
            .collect();
        let (mut advantages, targets) = self
            .rollout
            .advantages(self.config.discount, self.config.gae_lambda);
        normalize(&mut advantages);

        let n = steps.len();
        let mut indices: Vec<usize> = (0..n).collect();
        let minibatch = self.config.minibatch_size.max(1);
        let mut total_loss = 0.0;
        let mut evaluated = 0usize;

        for _ in 0..self.config.epochs {
            self.rng.shuffle(&mut indices);
            for chunk in indices.chunks(minibatch) {
                let mut policy_grads = self.model.policy.zero_grads();
                let mut value_grads = self.model.value.zero_grads();

                for &i in chunk {
                    let step = &steps[i];
                    let policy_cache = self.model.policy.forward_cached(&step.observation.tensor);
                    let probs = masked_softmax(policy_cache.output(), &step.mask, 1.0);
                    let log_prob = probs[step.action].max(1e-8).ln();
                    let ratio = (log_prob - old_log_probs[i]).exp();
                    let (surrogate, weight) =
                        clipped_surrogate(ratio, advantages[i], self.config.clip_epsilon);
                    let grad = policy_logit_grad(&probs, &step.mask, step.action, weight, self.config.entropy_coef);
                    self.model.policy.backward(&policy_cache, &grad, &mut policy_grads);

                    let value_cache = self.model.value.forward_cached(&step.observation.tensor);
                    let value = value_cache.output().first().copied().unwrap_or(0.0);
                    let value_error = value - targets[i];
                    self.model
                        .value
                        .backward(&value_cache, &[self.config.value_coef * value_error], &mut value_grads);

                    total_loss += surrogate - self.config.entropy_coef * masked_entropy(&probs)
                        + self.config.value_coef * 0.5 * value_error * value_error;
                    evaluated += 1;
                }

                let scale = 1.0 / chunk.len() as f32;
                policy_grads.scale(scale);
                value_grads.scale(scale);
                policy_grads.clip_norm(self.config.max_grad_norm);
                value_grads.clip_norm(self.config.max_grad_norm);
                self.policy_optimizer.step(&mut self.model.policy, &policy_grads);
                self.value_optimizer.step(&mut self.model.value, &value_grads);
            }
        }

        self.rollout.clear();
        self.updates += 1;
        let loss = if evaluated > 0 { total_loss / evaluated as f32 } else { 0.0 };
        trace!(loss, samples = n, update = self.updates, "ppo update");
        Some(LearnStats { loss, samples: n })
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
                "ppo network expects {} inputs, snapshot has {}",
                self.model.input_size(),
                model.input_size()
            )));
        }
        self.old_policy = model.policy.clone();
        self.policy_optimizer = Adam::new(&model.policy, self.config.policy_learning_rate);
        self.value_optimizer = Adam::new(&model.value, self.config.value_learning_rate);
        self.model = model;
        self.rollout.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{ActionMask, Observation};

    fn transition(action: usize, reward: f32) -> Transition {
        Transition {
            observation: Observation::flat(vec![0.5, 1.0]),
            legal: ActionMask([false, true, true, false, false]),
            action,
            player: PlayerId::new(0),
            reward,
            next_observation: Observation::flat(vec![0.0, 0.0]),
            next_legal: ActionMask::default(),
            done: true,
        }
    }

    fn agent() -> PpoAgent {
        PpoAgent::new(
            PpoConfig::default()
                .with_hidden(vec![16])
                .with_learning_rates(1e-2, 1e-2)
                .with_episodes_per_update(2)
                .with_epochs(4, 8),
            2,
            5,
        )
    }

    #[test]
    fn test_clipped_surrogate() {
        // Inside the trust region: plain ratio * advantage
        assert_eq!(clipped_surrogate(1.1, 2.0, 0.2), (-2.2, 2.2));
        // Positive advantage, ratio too large: clipped, no gradient
        let (loss, weight) = clipped_surrogate(1.5, 1.0, 0.2);
        assert!((loss + 1.2).abs() < 1e-6);
        assert_eq!(weight, 0.0);
        // Negative advantage, ratio too small: clipped, no gradient
        let (_, weight) = clipped_surrogate(0.5, -1.0, 0.2);
        assert_eq!(weight, 0.0);
        // Negative advantage, ratio large: unclipped term is the pessimistic one
        let (loss, weight) = clipped_surrogate(1.5, -1.0, 0.2);
        assert!((loss - 1.5).abs() < 1e-6);
        assert!((weight + 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_waits_for_full_batch() {
        let mut agent = agent();
        agent.observe_transition(transition(1, 1.0));
        assert!(agent.learn().is_none());
        agent.observe_transition(transition(2, 0.0));
        let stats = agent.learn().unwrap();
        assert_eq!(stats.samples, 2);
        assert_eq!(agent.buffered_steps(), 0);
        assert_eq!(agent.updates(), 1);
    }

    #[test]
    fn test_policy_improves() {
        let mut agent = agent();
        let obs = Observation::flat(vec![0.5, 1.0]);
        let mask = ActionMask([false, true, true, false, false]);
        let before = agent.model().action_probs(&obs, &mask)[2];

        for _ in 0..60 {
            agent.observe_transition(transition(2, 1.0));
            agent.observe_transition(transition(1, -1.0));
            agent.learn();
        }
        let after = agent.model().action_probs(&obs, &mask)[2];
        assert!(after > before);
        assert!(after > 0.7);
    }

    #[test]
    fn test_eval_mode_is_inert() {
        let mut agent = agent();
        agent.set_training(false);
        agent.observe_transition(transition(1, 1.0));
        agent.observe_transition(transition(1, 1.0));
        assert!(agent.learn().is_none());
        assert_eq!(agent.buffered_steps(), 0);
    }

    #[test]
    fn test_load_wrong_kind_keeps_policy() {
        let mut agent = agent();
        let before = agent.model().clone();
        let foreign = PolicySnapshot::encode(AgentKind::ActorCritic, "v1", agent.model()).unwrap();
        assert!(agent.load_policy(&foreign).is_err());
        assert_eq!(agent.model(), &before);
    }
}
