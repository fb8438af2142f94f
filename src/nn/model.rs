//! Policy and value heads shared by the policy-gradient agents.

use serde::{Deserialize, Serialize};

use super::mlp::Mlp;
use super::traits::{ActionMask, Observation, PolicyNetwork, ValueNetwork, ACTION_SPACE};
use crate::core::DraftRng;

/// Separate policy and value networks over the same observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyValueModel {
    pub policy: Mlp,
    pub value: Mlp,
}

impl PolicyValueModel {
    /// Build both heads with the same hidden layout.
    pub fn new(input: usize, hidden: &[usize], rng: &mut DraftRng) -> Self {
        let layout = |output: usize| {
            let mut sizes = Vec::with_capacity(hidden.len() + 2);
            sizes.push(input);
            sizes.extend_from_slice(hidden);
            sizes.push(output);
            sizes
        };
        Self {
            policy: Mlp::new(&layout(ACTION_SPACE), rng),
            value: Mlp::new(&layout(1), rng),
        }
    }

    /// Observation width the model expects.
    #[must_use]
    pub fn input_size(&self) -> usize {
        self.policy.input_size()
    }
}

impl PolicyNetwork for PolicyValueModel {
    fn logits(&self, observation: &Observation) -> Vec<f32> {
        self.policy.forward(&observation.tensor)
    }
}

impl ValueNetwork for PolicyValueModel {
    fn value(&self, observation: &Observation) -> f32 {
        self.value.forward(&observation.tensor).first().copied().unwrap_or(0.0)
    }
}

/// Entropy of a masked distribution; illegal (zero) entries contribute 0.
#[must_use]
pub fn masked_entropy(probs: &[f32]) -> f32 {
    probs
        .iter()
        .filter(|p| **p > 0.0)
        .map(|p| -p * p.ln())
        .sum()
}

/// Gradient w.r.t. the logits of `-weight · log π(action) - entropy_coef · H(π)`.
///
/// `probs` must be the masked softmax of those logits. Illegal logits get a
/// zero gradient.
#[must_use]
pub fn policy_logit_grad(
    probs: &[f32],
    mask: &ActionMask,
    action: usize,
    weight: f32,
    entropy_coef: f32,
) -> [f32; ACTION_SPACE] {
    let entropy = masked_entropy(probs);
    let mut grad = [0.0; ACTION_SPACE];
    for k in mask.legal_indices() {
        let p = probs.get(k).copied().unwrap_or(0.0);
        let indicator = if k == action { 1.0 } else { 0.0 };
        grad[k] = weight * (p - indicator);
        if p > 0.0 {
            // dH/dz_k = -p_k (ln p_k + H)
            grad[k] += entropy_coef * p * (p.ln() + entropy);
        }
    }
    grad
}
