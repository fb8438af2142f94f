//! Observation tensors, action masks, and network traits.
//!
//! The learning agents act over position categories, so every policy and
//! Q-value output has `ACTION_SPACE` entries indexed by `Position::index`.
//! Illegal categories are masked before any argmax or normalization.

use serde::{Deserialize, Serialize};

use crate::core::Position;
use crate::rules::LegalActions;

/// Number of discrete actions (one per position category).
pub const ACTION_SPACE: usize = Position::COUNT;

/// Encoded draft state as a flat tensor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Flattened tensor data (row-major order).
    pub tensor: Vec<f32>,

    /// Shape of the tensor (`[features]` for every encoder here).
    pub shape: Vec<usize>,
}

impl Observation {
    /// Create a new observation.
    pub fn new(tensor: Vec<f32>, shape: Vec<usize>) -> Self {
        debug_assert_eq!(
            tensor.len(),
            shape.iter().product::<usize>(),
            "Tensor length must match shape product"
        );
        Self { tensor, shape }
    }

    /// Create a flat observation.
    pub fn flat(tensor: Vec<f32>) -> Self {
        let len = tensor.len();
        Self::new(tensor, vec![len])
    }

    /// Create a zero-filled observation with the given shape.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let size = shape.iter().product();
        Self {
            tensor: vec![0.0; size],
            shape,
        }
    }

    /// Get the total number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tensor.len()
    }

    /// Check if the tensor is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tensor.is_empty()
    }

    /// Bitwise equality, distinguishing `-0.0` from `0.0` and matching NaNs.
    #[must_use]
    pub fn bit_eq(&self, other: &Observation) -> bool {
        self.shape == other.shape
            && self.tensor.len() == other.tensor.len()
            && self
                .tensor
                .iter()
                .zip(&other.tensor)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

/// Which position categories are legal this turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionMask(pub [bool; ACTION_SPACE]);

impl ActionMask {
    /// Every category legal.
    #[must_use]
    pub fn all() -> Self {
        Self([true; ACTION_SPACE])
    }

    /// Whether an action index is legal.
    #[must_use]
    pub fn is_legal(&self, action: usize) -> bool {
        self.0.get(action).copied().unwrap_or(false)
    }

    /// Whether any action is legal.
    #[must_use]
    pub fn any(&self) -> bool {
        self.0.iter().any(|&b| b)
    }

    /// Legal action indices in ascending order.
    pub fn legal_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().filter(|(_, b)| **b).map(|(i, _)| i)
    }

    /// Number of legal actions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }
}

impl From<&LegalActions> for ActionMask {
    fn from(legal: &LegalActions) -> Self {
        Self(legal.category_mask())
    }
}

/// Index of the largest legal value; ties go to the lowest index.
///
/// Returns `None` when nothing is legal.
#[must_use]
pub fn masked_argmax(values: &[f32], mask: &ActionMask) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for action in mask.legal_indices() {
        let v = values.get(action).copied().unwrap_or(f32::NEG_INFINITY);
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((action, v)),
        }
    }
    best.map(|(a, _)| a)
}

/// Largest legal value, or `0.0` when nothing is legal.
#[must_use]
pub fn masked_max(values: &[f32], mask: &ActionMask) -> f32 {
    masked_argmax(values, mask).map_or(0.0, |a| values[a])
}

/// Softmax over legal entries with a temperature; illegal entries get 0.
///
/// Returns all zeros when nothing is legal.
#[must_use]
pub fn masked_softmax(logits: &[f32], mask: &ActionMask, temperature: f32) -> Vec<f32> {
    let temperature = temperature.max(1e-6);
    let mut probs = vec![0.0; logits.len()];
    let max = mask
        .legal_indices()
        .filter_map(|a| logits.get(a))
        .fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    if !max.is_finite() {
        return probs;
    }

    let mut total = 0.0;
    for action in mask.legal_indices() {
        if let Some(&logit) = logits.get(action) {
            let e = ((logit - max) / temperature).exp();
            probs[action] = e;
            total += e;
        }
    }
    if total > 0.0 {
        for p in &mut probs {
            *p /= total;
        }
    }
    probs
}

/// Policy network outputs action logits.
pub trait PolicyNetwork: Send + Sync {
    /// Unnormalized action scores, `ACTION_SPACE` long.
    fn logits(&self, observation: &Observation) -> Vec<f32>;

    /// Masked action probabilities.
    fn action_probs(&self, observation: &Observation, mask: &ActionMask) -> Vec<f32> {
        masked_softmax(&self.logits(observation), mask, 1.0)
    }
}

/// Value network outputs a scalar state-value estimate.
pub trait ValueNetwork: Send + Sync {
    /// Expected return from this observation.
    fn value(&self, observation: &Observation) -> f32;
}

/// Combined policy-value network.
pub trait PolicyValueNetwork: PolicyNetwork + ValueNetwork {
    /// Predict both masked probabilities and value.
    fn predict(&self, observation: &Observation, mask: &ActionMask) -> (Vec<f32>, f32) {
        (self.action_probs(observation, mask), self.value(observation))
    }
}

impl<T: PolicyNetwork + ValueNetwork> PolicyValueNetwork for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_new() {
        let obs = Observation::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        assert_eq!(obs.len(), 4);
        assert_eq!(Observation::flat(vec![1.0; 3]).shape, vec![3]);
        assert!(Observation::zeros(vec![0]).is_empty());
    }

    #[test]
    fn test_bit_eq() {
        let a = Observation::flat(vec![0.0, 1.0]);
        let b = Observation::flat(vec![-0.0, 1.0]);
        assert_eq!(a, b);
        assert!(!a.bit_eq(&b));
        assert!(a.bit_eq(&a.clone()));
    }

    #[test]
    fn test_mask_helpers() {
        let mask = ActionMask([false, true, false, true, false]);
        assert_eq!(mask.legal_indices().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(mask.count(), 2);
        assert!(mask.any());
        assert!(!mask.is_legal(0));
        assert!(!mask.is_legal(9));
        assert!(!ActionMask::default().any());
    }

    #[test]
    fn test_masked_argmax() {
        let mask = ActionMask([true, false, true, true, false]);
        // Index 1 is larger but illegal
        assert_eq!(masked_argmax(&[0.1, 9.0, 0.5, 0.2, 7.0], &mask), Some(2));
        // Ties resolve to the lowest index
        assert_eq!(masked_argmax(&[1.0, 0.0, 1.0, 1.0, 0.0], &mask), Some(0));
        assert_eq!(masked_argmax(&[1.0; 5], &ActionMask::default()), None);
        assert_eq!(masked_max(&[0.1, 9.0, 0.5, 0.2, 7.0], &mask), 0.5);
    }

    #[test]
    fn test_masked_softmax() {
        let mask = ActionMask([true, false, true, false, false]);
        let probs = masked_softmax(&[0.0, 100.0, 0.0, 5.0, 5.0], &mask, 1.0);

        assert_eq!(probs[1], 0.0);
        assert_eq!(probs[3], 0.0);
        assert!((probs[0] - 0.5).abs() < 1e-6);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);

        let none = masked_softmax(&[1.0; 5], &ActionMask::default(), 1.0);
        assert!(none.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_softmax_temperature() {
        let mask = ActionMask::all();
        let logits = [1.0, 2.0, 0.0, 0.0, 0.0];
        let sharp = masked_softmax(&logits, &mask, 0.1);
        let flat = masked_softmax(&logits, &mask, 10.0);
        assert!(sharp[1] > 0.99);
        assert!(flat[1] < 0.3);
    }

    struct Constant;

    impl PolicyNetwork for Constant {
        fn logits(&self, _observation: &Observation) -> Vec<f32> {
            vec![0.0; ACTION_SPACE]
        }
    }

    impl ValueNetwork for Constant {
        fn value(&self, _observation: &Observation) -> f32 {
            1.5
        }
    }

    #[test]
    fn test_policy_value_blanket_impl() {
        let mask = ActionMask([true, true, false, false, false]);
        let (probs, value) = Constant.predict(&Observation::zeros(vec![3]), &mask);
        assert_eq!(value, 1.5);
        assert!((probs[0] - 0.5).abs() < 1e-6);
        assert_eq!(probs[2], 0.0);
    }
}
