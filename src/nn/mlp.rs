//! Small fully-connected networks with manual backpropagation.
//!
//! ## Components
//!
//! - `Mlp`: stack of `Dense` layers, ReLU between layers, linear output
//! - `ForwardCache`: per-layer activations kept for the backward pass
//! - `MlpGradients`: accumulated parameter gradients with global-norm clipping
//! - `Adam`: Adam / AdamW optimizer with an optional step-decay schedule
//!
//! Networks here are tiny (tens of inputs, a few hidden layers), so plain
//! `Vec<f32>` math is fast enough and keeps training deterministic.

use serde::{Deserialize, Serialize};

use crate::core::DraftRng;

/// One fully-connected layer. Weights are row-major `[outputs][inputs]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    inputs: usize,
    outputs: usize,
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl Dense {
    /// Xavier-uniform initialized layer with zero bias.
    pub fn new(inputs: usize, outputs: usize, rng: &mut DraftRng) -> Self {
        let limit = (6.0 / (inputs + outputs).max(1) as f32).sqrt();
        let weights = (0..inputs * outputs)
            .map(|_| rng.gen_uniform(-limit, limit))
            .collect();
        Self {
            inputs,
            outputs,
            weights,
            bias: vec![0.0; outputs],
        }
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.weights
            .chunks_exact(self.inputs.max(1))
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b)
            .take(self.outputs)
            .collect()
    }
}

/// Activation cache from one forward pass.
#[derive(Clone, Debug)]
pub struct ForwardCache {
    /// Input to each layer; `inputs[0]` is the network input.
    inputs: Vec<Vec<f32>>,
    /// Pre-activation output of each layer.
    pre: Vec<Vec<f32>>,
}

impl ForwardCache {
    /// Network output (linear last layer).
    #[must_use]
    pub fn output(&self) -> &[f32] {
        self.pre.last().map_or(&[], Vec::as_slice)
    }
}

/// Gradients for every parameter of an `Mlp`, same layout as its layers.
#[derive(Clone, Debug, PartialEq)]
pub struct MlpGradients {
    weights: Vec<Vec<f32>>,
    bias: Vec<Vec<f32>>,
}

impl MlpGradients {
    /// Multiply every gradient by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for g in self.weights.iter_mut().chain(self.bias.iter_mut()) {
            for v in g.iter_mut() {
                *v *= factor;
            }
        }
    }

    /// Global L2 norm.
    #[must_use]
    pub fn norm(&self) -> f32 {
        self.weights
            .iter()
            .chain(self.bias.iter())
            .flat_map(|g| g.iter())
            .map(|v| v * v)
            .sum::<f32>()
            .sqrt()
    }

    /// Rescale so the global norm is at most `max_norm`. Returns the norm
    /// before clipping.
    pub fn clip_norm(&mut self, max_norm: f32) -> f32 {
        let norm = self.norm();
        if norm > max_norm && norm > 0.0 {
            self.scale(max_norm / norm);
        }
        norm
    }
}

/// Multi-layer perceptron: ReLU hidden layers, linear output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mlp {
    layers: Vec<Dense>,
}

impl Mlp {
    /// Build a network with layer sizes `[input, hidden.., output]`.
    ///
    /// ```
    /// use draft_optimizer::core::DraftRng;
    /// use draft_optimizer::nn::Mlp;
    ///
    /// let mut rng = DraftRng::new(1);
    /// let net = Mlp::new(&[4, 8, 2], &mut rng);
    /// assert_eq!(net.forward(&[0.0; 4]).len(), 2);
    /// ```
    pub fn new(sizes: &[usize], rng: &mut DraftRng) -> Self {
        let layers = sizes
            .windows(2)
            .map(|w| Dense::new(w[0], w[1], rng))
            .collect();
        Self { layers }
    }

    /// Input width.
    #[must_use]
    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.inputs)
    }

    /// Output width.
    #[must_use]
    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.outputs)
    }

    /// Total trainable parameters.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.weights.len() + l.bias.len()).sum()
    }

    /// Forward pass.
    #[must_use]
    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        let last = self.layers.len().saturating_sub(1);
        let mut x = input.to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(&x);
            if i < last {
                relu(&mut x);
            }
        }
        x
    }

    /// Forward pass that keeps activations for `backward`.
    #[must_use]
    pub fn forward_cached(&self, input: &[f32]) -> ForwardCache {
        let last = self.layers.len().saturating_sub(1);
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut pre = Vec::with_capacity(self.layers.len());
        let mut x = input.to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            let z = layer.forward(&x);
            inputs.push(x);
            x = z.clone();
            if i < last {
                relu(&mut x);
            }
            pre.push(z);
        }
        ForwardCache { inputs, pre }
    }

    /// Zeroed gradient buffers shaped like this network.
    #[must_use]
    pub fn zero_grads(&self) -> MlpGradients {
        MlpGradients {
            weights: self.layers.iter().map(|l| vec![0.0; l.weights.len()]).collect(),
            bias: self.layers.iter().map(|l| vec![0.0; l.bias.len()]).collect(),
        }
    }

    /// Accumulate parameter gradients given `d loss / d output`.
    pub fn backward(&self, cache: &ForwardCache, grad_output: &[f32], grads: &mut MlpGradients) {
        let last = self.layers.len().saturating_sub(1);
        let mut delta = grad_output.to_vec();

        for (i, layer) in self.layers.iter().enumerate().rev() {
            if i < last {
                for (d, z) in delta.iter_mut().zip(&cache.pre[i]) {
                    if *z <= 0.0 {
                        *d = 0.0;
                    }
                }
            }

            let input = &cache.inputs[i];
            let gw = &mut grads.weights[i];
            let gb = &mut grads.bias[i];
            let mut grad_input = vec![0.0; layer.inputs];

            for (o, &d) in delta.iter().enumerate().take(layer.outputs) {
                if d == 0.0 {
                    continue;
                }
                gb[o] += d;
                let row = o * layer.inputs;
                for (j, &x) in input.iter().enumerate().take(layer.inputs) {
                    gw[row + j] += d * x;
                    grad_input[j] += layer.weights[row + j] * d;
                }
            }
            delta = grad_input;
        }
    }

    /// Overwrite parameters with another network's (target network sync).
    pub fn copy_from(&mut self, other: &Mlp) {
        self.layers.clone_from(&other.layers);
    }
}

fn relu(x: &mut [f32]) {
    for v in x.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
}

/// Step-decay learning-rate schedule.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepDecay {
    /// Decay every this many `advance` calls.
    pub step_size: usize,
    /// Multiplier applied at each decay.
    pub gamma: f32,
}

/// Adam optimizer with decoupled weight decay (AdamW when `weight_decay > 0`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    weight_decay: f32,
    schedule: Option<StepDecay>,
    schedule_steps: usize,
    t: u32,
    m: Vec<Vec<f32>>,
    v: Vec<Vec<f32>>,
}

impl Adam {
    /// Create an optimizer for a network.
    #[must_use]
    pub fn new(network: &Mlp, learning_rate: f32) -> Self {
        let shapes: Vec<usize> = network
            .layers
            .iter()
            .flat_map(|l| [l.weights.len(), l.bias.len()])
            .collect();
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            weight_decay: 0.0,
            schedule: None,
            schedule_steps: 0,
            t: 0,
            m: shapes.iter().map(|&n| vec![0.0; n]).collect(),
            v: shapes.iter().map(|&n| vec![0.0; n]).collect(),
        }
    }

    /// Enable decoupled weight decay.
    #[must_use]
    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// Enable a step-decay schedule driven by `advance_schedule`.
    #[must_use]
    pub fn with_schedule(mut self, schedule: StepDecay) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Current learning rate.
    #[must_use]
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Count one schedule step (an episode) and decay when due.
    pub fn advance_schedule(&mut self) {
        if let Some(schedule) = self.schedule {
            self.schedule_steps += 1;
            if schedule.step_size > 0 && self.schedule_steps % schedule.step_size == 0 {
                self.learning_rate *= schedule.gamma;
            }
        }
    }

    /// Apply one update to `network`.
    pub fn step(&mut self, network: &mut Mlp, grads: &MlpGradients) {
        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias2 = 1.0 - self.beta2.powi(self.t as i32);
        let lr = self.learning_rate;

        for (li, layer) in network.layers.iter_mut().enumerate() {
            let params = [
                (&mut layer.weights, &grads.weights[li], true),
                (&mut layer.bias, &grads.bias[li], false),
            ];
            for (pi, (values, grad, decay)) in params.into_iter().enumerate() {
                let slot = li * 2 + pi;
                let (m, v) = (&mut self.m[slot], &mut self.v[slot]);
                for k in 0..values.len() {
                    let g = grad[k];
                    m[k] = self.beta1 * m[k] + (1.0 - self.beta1) * g;
                    v[k] = self.beta2 * v[k] + (1.0 - self.beta2) * g * g;
                    let m_hat = m[k] / bias1;
                    let v_hat = v[k] / bias2;
                    if decay && self.weight_decay > 0.0 {
                        values[k] -= lr * self.weight_decay * values[k];
                    }
                    values[k] -= lr * m_hat / (v_hat.sqrt() + self.epsilon);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_grad(net: &Mlp, input: &[f32], layer: usize, index: usize) -> f32 {
        // d(sum of outputs)/d(weight) by central differences
        let eps = 1e-3;
        let mut plus = net.clone();
        plus.layers[layer].weights[index] += eps;
        let mut minus = net.clone();
        minus.layers[layer].weights[index] -= eps;
        let f = |n: &Mlp| n.forward(input).iter().sum::<f32>();
        (f(&plus) - f(&minus)) / (2.0 * eps)
    }

    #[test]
    fn test_shapes() {
        let mut rng = DraftRng::new(0);
        let net = Mlp::new(&[3, 5, 2], &mut rng);
        assert_eq!(net.input_size(), 3);
        assert_eq!(net.output_size(), 2);
        assert_eq!(net.parameter_count(), 3 * 5 + 5 + 5 * 2 + 2);
        assert_eq!(net.forward(&[1.0, 2.0, 3.0]).len(), 2);
    }

    #[test]
    fn test_forward_cached_matches_forward() {
        let mut rng = DraftRng::new(1);
        let net = Mlp::new(&[4, 6, 6, 3], &mut rng);
        let x = [0.5, -1.0, 0.25, 2.0];
        assert_eq!(net.forward_cached(&x).output(), net.forward(&x).as_slice());
    }

    #[test]
    fn test_backward_matches_numeric() {
        let mut rng = DraftRng::new(2);
        let net = Mlp::new(&[3, 4, 2], &mut rng);
        let x = [0.3, -0.7, 1.1];

        let cache = net.forward_cached(&x);
        let mut grads = net.zero_grads();
        net.backward(&cache, &[1.0, 1.0], &mut grads);

        for layer in 0..2 {
            for index in 0..net.layers[layer].weights.len() {
                let analytic = grads.weights[layer][index];
                let numeric = numeric_grad(&net, &x, layer, index);
                assert!(
                    (analytic - numeric).abs() < 1e-2,
                    "layer {layer} weight {index}: {analytic} vs {numeric}"
                );
            }
        }
    }

    #[test]
    fn test_clip_norm() {
        let mut rng = DraftRng::new(3);
        let net = Mlp::new(&[2, 2], &mut rng);
        let mut grads = net.zero_grads();
        grads.weights[0] = vec![3.0, 4.0, 0.0, 0.0];

        let before = grads.clip_norm(1.0);
        assert!((before - 5.0).abs() < 1e-6);
        assert!((grads.norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_adam_fits_regression() {
        // y = 2x - 1 on a handful of points
        let mut rng = DraftRng::new(4);
        let mut net = Mlp::new(&[1, 8, 1], &mut rng);
        let mut adam = Adam::new(&net, 0.02);
        let data: Vec<(f32, f32)> = (0..8).map(|i| (i as f32 / 4.0, i as f32 / 2.0 - 1.0)).collect();

        let loss = |net: &Mlp| -> f32 {
            data.iter().map(|(x, y)| (net.forward(&[*x])[0] - y).powi(2)).sum::<f32>() / data.len() as f32
        };
        let initial = loss(&net);

        for _ in 0..500 {
            let mut grads = net.zero_grads();
            for (x, y) in &data {
                let cache = net.forward_cached(&[*x]);
                let err = cache.output()[0] - y;
                net.backward(&cache, &[2.0 * err / data.len() as f32], &mut grads);
            }
            adam.step(&mut net, &grads);
        }

        assert!(loss(&net) < initial * 0.1);
    }

    #[test]
    fn test_schedule_and_copy() {
        let mut rng = DraftRng::new(5);
        let net = Mlp::new(&[2, 2], &mut rng);
        let mut adam = Adam::new(&net, 1.0).with_schedule(StepDecay { step_size: 2, gamma: 0.5 });
        adam.advance_schedule();
        assert_eq!(adam.learning_rate(), 1.0);
        adam.advance_schedule();
        assert_eq!(adam.learning_rate(), 0.5);

        let mut target = Mlp::new(&[2, 2], &mut rng);
        assert_ne!(target, net);
        target.copy_from(&net);
        assert_eq!(target, net);
    }
}
