//! Observations and function approximation for the learning agents.
//!
//! ## Overview
//!
//! - **Traits**: `PolicyNetwork`, `ValueNetwork`, `PolicyValueNetwork`
//! - **Encoding**: `StateEncoder` with `SelfOnlyEncoder` and `FullEncoder`
//! - **Masks**: `ActionMask` plus masked softmax / argmax helpers
//! - **Networks**: `Mlp` with manual backprop, `Adam`, `PolicyValueModel`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use draft_optimizer::nn::{EncodeScope, ObservationEncoder};
//!
//! let encoder = ObservationEncoder::new(&config);
//! let observation = encoder.encode(&state, team, EncodeScope::Full);
//! let (probs, value) = model.predict(&observation, &mask);
//! ```

pub mod encoder;
pub mod mlp;
pub mod model;
pub mod traits;

pub use encoder::{EncodeScope, FullEncoder, ObservationEncoder, SelfOnlyEncoder, StateEncoder};
pub use mlp::{Adam, Dense, ForwardCache, Mlp, MlpGradients, StepDecay};
pub use model::{masked_entropy, policy_logit_grad, PolicyValueModel};
pub use traits::{
    masked_argmax, masked_max, masked_softmax, ActionMask, Observation, PolicyNetwork,
    PolicyValueNetwork, ValueNetwork, ACTION_SPACE,
};
