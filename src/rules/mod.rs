//! Draft rules: pick order, lineup scoring, and the environment.
//!
//! `DraftEnvironment` owns the draft state and is the only component that
//! mutates it:
//! - Which players are legal for the team on the clock
//! - How a pick modifies state
//! - When the draft ends and how teams score

pub mod environment;
pub mod pick_order;
pub mod scoring;

pub use environment::{DraftEnvironment, LegalActions, StepOutcome};
pub use pick_order::PickOrder;
pub use scoring::{best_lineup, shaping_reward, Lineup, RewardScheme};
