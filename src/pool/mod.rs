//! Player pool: the immutable catalog a run drafts from.
//!
//! - `PlayerPool`: validated catalog with per-position aggregates
//! - `load_pool`: CSV input with row-level validation
//! - `load_history`: recorded real drafts for replay opponents

pub mod catalog;
pub mod history;
pub mod loader;

pub use catalog::PlayerPool;
pub use history::{load_history, load_history_from_reader, HistoricalPick, RealDraft};
pub use loader::{load_pool, load_pool_from_reader};
