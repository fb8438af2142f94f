//! Run settings from `draft_optimizer.toml`.
//!
//! # Priority
//!
//! Highest to lowest:
//! 1. Environment variables (`DRAFT_<SECTION>_<KEY>`)
//! 2. The settings file
//! 3. Built-in defaults
//!
//! ```text
//! DRAFT_OPTIMIZER_CONFIG=/etc/draft.toml
//! DRAFT_DRAFT_TEAMS=12
//! DRAFT_TRAINER_EPISODES=5000
//! DRAFT_THUNDERDOME_OUTPUT_PATH=out/standings.csv
//! ```
//!
//! The library never reads settings on its own; the binary loads them and
//! passes the individual configs into constructors.

mod loader;
mod structs;

pub use loader::{
    apply_env_overrides, apply_overrides, load_from_path, load_settings, parse_settings, CONFIG_ENV, CONFIG_FILE,
};
pub use structs::{DataSettings, Settings};

#[cfg(test)]
mod tests;
