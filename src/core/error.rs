//! Error taxonomy for the draft simulator.
//!
//! - `Config`: bad environment / trainer setup, fatal before any episode
//! - `DataValidation`: malformed player pool input, fatal at load
//! - `IllegalAction`: a pick outside the legal set, rejected without mutation
//! - `VersionMismatch` / `IncompatiblePolicy`: policy load failures, fatal
//!   for that load only

use thiserror::Error;

use super::player::PlayerId;
use super::team::TeamId;

/// Errors raised by the draft environment, agents, and orchestration.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid player data (row {row}): {reason}")]
    DataValidation { row: usize, reason: String },

    #[error("illegal action: {team} cannot draft {player}: {reason}")]
    IllegalAction {
        team: TeamId,
        player: PlayerId,
        reason: String,
    },

    #[error("draft is already complete")]
    DraftComplete,

    #[error("policy version mismatch for {kind}: expected {expected}, found {found}")]
    VersionMismatch {
        kind: String,
        expected: String,
        found: String,
    },

    #[error("incompatible policy: {0}")]
    IncompatiblePolicy(String),

    #[error("settings error: {0}")]
    Settings(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DraftError {
    /// Shorthand for a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    /// Shorthand for a data validation error at a given input row.
    pub fn data(row: usize, reason: impl Into<String>) -> Self {
        Self::DataValidation {
            row,
            reason: reason.into(),
        }
    }

    /// Whether this error invalidates a whole run rather than one episode.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::DataValidation { .. } | Self::Settings(_))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DraftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DraftError::IllegalAction {
            team: TeamId::new(1),
            player: PlayerId::new(7),
            reason: "already drafted".into(),
        };
        assert_eq!(
            err.to_string(),
            "illegal action: Team 1 cannot draft Player#7: already drafted"
        );

        let err = DraftError::data(3, "missing position");
        assert_eq!(err.to_string(), "invalid player data (row 3): missing position");
    }

    #[test]
    fn test_fatality() {
        assert!(DraftError::config("x").is_fatal());
        assert!(DraftError::data(0, "x").is_fatal());
        assert!(!DraftError::DraftComplete.is_fatal());
    }
}
