//! Saved policies keyed by agent kind and version tag.
//!
//! A snapshot wraps the agent's own bincode-encoded parameters. Files live
//! at `<dir>/<kind>-<version>.bin`. Loading checks the kind first, then the
//! version, and only then decodes the payload.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AgentKind;
use crate::core::{DraftError, Result};

/// Default version tag for freshly built agents.
pub const DEFAULT_POLICY_VERSION: &str = "v1";

/// Serialized policy parameters for one agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub kind: AgentKind,
    pub version: String,
    pub payload: Vec<u8>,
}

impl PolicySnapshot {
    /// Encode parameters into a snapshot.
    pub fn encode<T: Serialize>(kind: AgentKind, version: impl Into<String>, params: &T) -> Result<Self> {
        Ok(Self {
            kind,
            version: version.into(),
            payload: bincode::serialize(params)?,
        })
    }

    /// Check kind and version, then decode the payload.
    pub fn decode<T: DeserializeOwned>(&self, kind: AgentKind, version: &str) -> Result<T> {
        if self.kind != kind {
            return Err(DraftError::IncompatiblePolicy(format!(
                "snapshot holds a {} policy, expected {kind}",
                self.kind
            )));
        }
        if self.version != version {
            return Err(DraftError::VersionMismatch {
                kind: kind.label().to_string(),
                expected: version.to_string(),
                found: self.version.clone(),
            });
        }
        bincode::deserialize(&self.payload).map_err(|e| {
            DraftError::IncompatiblePolicy(format!("{kind} payload could not be decoded: {e}"))
        })
    }

    /// File name for this snapshot.
    #[must_use]
    pub fn file_name(&self) -> String {
        Self::file_name_for(self.kind, &self.version)
    }

    /// File name for a kind and version.
    #[must_use]
    pub fn file_name_for(kind: AgentKind, version: &str) -> String {
        format!("{}-{version}.bin", kind.label())
    }

    /// Write to `<dir>/<kind>-<version>.bin`, creating `dir` if needed.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, bincode::serialize(self)?)?;
        info!(path = %path.display(), kind = %self.kind, version = %self.version, "saved policy");
        Ok(path)
    }

    /// Read a snapshot file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(bincode::deserialize(&bytes)?)
    }

    /// Read the snapshot for a kind and version from `dir`.
    pub fn load_from_dir(dir: &Path, kind: AgentKind, version: &str) -> Result<Self> {
        Self::load(&dir.join(Self::file_name_for(kind, version)))
    }
}
