//! Content fingerprint of an optimization problem.
//!
//! The key is identity based: teams and boats are hashed by `id` after
//! sorting, so re-ordering, renaming or recoloring a roster keeps the key.
//! Settings participate through their canonical JSON form.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::OptimizationError;
use super::model::{Boat, Team};
use crate::config::OptimizerSettings;

/// Lowercase hex SHA-256 digest identifying a problem and its settings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already computed digest.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the fingerprint of a problem.
///
/// # Errors
///
/// Returns [`OptimizationError::InvalidProblem`] when the team or boat set is
/// empty, or [`OptimizationError::InternalFault`] if the settings cannot be
/// serialized.
pub fn fingerprint(
    teams: &[Team],
    boats: &[Boat],
    flights: u32,
    settings: &OptimizerSettings,
) -> Result<Fingerprint, OptimizationError> {
    if teams.is_empty() {
        return Err(OptimizationError::InvalidProblem("team roster is empty".into()));
    }
    if boats.is_empty() {
        return Err(OptimizationError::InvalidProblem("boat pool is empty".into()));
    }

    let mut team_ids: Vec<&str> = teams.iter().map(|t| t.id.as_str()).collect();
    team_ids.sort_unstable();
    let mut boat_ids: Vec<&str> = boats.iter().map(|b| b.id.as_str()).collect();
    boat_ids.sort_unstable();
    let settings_json = serde_json::to_string(settings)
        .map_err(|e| OptimizationError::InternalFault(format!("settings serialization: {e}")))?;

    let mut hasher = Sha256::new();
    update_section(&mut hasher, b"teams", &team_ids);
    update_section(&mut hasher, b"boats", &boat_ids);
    hasher.update(b"flights");
    hasher.update(flights.to_le_bytes());
    hasher.update(b"settings");
    update_field(&mut hasher, settings_json.as_bytes());

    let digest = hasher.finalize();
    let hex = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
    Ok(Fingerprint(hex))
}

fn update_section(hasher: &mut Sha256, tag: &[u8], ids: &[&str]) {
    hasher.update(tag);
    hasher.update((ids.len() as u64).to_le_bytes());
    for id in ids {
        update_field(hasher, id.as_bytes());
    }
}

// Length prefix keeps ("ab","c") and ("a","bc") apart.
fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
