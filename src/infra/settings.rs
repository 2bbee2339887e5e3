//! Settings presets resolved by name.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{OptimizerSettings, SettingsChoice};
use crate::core::{OptimizationError, SettingsProvider};

/// Default settings plus named presets.
///
/// JSON layout: `{"default": {...}, "presets": {"name": {...}}}`; both keys
/// are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsRegistry {
    /// Settings used for [`SettingsChoice::Default`].
    pub default: OptimizerSettings,
    /// Settings used for [`SettingsChoice::Named`].
    pub presets: HashMap<String, OptimizerSettings>,
}

impl SettingsRegistry {
    /// Registry with the given default and no presets.
    #[must_use]
    pub fn new(default: OptimizerSettings) -> Self {
        Self { default, presets: HashMap::new() }
    }

    /// Builder-style preset registration.
    #[must_use]
    pub fn with_preset(mut self, name: impl Into<String>, settings: OptimizerSettings) -> Self {
        self.presets.insert(name.into(), settings);
        self
    }

    /// Validate the default and every preset.
    ///
    /// # Errors
    ///
    /// Returns a description naming the offending preset.
    pub fn validate(&self) -> Result<(), String> {
        self.default.validate().map_err(|e| format!("default: {e}"))?;
        for (name, settings) in &self.presets {
            settings.validate().map_err(|e| format!("preset `{name}`: {e}"))?;
        }
        Ok(())
    }

    /// Parse and validate a registry from JSON.
    ///
    /// # Errors
    ///
    /// Returns a message on malformed JSON or invalid settings.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let registry: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        registry.validate()?;
        Ok(registry)
    }

    /// Read a registry from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns a message when the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
        Self::from_json_str(&raw)
    }
}

impl SettingsProvider for SettingsRegistry {
    fn resolve(&self, choice: &SettingsChoice) -> Result<OptimizerSettings, OptimizationError> {
        match choice {
            SettingsChoice::Default => Ok(self.default.clone()),
            SettingsChoice::Named(name) => self
                .presets
                .get(name)
                .cloned()
                .ok_or_else(|| OptimizationError::UnknownSettings(name.clone())),
            SettingsChoice::Custom(settings) => Ok(settings.clone()),
        }
    }
}
