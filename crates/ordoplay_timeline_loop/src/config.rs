// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loop playback settings.
//!
//! Settings are stored as RON, the same format the editor uses for project
//! files.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Default tolerance when resuming from a start time
pub const DEFAULT_RESUME_EPSILON: f64 = 0.01;

/// Playback settings for loop timelines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    /// Settings format version
    pub version: u32,
    /// Rebuild clip data when the host timeline starts from zero
    pub auto_prepare: bool,
    /// Start playback as soon as the driver is enabled
    pub play_on_awake: bool,
    /// Playback speed multiplier
    pub speed: f64,
    /// Tolerance applied when resuming from a start time
    pub resume_epsilon: f64,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            auto_prepare: true,
            play_on_awake: false,
            speed: 1.0,
            resume_epsilon: DEFAULT_RESUME_EPSILON,
        }
    }
}

impl LoopSettings {
    /// Check value ranges and format version
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version > SETTINGS_FORMAT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: self.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(ConfigError::InvalidSpeed(self.speed));
        }
        if !self.resume_epsilon.is_finite() || self.resume_epsilon < 0.0 {
            return Err(ConfigError::InvalidEpsilon(self.resume_epsilon));
        }
        Ok(())
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Deserialize from RON format and validate
    pub fn from_ron(s: &str) -> Result<Self, ConfigError> {
        let settings: LoopSettings = ron::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Save settings to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}
