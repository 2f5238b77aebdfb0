// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for timeline documents and loop settings.
//!
//! Scheduling itself never fails: an empty registry or an out-of-range
//! start time degrades to an idle state. Errors only surface at the edges
//! where documents are built or loaded.

use crate::track::TrackId;
use thiserror::Error;

/// Errors raised while building or loading a timeline document
#[derive(Debug, Error)]
pub enum TimelineError {
    /// Clip window ends before it starts
    #[error("Invalid clip window: start {start} is after end {end}")]
    InvalidClipWindow {
        /// Clip start time
        start: f64,
        /// Clip end time
        end: f64,
    },

    /// Negative or non-finite time value
    #[error("Invalid time value: {0}")]
    InvalidTime(f64),

    /// Frame rate is zero, negative or not finite
    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(f64),

    /// Track is not part of the timeline
    #[error("Track not found: {0:?}")]
    TrackNotFound(TrackId),

    /// RON parse error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] ron::Error),

    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading or validating [`LoopSettings`](crate::config::LoopSettings)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings file was written by a newer format
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version found in the file
        found: u32,
        /// Newest version this build understands
        supported: u32,
    },

    /// Speed multiplier is negative or not finite
    #[error("Invalid playback speed: {0}")]
    InvalidSpeed(f64),

    /// Resume tolerance is negative or not finite
    #[error("Invalid resume epsilon: {0}")]
    InvalidEpsilon(f64),

    /// RON parse error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] ron::Error),

    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for timeline document operations
pub type Result<T> = std::result::Result<T, TimelineError>;
