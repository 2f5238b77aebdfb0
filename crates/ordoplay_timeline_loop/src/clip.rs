// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loop control clips.

use crate::track::TrackId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable position of a clip inside one registry generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipIndex(pub usize);

impl ClipIndex {
    /// Get the raw index value
    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ClipIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a clip does when playback reaches its action point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ClipControl {
    /// Jump back to the clip start once `end - offset` is reached
    Loop {
        /// Seconds subtracted from the clip end to get the loop point
        offset: f64,
    },
    /// Hold playback at the clip start until resumed
    Pause,
    /// Consume the clip when its end is reached, without seeking
    Skip,
    /// Jump over the clip as soon as its start is reached
    AutoSkip,
}

impl ClipControl {
    /// Loop control without offset
    pub const LOOP: Self = Self::Loop { offset: 0.0 };

    /// Get the display name used for clip labels
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loop { .. } => "LoopClip",
            Self::Pause => "PauseClip",
            Self::Skip => "SkipClip",
            Self::AutoSkip => "AutoSkip",
        }
    }

    /// Whether this control rewinds playback
    pub fn is_loop(&self) -> bool {
        matches!(self, Self::Loop { .. })
    }

    /// Time at which a clip with this control acts
    pub fn action_point(&self, start: f64, end: f64) -> f64 {
        match *self {
            Self::Loop { offset } => end - offset,
            Self::Pause | Self::AutoSkip => start,
            Self::Skip => end,
        }
    }
}

/// Registered clip with its scheduling state
#[derive(Debug, Clone, PartialEq)]
pub struct ClipDescriptor {
    /// Stable index within the registry generation
    pub index: ClipIndex,
    /// Clip name as authored on the timeline
    pub name: String,
    /// Control behavior
    pub control: ClipControl,
    /// Window start in timeline seconds
    pub start: f64,
    /// Window end in timeline seconds
    pub end: f64,
    /// Owning track
    pub track: TrackId,
    /// Order index of the owning track, lower wins ties
    pub track_order: usize,
    /// Whether the action point has been consumed
    pub played: bool,
    /// Clips re-armed when this clip loops
    pub(crate) revive: Vec<ClipIndex>,
}

impl ClipDescriptor {
    /// Create an unplayed clip with an empty revive list
    pub fn new(
        index: ClipIndex,
        name: impl Into<String>,
        control: ClipControl,
        start: f64,
        end: f64,
        track: TrackId,
        track_order: usize,
    ) -> Self {
        Self {
            index,
            name: name.into(),
            control,
            start,
            end,
            track,
            track_order,
            played: false,
            revive: Vec::new(),
        }
    }

    /// Time at which this clip acts
    pub fn action_point(&self) -> f64 {
        self.control.action_point(self.start, self.end)
    }

    /// Loop offset in seconds, zero for non-loop clips
    pub fn offset(&self) -> f64 {
        match self.control {
            ClipControl::Loop { offset } => offset,
            _ => 0.0,
        }
    }

    /// Clips re-armed when this clip loops
    pub fn revive_list(&self) -> &[ClipIndex] {
        &self.revive
    }

    /// Label shown by inspectors, e.g. `3_PauseClip`
    pub fn display_name(&self) -> String {
        format!("{}_{}", self.index, self.control.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(control: ClipControl, start: f64, end: f64) -> ClipDescriptor {
        ClipDescriptor::new(ClipIndex(3), "clip", control, start, end, TrackId::new(), 0)
    }

    #[test]
    fn test_action_points() {
        assert_eq!(clip(ClipControl::Loop { offset: 2.0 }, 0.0, 10.0).action_point(), 8.0);
        assert_eq!(clip(ClipControl::Pause, 4.0, 6.0).action_point(), 4.0);
        assert_eq!(clip(ClipControl::Skip, 2.0, 8.0).action_point(), 8.0);
        assert_eq!(clip(ClipControl::AutoSkip, 2.0, 8.0).action_point(), 2.0);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(clip(ClipControl::Pause, 0.0, 1.0).display_name(), "3_PauseClip");
        assert_eq!(clip(ClipControl::LOOP, 0.0, 1.0).display_name(), "3_LoopClip");
    }

    #[test]
    fn test_offset_only_for_loops() {
        assert_eq!(clip(ClipControl::Loop { offset: 0.5 }, 0.0, 1.0).offset(), 0.5);
        assert_eq!(clip(ClipControl::Skip, 0.0, 1.0).offset(), 0.0);
    }
}
