// SPDX-License-Identifier: MIT OR Apache-2.0
//! Track definitions for loop scheduling.

use crate::clip::ClipIndex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub Uuid);

impl TrackId {
    /// Create a new random track ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind of a timeline output track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackKind {
    /// Loop/pause/skip control track
    #[default]
    LoopControl,
    /// Animation, audio or any other track the scheduler ignores
    Other,
}

impl TrackKind {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoopControl => "Loop Control",
            Self::Other => "Other",
        }
    }
}

/// A registered control track
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Track ID on the host timeline
    pub id: TrackId,
    /// Track name
    pub name: String,
    /// Position among the root timeline's output tracks
    pub order_index: usize,
    /// Whether the track is muted
    pub muted: bool,
    /// Owned clips in discovery order
    clips: Vec<ClipIndex>,
}

impl Track {
    /// Create an empty track
    pub fn new(id: TrackId, name: impl Into<String>, order_index: usize, muted: bool) -> Self {
        Self {
            id,
            name: name.into(),
            order_index,
            muted,
            clips: Vec::new(),
        }
    }

    /// Append a clip
    pub fn push_clip(&mut self, index: ClipIndex) {
        self.clips.push(index);
    }

    /// Get all clips
    pub fn clips(&self) -> &[ClipIndex] {
        &self.clips
    }

    /// Get clip count
    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }
}
