// SPDX-License-Identifier: MIT OR Apache-2.0
//! The external timeline seen by the scheduler.
//!
//! The host engine owns rendering and animation. The scheduler only reads
//! track and clip metadata from it and sends it transport commands.

use crate::clip::ClipControl;
use crate::track::{TrackId, TrackKind};
use serde::{Deserialize, Serialize};

/// Behavior when playback passes the end of the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WrapMode {
    /// Stop playback
    #[default]
    None,
    /// Restart from zero
    Loop,
    /// Clamp to the duration
    Hold,
}

/// Clip metadata as reported by the host
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSource {
    /// Clip name
    pub name: String,
    /// Window start in seconds
    pub start: f64,
    /// Window end in seconds
    pub end: f64,
    /// Loop control metadata, `None` for clips of other types
    pub control: Option<ClipControl>,
}

/// Track metadata as reported by the host
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSource {
    /// Track ID
    pub id: TrackId,
    /// Track name
    pub name: String,
    /// Track kind
    pub kind: TrackKind,
    /// Position among the root output tracks, groups flattened
    pub order_index: usize,
    /// Whether the track is muted
    pub muted: bool,
    /// Clips in timeline order
    pub clips: Vec<ClipSource>,
}

/// Timeline/director interface consumed by the scheduler
pub trait TimelineHost {
    /// Output tracks in output order
    fn output_tracks(&self) -> Vec<TrackSource>;

    /// Total duration in seconds
    fn duration(&self) -> f64;

    /// Configured wrap mode
    fn wrap_mode(&self) -> WrapMode;

    /// Current host time in seconds
    fn time(&self) -> f64;

    /// Move the host to a time
    fn seek(&mut self, time: f64);

    /// Start host playback
    fn play(&mut self);

    /// Suspend host playback
    fn pause(&mut self);

    /// Continue suspended playback
    fn resume(&mut self);

    /// Halt playback and rewind
    fn stop(&mut self);

    /// Evaluate/render at the current time
    fn evaluate(&mut self);
}
