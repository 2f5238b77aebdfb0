// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory timeline document.
//!
//! [`Timeline`] is a small [`TimelineHost`] that keeps its tracks in
//! memory and records the transport commands it receives. The preview
//! tool loads it from RON, and tests use it in place of an engine
//! director.

use crate::clip::ClipControl;
use crate::error::{Result, TimelineError};
use crate::host::{ClipSource, TimelineHost, TrackSource, WrapMode};
use crate::track::{TrackId, TrackKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Default frame rate used to convert loop offsets from frames to seconds
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Unique identifier for a timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimelineId(pub Uuid);

impl TimelineId {
    /// Create a new random timeline ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimelineId {
    fn default() -> Self {
        Self::new()
    }
}

/// Authored control type of a loop clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlKind {
    /// Loop back to the clip start
    Loop,
    /// Pause at the clip start
    Pause,
    /// Consume at the clip end
    Skip,
    /// Jump to the clip end
    AutoSkip,
}

/// Loop clip asset as authored in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopClipAsset {
    /// Control type
    pub control_type: ControlKind,
    /// Loop point offset from the clip end, in frames
    #[serde(default)]
    pub offset_frames: u32,
}

impl LoopClipAsset {
    /// Resolve to a runtime control at the given frame rate
    pub fn control(&self, frame_rate: f64) -> ClipControl {
        match self.control_type {
            ControlKind::Loop => ClipControl::Loop {
                offset: f64::from(self.offset_frames) / frame_rate,
            },
            ControlKind::Pause => ClipControl::Pause,
            ControlKind::Skip => ClipControl::Skip,
            ControlKind::AutoSkip => ClipControl::AutoSkip,
        }
    }
}

/// A clip placed on a timeline track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineClip {
    /// Clip ID
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Clip name
    pub name: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Loop control asset, absent for other clip types
    #[serde(default)]
    pub asset: Option<LoopClipAsset>,
}

impl TimelineClip {
    /// Create a loop control clip
    pub fn control(name: impl Into<String>, control_type: ControlKind, start: f64, end: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            start,
            end,
            asset: Some(LoopClipAsset {
                control_type,
                offset_frames: 0,
            }),
        }
    }

    /// Create a clip without loop control metadata
    pub fn plain(name: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            start,
            end,
            asset: None,
        }
    }

    /// Set the loop offset in frames
    pub fn with_offset_frames(mut self, frames: u32) -> Self {
        if let Some(asset) = &mut self.asset {
            asset.offset_frames = frames;
        }
        self
    }

    fn validate(&self) -> Result<()> {
        for time in [self.start, self.end] {
            if !time.is_finite() || time < 0.0 {
                return Err(TimelineError::InvalidTime(time));
            }
        }
        if self.start > self.end {
            return Err(TimelineError::InvalidClipWindow {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// A track in a timeline document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineTrack {
    /// Track ID
    #[serde(default)]
    pub id: TrackId,
    /// Track name
    pub name: String,
    /// Track kind
    #[serde(default)]
    pub kind: TrackKind,
    /// Whether the track is muted
    #[serde(default)]
    pub muted: bool,
    /// Clips in this track
    #[serde(default)]
    pub clips: Vec<TimelineClip>,
}

impl TimelineTrack {
    /// Create an empty track
    pub fn new(name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: TrackId::new(),
            name: name.into(),
            kind,
            muted: false,
            clips: Vec::new(),
        }
    }

    /// Add a clip, keeping clips sorted by start time
    pub fn add_clip(&mut self, clip: TimelineClip) -> Result<Uuid> {
        clip.validate()?;
        let id = clip.id;
        self.clips.push(clip);
        self.clips.sort_by(|a, b| a.start.total_cmp(&b.start));
        Ok(id)
    }
}

/// Transport state of the in-memory host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostState {
    /// Stopped
    #[default]
    Stopped,
    /// Playing
    Playing,
    /// Paused
    Paused,
}

/// Transport command received by the in-memory host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostCommand {
    /// Seek to a time
    Seek(f64),
    /// Start playback
    Play,
    /// Pause playback
    Pause,
    /// Resume playback
    Resume,
    /// Stop playback
    Stop,
}

/// A timeline of tracks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    /// Unique timeline ID
    #[serde(default)]
    pub id: TimelineId,
    /// Timeline name
    pub name: String,
    /// Tracks in output order
    tracks: IndexMap<TrackId, TimelineTrack>,
    /// Timeline duration (can be longer than tracks)
    pub duration: f64,
    /// Frame rate for loop offsets
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    /// Behavior past the end
    #[serde(default)]
    pub wrap_mode: WrapMode,
    #[serde(skip)]
    time: f64,
    #[serde(skip)]
    state: HostState,
    #[serde(skip)]
    commands: Vec<HostCommand>,
    #[serde(skip)]
    evaluations: u64,
}

fn default_frame_rate() -> f64 {
    DEFAULT_FRAME_RATE
}

impl Timeline {
    /// Create an empty timeline
    pub fn new(name: impl Into<String>, duration: f64) -> Self {
        Self {
            id: TimelineId::new(),
            name: name.into(),
            tracks: IndexMap::new(),
            duration,
            frame_rate: DEFAULT_FRAME_RATE,
            wrap_mode: WrapMode::None,
            time: 0.0,
            state: HostState::Stopped,
            commands: Vec::new(),
            evaluations: 0,
        }
    }

    /// Set the wrap mode
    pub fn with_wrap_mode(mut self, wrap_mode: WrapMode) -> Self {
        self.wrap_mode = wrap_mode;
        self
    }

    /// Add a track
    pub fn add_track(&mut self, track: TimelineTrack) -> TrackId {
        let id = track.id;
        self.tracks.insert(id, track);
        id
    }

    /// Add an empty loop control track
    pub fn add_control_track(&mut self, name: impl Into<String>) -> TrackId {
        self.add_track(TimelineTrack::new(name, TrackKind::LoopControl))
    }

    /// Get a track
    pub fn track(&self, track_id: TrackId) -> Option<&TimelineTrack> {
        self.tracks.get(&track_id)
    }

    /// Get all tracks
    pub fn tracks(&self) -> impl Iterator<Item = &TimelineTrack> {
        self.tracks.values()
    }

    /// Get track count
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Add a clip to a track
    pub fn add_clip(&mut self, track_id: TrackId, clip: TimelineClip) -> Result<Uuid> {
        self.tracks
            .get_mut(&track_id)
            .ok_or(TimelineError::TrackNotFound(track_id))?
            .add_clip(clip)
    }

    /// Mute or unmute a track
    pub fn set_muted(&mut self, track_id: TrackId, muted: bool) -> Result<()> {
        let track = self
            .tracks
            .get_mut(&track_id)
            .ok_or(TimelineError::TrackNotFound(track_id))?;
        track.muted = muted;
        Ok(())
    }

    /// Current transport state
    pub fn state(&self) -> HostState {
        self.state
    }

    /// Transport commands received so far
    pub fn commands(&self) -> &[HostCommand] {
        &self.commands
    }

    /// Drain the recorded transport commands
    pub fn take_commands(&mut self) -> Vec<HostCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of evaluate calls received
    pub fn evaluation_count(&self) -> u64 {
        self.evaluations
    }

    /// Advance host-driven playback by one engine frame
    pub fn advance(&mut self, delta_time: f64) {
        if self.state != HostState::Playing {
            return;
        }

        self.time += delta_time;
        if self.time >= self.duration {
            match self.wrap_mode {
                WrapMode::None => {
                    self.time = self.duration;
                    self.state = HostState::Stopped;
                }
                WrapMode::Loop if self.duration > 0.0 => self.time %= self.duration,
                WrapMode::Loop => self.time = 0.0,
                WrapMode::Hold => self.time = self.duration,
            }
        }
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Deserialize from RON format, validating the frame rate and every clip window
    ///
    /// Track IDs follow their map keys and clips are sorted by start time.
    pub fn from_ron(s: &str) -> Result<Self> {
        let mut timeline: Timeline = ron::from_str(s)?;
        if !(timeline.frame_rate.is_finite() && timeline.frame_rate > 0.0) {
            return Err(TimelineError::InvalidFrameRate(timeline.frame_rate));
        }
        for (id, track) in &mut timeline.tracks {
            track.id = *id;
            for clip in &track.clips {
                clip.validate()?;
            }
            track.clips.sort_by(|a, b| a.start.total_cmp(&b.start));
        }
        Ok(timeline)
    }

    /// Save timeline to file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Load timeline from file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new("Untitled Timeline", 10.0)
    }
}

impl TimelineHost for Timeline {
    fn output_tracks(&self) -> Vec<TrackSource> {
        self.tracks
            .values()
            .enumerate()
            .map(|(order_index, track)| TrackSource {
                id: track.id,
                name: track.name.clone(),
                kind: track.kind,
                order_index,
                muted: track.muted,
                clips: track
                    .clips
                    .iter()
                    .map(|clip| ClipSource {
                        name: clip.name.clone(),
                        start: clip.start,
                        end: clip.end,
                        control: clip.asset.map(|a| a.control(self.frame_rate)),
                    })
                    .collect(),
            })
            .collect()
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn wrap_mode(&self) -> WrapMode {
        self.wrap_mode
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn seek(&mut self, time: f64) {
        self.time = time;
        self.commands.push(HostCommand::Seek(time));
    }

    fn play(&mut self) {
        self.state = HostState::Playing;
        self.commands.push(HostCommand::Play);
    }

    fn pause(&mut self) {
        if self.state == HostState::Playing {
            self.state = HostState::Paused;
        }
        self.commands.push(HostCommand::Pause);
    }

    fn resume(&mut self) {
        if self.state == HostState::Paused {
            self.state = HostState::Playing;
        }
        self.commands.push(HostCommand::Resume);
    }

    fn stop(&mut self) {
        self.state = HostState::Stopped;
        self.time = 0.0;
        self.commands.push(HostCommand::Stop);
    }

    fn evaluate(&mut self) {
        self.evaluations += 1;
    }
}
