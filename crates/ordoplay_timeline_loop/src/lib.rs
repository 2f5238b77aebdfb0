// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loop control playback for OrdoPlay timelines.
//!
//! This crate turns plain timeline clips into flow control:
//! - Loop clips jump back to their start and re-arm the clips they cover
//! - Pause clips hold playback until resumed
//! - Skip clips are consumed when passed
//! - Auto-skip clips jump straight to their end
//!
//! ## Architecture
//!
//! The crate is built on:
//! - A clip registry rebuilt from a [`TimelineHost`]
//! - A scheduler that picks the next clip to act and fires it
//! - Two execution models:
//!   - [`ClipManager`] and [`LoopMixer`] when the host advances time
//!   - [`PlaybackDriver`] when the crate owns the time cursor, fed by
//!     engine frames or a shared [`ClockSource`]

pub mod clip;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod host;
pub mod manager;
pub mod mixer;
pub mod registry;
pub mod scheduler;
pub mod timeline;
pub mod track;

pub use clip::{ClipControl, ClipDescriptor, ClipIndex};
pub use clock::{CallbackHandle, ClockCallback, ClockSource, GameTimeClock};
pub use config::{LoopSettings, SETTINGS_FORMAT_VERSION};
pub use driver::{PlaybackDriver, PlaybackState};
pub use error::{ConfigError, Result, TimelineError};
pub use host::{ClipSource, TimelineHost, TrackSource, WrapMode};
pub use manager::ClipManager;
pub use mixer::LoopMixer;
pub use registry::ClipRegistry;
pub use scheduler::{PrepareMode, Scheduler, Trigger};
pub use timeline::{
    ControlKind, HostCommand, HostState, LoopClipAsset, Timeline, TimelineClip, TimelineId,
    TimelineTrack,
};
pub use track::{Track, TrackId, TrackKind};
