// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-track mixers for host-driven playback.

use crate::clip::ClipControl;
use crate::host::TimelineHost;
use crate::manager::ClipManager;
use crate::scheduler::Trigger;
use crate::track::{TrackId, TrackKind};

/// Frame processor bound to one control track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopMixer {
    track: TrackId,
}

impl LoopMixer {
    /// Create a mixer for a track
    pub fn new(track: TrackId) -> Self {
        Self { track }
    }

    /// Create one mixer per loop control track of the host
    pub fn for_host<H: TimelineHost + ?Sized>(host: &H) -> Vec<Self> {
        host.output_tracks()
            .into_iter()
            .filter(|track| track.kind == TrackKind::LoopControl)
            .map(|track| Self::new(track.id))
            .collect()
    }

    /// Track this mixer is bound to
    pub fn track(&self) -> TrackId {
        self.track
    }

    /// Called when the host starts playing this track
    pub fn on_behaviour_play<H: TimelineHost + ?Sized>(&self, manager: &mut ClipManager, host: &H) {
        manager.on_timeline_start(host);
    }

    /// Apply the target clip's action if it belongs to this track and is due
    pub fn process_frame<H: TimelineHost + ?Sized>(
        &self,
        manager: &mut ClipManager,
        host: &mut H,
    ) -> Option<Trigger> {
        let time = host.time();
        let trigger = manager.scheduler_mut().poll_track(self.track, time)?;

        match trigger.control {
            ClipControl::Loop { .. } => host.seek(trigger.start),
            ClipControl::Pause => {
                host.seek(trigger.start);
                host.pause();
            }
            ClipControl::Skip => {}
            ClipControl::AutoSkip => host.seek(trigger.end),
        }
        Some(trigger)
    }
}
