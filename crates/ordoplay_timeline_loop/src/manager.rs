// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clip manager for host-driven playback.
//!
//! In this execution model the host engine advances its own time every
//! frame. The manager owns the scheduler, and each control track's
//! [`LoopMixer`](crate::mixer::LoopMixer) consults it once per frame.
//!
//! If auto-prepare is disabled, call [`ClipManager::prepare`] before
//! starting the host timeline.

use crate::clip::{ClipControl, ClipDescriptor, ClipIndex};
use crate::config::LoopSettings;
use crate::host::TimelineHost;
use crate::mixer::LoopMixer;
use crate::scheduler::{PrepareMode, Scheduler, Trigger};

/// Owner of the clip registry when the host drives time
#[derive(Debug, Clone)]
pub struct ClipManager {
    scheduler: Scheduler,
    auto_prepare: bool,
}

impl ClipManager {
    /// Create a manager from settings
    pub fn new(settings: &LoopSettings) -> Self {
        Self {
            scheduler: Scheduler::new(),
            auto_prepare: settings.auto_prepare,
        }
    }

    /// Whether clip data is rebuilt automatically on timeline start
    pub fn auto_prepare(&self) -> bool {
        self.auto_prepare
    }

    /// Get the scheduler
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Get the mutable scheduler
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Rebuild clip data for playback
    pub fn prepare<H: TimelineHost + ?Sized>(&mut self, host: &H) {
        self.scheduler.prepare(host, PrepareMode::Live);
    }

    /// Rebuild clip data, arming only the given clips
    pub fn prepare_subset<H: TimelineHost + ?Sized>(&mut self, host: &H, armed: &[ClipIndex]) {
        self.scheduler.prepare_subset(host, armed, PrepareMode::Live);
    }

    /// Rebuild clip data for an inspector, without revive lists
    pub fn prepare_for_inspection<H: TimelineHost + ?Sized>(&mut self, host: &H) {
        self.scheduler.prepare(host, PrepareMode::Authoring);
    }

    /// Called when the host timeline starts playing
    ///
    /// Rebuilds clip data when auto-prepare is on and the host is at zero.
    /// Returns true if a rebuild happened.
    pub fn on_timeline_start<H: TimelineHost + ?Sized>(&mut self, host: &H) -> bool {
        if host.time() > 0.0 || !self.auto_prepare {
            return false;
        }
        self.prepare(host);
        true
    }

    /// Current target clip index
    pub fn target(&mut self) -> Option<ClipIndex> {
        self.scheduler.target()
    }

    /// Current target clip
    pub fn target_clip(&mut self) -> Option<&ClipDescriptor> {
        self.scheduler.target_clip()
    }

    /// Force a fresh target scan
    pub fn set_target(&mut self) {
        self.scheduler.retarget();
    }

    /// Rebuild clip data and start the host
    pub fn play_timeline<H: TimelineHost + ?Sized>(&mut self, host: &mut H) {
        self.prepare(host);
        host.play();
        tracing::info!("Timeline started");
    }

    /// Stop the host, rewinding it to the top
    pub fn return_top<H: TimelineHost + ?Sized>(&mut self, host: &mut H) {
        host.stop();
    }

    /// Consume the target clip, jump to its end and resume the host
    pub fn skip_to_clip_end<H: TimelineHost + ?Sized>(&mut self, host: &mut H) -> bool {
        let Some(trigger) = self.scheduler.complete_target() else {
            return false;
        };
        host.seek(trigger.end);
        host.resume();
        tracing::info!(clip = trigger.clip.0, time = trigger.end, "Skipped to clip end");
        true
    }

    /// Release a pause clip hold and resume the host
    pub fn resume<H: TimelineHost + ?Sized>(&mut self, host: &mut H) -> bool {
        let holding = self
            .scheduler
            .target_clip()
            .is_some_and(|clip| clip.control == ClipControl::Pause && host.time() >= clip.start);
        if !holding {
            return false;
        }
        self.scheduler.complete_target();
        host.resume();
        tracing::info!("Resumed from pause clip");
        true
    }

    /// Set the played flag of one clip
    pub fn set_clip_played(&mut self, index: ClipIndex, played: bool) -> bool {
        self.scheduler.registry_mut().set_played(index, played)
    }

    /// Set the played flag of several clips
    pub fn set_clips_played(&mut self, indices: &[ClipIndex], played: bool) {
        self.scheduler.registry_mut().set_played_many(indices, played);
    }

    /// Run every mixer for one frame, stopping at the first action
    pub fn process_frame<H: TimelineHost + ?Sized>(
        &mut self,
        mixers: &[LoopMixer],
        host: &mut H,
    ) -> Option<Trigger> {
        mixers.iter().find_map(|mixer| mixer.process_frame(self, host))
    }
}

impl Default for ClipManager {
    fn default() -> Self {
        Self::new(&LoopSettings::default())
    }
}
