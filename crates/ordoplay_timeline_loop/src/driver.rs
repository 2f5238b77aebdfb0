// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback driver with its own time cursor.
//!
//! The driver owns the playback time and pushes it to the host every tick.
//! Deltas come from exactly one source:
//! - engine frames through [`PlaybackDriver::update`], or
//! - a shared [`ClockSource`] the driver subscribes to on play.
//!
//! When a clock is attached, frame updates are ignored so time is never
//! advanced twice.

use crate::clip::{ClipControl, ClipDescriptor, ClipIndex};
use crate::clock::{CallbackHandle, ClockSource};
use crate::config::{LoopSettings, DEFAULT_RESUME_EPSILON};
use crate::host::{TimelineHost, WrapMode};
use crate::scheduler::{PrepareMode, Scheduler, Trigger};
use parking_lot::Mutex;
use std::sync::Arc;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Stopped
    #[default]
    Stopped,
    /// Time is advancing
    Playing,
    /// Held by a pause clip until resumed
    Paused,
}

impl PlaybackState {
    /// Check if playing or paused
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }

    /// Check if time is advancing
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }

    /// Check if held by a pause clip
    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }
}

struct DriverCore<H> {
    host: H,
    scheduler: Scheduler,
    state: PlaybackState,
    current_time: f64,
    speed: f64,
    resume_epsilon: f64,
    play_on_awake: bool,
    clock: Option<Arc<dyn ClockSource>>,
    lease: Option<CallbackHandle>,
    last_trigger: Option<Trigger>,
}

impl<H: TimelineHost> DriverCore<H> {
    fn prepare(&mut self) {
        self.scheduler.prepare(&self.host, PrepareMode::Live);
    }

    fn begin(&mut self, start_time: Option<f64>, rebuild: bool) -> bool {
        if self.state.is_active() {
            return false;
        }
        if let Some(time) = start_time {
            if !time.is_finite() || time < 0.0 || time > self.host.duration() {
                tracing::warn!(time, "Start time outside the timeline, ignoring play");
                return false;
            }
        }

        if rebuild {
            self.prepare();
        }
        if let Some(time) = start_time {
            self.current_time = time;
            self.scheduler
                .registry_mut()
                .mark_played_through(time + self.resume_epsilon);
            self.scheduler.reset_target();
        }

        self.state = PlaybackState::Playing;
        self.host.play();
        tracing::info!(time = self.current_time, "Playback started");
        true
    }

    fn advance(&mut self, delta_time: f64) -> Option<Trigger> {
        if !self.state.is_playing() {
            return None;
        }
        self.current_time += delta_time * self.speed;
        self.update_timeline()
    }

    fn update_timeline(&mut self) -> Option<Trigger> {
        let trigger = self.scheduler.poll(self.current_time);

        match &trigger {
            Some(trigger) => match trigger.control {
                ClipControl::Loop { .. } => self.current_time = trigger.start,
                ClipControl::Pause => {
                    self.current_time = trigger.start;
                    self.state = PlaybackState::Paused;
                    self.host.pause();
                }
                ClipControl::Skip => {}
                ClipControl::AutoSkip => self.current_time = trigger.end,
            },
            None => {
                let duration = self.host.duration();
                if self.current_time > duration {
                    match self.host.wrap_mode() {
                        WrapMode::None => {
                            self.stop();
                            return None;
                        }
                        WrapMode::Loop => self.current_time = 0.0,
                        WrapMode::Hold => self.current_time = duration,
                    }
                }
            }
        }

        self.host.seek(self.current_time);
        self.host.evaluate();
        if trigger.is_some() {
            self.last_trigger = trigger;
        }
        trigger
    }

    fn stop(&mut self) -> bool {
        if let Some(handle) = self.lease.take() {
            if let Some(clock) = &self.clock {
                clock.unsubscribe(handle);
            }
        }
        if !self.state.is_active() {
            return false;
        }

        self.state = PlaybackState::Stopped;
        self.current_time = 0.0;
        self.host.stop();
        tracing::info!("Playback stopped");
        true
    }

    fn resume(&mut self) -> bool {
        if !self.state.is_paused() {
            return false;
        }
        if let Some(trigger) = self.scheduler.complete_target() {
            tracing::debug!(clip = trigger.clip.0, "Pause clip released");
        }
        self.state = PlaybackState::Playing;
        self.host.resume();
        tracing::info!(time = self.current_time, "Playback resumed");
        true
    }

    fn skip_to_clip_end(&mut self) -> bool {
        if !self.state.is_active() {
            return false;
        }
        let Some(trigger) = self.scheduler.complete_target() else {
            return false;
        };

        self.current_time = trigger.end;
        if self.state.is_paused() {
            self.state = PlaybackState::Playing;
            self.host.resume();
        }
        tracing::info!(clip = trigger.clip.0, time = trigger.end, "Skipped to clip end");
        self.update_timeline();
        true
    }
}

/// Clamp a multiplier or tolerance to a finite, non-negative value
fn sanitize(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        tracing::warn!(value, fallback, "Non-finite playback setting replaced");
        fallback
    }
}

/// Time stepper that drives a host timeline through loop clips
pub struct PlaybackDriver<H: TimelineHost + Send + 'static> {
    core: Arc<Mutex<DriverCore<H>>>,
}

impl<H: TimelineHost + Send + 'static> PlaybackDriver<H> {
    /// Create a driver fed by engine frame updates
    pub fn new(host: H, settings: &LoopSettings) -> Self {
        Self::build(host, settings, None)
    }

    /// Create a driver fed by a shared clock
    pub fn with_clock(host: H, settings: &LoopSettings, clock: Arc<dyn ClockSource>) -> Self {
        Self::build(host, settings, Some(clock))
    }

    fn build(host: H, settings: &LoopSettings, clock: Option<Arc<dyn ClockSource>>) -> Self {
        Self {
            core: Arc::new(Mutex::new(DriverCore {
                host,
                scheduler: Scheduler::new(),
                state: PlaybackState::Stopped,
                current_time: 0.0,
                speed: sanitize(settings.speed, 1.0),
                resume_epsilon: sanitize(settings.resume_epsilon, DEFAULT_RESUME_EPSILON),
                play_on_awake: settings.play_on_awake,
                clock,
                lease: None,
                last_trigger: None,
            })),
        }
    }

    /// Start playback if configured to play on awake
    pub fn enable(&self) -> bool {
        let play_on_awake = self.core.lock().play_on_awake;
        play_on_awake && self.play()
    }

    /// Rebuild clip data from the host
    pub fn prepare(&self) {
        self.core.lock().prepare();
    }

    /// Rebuild clip data and play from the current time
    pub fn play(&self) -> bool {
        self.play_from(None, true)
    }

    /// Play, optionally from a start time and optionally without rebuilding
    ///
    /// Clips acting at or before the start time are treated as played.
    /// Returns false if already playing or if the start time lies outside
    /// the timeline.
    pub fn play_from(&self, start_time: Option<f64>, rebuild: bool) -> bool {
        let mut core = self.core.lock();
        if !core.begin(start_time, rebuild) {
            return false;
        }

        if let Some(clock) = core.clock.clone() {
            let weak = Arc::downgrade(&self.core);
            let handle = clock.subscribe(Box::new(move |delta_time: f64| {
                if let Some(core) = weak.upgrade() {
                    core.lock().advance(delta_time);
                }
            }));
            core.lease = Some(handle);
        }
        true
    }

    /// Stop playback, release the clock and rewind
    pub fn stop(&self) -> bool {
        self.core.lock().stop()
    }

    /// Leave a pause clip hold
    pub fn resume(&self) -> bool {
        self.core.lock().resume()
    }

    /// Advance by one engine frame
    ///
    /// Ignored when a shared clock drives this driver.
    pub fn update(&self, delta_time: f64) -> Option<Trigger> {
        let mut core = self.core.lock();
        if core.clock.is_some() {
            return None;
        }
        core.advance(delta_time)
    }

    /// Consume the target clip and jump to its end
    pub fn skip_to_clip_end(&self) -> bool {
        self.core.lock().skip_to_clip_end()
    }

    /// Mark a clip played
    pub fn set_clip_played(&self, index: ClipIndex) -> bool {
        self.core.lock().scheduler.registry_mut().set_played(index, true)
    }

    /// Mark several clips played
    pub fn set_clips_played(&self, indices: &[ClipIndex]) {
        self.core
            .lock()
            .scheduler
            .registry_mut()
            .set_played_many(indices, true);
    }

    /// Mark all but the last clip played, returning the last clip's start
    pub fn set_clip_played_without_last(&self) -> Option<f64> {
        self.core.lock().scheduler.set_played_without_last()
    }

    /// Current playback state
    pub fn state(&self) -> PlaybackState {
        self.core.lock().state
    }

    /// Whether playing or paused
    pub fn is_playing(&self) -> bool {
        self.state().is_active()
    }

    /// Current playback time
    pub fn current_time(&self) -> f64 {
        self.core.lock().current_time
    }

    /// Playback speed multiplier
    pub fn speed(&self) -> f64 {
        self.core.lock().speed
    }

    /// Set playback speed (clamped to non-negative)
    pub fn set_speed(&self, speed: f64) {
        self.core.lock().speed = sanitize(speed, 1.0);
    }

    /// Whether a shared clock is attached
    pub fn uses_shared_clock(&self) -> bool {
        self.core.lock().clock.is_some()
    }

    /// Whether a clock subscription is held
    pub fn is_subscribed(&self) -> bool {
        self.core.lock().lease.is_some()
    }

    /// Take the most recent clip action, if any fired since the last call
    ///
    /// Clock-driven ticks have no return channel, so this is how callers
    /// observe them.
    pub fn take_last_trigger(&self) -> Option<Trigger> {
        self.core.lock().last_trigger.take()
    }

    /// Current target clip
    pub fn target_clip(&self) -> Option<ClipDescriptor> {
        self.core.lock().scheduler.target_clip().cloned()
    }

    /// Played flag of a clip
    pub fn is_clip_played(&self, index: ClipIndex) -> Option<bool> {
        self.core.lock().scheduler.registry().is_played(index)
    }

    /// Played flag per clip in index order
    pub fn played_flags(&self) -> Vec<bool> {
        self.core.lock().scheduler.registry().played_flags()
    }

    /// Get registered clip count
    pub fn clip_count(&self) -> usize {
        self.core.lock().scheduler.registry().clip_count()
    }

    /// Inspect the scheduler
    pub fn with_scheduler<R>(&self, f: impl FnOnce(&Scheduler) -> R) -> R {
        f(&self.core.lock().scheduler)
    }

    /// Inspect the host
    pub fn with_host<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        f(&self.core.lock().host)
    }

    /// Modify the host
    pub fn with_host_mut<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut self.core.lock().host)
    }
}

impl<H: TimelineHost + Send + 'static> Drop for PlaybackDriver<H> {
    fn drop(&mut self) {
        self.core.lock().stop();
    }
}
