// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared game clock.
//!
//! A [`ClockSource`] delivers per-tick deltas to registered callbacks. A
//! playback driver subscribes to one instead of taking engine frame deltas
//! so that a whole scene can be driven from a single game-time signal.

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Callback receiving the elapsed seconds of one clock tick
pub type ClockCallback = Box<dyn FnMut(f64) + Send>;

/// Handle identifying one clock subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackHandle(pub Uuid);

impl CallbackHandle {
    /// Create a new random handle
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CallbackHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// A source of per-tick deltas
pub trait ClockSource: Send + Sync {
    /// Register a callback
    fn subscribe(&self, callback: ClockCallback) -> CallbackHandle;

    /// Remove a callback, returns false if the handle was unknown
    fn unsubscribe(&self, handle: CallbackHandle) -> bool;
}

type SharedCallback = Arc<Mutex<ClockCallback>>;

/// Clock driven by game time
///
/// Callbacks run outside the registry lock, so a callback may unsubscribe
/// itself or others while a tick is in progress.
#[derive(Default)]
pub struct GameTimeClock {
    callbacks: Mutex<IndexMap<CallbackHandle, SharedCallback>>,
    last_sample: Mutex<Option<f64>>,
}

impl GameTimeClock {
    /// Create a clock without subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock ready to be shared between drivers
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Deliver a delta to every subscriber
    pub fn tick(&self, delta_time: f64) {
        let snapshot: Vec<(CallbackHandle, SharedCallback)> = self
            .callbacks
            .lock()
            .iter()
            .map(|(handle, callback)| (*handle, Arc::clone(callback)))
            .collect();

        for (handle, callback) in snapshot {
            // Skip callbacks removed earlier in this tick
            if !self.callbacks.lock().contains_key(&handle) {
                continue;
            }
            let mut callback = callback.lock();
            (*callback)(delta_time);
        }
    }

    /// Remember the current game time as the start of the next delta
    pub fn start(&self, now: f64) {
        *self.last_sample.lock() = Some(now);
    }

    /// Tick with the time elapsed since the previous sample
    ///
    /// The first sample only records the time.
    pub fn sample(&self, now: f64) {
        let previous = self.last_sample.lock().replace(now);
        if let Some(previous) = previous {
            self.tick((now - previous).max(0.0));
        }
    }

    /// Drop every subscription
    pub fn clear(&self) {
        self.callbacks.lock().clear();
    }

    /// Get subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.callbacks.lock().len()
    }
}

impl ClockSource for GameTimeClock {
    fn subscribe(&self, callback: ClockCallback) -> CallbackHandle {
        let mut callbacks = self.callbacks.lock();
        let mut handle = CallbackHandle::new();
        while callbacks.contains_key(&handle) {
            handle = CallbackHandle::new();
        }
        callbacks.insert(handle, Arc::new(Mutex::new(callback)));
        handle
    }

    fn unsubscribe(&self, handle: CallbackHandle) -> bool {
        self.callbacks.lock().shift_remove(&handle).is_some()
    }
}

impl std::fmt::Debug for GameTimeClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameTimeClock")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_reaches_subscribers() {
        let clock = GameTimeClock::new();
        let total = Arc::new(Mutex::new(0.0));
        let sink = Arc::clone(&total);
        let handle = clock.subscribe(Box::new(move |dt| *sink.lock() += dt));

        clock.tick(0.5);
        clock.tick(0.25);
        assert_eq!(*total.lock(), 0.75);

        assert!(clock.unsubscribe(handle));
        assert!(!clock.unsubscribe(handle));
        clock.tick(1.0);
        assert_eq!(*total.lock(), 0.75);
    }

    #[test]
    fn test_sample_derives_deltas() {
        let clock = GameTimeClock::new();
        let deltas = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&deltas);
        clock.subscribe(Box::new(move |dt| sink.lock().push(dt)));

        clock.sample(10.0);
        clock.sample(10.5);
        clock.sample(11.5);
        assert_eq!(*deltas.lock(), vec![0.5, 1.0]);
    }

    #[test]
    fn test_start_sets_sample_origin() {
        let clock = GameTimeClock::new();
        let deltas = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&deltas);
        clock.subscribe(Box::new(move |dt| sink.lock().push(dt)));

        clock.start(5.0);
        clock.sample(5.25);
        assert_eq!(*deltas.lock(), vec![0.25]);
    }

    #[test]
    fn test_callback_may_unsubscribe_during_tick() {
        let clock = GameTimeClock::shared();
        let handle_slot = Arc::new(Mutex::new(None::<CallbackHandle>));
        let calls = Arc::new(Mutex::new(0));

        let weak = Arc::downgrade(&clock);
        let slot = Arc::clone(&handle_slot);
        let counter = Arc::clone(&calls);
        let handle = clock.subscribe(Box::new(move |_| {
            *counter.lock() += 1;
            if let (Some(clock), Some(handle)) = (weak.upgrade(), *slot.lock()) {
                clock.unsubscribe(handle);
            }
        }));
        *handle_slot.lock() = Some(handle);

        clock.tick(0.1);
        clock.tick(0.1);
        assert_eq!(*calls.lock(), 1);
        assert_eq!(clock.subscriber_count(), 0);
    }

    #[test]
    fn test_clear() {
        let clock = GameTimeClock::new();
        clock.subscribe(Box::new(|_| {}));
        clock.subscribe(Box::new(|_| {}));
        assert_eq!(clock.subscriber_count(), 2);
        clock.clear();
        assert_eq!(clock.subscriber_count(), 0);
    }
}
