// SPDX-License-Identifier: MIT OR Apache-2.0
//! Next-target selection and revive lists.
//!
//! The scheduler decides which registered clip acts next and, for every
//! loop clip, which other clips must be re-armed when that loop rewinds
//! over them.
//!
//! ## Ordering
//!
//! Clips act in order of their action point. On equal action points the
//! clip that starts later acts first, and on equal windows the clip on the
//! lower track order index acts first.

use crate::clip::{ClipControl, ClipDescriptor, ClipIndex};
use crate::host::{TimelineHost, TrackSource};
use crate::registry::ClipRegistry;
use crate::track::TrackId;
use std::cmp::Ordering;

/// Whether a rebuild is for live playback or for inspection only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrepareMode {
    /// Playback: revive lists are computed
    #[default]
    Live,
    /// Authoring/inspection: revive lists stay empty
    Authoring,
}

/// A clip whose action point was reached
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trigger {
    /// Clip that acted
    pub clip: ClipIndex,
    /// Its control
    pub control: ClipControl,
    /// Window start
    pub start: f64,
    /// Window end
    pub end: f64,
    /// Number of clips re-armed by a loop
    pub revived: usize,
}

/// Scheduling order between two clips, `Less` acts first
pub fn schedule_order(a: &ClipDescriptor, b: &ClipDescriptor) -> Ordering {
    a.action_point()
        .total_cmp(&b.action_point())
        .then_with(|| b.start.total_cmp(&a.start))
        .then_with(|| a.track_order.cmp(&b.track_order))
}

/// Find the unplayed clip that acts first
pub fn most_previous_clip(registry: &ClipRegistry) -> Option<ClipIndex> {
    let mut best: Option<&ClipDescriptor> = None;
    for clip in registry.clips().filter(|c| !c.played) {
        best = match best {
            Some(current) if schedule_order(clip, current) != Ordering::Less => Some(current),
            _ => Some(clip),
        };
    }
    best.map(|clip| clip.index)
}

/// Whether loop clip `owner` revives `other`
///
/// `other` is revived when its action point falls inside the loop region
/// `(owner.start, owner loop point]`. A clip acting exactly at the loop
/// point is only revived if it starts later, or, for identical windows, if
/// it sits on a lower track order index than the loop.
pub fn revives(owner: &ClipDescriptor, other: &ClipDescriptor) -> bool {
    let loop_point = owner.action_point();
    let other_point = other.action_point();

    if other_point <= owner.start || other_point > loop_point {
        return false;
    }
    if other_point < loop_point {
        return true;
    }
    if other.start == owner.start {
        owner.track_order > other.track_order
    } else {
        other.start > owner.start
    }
}

/// Recompute every loop clip's revive list from scratch
///
/// Clips already played at this point are never revived.
pub fn compute_revive_lists(registry: &mut ClipRegistry) {
    let lists: Vec<Vec<ClipIndex>> = registry
        .clips()
        .map(|owner| {
            if !owner.control.is_loop() {
                return Vec::new();
            }
            registry
                .clips()
                .filter(|other| other.index != owner.index && !other.played)
                .filter(|other| revives(owner, other))
                .map(|other| other.index)
                .collect()
        })
        .collect();

    for (clip, list) in registry.clips_mut().zip(lists) {
        clip.revive = list;
    }
}

/// Registry plus the lazily selected target clip
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    registry: ClipRegistry,
    target: Option<ClipIndex>,
    exhausted: bool,
}

impl Scheduler {
    /// Create a scheduler with an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the registry from the host and reset targeting
    pub fn prepare<H: TimelineHost + ?Sized>(&mut self, host: &H, mode: PrepareMode) {
        self.prepare_from_sources(host.output_tracks(), mode);
    }

    /// Rebuild, keeping only the given clips armed
    ///
    /// Every other clip starts played, muted or not.
    pub fn prepare_subset<H: TimelineHost + ?Sized>(
        &mut self,
        host: &H,
        armed: &[ClipIndex],
        mode: PrepareMode,
    ) {
        self.reset_target();
        self.registry.rebuild(host);
        self.registry.set_all_played(true);
        self.registry.set_played_many(armed, false);
        self.finish_prepare(mode);
    }

    /// Rebuild from explicit track metadata
    pub fn prepare_from_sources(&mut self, sources: Vec<TrackSource>, mode: PrepareMode) {
        self.reset_target();
        self.registry.rebuild_from_sources(sources);
        self.finish_prepare(mode);
    }

    /// Drop the cached target and exhaustion after played flags changed wholesale
    pub(crate) fn reset_target(&mut self) {
        self.target = None;
        self.exhausted = false;
    }

    fn finish_prepare(&mut self, mode: PrepareMode) {
        if self.registry.is_empty() {
            tracing::warn!("No loop control clips found, scheduler stays idle");
        }
        if mode == PrepareMode::Live {
            compute_revive_lists(&mut self.registry);
        }
    }

    /// Get the registry
    pub fn registry(&self) -> &ClipRegistry {
        &self.registry
    }

    /// Get the mutable registry
    pub fn registry_mut(&mut self) -> &mut ClipRegistry {
        &mut self.registry
    }

    /// Whether every clip has been consumed for this generation
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Current target, reselected once the previous one was played
    pub fn target(&mut self) -> Option<ClipIndex> {
        if self.exhausted {
            return None;
        }
        let stale = match self.target {
            Some(index) => self.registry.is_played(index).unwrap_or(true),
            None => true,
        };
        if stale {
            self.retarget();
        }
        self.target
    }

    /// Current target descriptor
    pub fn target_clip(&mut self) -> Option<&ClipDescriptor> {
        let index = self.target()?;
        self.registry.clip(index)
    }

    /// Force a fresh scan for the target
    pub fn retarget(&mut self) {
        if self.exhausted {
            return;
        }
        self.target = most_previous_clip(&self.registry);
        if self.target.is_none() {
            self.exhausted = true;
            tracing::info!("All loop control clips consumed");
        }
    }

    /// Fire the target if `time` has reached its action point
    pub fn poll(&mut self, time: f64) -> Option<Trigger> {
        self.poll_where(time, |_| true)
    }

    /// Fire the target if it belongs to `track` and `time` has reached it
    pub fn poll_track(&mut self, track: TrackId, time: f64) -> Option<Trigger> {
        self.poll_where(time, |clip| clip.track == track)
    }

    fn poll_where(&mut self, time: f64, accept: impl Fn(&ClipDescriptor) -> bool) -> Option<Trigger> {
        let index = self.target()?;
        let clip = self.registry.clip(index)?;
        if !accept(clip) || time < clip.action_point() {
            return None;
        }

        let mut trigger = Trigger {
            clip: index,
            control: clip.control,
            start: clip.start,
            end: clip.end,
            revived: 0,
        };

        match trigger.control {
            ClipControl::Loop { .. } => {
                trigger.revived = self.registry.revive(index);
                self.retarget();
            }
            ClipControl::Pause => {}
            ClipControl::Skip | ClipControl::AutoSkip => {
                self.registry.set_played(index, true);
            }
        }

        tracing::debug!(
            clip = index.0,
            control = trigger.control.name(),
            time,
            revived = trigger.revived,
            "Clip action fired"
        );
        Some(trigger)
    }

    /// Mark the current target played and return it
    pub fn complete_target(&mut self) -> Option<Trigger> {
        let index = self.target()?;
        let clip = self.registry.clip(index)?;
        let trigger = Trigger {
            clip: index,
            control: clip.control,
            start: clip.start,
            end: clip.end,
            revived: 0,
        };
        self.registry.set_played(index, true);
        Some(trigger)
    }

    /// Mark every clip but the last one to act as played
    ///
    /// Only clips on unmuted tracks take part. Returns the start of the
    /// remaining clip, or `None` if it was already played.
    pub fn set_played_without_last(&mut self) -> Option<f64> {
        let mut order: Vec<&ClipDescriptor> = self
            .registry
            .clips()
            .filter(|clip| !self.registry.is_muted(clip.index))
            .collect();
        order.sort_by(|a, b| schedule_order(a, b));

        let (last, rest) = order.split_last()?;
        let last_index = last.index;
        let rest: Vec<ClipIndex> = rest.iter().map(|clip| clip.index).collect();

        self.registry.set_played_many(&rest, true);
        let last = self.registry.clip(last_index)?;
        (!last.played).then_some(last.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ClipSource;
    use crate::track::TrackKind;

    fn source(order_index: usize, clips: Vec<(ClipControl, f64, f64)>) -> TrackSource {
        TrackSource {
            id: TrackId::new(),
            name: format!("Track {order_index}"),
            kind: TrackKind::LoopControl,
            order_index,
            muted: false,
            clips: clips
                .into_iter()
                .map(|(control, start, end)| ClipSource {
                    name: control.name().to_string(),
                    start,
                    end,
                    control: Some(control),
                })
                .collect(),
        }
    }

    fn scheduler(sources: Vec<TrackSource>) -> Scheduler {
        let mut scheduler = Scheduler::new();
        scheduler.prepare_from_sources(sources, PrepareMode::Live);
        scheduler
    }

    #[test]
    fn test_earliest_action_point_wins() {
        let mut scheduler = scheduler(vec![
            source(0, vec![(ClipControl::LOOP, 0.0, 10.0)]),
            source(1, vec![(ClipControl::Pause, 4.0, 6.0), (ClipControl::Skip, 2.0, 8.0)]),
        ]);
        assert_eq!(scheduler.target(), Some(ClipIndex(1)));
    }

    #[test]
    fn test_later_start_wins_on_equal_action_point() {
        let mut scheduler = scheduler(vec![
            source(0, vec![(ClipControl::Skip, 1.0, 5.0)]),
            source(1, vec![(ClipControl::Skip, 3.0, 5.0)]),
        ]);
        assert_eq!(scheduler.target(), Some(ClipIndex(1)));
    }

    #[test]
    fn test_lower_track_wins_regardless_of_registration_order() {
        let mut scheduler = scheduler(vec![
            source(1, vec![(ClipControl::Skip, 2.0, 5.0)]),
            source(0, vec![(ClipControl::Skip, 2.0, 5.0)]),
        ]);
        assert_eq!(scheduler.target(), Some(ClipIndex(1)));
        assert_eq!(scheduler.target_clip().map(|c| c.track_order), Some(0));
    }

    #[test]
    fn test_target_is_lazy_until_played() {
        let mut scheduler = scheduler(vec![source(
            0,
            vec![(ClipControl::Skip, 0.0, 5.0), (ClipControl::Skip, 0.0, 7.0)],
        )]);
        assert_eq!(scheduler.target(), Some(ClipIndex(0)));

        // Re-arming an earlier clip does not steal an unplayed target
        scheduler.registry_mut().set_played(ClipIndex(0), true);
        assert_eq!(scheduler.target(), Some(ClipIndex(1)));
        scheduler.registry_mut().set_played(ClipIndex(0), false);
        assert_eq!(scheduler.target(), Some(ClipIndex(1)));

        scheduler.registry_mut().set_played(ClipIndex(1), true);
        assert_eq!(scheduler.target(), Some(ClipIndex(0)));
    }

    #[test]
    fn test_exhaustion_is_terminal() {
        let mut scheduler = scheduler(vec![source(0, vec![(ClipControl::Skip, 0.0, 1.0)])]);
        assert!(scheduler.poll(1.0).is_some());
        assert_eq!(scheduler.target(), None);
        assert!(scheduler.is_exhausted());

        scheduler.registry_mut().set_played(ClipIndex(0), false);
        assert_eq!(scheduler.target(), None);
    }

    #[test]
    fn test_empty_registry_has_no_target() {
        let mut scheduler = scheduler(Vec::new());
        assert_eq!(scheduler.target(), None);
        assert!(scheduler.poll(100.0).is_none());
    }

    #[test]
    fn test_revive_nested_clip() {
        let scheduler = scheduler(vec![
            source(0, vec![(ClipControl::Loop { offset: 2.0 }, 0.0, 10.0)]),
            source(
                1,
                vec![
                    (ClipControl::Skip, 3.0, 6.0),
                    (ClipControl::Skip, 0.0, 0.0),
                    (ClipControl::Skip, 5.0, 9.0),
                ],
            ),
        ]);
        let owner = scheduler.registry().clip(ClipIndex(0)).unwrap();
        assert_eq!(owner.action_point(), 8.0);
        assert_eq!(owner.revive_list(), &[ClipIndex(1)]);
    }

    #[test]
    fn test_revive_same_loop_point() {
        // Longer clip starting earlier revives the one starting later
        let scheduler = scheduler(vec![
            source(0, vec![(ClipControl::LOOP, 0.0, 10.0)]),
            source(1, vec![(ClipControl::LOOP, 4.0, 10.0)]),
        ]);
        let registry = scheduler.registry();
        assert_eq!(registry.clip(ClipIndex(0)).unwrap().revive_list(), &[ClipIndex(1)]);
        assert!(registry.clip(ClipIndex(1)).unwrap().revive_list().is_empty());
    }

    #[test]
    fn test_revive_duplicate_window_by_track_order() {
        let scheduler = scheduler(vec![
            source(0, vec![(ClipControl::LOOP, 0.0, 10.0)]),
            source(1, vec![(ClipControl::LOOP, 0.0, 10.0)]),
        ]);
        let registry = scheduler.registry();
        assert!(registry.clip(ClipIndex(0)).unwrap().revive_list().is_empty());
        assert_eq!(registry.clip(ClipIndex(1)).unwrap().revive_list(), &[ClipIndex(0)]);
    }

    #[test]
    fn test_revive_skips_played_clips() {
        let mut sources = vec![
            source(0, vec![(ClipControl::LOOP, 0.0, 10.0)]),
            source(1, vec![(ClipControl::Skip, 2.0, 4.0)]),
        ];
        sources[1].muted = true;
        let scheduler = scheduler(sources);
        assert!(scheduler.registry().clip(ClipIndex(0)).unwrap().revive_list().is_empty());
    }

    #[test]
    fn test_authoring_mode_leaves_revive_lists_empty() {
        let mut scheduler = Scheduler::new();
        scheduler.prepare_from_sources(
            vec![source(0, vec![(ClipControl::LOOP, 0.0, 10.0), (ClipControl::Skip, 2.0, 4.0)])],
            PrepareMode::Authoring,
        );
        assert!(scheduler.registry().clips().all(|c| c.revive_list().is_empty()));
    }

    #[test]
    fn test_rebuild_is_stable() {
        let make = || {
            vec![
                source(0, vec![(ClipControl::LOOP, 0.0, 10.0), (ClipControl::Pause, 1.0, 2.0)]),
                source(1, vec![(ClipControl::Skip, 3.0, 6.0), (ClipControl::LOOP, 2.0, 7.0)]),
            ]
        };
        let mut scheduler = scheduler(make());
        let first: Vec<_> = scheduler
            .registry()
            .clips()
            .map(|c| (c.index, c.revive_list().to_vec()))
            .collect();

        scheduler.prepare_from_sources(make(), PrepareMode::Live);
        let second: Vec<_> = scheduler
            .registry()
            .clips()
            .map(|c| (c.index, c.revive_list().to_vec()))
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_loop_poll_revives_and_retargets() {
        let mut scheduler = scheduler(vec![source(
            0,
            vec![(ClipControl::LOOP, 0.0, 10.0), (ClipControl::Skip, 2.0, 5.0)],
        )]);
        assert_eq!(scheduler.poll(4.9), None);
        let skip = scheduler.poll(5.0).unwrap();
        assert_eq!(skip.clip, ClipIndex(1));

        let looped = scheduler.poll(10.0).unwrap();
        assert_eq!(looped.control, ClipControl::LOOP);
        assert_eq!(looped.revived, 1);
        assert_eq!(scheduler.registry().is_played(ClipIndex(1)), Some(false));
        assert_eq!(scheduler.target(), Some(ClipIndex(1)));
    }

    #[test]
    fn test_poll_track_filters_owner() {
        let sources = vec![
            source(0, vec![(ClipControl::Skip, 0.0, 1.0)]),
            source(1, vec![(ClipControl::Skip, 0.0, 2.0)]),
        ];
        let other = sources[1].id;
        let owner = sources[0].id;
        let mut scheduler = scheduler(sources);

        assert!(scheduler.poll_track(other, 5.0).is_none());
        assert_eq!(scheduler.poll_track(owner, 5.0).map(|t| t.clip), Some(ClipIndex(0)));
    }

    #[test]
    fn test_set_played_without_last() {
        let mut scheduler = scheduler(vec![source(
            0,
            vec![
                (ClipControl::Pause, 1.0, 2.0),
                (ClipControl::Skip, 2.0, 4.0),
                (ClipControl::Skip, 5.0, 6.0),
                (ClipControl::Pause, 8.0, 9.0),
            ],
        )]);
        assert_eq!(scheduler.set_played_without_last(), Some(8.0));
        assert_eq!(scheduler.registry().played_flags(), vec![true, true, true, false]);

        scheduler.registry_mut().set_played(ClipIndex(3), true);
        assert_eq!(scheduler.set_played_without_last(), None);
    }
}
