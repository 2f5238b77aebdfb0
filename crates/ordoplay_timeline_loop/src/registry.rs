// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clip registry: the track to clip mapping of one registry generation.
//!
//! Clips live in a flat arena indexed by [`ClipIndex`]. Tracks only hold
//! indices into that arena, and revive lists point at sibling clips the
//! same way, so clips on different tracks can refer to each other without
//! owning each other.

use crate::clip::{ClipDescriptor, ClipIndex};
use crate::host::{TimelineHost, TrackSource};
use crate::track::{Track, TrackId, TrackKind};
use indexmap::IndexMap;

/// Registered control tracks and their clips
#[derive(Debug, Clone, Default)]
pub struct ClipRegistry {
    /// Control tracks in output order
    tracks: IndexMap<TrackId, Track>,
    /// Clip arena, position equals clip index
    clips: Vec<ClipDescriptor>,
}

impl ClipRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every track and clip
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.clips.clear();
    }

    /// Rebuild from the host's output tracks
    pub fn rebuild<H: TimelineHost + ?Sized>(&mut self, host: &H) {
        self.rebuild_from_sources(host.output_tracks());
    }

    /// Rebuild from explicit track metadata
    ///
    /// Only loop control tracks are registered, and only their clips that
    /// carry control metadata. Indices are handed out in enumeration order
    /// across all tracks. Clips on muted tracks start out played.
    pub fn rebuild_from_sources(&mut self, sources: Vec<TrackSource>) {
        self.clear();

        for source in sources {
            if source.kind != TrackKind::LoopControl {
                tracing::trace!(track = %source.name, kind = source.kind.name(), "Skipping track");
                continue;
            }

            let mut track = Track::new(source.id, source.name, source.order_index, source.muted);
            for clip in source.clips {
                let Some(control) = clip.control else {
                    continue;
                };
                let index = ClipIndex(self.clips.len());
                let mut descriptor = ClipDescriptor::new(
                    index,
                    clip.name,
                    control,
                    clip.start,
                    clip.end,
                    source.id,
                    source.order_index,
                );
                descriptor.played = source.muted;
                track.push_clip(index);
                self.clips.push(descriptor);
            }
            self.tracks.insert(source.id, track);
        }

        tracing::debug!(
            tracks = self.tracks.len(),
            clips = self.clips.len(),
            "Clip registry rebuilt"
        );
    }

    /// Get a clip
    pub fn clip(&self, index: ClipIndex) -> Option<&ClipDescriptor> {
        self.clips.get(index.0)
    }

    /// Get a mutable clip
    pub fn clip_mut(&mut self, index: ClipIndex) -> Option<&mut ClipDescriptor> {
        self.clips.get_mut(index.0)
    }

    /// Get all clips in index order
    pub fn clips(&self) -> impl Iterator<Item = &ClipDescriptor> {
        self.clips.iter()
    }

    pub(crate) fn clips_mut(&mut self) -> impl Iterator<Item = &mut ClipDescriptor> {
        self.clips.iter_mut()
    }

    /// Get a track
    pub fn track(&self, track_id: TrackId) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    /// Get all tracks
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Get the clips owned by a track
    pub fn track_clips(&self, track_id: TrackId) -> impl Iterator<Item = &ClipDescriptor> {
        self.tracks
            .get(&track_id)
            .into_iter()
            .flat_map(|track| track.clips().iter())
            .filter_map(|index| self.clips.get(index.0))
    }

    /// Get clip count
    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    /// Get track count
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Whether no clip is registered
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Whether the clip's owning track is muted
    pub fn is_muted(&self, index: ClipIndex) -> bool {
        self.clip(index)
            .and_then(|clip| self.tracks.get(&clip.track))
            .is_some_and(|track| track.muted)
    }

    /// Get the played flag of a clip
    pub fn is_played(&self, index: ClipIndex) -> Option<bool> {
        self.clip(index).map(|clip| clip.played)
    }

    /// Set the played flag of one clip, returns false for unknown indices
    pub fn set_played(&mut self, index: ClipIndex, played: bool) -> bool {
        match self.clip_mut(index) {
            Some(clip) => {
                clip.played = played;
                true
            }
            None => false,
        }
    }

    /// Set the played flag of several clips
    pub fn set_played_many(&mut self, indices: &[ClipIndex], played: bool) {
        for &index in indices {
            self.set_played(index, played);
        }
    }

    /// Set the played flag of every clip
    pub fn set_all_played(&mut self, played: bool) {
        for clip in &mut self.clips {
            clip.played = played;
        }
    }

    /// Mark clips acting at or before `time` as played and the rest unplayed
    ///
    /// Clips on muted tracks stay played.
    pub fn mark_played_through(&mut self, time: f64) {
        for clip in &mut self.clips {
            let muted = self.tracks.get(&clip.track).is_some_and(|track| track.muted);
            clip.played = muted || clip.action_point() <= time;
        }
    }

    /// Re-arm every clip in the revive list of `index`
    ///
    /// Returns how many clips were re-armed.
    pub fn revive(&mut self, index: ClipIndex) -> usize {
        let Some(targets) = self.clip(index).map(|clip| clip.revive.clone()) else {
            return 0;
        };
        for target in &targets {
            self.set_played(*target, false);
        }
        targets.len()
    }

    /// Played flag per clip in index order
    pub fn played_flags(&self) -> Vec<bool> {
        self.clips.iter().map(|clip| clip.played).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ClipControl;
    use crate::host::ClipSource;
    use crate::timeline::{ControlKind, Timeline, TimelineClip};

    fn source(name: &str, order_index: usize, muted: bool, clips: Vec<ClipSource>) -> TrackSource {
        TrackSource {
            id: TrackId::new(),
            name: name.to_string(),
            kind: TrackKind::LoopControl,
            order_index,
            muted,
            clips,
        }
    }

    fn clip(control: ClipControl, start: f64, end: f64) -> ClipSource {
        ClipSource {
            name: control.name().to_string(),
            start,
            end,
            control: Some(control),
        }
    }

    #[test]
    fn test_indices_follow_discovery_order() {
        let mut registry = ClipRegistry::new();
        registry.rebuild_from_sources(vec![
            source("A", 0, false, vec![clip(ClipControl::Pause, 1.0, 2.0), clip(ClipControl::Skip, 3.0, 4.0)]),
            source("B", 1, false, vec![clip(ClipControl::AutoSkip, 0.0, 5.0)]),
        ]);

        let names: Vec<_> = registry.clips().map(|c| (c.index.0, c.control)).collect();
        assert_eq!(
            names,
            vec![
                (0, ClipControl::Pause),
                (1, ClipControl::Skip),
                (2, ClipControl::AutoSkip),
            ]
        );
        assert_eq!(registry.track_count(), 2);
    }

    #[test]
    fn test_muted_tracks_start_played() {
        let mut registry = ClipRegistry::new();
        registry.rebuild_from_sources(vec![
            source("Live", 0, false, vec![clip(ClipControl::Pause, 1.0, 2.0)]),
            source("Muted", 1, true, vec![clip(ClipControl::Skip, 1.0, 2.0), clip(ClipControl::LOOP, 0.0, 3.0)]),
            source("Live2", 2, false, vec![clip(ClipControl::AutoSkip, 4.0, 5.0)]),
        ]);

        for clip in registry.clips() {
            assert_eq!(clip.played, registry.is_muted(clip.index));
        }
        assert_eq!(registry.played_flags(), vec![false, true, true, false]);
    }

    #[test]
    fn test_foreign_tracks_and_clips_ignored() {
        let mut other = source("Anim", 0, false, vec![clip(ClipControl::Skip, 0.0, 1.0)]);
        other.kind = TrackKind::Other;
        let mut control = source("Control", 1, false, vec![clip(ClipControl::Skip, 0.0, 1.0)]);
        control.clips.push(ClipSource {
            name: "Audio".to_string(),
            start: 0.0,
            end: 1.0,
            control: None,
        });

        let mut registry = ClipRegistry::new();
        registry.rebuild_from_sources(vec![other, control]);
        assert_eq!(registry.track_count(), 1);
        assert_eq!(registry.clip_count(), 1);
    }

    #[test]
    fn test_rebuild_clears_previous_generation() {
        let mut registry = ClipRegistry::new();
        registry.rebuild_from_sources(vec![source("A", 0, false, vec![clip(ClipControl::Skip, 0.0, 1.0)])]);
        registry.set_played(ClipIndex(0), true);

        registry.rebuild_from_sources(vec![]);
        assert!(registry.is_empty());
        assert_eq!(registry.track_count(), 0);
    }

    #[test]
    fn test_set_played_by_index() {
        let mut registry = ClipRegistry::new();
        registry.rebuild_from_sources(vec![source(
            "A",
            0,
            false,
            vec![clip(ClipControl::Skip, 0.0, 1.0), clip(ClipControl::Skip, 1.0, 2.0), clip(ClipControl::Skip, 2.0, 3.0)],
        )]);

        registry.set_played_many(&[ClipIndex(0), ClipIndex(2)], true);
        assert_eq!(registry.played_flags(), vec![true, false, true]);
        assert!(!registry.set_played(ClipIndex(9), true));
    }

    #[test]
    fn test_unmuted_track_rearmed_on_rebuild() {
        let mut timeline = Timeline::new("Mute", 10.0);
        let muted = timeline.add_control_track("Muted");
        let open = timeline.add_control_track("Open");
        timeline
            .add_clip(muted, TimelineClip::control("Pause", ControlKind::Pause, 1.0, 2.0))
            .unwrap();
        timeline
            .add_clip(open, TimelineClip::control("Skip", ControlKind::Skip, 3.0, 4.0))
            .unwrap();
        let mut registry = ClipRegistry::new();

        timeline.set_muted(muted, true).unwrap();
        registry.rebuild(&timeline);
        assert_eq!(registry.played_flags(), vec![true, false]);

        // Unmuting alone changes nothing until the next rebuild
        timeline.set_muted(muted, false).unwrap();
        assert_eq!(registry.played_flags(), vec![true, false]);

        registry.rebuild(&timeline);
        assert_eq!(registry.played_flags(), vec![false, false]);
        assert!(!registry.is_muted(ClipIndex(0)));
    }

    #[test]
    fn test_mark_played_through_keeps_muted() {
        let mut registry = ClipRegistry::new();
        registry.rebuild_from_sources(vec![
            source("A", 0, false, vec![clip(ClipControl::Pause, 1.0, 2.0), clip(ClipControl::Skip, 2.0, 6.0)]),
            source("M", 1, true, vec![clip(ClipControl::Skip, 7.0, 8.0)]),
        ]);

        registry.mark_played_through(3.0);
        assert_eq!(registry.played_flags(), vec![true, false, true]);
    }
}
