//! Playback position synchronisation.
//!
//! Converts the transport's continuous playhead position into per-layout
//! pixel offsets, animates the note-flash overlays, and translates pointer
//! drags back into transport positions. Everything here is a pure function
//! of explicit state so hosts without a live display surface can drive it
//! deterministically.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{PreferenceStore, PLAYER_ID_KEY};
use crate::layout::{AnchorEdge, LayoutMode, Viewport};
use crate::timeline::TimelineScene;

/// Interval of the advisory cross-instance poll.
pub const INSTANCE_POLL_MS: u64 = 100;

/// Flash overlays dimmer than this do not light their piano key.
const KEY_LIGHT_THRESHOLD: f64 = 0.05;

/// Pixel offset of the playhead marker along the timeline's long axis.
/// Monotone non-decreasing in `position` for every layout.
pub fn playhead_offset(position: f64, bar_count: u32, timeline_width: f64) -> f64 {
    if bar_count == 0 {
        return 0.0;
    }
    timeline_width * position / bar_count as f64
}

/// Where the presentation layer should place the playhead marker and the
/// timeline container for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayheadPlacement {
    pub playhead_px: f64,
    pub container_left: f64,
    pub container_top: f64,
    pub container_bottom: f64,
    /// Scroll applied by the layouts that keep the playhead in view by
    /// scrolling the viewport instead of translating the container.
    pub scroll_left: f64,
}

/// Computes the marker and container placement for the active layout.
pub fn place_playhead(
    mode: LayoutMode,
    position: f64,
    bar_count: u32,
    timeline_width: f64,
    viewport: Viewport,
) -> PlayheadPlacement {
    let offset = playhead_offset(position, bar_count, timeline_width);
    match mode {
        // These layouts pin the playhead to the viewport center by sliding
        // the whole container underneath it.
        LayoutMode::Piano | LayoutMode::Middle => PlayheadPlacement {
            playhead_px: offset,
            container_left: -offset,
            container_top: 0.0,
            container_bottom: 0.0,
            scroll_left: 0.0,
        },
        LayoutMode::Vertical => PlayheadPlacement {
            playhead_px: offset,
            container_left: 0.0,
            container_top: offset + viewport.height / 2.0,
            container_bottom: -offset,
            scroll_left: 0.0,
        },
        _ => PlayheadPlacement {
            playhead_px: offset,
            container_left: 0.0,
            container_top: 0.0,
            container_bottom: 0.0,
            scroll_left: if bar_count == 0 {
                0.0
            } else {
                (position / bar_count as f64) * (timeline_width - viewport.width)
            },
        },
    }
}

/// Opacity update for one flash overlay; the presentation layer applies it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlashUpdate {
    pub id: usize,
    pub opacity: f64,
}

/// Output of one flash tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlashFrame {
    pub updates: Vec<FlashUpdate>,
    /// Piano keys currently lit by a tonal note.
    pub lit_keys: Vec<u32>,
}

#[derive(Debug, Clone)]
struct ActiveFlash {
    id: usize,
    bar: u32,
    start_frac: f64,
    end_frac: f64,
    pitch: u32,
    is_noise: bool,
    opacity: f64,
}

/// Tracks which flash overlays are live as the playhead moves.
///
/// Overlays join the active set when their bar becomes current and are
/// retired once they belong to another bar and have fully faded.
#[derive(Debug, Default)]
pub struct FlashTracker {
    per_bar: Vec<Vec<ActiveFlash>>,
    active: Vec<ActiveFlash>,
    current_bar: Option<u32>,
}

impl FlashTracker {
    /// Indexes a scene's overlays by bar. Rebuild the tracker whenever the
    /// scene is rebuilt.
    pub fn new(scene: &TimelineScene, parts_per_bar: u32) -> Self {
        let bar_count = scene
            .overlays
            .iter()
            .map(|overlay| overlay.bar + 1)
            .max()
            .unwrap_or(0);
        let mut per_bar: Vec<Vec<ActiveFlash>> = vec![Vec::new(); bar_count as usize];
        let parts = parts_per_bar.max(1) as f64;
        for overlay in &scene.overlays {
            per_bar[overlay.bar as usize].push(ActiveFlash {
                id: overlay.id,
                bar: overlay.bar,
                start_frac: overlay.start as f64 / parts,
                end_frac: overlay.end as f64 / parts,
                pitch: overlay.pitch,
                is_noise: overlay.is_noise,
                opacity: 0.0,
            });
        }
        Self {
            per_bar,
            active: Vec::new(),
            current_bar: None,
        }
    }

    /// Recomputes overlay opacities for the given playhead position.
    ///
    /// The envelope is triangular: fully lit at the note's midpoint, fading
    /// linearly to either end, zero outside the note or its bar.
    pub fn tick(&mut self, playhead: f64) -> FlashFrame {
        let bar = playhead.floor().max(0.0) as u32;
        let local = playhead - playhead.floor();

        if self.current_bar != Some(bar) {
            self.retire_faded(bar);
            if let Some(entering) = self.per_bar.get(bar as usize) {
                self.active.extend(entering.iter().cloned());
            }
            self.current_bar = Some(bar);
        }

        let mut frame = FlashFrame::default();
        for flash in &mut self.active {
            let opacity = if flash.bar == bar && local >= flash.start_frac {
                let half = (flash.end_frac - flash.start_frac) / 2.0;
                if half > 0.0 {
                    1.0 - (((local - flash.start_frac) - half) / half).abs()
                } else {
                    0.0
                }
            } else {
                0.0
            };
            flash.opacity = opacity.max(0.0);
            frame.updates.push(FlashUpdate { id: flash.id, opacity: flash.opacity });
            if !flash.is_noise && flash.opacity > KEY_LIGHT_THRESHOLD {
                frame.lit_keys.push(flash.pitch);
            }
        }
        frame
    }

    fn retire_faded(&mut self, bar: u32) {
        let mut index = self.active.len();
        while index > 0 {
            index -= 1;
            let flash = &self.active[index];
            if flash.bar != bar && flash.opacity == 0.0 {
                remove_from_unordered(&mut self.active, index);
            }
        }
    }

    #[cfg(test)]
    fn active_len(&self) -> usize {
        self.active.len()
    }
}

/// Removes an element without preserving order: swap with the tail and pop.
fn remove_from_unordered<T>(items: &mut Vec<T>, index: usize) {
    if items.is_empty() || index >= items.len() {
        return;
    }
    let last = items.len() - 1;
    items.swap(index, last);
    items.pop();
}

/// Bounding box of the visualization area in cursor coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorBounds {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Pointer/touch drag state for the playhead.
///
/// While a drag is live the playhead position comes from the translated
/// cursor instead of the transport; `end` always clears every flag so a
/// stray release without a press is harmless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragState {
    dragging_playhead: bool,
    dragging_timeline_bar: bool,
}

impl DragState {
    pub fn begin(&mut self) {
        self.dragging_playhead = true;
    }

    pub fn begin_timeline_bar(&mut self) {
        self.dragging_playhead = true;
        self.dragging_timeline_bar = true;
    }

    /// Idempotent: clears all drag flags regardless of prior state.
    pub fn end(&mut self) {
        self.dragging_playhead = false;
        self.dragging_timeline_bar = false;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging_playhead
    }

    pub fn on_timeline_bar(&self) -> bool {
        self.dragging_timeline_bar
    }

    /// Translates a cursor coordinate into a transport position, inverting
    /// the active layout's anchor mapping. The caller picks the axis the
    /// layout tracks (x for horizontal modes, y for vertical). Returns
    /// `None` when no drag is live or the playlist has no song.
    pub fn position_from_cursor(
        &self,
        mode: LayoutMode,
        cursor: f64,
        bounds: CursorBounds,
        bar_count: u32,
    ) -> Option<f64> {
        if !self.dragging_playhead || bar_count == 0 {
            return None;
        }
        let bars = bar_count as f64;
        // Dragging the secondary timeline bar in vertical mode falls back to
        // the horizontal mapping.
        let anchor = if self.dragging_timeline_bar {
            AnchorEdge::Left
        } else {
            mode.transform().anchor
        };
        let position = match anchor {
            AnchorEdge::Left => bars * (cursor - bounds.left) / (bounds.right - bounds.left),
            AnchorEdge::Right => bars * (cursor - bounds.right) / (bounds.left - bounds.right),
            AnchorEdge::Bottom => bars * (cursor - bounds.bottom) / (bounds.top - bounds.bottom),
        };
        Some(position)
    }
}

/// Handle for a scheduled animation loop. Cancelling is safe even after the
/// loop has already stopped.
#[derive(Debug, Clone, Default)]
pub struct LoopHandle {
    active: Arc<AtomicBool>,
}

impl LoopHandle {
    pub fn cancel(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

/// Self-cancelling render loop driven by the host's animation callback.
///
/// The host calls [`FrameLoop::tick`] once per display refresh and keeps
/// rescheduling only while it returns `true`. Starting a new loop cancels
/// the previous one first, so no two loops run concurrently.
#[derive(Debug, Default)]
pub struct FrameLoop {
    handle: Option<LoopHandle>,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels any running loop and returns a fresh handle.
    pub fn start(&mut self) -> LoopHandle {
        self.cancel();
        let handle = LoopHandle {
            active: Arc::new(AtomicBool::new(true)),
        };
        self.handle = Some(handle.clone());
        handle
    }

    /// Returns whether the loop should reschedule itself. The loop stops
    /// as soon as the transport stops or the handle was cancelled.
    pub fn tick(&mut self, playing: bool) -> bool {
        let live = self
            .handle
            .as_ref()
            .map(|handle| handle.is_active())
            .unwrap_or(false);
        if !live || !playing {
            self.cancel();
            return false;
        }
        true
    }

    /// Safe to call when no loop is running.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

/// Advisory cross-instance coordination through a shared marker.
///
/// Each player writes its random id into the shared store when playback
/// starts; a low-frequency poll pauses this instance if another id appears.
/// Last writer wins; storage failures degrade to "no coordination".
#[derive(Debug, Clone)]
pub struct InstanceGuard {
    id: String,
}

impl InstanceGuard {
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        Self {
            id: format!("{:08x}", rng.gen::<u32>()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Marks this instance as the active player.
    pub fn claim(&self, store: &mut dyn PreferenceStore) {
        store.set(PLAYER_ID_KEY, &self.id);
    }

    /// True when another instance has claimed playback since our last claim.
    pub fn superseded(&self, store: &dyn PreferenceStore) -> bool {
        match store.get(PLAYER_ID_KEY) {
            Some(other) => other != self.id,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryStore;
    use crate::song::{Channel, Note, NotePin, Pattern, Song};
    use crate::timeline::{render, RenderOptions};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn build_song() -> Song {
        let note = Note {
            pitches: vec![24],
            start: 0,
            end: 96,
            pins: vec![NotePin::new(0, 0, 6), NotePin::new(96, 0, 6)],
        };
        Song {
            bar_count: 4,
            beats_per_bar: 4,
            key: 0,
            loop_start: 0,
            loop_length: 4,
            channels: vec![Channel {
                patterns: vec![
                    Some(Pattern { notes: vec![note.clone()] }),
                    Some(Pattern { notes: vec![note] }),
                    None,
                    None,
                ],
                octave: 2,
                is_noise: false,
            }],
        }
    }

    fn build_scene(song: &Song) -> TimelineScene {
        render(
            Some(song),
            LayoutMode::Classic,
            Viewport::new(800.0, 600.0),
            RenderOptions { flash_enabled: true, ..Default::default() },
        )
    }

    #[test]
    fn offset_is_monotone_in_position() {
        let mut previous = f64::MIN;
        for step in 0..=64 {
            let position = step as f64 * 4.0 / 64.0;
            let offset = playhead_offset(position, 4, 800.0);
            assert!(offset >= previous);
            previous = offset;
        }
        assert_eq!(playhead_offset(4.0, 4, 800.0), 800.0);
    }

    #[test]
    fn placement_follows_the_layout_anchor() {
        let viewport = Viewport::new(400.0, 300.0);
        let piano = place_playhead(LayoutMode::Piano, 2.0, 4, 800.0, viewport);
        assert_eq!(piano.playhead_px, 400.0);
        assert_eq!(piano.container_left, -400.0);

        let vertical = place_playhead(LayoutMode::Vertical, 2.0, 4, 800.0, viewport);
        assert_eq!(vertical.container_bottom, -400.0);
        assert_eq!(vertical.container_top, 400.0 + 150.0);

        let classic = place_playhead(LayoutMode::Classic, 2.0, 4, 800.0, viewport);
        assert_eq!(classic.container_left, 0.0);
        assert_eq!(classic.scroll_left, 0.5 * (800.0 - 400.0));
    }

    #[test]
    fn flash_envelope_is_triangular() {
        let song = build_song();
        let scene = build_scene(&song);
        let mut tracker = FlashTracker::new(&scene, song.parts_per_bar());

        // The bar-0 note spans the whole bar, so it peaks at the midpoint.
        let mid = tracker.tick(0.5);
        assert_eq!(mid.updates.len(), 1);
        assert!((mid.updates[0].opacity - 1.0).abs() < 1e-9);
        assert_eq!(mid.lit_keys, vec![24]);

        let late = tracker.tick(0.75);
        assert!((late.updates[0].opacity - 0.5).abs() < 1e-9);

        let done = tracker.tick(2.25);
        assert!(done.updates.iter().all(|update| update.opacity == 0.0));
        assert!(done.lit_keys.is_empty());
    }

    #[test]
    fn faded_overlays_are_retired_when_the_bar_changes() {
        let song = build_song();
        let scene = build_scene(&song);
        let mut tracker = FlashTracker::new(&scene, song.parts_per_bar());

        tracker.tick(0.5);
        assert_eq!(tracker.active_len(), 1);
        // Entering bar 1 keeps the still-lit bar-0 overlay around until it
        // fades; a later bar change retires it.
        tracker.tick(1.1);
        assert_eq!(tracker.active_len(), 2);
        tracker.tick(2.0);
        tracker.tick(3.0);
        assert_eq!(tracker.active_len(), 0);
    }

    #[test]
    fn remove_from_unordered_handles_edges() {
        let mut items = vec![1, 2, 3, 4];
        remove_from_unordered(&mut items, 1);
        assert_eq!(items, vec![1, 4, 3]);
        remove_from_unordered(&mut items, 2);
        assert_eq!(items, vec![1, 4]);
        remove_from_unordered(&mut items, 9);
        assert_eq!(items, vec![1, 4]);
        let mut empty: Vec<i32> = Vec::new();
        remove_from_unordered(&mut empty, 0);
        assert!(empty.is_empty());
    }

    #[test]
    fn drag_maps_cursor_through_the_anchor() {
        let bounds = CursorBounds { left: 100.0, right: 500.0, top: 50.0, bottom: 650.0 };
        let mut drag = DragState::default();
        assert_eq!(drag.position_from_cursor(LayoutMode::Classic, 300.0, bounds, 4), None);

        drag.begin();
        // Halfway across a 4-bar song lands exactly on bar 2.
        let position = drag
            .position_from_cursor(LayoutMode::Classic, 300.0, bounds, 4)
            .unwrap();
        assert!((position - 2.0).abs() < 1e-9);

        // BoxBeep anchors the right edge, so the same cursor mirrors.
        let mirrored = drag
            .position_from_cursor(LayoutMode::BoxBeep, 400.0, bounds, 4)
            .unwrap();
        assert!((mirrored - 1.0).abs() < 1e-9);

        // Vertical reads the y axis bottom-to-top.
        let vertical = drag
            .position_from_cursor(LayoutMode::Vertical, 350.0, bounds, 4)
            .unwrap();
        assert!((vertical - 2.0).abs() < 1e-9);
    }

    #[test]
    fn drag_end_is_idempotent() {
        let mut drag = DragState::default();
        drag.end();
        assert!(!drag.is_dragging());
        drag.begin_timeline_bar();
        drag.end();
        drag.end();
        assert!(!drag.is_dragging());
        assert!(!drag.on_timeline_bar());
    }

    #[test]
    fn frame_loop_stops_when_playback_stops() {
        let mut frame_loop = FrameLoop::new();
        let handle = frame_loop.start();
        assert!(frame_loop.tick(true));
        assert!(handle.is_active());
        assert!(!frame_loop.tick(false));
        assert!(!handle.is_active());
        // Cancelling an already stopped loop is harmless.
        frame_loop.cancel();
        handle.cancel();
        assert!(!frame_loop.tick(true));
    }

    #[test]
    fn starting_a_loop_cancels_the_previous_one() {
        let mut frame_loop = FrameLoop::new();
        let first = frame_loop.start();
        let second = frame_loop.start();
        assert!(!first.is_active());
        assert!(second.is_active());
    }

    #[test]
    fn instance_guard_detects_another_player() {
        let mut rng = SmallRng::seed_from_u64(7);
        let guard = InstanceGuard::new(&mut rng);
        let mut store = MemoryStore::default();

        // Inaccessible or empty storage degrades to no coordination.
        assert!(!guard.superseded(&store));

        guard.claim(&mut store);
        assert!(!guard.superseded(&store));

        let other = InstanceGuard::new(&mut rng);
        other.claim(&mut store);
        assert!(guard.superseded(&store));
    }
}
