//! Timeline scene construction.
//!
//! Iterates the song's patterns and turns them into a flat list of drawable
//! primitives. Colors are emitted as roles, never concrete values; theming
//! belongs to the presentation layer. Building a scene is synchronous and
//! idempotent, so hosts can rebuild eagerly on resize or visibility changes.

use serde::{Deserialize, Serialize};

use crate::geometry::{note_path, PathPoint};
use crate::layout::{
    channel_baseline, compute_geometry, octave_window_start, LayoutMode, LayoutTransform,
    Viewport, ViewportGeometry,
};
use crate::song::{Song, PITCHES_PER_OCTAVE};

/// Opacity applied to noise-channel notes.
const NOISE_NOTE_OPACITY: f64 = 0.6;
/// Opacity of the octave band guides.
const OCTAVE_BAND_OPACITY: f64 = 0.75;

/// Symbolic color slot resolved by the presentation layer's theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorRole {
    BarLine,
    LoopAccent,
    OctaveBand,
    Channel(usize),
    FlashPrimary,
    FlashSecondary,
}

/// Axis-aligned rectangle primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectShape {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub role: ColorRole,
    pub opacity: f64,
}

/// One note envelope polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteShape {
    pub points: Vec<PathPoint>,
    pub role: ColorRole,
    pub opacity: f64,
}

/// Overlay drawn above a note that lights up as the playhead crosses it.
/// Spawned with opacity zero; [`crate::playhead::FlashTracker`] animates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashOverlay {
    pub id: usize,
    pub points: Vec<PathPoint>,
    pub role: ColorRole,
    pub bar: u32,
    /// Note start in parts, bar-relative.
    pub start: u32,
    /// Note end in parts, bar-relative.
    pub end: u32,
    pub pitch: u32,
    pub is_noise: bool,
}

/// One key of the piano strip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PianoKey {
    /// Pitch row this key corresponds to, `0..window_pitch_count`.
    pub pitch: u32,
    pub x: f64,
    pub width: f64,
    pub height: f64,
    pub is_white: bool,
}

/// Options that vary per host rather than per song.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RenderOptions {
    pub zoom: bool,
    pub mobile: bool,
    pub flash_enabled: bool,
    /// Depth of the piano strip, when the layout shows one.
    pub piano_depth: f64,
}

/// The full set of drawables for one render pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineScene {
    pub geometry: ViewportGeometry,
    pub transform: LayoutTransform,
    pub rects: Vec<RectShape>,
    pub notes: Vec<NoteShape>,
    pub overlays: Vec<FlashOverlay>,
    pub piano_keys: Vec<PianoKey>,
}

impl TimelineScene {
    /// Empty scene used when no song is loaded; rendering degrades to a
    /// cleared timeline instead of failing.
    pub fn empty(mode: LayoutMode) -> Self {
        Self {
            geometry: ViewportGeometry {
                timeline_width: 0.0,
                timeline_height: 0.0,
                bar_width: 0.0,
                part_width: 0.0,
                window_octaves: 0,
                window_pitch_count: 0,
                wave_pitch_height: 0.0,
                drum_pitch_height: 0.0,
                piano_visible: false,
                piano_height: 0.0,
            },
            transform: mode.transform(),
            rects: Vec::new(),
            notes: Vec::new(),
            overlays: Vec::new(),
            piano_keys: Vec::new(),
        }
    }
}

/// Builds the scene for a song snapshot, or an empty scene if none is loaded.
pub fn render(
    song: Option<&Song>,
    mode: LayoutMode,
    viewport: Viewport,
    options: RenderOptions,
) -> TimelineScene {
    let Some(song) = song else {
        return TimelineScene::empty(mode);
    };

    let geometry = compute_geometry(song, mode, viewport, options.zoom, options.mobile);
    let mut scene = TimelineScene {
        geometry,
        transform: mode.transform(),
        rects: Vec::new(),
        notes: Vec::new(),
        overlays: Vec::new(),
        piano_keys: Vec::new(),
    };

    push_bar_lines(&mut scene, song);
    push_octave_bands(&mut scene);
    push_notes(&mut scene, song, options.flash_enabled);
    if geometry.piano_visible {
        push_piano_keys(&mut scene, song, options.piano_depth);
    }

    scene
}

fn push_bar_lines(scene: &mut TimelineScene, song: &Song) {
    let geometry = &scene.geometry;
    for bar in 0..=song.bar_count {
        let accent = bar == song.loop_start || bar == song.loop_start + song.loop_length;
        scene.rects.push(RectShape {
            x: bar as f64 * geometry.bar_width - 1.0,
            y: 0.0,
            width: 2.0,
            height: geometry.timeline_height,
            role: if accent { ColorRole::LoopAccent } else { ColorRole::BarLine },
            opacity: 1.0,
        });
    }
}

fn push_octave_bands(scene: &mut TimelineScene) {
    let geometry = &scene.geometry;
    for octave in 0..=geometry.window_octaves {
        scene.rects.push(RectShape {
            x: 0.0,
            y: octave as f64 * PITCHES_PER_OCTAVE as f64 * geometry.wave_pitch_height,
            width: geometry.timeline_width,
            height: geometry.wave_pitch_height + 1.0,
            role: ColorRole::OctaveBand,
            opacity: OCTAVE_BAND_OPACITY,
        });
    }
}

fn push_notes(scene: &mut TimelineScene, song: &Song, flash_enabled: bool) {
    let geometry = scene.geometry;
    let mut next_overlay_id = 0;

    // Walk channels back to front so earlier channels draw on top.
    for channel_index in (0..song.channels.len()).rev() {
        let channel = &song.channels[channel_index];
        let pitch_height = if channel.is_noise {
            geometry.drum_pitch_height
        } else {
            geometry.wave_pitch_height
        };
        let window_start = if channel.is_noise {
            0
        } else {
            octave_window_start(channel.octave, geometry.window_octaves)
        };
        let offset_y = channel_baseline(window_start, pitch_height, geometry.timeline_height);
        let radius = (pitch_height + 1.0) / 2.0;

        for bar in 0..song.bar_count {
            let Some(pattern) = song.pattern(channel_index, bar as usize) else {
                continue;
            };
            let offset_x = bar as f64 * geometry.bar_width;

            for note in &pattern.notes {
                for &pitch in &note.pitches {
                    let points = note_path(
                        pitch,
                        note.start,
                        &note.pins,
                        radius,
                        offset_x,
                        offset_y,
                        geometry.part_width,
                        pitch_height,
                    );
                    scene.notes.push(NoteShape {
                        points: points.clone(),
                        role: ColorRole::Channel(channel_index),
                        opacity: if channel.is_noise { NOISE_NOTE_OPACITY } else { 1.0 },
                    });

                    if flash_enabled {
                        scene.overlays.push(FlashOverlay {
                            id: next_overlay_id,
                            points,
                            role: if channel.is_noise {
                                ColorRole::FlashSecondary
                            } else {
                                ColorRole::FlashPrimary
                            },
                            bar,
                            start: note.start,
                            end: note.end,
                            pitch,
                            is_noise: channel.is_noise,
                        });
                        next_overlay_id += 1;
                    }
                }
            }
        }
    }
}

fn push_piano_keys(scene: &mut TimelineScene, song: &Song, depth: f64) {
    let geometry = &scene.geometry;
    // The keyboard spans the pitch axis, one key per visible semitone row.
    let key_count = geometry.window_pitch_count.max(1);
    let span = geometry.timeline_height;
    let key_width = span / key_count as f64;
    let base_pitch = song.key_info().base_pitch;

    for index in 0..key_count {
        let name_index = ((index + base_pitch) % PITCHES_PER_OCTAVE) as usize;
        scene.piano_keys.push(PianoKey {
            pitch: index,
            x: index as f64 / key_count as f64 * span,
            width: key_width,
            height: depth,
            is_white: crate::song::KEYS[name_index].is_white_key,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::{Channel, Note, NotePin, Pattern};

    fn build_song() -> Song {
        let note = Note {
            pitches: vec![24, 28],
            start: 0,
            end: 48,
            pins: vec![NotePin::new(0, 0, 6), NotePin::new(48, 0, 6)],
        };
        let pattern = Pattern { notes: vec![note] };
        Song {
            bar_count: 4,
            beats_per_bar: 8,
            key: 0,
            loop_start: 1,
            loop_length: 2,
            channels: vec![
                Channel {
                    patterns: vec![Some(pattern.clone()), None, Some(pattern.clone()), None],
                    octave: 2,
                    is_noise: false,
                },
                Channel {
                    patterns: vec![None, Some(pattern), None, None],
                    octave: 0,
                    is_noise: true,
                },
            ],
        }
    }

    fn options(flash: bool) -> RenderOptions {
        RenderOptions {
            zoom: false,
            mobile: false,
            flash_enabled: flash,
            piano_depth: 40.0,
        }
    }

    #[test]
    fn missing_song_renders_an_empty_scene() {
        let scene = render(None, LayoutMode::Classic, Viewport::new(800.0, 600.0), options(true));
        assert!(scene.rects.is_empty());
        assert!(scene.notes.is_empty());
        assert!(scene.overlays.is_empty());
    }

    #[test]
    fn bar_lines_mark_loop_boundaries() {
        let song = build_song();
        let scene = render(
            Some(&song),
            LayoutMode::Classic,
            Viewport::new(800.0, 600.0),
            options(false),
        );
        let bar_lines: Vec<_> = scene
            .rects
            .iter()
            .filter(|rect| matches!(rect.role, ColorRole::BarLine | ColorRole::LoopAccent))
            .collect();
        assert_eq!(bar_lines.len(), song.bar_count as usize + 1);
        let accents = bar_lines
            .iter()
            .filter(|rect| rect.role == ColorRole::LoopAccent)
            .count();
        // Loop start and loop end.
        assert_eq!(accents, 2);
    }

    #[test]
    fn chords_emit_one_polygon_per_pitch() {
        let song = build_song();
        let scene = render(
            Some(&song),
            LayoutMode::Classic,
            Viewport::new(800.0, 600.0),
            options(false),
        );
        // Two patterns on the tonal channel and one on the noise channel,
        // each holding one two-pitch chord.
        assert_eq!(scene.notes.len(), 6);
        assert!(scene.overlays.is_empty());
    }

    #[test]
    fn flash_overlays_carry_note_metadata() {
        let song = build_song();
        let scene = render(
            Some(&song),
            LayoutMode::Classic,
            Viewport::new(800.0, 600.0),
            options(true),
        );
        assert_eq!(scene.overlays.len(), scene.notes.len());
        let ids: Vec<_> = scene.overlays.iter().map(|overlay| overlay.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
        let noise = scene.overlays.iter().find(|overlay| overlay.is_noise).unwrap();
        assert_eq!(noise.role, ColorRole::FlashSecondary);
        assert_eq!(noise.bar, 1);
    }

    #[test]
    fn noise_notes_draw_at_reduced_opacity() {
        let song = build_song();
        let scene = render(
            Some(&song),
            LayoutMode::Classic,
            Viewport::new(800.0, 600.0),
            options(false),
        );
        let noise_notes = scene
            .notes
            .iter()
            .filter(|note| note.role == ColorRole::Channel(1))
            .count();
        assert_eq!(noise_notes, 2);
        for note in &scene.notes {
            let expected = if note.role == ColorRole::Channel(1) { 0.6 } else { 1.0 };
            assert_eq!(note.opacity, expected);
        }
    }

    #[test]
    fn piano_keys_follow_the_song_key() {
        let mut song = build_song();
        song.key = 9; // A
        let scene = render(
            Some(&song),
            LayoutMode::Piano,
            Viewport::new(800.0, 600.0),
            options(false),
        );
        assert!(!scene.piano_keys.is_empty());
        assert_eq!(scene.piano_keys.len(), scene.geometry.window_pitch_count as usize);
        // Row zero is the tonic A, a white key; row one is A sharp.
        assert!(scene.piano_keys[0].is_white);
        assert!(!scene.piano_keys[1].is_white);
    }

    #[test]
    fn scenes_round_trip_through_json() {
        let song = build_song();
        let scene = render(
            Some(&song),
            LayoutMode::BoxBeep,
            Viewport::new(800.0, 600.0),
            options(true),
        );
        let json = serde_json::to_string(&scene).unwrap();
        let decoded: TimelineScene = serde_json::from_str(&json).unwrap();
        assert_eq!(scene, decoded);
    }

    #[test]
    fn rendering_is_idempotent() {
        let song = build_song();
        let viewport = Viewport::new(1024.0, 768.0);
        let first = render(Some(&song), LayoutMode::Vertical, viewport, options(true));
        let second = render(Some(&song), LayoutMode::Vertical, viewport, options(true));
        assert_eq!(first, second);
    }
}
