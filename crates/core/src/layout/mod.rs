use serde::{Deserialize, Serialize};

use crate::song::{Song, DRUM_COUNT, MAX_PITCH, PITCHES_PER_OCTAVE, PITCH_OCTAVES};

/// Minimum pixel height of a semitone row when zoom is disabled.
const MIN_SEMITONE_HEIGHT: f64 = 1.0;
/// Minimum pixel width of a beat when zoom is enabled.
const MIN_BEAT_WIDTH: f64 = 8.0;
/// Smallest octave window in the non-zoomed layouts.
const MIN_WINDOW_OCTAVES: u32 = 3;
/// Keyboard strip height reserved by the zoomed vertical layout.
const VERTICAL_PIANO_MIN_HEIGHT: f64 = 140.0;

/// The fixed set of screen orientations the player can render in. Exactly
/// one is active at a time; the identifier strings double as the persisted
/// preference value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    Classic,
    Top,
    BoxBeep,
    Piano,
    Vertical,
    Middle,
    ShitBox4,
}

impl LayoutMode {
    pub const ALL: [LayoutMode; 7] = [
        LayoutMode::Classic,
        LayoutMode::Top,
        LayoutMode::BoxBeep,
        LayoutMode::Piano,
        LayoutMode::Vertical,
        LayoutMode::Middle,
        LayoutMode::ShitBox4,
    ];

    /// Stable identifier used for persistence and the command line.
    pub fn id(self) -> &'static str {
        match self {
            LayoutMode::Classic => "classic",
            LayoutMode::Top => "top",
            LayoutMode::BoxBeep => "boxbeep",
            LayoutMode::Piano => "piano",
            LayoutMode::Vertical => "vertical",
            LayoutMode::Middle => "middle",
            LayoutMode::ShitBox4 => "shitbox4",
        }
    }

    /// Parses a persisted identifier. Unknown strings yield `None` so the
    /// caller can fall back to a default.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|mode| mode.id() == id)
    }

    /// Coordinate transform descriptor for this mode. Adding a layout mode
    /// is a row in this table, not a new conditional at every call site.
    pub fn transform(self) -> LayoutTransform {
        match self {
            LayoutMode::Vertical => LayoutTransform {
                rotate_quarter_turn: true,
                flip_vertical: true,
                anchor: AnchorEdge::Bottom,
            },
            LayoutMode::BoxBeep => LayoutTransform {
                rotate_quarter_turn: false,
                flip_vertical: false,
                anchor: AnchorEdge::Right,
            },
            _ => LayoutTransform {
                rotate_quarter_turn: false,
                flip_vertical: false,
                anchor: AnchorEdge::Left,
            },
        }
    }
}

impl Default for LayoutMode {
    fn default() -> Self {
        LayoutMode::Classic
    }
}

/// Which edge of the timeline tracks the playhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorEdge {
    Left,
    Right,
    /// The timeline runs bottom-to-top.
    Bottom,
}

/// Coordinate-space descriptor derived from a [`LayoutMode`].
///
/// Vertical modes rotate the timeline a quarter turn with a compensating
/// translation so the rotated content still fills the viewport; the flip
/// keeps pitch increasing away from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutTransform {
    pub rotate_quarter_turn: bool,
    pub flip_vertical: bool,
    pub anchor: AnchorEdge,
}

/// Viewport bounding box handed in by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Pixel-space measurements for one render pass. Recomputed on every call
/// and never persisted, so eager rebuilds on resize are safe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportGeometry {
    pub timeline_width: f64,
    pub timeline_height: f64,
    pub bar_width: f64,
    pub part_width: f64,
    /// Visible octave window of tonal channels.
    pub window_octaves: u32,
    /// `window_octaves * 12 + 1`; the extra row keeps the top tonic visible.
    pub window_pitch_count: u32,
    pub wave_pitch_height: f64,
    pub drum_pitch_height: f64,
    pub piano_visible: bool,
    /// Keyboard strip height the layout reserves; zero for most modes.
    pub piano_height: f64,
}

/// Computes the geometry for a render pass.
///
/// When zoom is disabled the sizing targets a minimum semitone height so the
/// whole song fits the viewport; when enabled it targets a minimum beat
/// width, letting the timeline exceed the viewport for horizontal scrolling.
pub fn compute_geometry(
    song: &Song,
    mode: LayoutMode,
    viewport: Viewport,
    zoom: bool,
    mobile: bool,
) -> ViewportGeometry {
    let vertical = mode == LayoutMode::Vertical;
    let beats_total = (song.bar_count * song.beats_per_bar).max(1) as f64;

    let (timeline_width, timeline_height, window_octaves);
    let (piano_visible, piano_height);

    if zoom {
        // The pitch axis spans whichever viewport edge the rotation maps it to.
        let height = if vertical { viewport.width } else { viewport.height };
        window_octaves = ((height / (12.0 * 2.0)).round() as u32).clamp(1, PITCH_OCTAVES);
        let pitch_count = window_octaves * PITCHES_PER_OCTAVE + 1;
        let semitone_height = (height - 1.0) / pitch_count as f64;
        let target_beat_width = (semitone_height * 4.0).max(MIN_BEAT_WIDTH);
        timeline_width = (target_beat_width * beats_total).max(viewport.width);
        timeline_height = height;
        if vertical {
            piano_visible = !mobile;
            piano_height = if mobile { 0.0 } else { VERTICAL_PIANO_MIN_HEIGHT };
        } else {
            piano_visible = matches!(mode, LayoutMode::Piano | LayoutMode::Middle);
            piano_height = 0.0;
        }
    } else {
        timeline_width = viewport.width;
        let target_semitone_height =
            (timeline_width / beats_total / 6.0).max(MIN_SEMITONE_HEIGHT);
        timeline_height =
            (target_semitone_height * (MAX_PITCH + 1) as f64 + 1.0).min(viewport.height);
        window_octaves = ((timeline_height / (12.0 * target_semitone_height)).round() as u32)
            .clamp(MIN_WINDOW_OCTAVES, PITCH_OCTAVES);
        piano_visible = !vertical && matches!(mode, LayoutMode::Piano | LayoutMode::Middle);
        piano_height = 0.0;
    }

    let window_pitch_count = window_octaves * PITCHES_PER_OCTAVE + 1;
    let bar_width = timeline_width / song.bar_count.max(1) as f64;
    let part_width = bar_width / (song.beats_per_bar * crate::song::PARTS_PER_BEAT).max(1) as f64;

    ViewportGeometry {
        timeline_width,
        timeline_height,
        bar_width,
        part_width,
        window_octaves,
        window_pitch_count,
        wave_pitch_height: (timeline_height - 1.0) / window_pitch_count as f64,
        drum_pitch_height: (timeline_height - 1.0) / DRUM_COUNT as f64,
        piano_visible,
        piano_height,
    }
}

/// First octave of a channel's visible window, centered on the channel's
/// preferred octave and clamped to the instrument's pitch range.
pub fn octave_window_start(preferred_octave: u32, window_octaves: u32) -> u32 {
    let window = window_octaves.min(PITCH_OCTAVES);
    let raw = (preferred_octave as f64 - window as f64 * 0.5).ceil() as i64;
    raw.clamp(0, (PITCH_OCTAVES - window) as i64) as u32
}

/// Vertical pixel position of a channel's pitch-zero row. Pitches are drawn
/// upward from this baseline.
pub fn channel_baseline(window_start: u32, pitch_height: f64, timeline_height: f64) -> f64 {
    window_start as f64 * pitch_height * PITCHES_PER_OCTAVE as f64 + timeline_height
        - pitch_height * 0.5
        - 0.5
}
