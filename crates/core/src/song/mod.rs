use serde::{Deserialize, Serialize};

/// Fixed time resolution of the song format: parts per beat.
pub const PARTS_PER_BEAT: u32 = 24;
/// Number of semitones per octave.
pub const PITCHES_PER_OCTAVE: u32 = 12;
/// Total octave range of tonal instruments.
pub const PITCH_OCTAVES: u32 = 8;
/// Highest tonal pitch index (exclusive of the extra tonic row).
pub const MAX_PITCH: u32 = PITCH_OCTAVES * PITCHES_PER_OCTAVE;
/// Number of rows available to noise/drum channels.
pub const DRUM_COUNT: u32 = 12;
/// Maximum representable note size (expression). Pin sizes are stored in
/// `0..=NOTE_SIZE_MAX` and scaled to a fraction of the note radius.
pub const NOTE_SIZE_MAX: u32 = 6;

/// Static description of one of the twelve musical keys.
#[derive(Debug, Clone, Copy)]
pub struct KeyInfo {
    pub name: &'static str,
    /// Semitone offset of the tonic within an octave.
    pub base_pitch: u32,
    pub is_white_key: bool,
}

/// The twelve keys, indexed by [`Song::key`].
pub const KEYS: [KeyInfo; 12] = [
    KeyInfo { name: "C", base_pitch: 0, is_white_key: true },
    KeyInfo { name: "C♯", base_pitch: 1, is_white_key: false },
    KeyInfo { name: "D", base_pitch: 2, is_white_key: true },
    KeyInfo { name: "D♯", base_pitch: 3, is_white_key: false },
    KeyInfo { name: "E", base_pitch: 4, is_white_key: true },
    KeyInfo { name: "F", base_pitch: 5, is_white_key: true },
    KeyInfo { name: "F♯", base_pitch: 6, is_white_key: false },
    KeyInfo { name: "G", base_pitch: 7, is_white_key: true },
    KeyInfo { name: "G♯", base_pitch: 8, is_white_key: false },
    KeyInfo { name: "A", base_pitch: 9, is_white_key: true },
    KeyInfo { name: "A♯", base_pitch: 10, is_white_key: false },
    KeyInfo { name: "B", base_pitch: 11, is_white_key: true },
];

/// A control point on a note envelope. Consecutive pins define a
/// piecewise-linear envelope in both pitch offset and thickness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePin {
    /// Time offset in parts, relative to the note start. The first pin of a
    /// note always sits at offset zero.
    pub time: u32,
    /// Pitch interval offset in semitones relative to the note pitch.
    pub interval: i32,
    /// Expression in `0..=NOTE_SIZE_MAX`.
    pub size: u32,
}

impl NotePin {
    pub fn new(time: u32, interval: i32, size: u32) -> Self {
        Self { time, interval, size }
    }
}

/// One note: one or more simultaneous pitches sharing a pin envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub pitches: Vec<u32>,
    /// Start time in parts, relative to the bar.
    pub start: u32,
    /// End time in parts, relative to the bar.
    pub end: u32,
    pub pins: Vec<NotePin>,
}

/// The notes of one bar on one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub notes: Vec<Note>,
}

/// One instrument lane of the song.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Patterns indexed by bar; `None` means the bar is empty.
    pub patterns: Vec<Option<Pattern>>,
    /// Preferred octave the visible window should center on.
    pub octave: u32,
    /// Noise channels use a fixed pitch window instead of the tonal
    /// octave window.
    pub is_noise: bool,
}

/// Read-only snapshot of the song owned by the external playback engine.
///
/// The core never mutates or caches these; every render pass re-reads the
/// snapshot it is handed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub bar_count: u32,
    pub beats_per_bar: u32,
    /// Index into [`KEYS`].
    pub key: usize,
    pub loop_start: u32,
    pub loop_length: u32,
    pub channels: Vec<Channel>,
}

impl Song {
    /// Number of parts in a single bar.
    pub fn parts_per_bar(&self) -> u32 {
        self.beats_per_bar * PARTS_PER_BEAT
    }

    /// Looks up the pattern for a channel and bar, if either exists.
    pub fn pattern(&self, channel: usize, bar: usize) -> Option<&Pattern> {
        self.channels
            .get(channel)?
            .patterns
            .get(bar)?
            .as_ref()
    }

    /// Key description for this song, falling back to C for out-of-range
    /// indices rather than panicking on malformed input.
    pub fn key_info(&self) -> KeyInfo {
        KEYS.get(self.key).copied().unwrap_or(KEYS[0])
    }
}
