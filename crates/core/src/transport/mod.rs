//! Boundary to the external playback engine.
//!
//! The engine owns the authoritative song model, transport position and
//! audio output; the core only reads metadata and issues transport
//! commands through this trait. Song-finished notifications flow the other
//! way: the host observes the engine and calls
//! [`crate::playlist::PlaylistController::advance`].

use crate::song::Song;

/// The slice of the playback engine the core consumes.
pub trait Transport {
    /// Song metadata snapshot, if a song is loaded.
    fn song(&self) -> Option<&Song>;
    /// Continuous playhead position in bars, `[0, bar_count)`.
    fn playhead(&self) -> f64;
    fn set_playhead(&mut self, position: f64);
    fn playing(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);
    /// `-1` loops forever, otherwise the loop section repeats `count` times.
    fn set_loop_repeat_count(&mut self, count: i32);
    fn set_volume(&mut self, volume: f64);
    /// Loads a song from its opaque encoded form. Decoding is the engine's
    /// concern; the core never inspects the string.
    fn load_song(&mut self, data: &str);
    fn snap_to_start(&mut self);
}

/// In-memory transport used by the command line demo and the test suites.
/// It keeps the commands it receives observable instead of making sound.
#[derive(Debug, Default)]
pub struct OfflineTransport {
    song: Option<Song>,
    playhead: f64,
    playing: bool,
    loop_repeat_count: i32,
    volume: f64,
    loaded_data: Option<String>,
    loads: usize,
}

impl OfflineTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a decoded song model, standing in for the engine's decoder.
    pub fn set_song_model(&mut self, song: Song) {
        self.song = Some(song);
    }

    pub fn loaded_data(&self) -> Option<&str> {
        self.loaded_data.as_deref()
    }

    pub fn loads(&self) -> usize {
        self.loads
    }

    pub fn loop_repeat_count(&self) -> i32 {
        self.loop_repeat_count
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }
}

impl Transport for OfflineTransport {
    fn song(&self) -> Option<&Song> {
        self.song.as_ref()
    }

    fn playhead(&self) -> f64 {
        self.playhead
    }

    fn set_playhead(&mut self, position: f64) {
        self.playhead = position;
    }

    fn playing(&self) -> bool {
        self.playing
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn set_loop_repeat_count(&mut self, count: i32) {
        self.loop_repeat_count = count;
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn load_song(&mut self, data: &str) {
        self.loaded_data = Some(data.to_string());
        self.loads += 1;
        self.playhead = 0.0;
    }

    fn snap_to_start(&mut self) {
        self.playhead = 0.0;
    }
}
