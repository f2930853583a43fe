//! Playlist traversal state machine.
//!
//! Decides which song plays next when the current one finishes or the user
//! skips, honouring the repeat-song, shuffle and repeat-playlist flags in
//! that order of precedence. Random choices take an injected [`Rng`] so the
//! machine stays deterministic under test.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::transport::Transport;

/// Delay between a song finishing and the next one starting, decoupling the
/// presentation transition from an immediate re-trigger.
pub const ADVANCE_DELAY_MS: u64 = 2000;

/// Opaque link back to the presentation element a playlist entry was built
/// from, used to toggle its "now playing" marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryHandle(pub usize);

/// One playlist entry scanned from the presentation layer at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub handle: EntryHandle,
    /// The song in its opaque encoded form.
    pub song_data: String,
    /// Loop-section repetitions: `-1` means infinite.
    pub repetitions: i32,
}

impl PlaylistEntry {
    /// Builds an entry, normalising the repetition attribute at ingestion.
    /// Absent, non-numeric or out-of-range values become infinite looping;
    /// selection never has to re-validate.
    pub fn new(handle: EntryHandle, song_data: impl Into<String>, repetitions: Option<&str>) -> Self {
        let repetitions = repetitions
            .and_then(|raw| raw.trim().parse::<i32>().ok())
            .filter(|count| *count >= -1)
            .unwrap_or(-1);
        Self {
            handle,
            song_data: song_data.into(),
            repetitions,
        }
    }
}

/// The three independent traversal flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistFlags {
    pub repeat_song: bool,
    pub shuffle: bool,
    pub repeat_playlist: bool,
}

/// Outcome of an advance decision. The host pauses the transport, waits
/// `delay_ms`, selects `index`, then resumes playback unless `halt` is set.
/// Selection still happens when halting, so the visible "now playing"
/// marker wraps to the top of the list while playback stays paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advance {
    pub index: usize,
    pub halt: bool,
    pub delay_ms: u64,
}

/// Marker toggles for the presentation layer after a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionUpdate {
    pub deactivate: Option<EntryHandle>,
    /// Activate this entry's marker and scroll it into view.
    pub activate: EntryHandle,
    /// A full timeline rebuild is required after every selection.
    pub rebuild_timeline: bool,
}

/// Ordered playlist plus cursor and flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistState {
    entries: Vec<PlaylistEntry>,
    current: usize,
    pub flags: PlaylistFlags,
}

impl PlaylistState {
    pub fn new(entries: Vec<PlaylistEntry>) -> Self {
        Self {
            entries,
            current: 0,
            flags: PlaylistFlags::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn entry(&self, index: usize) -> Option<&PlaylistEntry> {
        self.entries.get(index)
    }

    /// Picks the next index by flag precedence. First matching rule wins:
    /// repeat-song replays the current entry; shuffle picks a uniformly
    /// random different entry (same entry when the list is too short to
    /// offer one, so the search always terminates); otherwise insertion
    /// order, wrapping to zero at the end with a halt unless repeat-playlist
    /// is set.
    fn next_index<R: Rng>(&self, rng: &mut R) -> (usize, bool) {
        if self.flags.repeat_song {
            (self.current, false)
        } else if self.flags.shuffle {
            if self.entries.len() <= 1 {
                (self.current, false)
            } else {
                let mut next = self.current;
                while next == self.current {
                    next = rng.gen_range(0..self.entries.len());
                }
                (next, false)
            }
        } else if self.current + 1 < self.entries.len() {
            (self.current + 1, false)
        } else {
            (0, !self.flags.repeat_playlist)
        }
    }
}

/// Drives the playlist against a [`Transport`].
#[derive(Debug, Clone, Default)]
pub struct PlaylistController {
    pub state: PlaylistState,
}

impl PlaylistController {
    pub fn new(state: PlaylistState) -> Self {
        Self { state }
    }

    /// Selects the entry at `index`: loads its song into the transport,
    /// applies its repetition count and reports the marker toggles. A
    /// silent no-op on an empty playlist or an out-of-range index.
    pub fn select(&mut self, index: usize, transport: &mut dyn Transport) -> Option<SelectionUpdate> {
        if index >= self.state.entries.len() {
            return None;
        }
        let deactivate = self
            .state
            .entries
            .get(self.state.current)
            .map(|entry| entry.handle);
        self.state.current = index;
        let entry = &self.state.entries[index];

        transport.load_song(&entry.song_data);
        transport.snap_to_start();
        transport.set_loop_repeat_count(entry.repetitions);

        Some(SelectionUpdate {
            deactivate,
            activate: entry.handle,
            rebuild_timeline: true,
        })
    }

    /// Reacts to the current song finishing: pauses the transport and
    /// returns the delayed advance decision for the host to schedule.
    pub fn advance<R: Rng>(&mut self, rng: &mut R, transport: &mut dyn Transport) -> Option<Advance> {
        self.advance_after(rng, transport, ADVANCE_DELAY_MS)
    }

    /// User-triggered skip: the same precedence rules with zero delay.
    pub fn skip<R: Rng>(&mut self, rng: &mut R, transport: &mut dyn Transport) -> Option<Advance> {
        self.advance_after(rng, transport, 0)
    }

    fn advance_after<R: Rng>(
        &mut self,
        rng: &mut R,
        transport: &mut dyn Transport,
        delay_ms: u64,
    ) -> Option<Advance> {
        if self.state.is_empty() {
            return None;
        }
        transport.pause();
        let (index, halt) = self.state.next_index(rng);
        Some(Advance { index, halt, delay_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::OfflineTransport;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn build_entries(count: usize) -> Vec<PlaylistEntry> {
        (0..count)
            .map(|index| PlaylistEntry::new(EntryHandle(index), format!("song-{index}"), None))
            .collect()
    }

    fn build_controller(count: usize) -> PlaylistController {
        PlaylistController::new(PlaylistState::new(build_entries(count)))
    }

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    #[test]
    fn repetition_attribute_normalises_at_ingestion() {
        assert_eq!(PlaylistEntry::new(EntryHandle(0), "a", Some("3")).repetitions, 3);
        assert_eq!(PlaylistEntry::new(EntryHandle(0), "a", Some("-1")).repetitions, -1);
        assert_eq!(PlaylistEntry::new(EntryHandle(0), "a", Some("forever")).repetitions, -1);
        assert_eq!(PlaylistEntry::new(EntryHandle(0), "a", Some("-7")).repetitions, -1);
        assert_eq!(PlaylistEntry::new(EntryHandle(0), "a", None).repetitions, -1);
    }

    #[test]
    fn single_entry_playlist_always_selects_itself() {
        let mut rng = rng();
        for (repeat_song, shuffle, repeat_playlist) in [
            (false, false, false),
            (true, false, false),
            (false, true, false),
            (false, false, true),
            (true, true, true),
        ] {
            let mut controller = build_controller(1);
            controller.state.flags = PlaylistFlags { repeat_song, shuffle, repeat_playlist };
            let mut transport = OfflineTransport::new();
            let advance = controller.advance(&mut rng, &mut transport).unwrap();
            assert_eq!(advance.index, 0);
        }
    }

    #[test]
    fn shuffle_never_repeats_the_current_index() {
        let mut rng = rng();
        let mut controller = build_controller(5);
        controller.state.flags.shuffle = true;
        let mut transport = OfflineTransport::new();
        for _ in 0..200 {
            let current = controller.state.current();
            let advance = controller.advance(&mut rng, &mut transport).unwrap();
            assert_ne!(advance.index, current);
            assert!(!advance.halt);
            controller.select(advance.index, &mut transport);
        }
    }

    #[test]
    fn repeat_song_takes_precedence_over_other_flags() {
        let mut rng = rng();
        let mut controller = build_controller(4);
        controller.state.flags = PlaylistFlags {
            repeat_song: true,
            shuffle: true,
            repeat_playlist: true,
        };
        let mut transport = OfflineTransport::new();
        controller.select(2, &mut transport);
        let advance = controller.advance(&mut rng, &mut transport).unwrap();
        assert_eq!(advance.index, 2);
        assert!(!advance.halt);
    }

    #[test]
    fn end_of_list_wraps_and_halts_unless_repeating() {
        let mut rng = rng();
        let mut transport = OfflineTransport::new();

        let mut controller = build_controller(3);
        controller.select(2, &mut transport);
        let advance = controller.advance(&mut rng, &mut transport).unwrap();
        assert_eq!(advance.index, 0);
        assert!(advance.halt);

        controller.state.flags.repeat_playlist = true;
        let advance = controller.advance(&mut rng, &mut transport).unwrap();
        assert_eq!(advance.index, 0);
        assert!(!advance.halt);
    }

    #[test]
    fn mid_list_advance_steps_by_one() {
        let mut rng = rng();
        let mut controller = build_controller(3);
        let mut transport = OfflineTransport::new();
        let advance = controller.advance(&mut rng, &mut transport).unwrap();
        assert_eq!(advance.index, 1);
        assert!(!advance.halt);
        assert_eq!(advance.delay_ms, ADVANCE_DELAY_MS);
    }

    #[test]
    fn skip_advances_immediately() {
        let mut rng = rng();
        let mut controller = build_controller(3);
        let mut transport = OfflineTransport::new();
        transport.play();
        let advance = controller.skip(&mut rng, &mut transport).unwrap();
        assert_eq!(advance.delay_ms, 0);
        assert_eq!(advance.index, 1);
        assert!(!transport.playing());
    }

    #[test]
    fn empty_playlist_operations_are_no_ops() {
        let mut rng = rng();
        let mut controller = build_controller(0);
        let mut transport = OfflineTransport::new();
        assert!(controller.advance(&mut rng, &mut transport).is_none());
        assert!(controller.skip(&mut rng, &mut transport).is_none());
        assert!(controller.select(0, &mut transport).is_none());
        assert_eq!(transport.loads(), 0);
    }

    #[test]
    fn selection_loads_the_song_and_loop_count() {
        let entries = vec![
            PlaylistEntry::new(EntryHandle(10), "first", Some("2")),
            PlaylistEntry::new(EntryHandle(11), "second", Some("nope")),
        ];
        let mut controller = PlaylistController::new(PlaylistState::new(entries));
        let mut transport = OfflineTransport::new();

        let update = controller.select(1, &mut transport).unwrap();
        assert_eq!(update.deactivate, Some(EntryHandle(10)));
        assert_eq!(update.activate, EntryHandle(11));
        assert!(update.rebuild_timeline);
        assert_eq!(transport.loaded_data(), Some("second"));
        assert_eq!(transport.loop_repeat_count(), -1);

        let update = controller.select(0, &mut transport).unwrap();
        assert_eq!(update.deactivate, Some(EntryHandle(11)));
        assert_eq!(transport.loop_repeat_count(), 2);
    }

    #[test]
    fn finishing_the_last_song_selects_the_first_and_halts() {
        // Three entries, all flags off, playing entry 2 to completion.
        let mut rng = rng();
        let mut controller = build_controller(3);
        let mut transport = OfflineTransport::new();
        controller.select(2, &mut transport);
        transport.play();

        let advance = controller.advance(&mut rng, &mut transport).unwrap();
        assert!(!transport.playing());
        assert_eq!(advance.index, 0);
        assert!(advance.halt);

        // The host still applies the selection, then leaves playback paused.
        controller.select(advance.index, &mut transport);
        assert_eq!(controller.state.current(), 0);
        assert_eq!(transport.loaded_data(), Some("song-0"));
        assert!(!transport.playing());
    }
}
