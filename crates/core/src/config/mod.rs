//! Persisted preferences.
//!
//! The host supplies the actual storage (browser local storage, a config
//! file, an in-memory map); the core only speaks the [`PreferenceStore`]
//! trait. Storage that throws is expected to be wrapped into a silently
//! failing implementation, so preference access never interrupts playback.

use std::collections::HashMap;

use crate::layout::LayoutMode;

/// Preference key for the active layout mode identifier.
pub const LAYOUT_KEY: &str = "spLayout";
/// Preference key for the volume slider position.
pub const VOLUME_KEY: &str = "volume";
/// Preference key for the note-flash toggle.
pub const FLASH_KEY: &str = "notesFlashWhenPlayed";
/// Shared marker used by the cross-instance pause guard.
pub const PLAYER_ID_KEY: &str = "playerId";

/// Upper bound of the volume slider.
pub const VOLUME_MAX: u32 = 75;

/// String key/value storage boundary. Implementations swallow their own
/// failures: a `get` that cannot reach storage returns `None`, a `set`
/// drops the write.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

/// In-memory store for tests and the command line demo.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

/// Typed accessors over a [`PreferenceStore`].
pub struct Preferences;

impl Preferences {
    /// Active layout, defaulting to classic when unset or unrecognised.
    pub fn layout(store: &dyn PreferenceStore) -> LayoutMode {
        store
            .get(LAYOUT_KEY)
            .and_then(|id| LayoutMode::from_id(&id))
            .unwrap_or_default()
    }

    pub fn set_layout(store: &mut dyn PreferenceStore, mode: LayoutMode) {
        store.set(LAYOUT_KEY, mode.id());
    }

    /// Volume slider position, clamped to `0..=VOLUME_MAX`.
    pub fn volume(store: &dyn PreferenceStore) -> u32 {
        store
            .get(VOLUME_KEY)
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .map(|volume| volume.min(VOLUME_MAX))
            .unwrap_or(VOLUME_MAX)
    }

    pub fn set_volume(store: &mut dyn PreferenceStore, volume: u32) {
        store.set(VOLUME_KEY, &volume.min(VOLUME_MAX).to_string());
    }

    pub fn flash_notes(store: &dyn PreferenceStore) -> bool {
        store
            .get(FLASH_KEY)
            .map(|value| value == "true")
            .unwrap_or(false)
    }
}

/// Maps the volume slider onto the transport gain. The square-root segment
/// keeps low slider positions audible; the exponential segment tapers the
/// top of the range.
pub fn volume_curve(slider: u32) -> f64 {
    let volume = slider.min(VOLUME_MAX) as f64;
    (volume / 50.0).sqrt().min(1.0) * 2.0_f64.powf((volume - 75.0) / 25.0)
}
