//! Core library for the playlist song player.
//!
//! The crate holds the two halves of the player that carry real logic: the
//! playlist advance state machine (which song plays next under the repeat
//! and shuffle flags) and the timeline/piano visualization engine (musical
//! time, pitch and note envelopes mapped to 2D geometry under a set of
//! selectable screen orientations, kept in sync with the live playback
//! position). Audio synthesis, widget construction and theming live in the
//! host; they appear here only as trait boundaries.

pub mod config;
pub mod error;
pub mod fragment;
pub mod geometry;
pub mod layout;
pub mod playhead;
pub mod playlist;
pub mod song;
pub mod timeline;
pub mod transport;

pub use config::{volume_curve, MemoryStore, PreferenceStore, Preferences};
pub use error::{PlayerError, Result};
pub use fragment::{parse_fragment, FragmentRequest};
pub use geometry::{note_path, path_data, PathPoint};
pub use layout::{
    compute_geometry, octave_window_start, AnchorEdge, LayoutMode, LayoutTransform, Viewport,
    ViewportGeometry,
};
pub use playhead::{
    place_playhead, playhead_offset, CursorBounds, DragState, FlashFrame, FlashTracker,
    FlashUpdate, FrameLoop, InstanceGuard, LoopHandle, PlayheadPlacement,
};
pub use playlist::{
    Advance, EntryHandle, PlaylistController, PlaylistEntry, PlaylistFlags, PlaylistState,
    SelectionUpdate,
};
pub use song::{Channel, Note, NotePin, Pattern, Song};
pub use timeline::{render, ColorRole, RenderOptions, TimelineScene};
pub use transport::{OfflineTransport, Transport};
