// PeaceFinder Library - Core modules for a minimal terminal music player
// The UI only talks to the manager; the manager only talks to the engine

pub mod audio;   // songs, playback engine seam, player manager
pub mod config;  // settings and preferences
pub mod error;   // typed failures the UI can recover from
pub mod library; // media index and song loading
#[cfg(feature = "tui")]
pub mod ui;      // terminal interface

// Export the stuff other modules actually use
pub use audio::{MusicPlayerManager, PlaybackEngine, RepeatMode, Song};
pub use config::Config;
pub use error::{PlayerError, Result};
pub use library::{FilesystemIndex, MediaIndex, SongLoader};
