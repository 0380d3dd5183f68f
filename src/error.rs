// Error types for the player core
// The binary wraps these in anyhow; the library keeps them typed so the UI can pick a recovery

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlayerError>;

#[derive(Error, Debug)]
pub enum PlayerError {
    /// The media index could not be read
    #[error("Permission denied: cannot read music directory {}", path.display())]
    PermissionDenied { path: PathBuf },

    /// Transport command issued against an empty queue
    #[error("Library is empty: no songs to play")]
    EmptyLibrary,

    #[error("Queue index {index} out of range (queue has {len} songs)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Anything the playback engine reported, passed through untranslated
    #[error("Playback engine error: {0}")]
    Engine(String),

    #[error("Player has been released")]
    Released,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PlayerError {
    pub fn engine(err: impl std::fmt::Display) -> Self {
        PlayerError::Engine(err.to_string())
    }
}
