pub mod engine;
pub mod manager;
pub mod song;

pub use engine::{EngineState, PlaybackEngine};
#[cfg(feature = "audio")]
pub use engine::RodioEngine;
pub use manager::{MusicPlayerManager, RepeatMode};
pub use song::{MediaLocator, Song};

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub initial_volume: f32, // 0.0 to 1.0
    pub fade_in_ms: u64,     // 0 disables the fade
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            initial_volume: 1.0,
            fade_in_ms: 0,
        }
    }
}

impl AudioConfig {
    /// Ramp applied to the start of each source, if any
    pub fn fade_in(&self) -> Option<Duration> {
        (self.fade_in_ms > 0).then(|| Duration::from_millis(self.fade_in_ms))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFormat {
    Mp3,
    Flac,
    Ogg,
    Mp4,
    Wav,
    Unknown,
}

impl AudioFormat {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "mp3" => AudioFormat::Mp3,
            "flac" => AudioFormat::Flac,
            "ogg" | "oga" => AudioFormat::Ogg,
            "mp4" | "m4a" | "aac" => AudioFormat::Mp4,
            "wav" => AudioFormat::Wav,
            _ => AudioFormat::Unknown,
        }
    }

    pub fn from_path(path: &std::path::Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(AudioFormat::from_extension)
            .unwrap_or(AudioFormat::Unknown)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, AudioFormat::Unknown)
    }
}
