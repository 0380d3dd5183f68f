use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const FILE_SCHEME: &str = "file://";

/// Opaque media URI handed to the playback engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaLocator(String);

impl MediaLocator {
    pub fn from_path(path: &Path) -> Self {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        };
        Self(format!("{}{}", FILE_SCHEME, absolute.display()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem path behind a `file://` locator, if it is one
    pub fn to_path(&self) -> Option<PathBuf> {
        self.0.strip_prefix(FILE_SCHEME).map(PathBuf::from)
    }
}

impl fmt::Display for MediaLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the media index, immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub id: u64,
    pub title: String,
    pub artist: String,
    pub path: PathBuf,
    pub duration_ms: u64,
    pub locator: MediaLocator,
}

impl Song {
    pub fn new(id: u64, title: String, artist: String, path: PathBuf, duration_ms: u64) -> Self {
        let locator = MediaLocator::from_path(&path);
        Self {
            id,
            title,
            artist,
            path,
            duration_ms,
            locator,
        }
    }

    /// Tag duration, `None` when the index had nothing to offer
    pub fn duration(&self) -> Option<Duration> {
        (self.duration_ms > 0).then(|| Duration::from_millis(self.duration_ms))
    }

    pub fn display_line(&self) -> String {
        format!("{} - {}", self.title, self.artist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_round_trips_absolute_path() {
        let path = PathBuf::from("/music/a song.mp3");
        let locator = MediaLocator::from_path(&path);
        assert_eq!(locator.as_str(), "file:///music/a song.mp3");
        assert_eq!(locator.to_path(), Some(path));
    }

    #[test]
    fn test_unknown_duration() {
        let song = Song::new(1, "A".into(), "B".into(), PathBuf::from("/a.mp3"), 0);
        assert!(song.duration().is_none());

        let song = Song::new(1, "A".into(), "B".into(), PathBuf::from("/a.mp3"), 65_000);
        assert_eq!(song.duration(), Some(Duration::from_millis(65_000)));
    }
}
