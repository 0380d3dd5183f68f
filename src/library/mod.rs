// Media library - where songs come from
// A media index answers "what audio is on this device", the loader turns its rows into Songs

pub mod scanner;

pub use scanner::FilesystemIndex;

use crate::audio::Song;
use crate::error::{PlayerError, Result};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One raw row of a media index, before filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaEntry {
    pub id: u64,
    pub title: String,
    pub artist: String,
    pub path: PathBuf,
    pub duration_ms: u64,
    pub is_music: bool,
}

/// A queryable catalog of audio files.
pub trait MediaIndex {
    fn query(&self) -> Result<Vec<MediaEntry>>;
}

pub struct SongLoader;

impl SongLoader {
    /// Every music entry of `index`, sorted by title.
    ///
    /// Never fails: an unreadable index is logged and yields no songs.
    pub fn load_all_songs(index: &dyn MediaIndex) -> Vec<Song> {
        let entries = match index.query() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Media index query failed: {}", e);
                return Vec::new();
            }
        };

        let mut music: Vec<MediaEntry> = entries.into_iter().filter(|e| e.is_music).collect();
        music.sort_by(compare_titles);

        let songs: Vec<Song> = music
            .into_iter()
            .map(|e| Song::new(e.id, e.title, e.artist, e.path, e.duration_ms))
            .collect();

        info!("Loaded {} songs", songs.len());
        songs
    }
}

fn compare_titles(a: &MediaEntry, b: &MediaEntry) -> Ordering {
    a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.id.cmp(&b.id))
}

/// Succeeds when at least one of `dirs` can be listed.
pub fn check_read_access(dirs: &[PathBuf]) -> Result<()> {
    let mut first_failure: Option<PathBuf> = None;

    for dir in dirs {
        match fs::read_dir(dir) {
            Ok(_) => return Ok(()),
            Err(e) => {
                warn!("Cannot read {}: {}", dir.display(), e);
                first_failure.get_or_insert_with(|| dir.clone());
            }
        }
    }

    Err(PlayerError::PermissionDenied {
        path: first_failure.unwrap_or_else(|| Path::new(".").to_path_buf()),
    })
}
