use super::{MediaEntry, MediaIndex};
use crate::audio::AudioFormat;
use crate::error::Result;
use id3::TagLike;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const UNKNOWN_ARTIST: &str = "<unknown>";
const MAX_FILE_SIZE: u64 = 1_000_000_000;

// Audio under these folders is system sound or spoken word, not music
const NON_MUSIC_DIRS: &[&str] = &["ringtones", "notifications", "alarms", "podcasts"];

/// Media index backed by plain directories on disk.
#[derive(Clone)]
pub struct FilesystemIndex {
    roots: Vec<PathBuf>,
    supported_extensions: Vec<String>,
}

#[derive(Debug, Default)]
struct Tags {
    title: Option<String>,
    artist: Option<String>,
    duration_ms: Option<u64>,
}

impl FilesystemIndex {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            supported_extensions: ["mp3", "flac", "ogg", "oga", "mp4", "m4a", "aac", "wav"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn scan_root(&self, root: &Path, next_id: &mut u64, entries: &mut Vec<MediaEntry>) {
        for entry in WalkDir::new(root).follow_links(true).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();

            if !entry.file_type().is_file() {
                continue;
            }

            // Skip hidden files (dotfiles)
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with('.'))
            {
                continue;
            }

            match fs::metadata(path) {
                Ok(metadata) if metadata.len() == 0 || metadata.len() > MAX_FILE_SIZE => continue,
                Ok(_) => {}
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            }

            if !self.is_supported_file(path) {
                continue;
            }

            entries.push(self.entry_from_file(*next_id, root, path));
            *next_id += 1;
        }
    }

    fn is_supported_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.supported_extensions.contains(&ext.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    fn entry_from_file(&self, id: u64, root: &Path, path: &Path) -> MediaEntry {
        let tags = match AudioFormat::from_path(path) {
            AudioFormat::Mp3 => read_id3(path),
            AudioFormat::Mp4 => read_mp4(path),
            _ => Tags::default(),
        };

        let title = tags.title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("Unknown")
                .to_string()
        });
        let artist = tags
            .artist
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
        let duration_ms = tags.duration_ms.or_else(|| probe_duration_ms(path)).unwrap_or(0);

        MediaEntry {
            id,
            title,
            artist,
            path: path.to_path_buf(),
            duration_ms,
            is_music: is_music_path(root, path),
        }
    }
}

impl MediaIndex for FilesystemIndex {
    fn query(&self) -> Result<Vec<MediaEntry>> {
        let mut entries = Vec::new();
        let mut next_id = 1;

        for root in &self.roots {
            if !root.exists() {
                warn!("Music directory {} does not exist", root.display());
                continue;
            }
            self.scan_root(root, &mut next_id, &mut entries);
        }

        debug!("Media index returned {} entries", entries.len());
        Ok(entries)
    }
}

/// Only path components below the scanned root count, so a library that itself
/// lives in a folder called "Podcasts" is still music.
fn is_music_path(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parent = relative.parent().unwrap_or(Path::new(""));

    !parent.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .map(|name| NON_MUSIC_DIRS.contains(&name.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    })
}

fn read_id3(path: &Path) -> Tags {
    match id3::Tag::read_from_path(path) {
        Ok(tag) => Tags {
            title: tag.title().map(|s| s.to_string()),
            artist: tag.artist().map(|s| s.to_string()),
            duration_ms: tag.duration().map(|d| d as u64),
        },
        Err(e) => {
            debug!("No ID3 tag in {}: {}", path.display(), e);
            Tags::default()
        }
    }
}

fn read_mp4(path: &Path) -> Tags {
    match mp4ameta::Tag::read_from_path(path) {
        Ok(tag) => Tags {
            title: tag.title().map(|s| s.to_string()),
            artist: tag.artist().map(|s| s.to_string()),
            duration_ms: tag.duration().map(|d| d.as_millis() as u64),
        },
        Err(e) => {
            debug!("No MP4 metadata in {}: {}", path.display(), e);
            Tags::default()
        }
    }
}

#[cfg(feature = "probe")]
fn probe_duration_ms(path: &Path) -> Option<u64> {
    use symphonia::core::codecs::CODEC_TYPE_NULL;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = fs::File::open(path).ok()?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .ok()?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)?;

    let time_base = track.codec_params.time_base?;
    let n_frames = track.codec_params.n_frames?;
    let time = time_base.calc_time(n_frames);
    Some(time.seconds * 1000 + (time.frac * 1000.0) as u64)
}

#[cfg(not(feature = "probe"))]
fn probe_duration_ms(_path: &Path) -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, bytes: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_scan_filters_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        write(&root.join("Beta Song.mp3"), b"not really audio");
        write(&root.join("album/Alpha.FLAC"), b"not really audio");
        write(&root.join(".hidden.mp3"), b"not really audio");
        write(&root.join("cover.jpg"), b"jpeg");
        write(&root.join("empty.mp3"), b"");
        write(&root.join("Ringtones/Beep.ogg"), b"not really audio");

        let index = FilesystemIndex::new(vec![root.to_path_buf(), root.join("missing")]);
        let mut entries = index.query().unwrap();
        entries.sort_by(|a, b| a.title.cmp(&b.title));

        let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Beep", "Beta Song"]);

        let beep = entries.iter().find(|e| e.title == "Beep").unwrap();
        assert!(!beep.is_music);
        assert!(entries.iter().filter(|e| e.title != "Beep").all(|e| e.is_music));
        assert!(entries.iter().all(|e| e.artist == UNKNOWN_ARTIST));
        assert!(entries.iter().all(|e| e.duration_ms == 0));

        let mut ids: Vec<u64> = entries.iter().map(|e| e.id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_non_music_dir_relative_to_root() {
        let root = Path::new("/home/me/Podcasts");
        assert!(is_music_path(root, &root.join("show.mp3")));
        assert!(!is_music_path(root, &root.join("alarms/wake.mp3")));
        assert!(!is_music_path(Path::new("/sd"), Path::new("/sd/Notifications/ding.ogg")));
    }
}
