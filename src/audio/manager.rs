use super::{EngineState, MediaLocator, PlaybackEngine, Song};
use crate::error::{PlayerError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    #[default]
    None,
    All,
    One,
}

impl RepeatMode {
    /// None -> All -> One -> None
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::None => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::None,
        }
    }
}

/// Index after `current` in a queue of `len` songs.
///
/// No current position starts the queue from the top.
pub fn next_index<R: Rng + ?Sized>(
    current: Option<usize>,
    len: usize,
    repeat: RepeatMode,
    shuffle: bool,
    rng: &mut R,
) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let index = match current {
        Some(current) if repeat == RepeatMode::One => current,
        _ if shuffle => rng.gen_range(0..len),
        Some(current) => (current + 1) % len,
        None => 0,
    };
    Some(index)
}

/// Index before `current` in a queue of `len` songs, wrapping to the end.
pub fn previous_index<R: Rng + ?Sized>(
    current: Option<usize>,
    len: usize,
    repeat: RepeatMode,
    shuffle: bool,
    rng: &mut R,
) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let index = match current {
        Some(current) if repeat == RepeatMode::One => current,
        _ if shuffle => rng.gen_range(0..len),
        Some(0) | None => len - 1,
        Some(current) => current - 1,
    };
    Some(index)
}

/// Session object in front of a single playback engine.
///
/// Owns the queue, the queue position, the shuffle/repeat flags and a shadow
/// copy of the volume. The shadow exists because engines take a volume but
/// never report one back; `volume()` is the only readback there is.
pub struct MusicPlayerManager<E: PlaybackEngine> {
    engine: E,
    songs: Vec<Song>,
    current_index: Option<usize>,
    current_song: Option<Song>,
    volume: f32,
    shuffle: bool,
    repeat_mode: RepeatMode,
    released: bool,
}

impl<E: PlaybackEngine> MusicPlayerManager<E> {
    pub fn new(mut engine: E, initial_volume: f32) -> Self {
        let volume = initial_volume.clamp(0.0, 1.0);
        engine.set_volume(volume);

        Self {
            engine,
            songs: Vec::new(),
            current_index: None,
            current_song: None,
            volume,
            shuffle: false,
            repeat_mode: RepeatMode::None,
            released: false,
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.released {
            Err(PlayerError::Released)
        } else {
            Ok(())
        }
    }

    /// Replace the queue without touching the engine.
    ///
    /// Ids are only unique per load, so the current song is found again by path.
    /// If it is gone the position is forgotten.
    pub fn set_queue(&mut self, songs: Vec<Song>) {
        info!("Queue replaced with {} songs", songs.len());
        self.current_index = self
            .current_song
            .as_ref()
            .and_then(|current| songs.iter().position(|s| s.path == current.path));
        if let Some(index) = self.current_index {
            self.current_song = Some(songs[index].clone());
        }
        self.songs = songs;
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.current_song.as_ref()
    }

    /// Load `song` by its file path and start playing it
    pub fn play_song(&mut self, song: &Song) -> Result<()> {
        let locator = MediaLocator::from_path(&song.path);
        self.start(song, &locator)
    }

    /// Load `song` by its media locator and start playing it
    pub fn play(&mut self, song: &Song) -> Result<()> {
        self.start(song, &song.locator)
    }

    pub fn play_at(&mut self, index: usize) -> Result<()> {
        let song = self.song_at(index)?.clone();
        self.play(&song)
    }

    fn song_at(&self, index: usize) -> Result<&Song> {
        if self.songs.is_empty() {
            return Err(PlayerError::EmptyLibrary);
        }
        self.songs.get(index).ok_or(PlayerError::IndexOutOfRange {
            index,
            len: self.songs.len(),
        })
    }

    fn start(&mut self, song: &Song, locator: &MediaLocator) -> Result<()> {
        self.ensure_live()?;

        if let Err(e) = self.engine.load_and_play(locator) {
            error!("Could not play '{}': {}", song.title, e);
            return Err(e);
        }
        // Sinks are created fresh per load, so the shadow has to be reapplied
        self.engine.set_volume(self.volume);

        if let Some(index) = self.songs.iter().position(|s| s.id == song.id) {
            self.current_index = Some(index);
        }
        self.current_song = Some(song.clone());
        info!("Playing '{}' by {}", song.title, song.artist);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.engine.pause();
        debug!("Paused at {:?}", self.engine.position());
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.engine.resume();
        Ok(())
    }

    /// Halt playback; position goes back to zero
    pub fn stop(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.engine.stop();
        info!("Playback stopped");
        Ok(())
    }

    /// Free the engine. Every later call fails with `Released`.
    pub fn release(&mut self) {
        if !self.released {
            self.engine.release();
            self.released = true;
            info!("Player released");
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// No clamping against the duration; out-of-range seeks are the engine's call
    pub fn seek_to(&mut self, position: Duration) -> Result<()> {
        self.ensure_live()?;
        debug!("Seeking to {:?}", position);
        self.engine.seek(position)
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.ensure_live()?;
        self.volume = volume.clamp(0.0, 1.0);
        self.engine.set_volume(self.volume);
        Ok(())
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Flips the flag only; the queue order is untouched
    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        info!("Shuffle {}", if self.shuffle { "on" } else { "off" });
        self.shuffle
    }

    pub fn shuffle_state(&self) -> bool {
        self.shuffle
    }

    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        self.repeat_mode = self.repeat_mode.cycle();
        info!("Repeat mode {:?}", self.repeat_mode);
        self.repeat_mode
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat_mode = mode;
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    pub fn play_next_song(&mut self) -> Result<()> {
        self.ensure_live()?;
        let index = next_index(
            self.current_index,
            self.songs.len(),
            self.repeat_mode,
            self.shuffle,
            &mut rand::thread_rng(),
        )
        .ok_or(PlayerError::EmptyLibrary)?;

        debug!("Next song: {:?} -> {}", self.current_index, index);
        self.play_at(index)
    }

    pub fn play_previous_song(&mut self) -> Result<()> {
        self.ensure_live()?;
        let index = previous_index(
            self.current_index,
            self.songs.len(),
            self.repeat_mode,
            self.shuffle,
            &mut rand::thread_rng(),
        )
        .ok_or(PlayerError::EmptyLibrary)?;

        debug!("Previous song: {:?} -> {}", self.current_index, index);
        self.play_at(index)
    }

    /// Move on after the engine ran out of audio.
    ///
    /// Returns false when repeat is off and the last song of the queue just ended.
    pub fn advance_after_finish(&mut self) -> Result<bool> {
        self.ensure_live()?;
        let at_end = self
            .current_index
            .map(|index| index + 1 >= self.songs.len())
            .unwrap_or(false);

        if self.repeat_mode == RepeatMode::None && !self.shuffle && at_end {
            info!("Reached the end of the queue");
            self.engine.stop();
            return Ok(false);
        }

        self.play_next_song()?;
        Ok(true)
    }

    pub fn current_position(&self) -> Duration {
        if self.released {
            return Duration::ZERO;
        }
        self.engine.position()
    }

    /// Engine duration, falling back to what the media index said
    pub fn duration(&self) -> Option<Duration> {
        if self.released {
            return None;
        }
        self.engine
            .duration()
            .or_else(|| self.current_song.as_ref().and_then(Song::duration))
    }

    pub fn is_playing(&self) -> bool {
        !self.released && self.engine.state() == EngineState::Playing
    }

    pub fn engine_state(&self) -> EngineState {
        if self.released {
            EngineState::Idle
        } else {
            self.engine.state()
        }
    }

    pub fn is_finished(&self) -> bool {
        !self.released && self.engine.is_finished()
    }
}

impl<E: PlaybackEngine> Drop for MusicPlayerManager<E> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    /// Engine double that records every command it receives
    #[derive(Clone, Default)]
    pub(crate) struct MockEngine {
        pub calls: Rc<RefCell<Vec<String>>>,
        pub loaded: Rc<RefCell<Option<MediaLocator>>>,
        pub position: Rc<RefCell<Duration>>,
        pub state: Rc<RefCell<Option<EngineState>>>,
        pub finished: Rc<RefCell<bool>>,
        pub fail_loads: Rc<RefCell<bool>>,
    }

    impl MockEngine {
        pub fn log(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.borrow_mut().push(call.into());
        }
    }

    impl PlaybackEngine for MockEngine {
        fn load_and_play(&mut self, locator: &MediaLocator) -> Result<()> {
            self.record(format!("load {}", locator));
            // A failed load leaves the current source alone
            if *self.fail_loads.borrow() {
                return Err(PlayerError::Engine("decoder exploded".into()));
            }
            *self.loaded.borrow_mut() = Some(locator.clone());
            *self.position.borrow_mut() = Duration::ZERO;
            *self.state.borrow_mut() = Some(EngineState::Playing);
            Ok(())
        }

        fn pause(&mut self) {
            self.record("pause");
            *self.state.borrow_mut() = Some(EngineState::Paused);
        }

        fn resume(&mut self) {
            self.record("resume");
            *self.state.borrow_mut() = Some(EngineState::Playing);
        }

        fn stop(&mut self) {
            self.record("stop");
            *self.position.borrow_mut() = Duration::ZERO;
            *self.state.borrow_mut() = Some(EngineState::Idle);
        }

        fn seek(&mut self, position: Duration) -> Result<()> {
            self.record(format!("seek {}", position.as_millis()));
            *self.position.borrow_mut() = position;
            Ok(())
        }

        fn set_volume(&mut self, volume: f32) {
            self.record(format!("volume {:.2}", volume));
        }

        fn position(&self) -> Duration {
            *self.position.borrow()
        }

        fn duration(&self) -> Option<Duration> {
            None
        }

        fn state(&self) -> EngineState {
            self.state.borrow().unwrap_or(EngineState::Idle)
        }

        fn is_finished(&self) -> bool {
            *self.finished.borrow()
        }

        fn release(&mut self) {
            self.record("release");
        }
    }

    pub(crate) fn song(id: u64, title: &str) -> Song {
        Song::new(
            id,
            title.to_string(),
            "Artist".to_string(),
            PathBuf::from(format!("/music/{}.mp3", title)),
            180_000,
        )
    }

    fn manager_with(count: u64) -> (MusicPlayerManager<MockEngine>, MockEngine) {
        let engine = MockEngine::default();
        let mut manager = MusicPlayerManager::new(engine.clone(), 1.0);
        manager.set_queue((0..count).map(|i| song(i + 1, &format!("song{}", i))).collect());
        (manager, engine)
    }

    #[test]
    fn test_wraparound_symmetry() {
        let (mut manager, _) = manager_with(3);
        manager.play_at(0).unwrap();

        manager.play_previous_song().unwrap();
        assert_eq!(manager.current_index(), Some(2));

        manager.play_next_song().unwrap();
        assert_eq!(manager.current_index(), Some(0));
    }

    #[test]
    fn test_next_then_previous_returns_to_start() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in 1..6 {
            for start in 0..len {
                let next = next_index(Some(start), len, RepeatMode::None, false, &mut rng).unwrap();
                let back = previous_index(Some(next), len, RepeatMode::None, false, &mut rng).unwrap();
                assert_eq!(back, start, "len {} start {}", len, start);
            }
        }
    }

    #[test]
    fn test_repeat_one_keeps_index() {
        let (mut manager, engine) = manager_with(3);
        manager.play_at(1).unwrap();
        manager.set_repeat_mode(RepeatMode::One);

        manager.play_next_song().unwrap();
        assert_eq!(manager.current_index(), Some(1));
        manager.play_previous_song().unwrap();
        assert_eq!(manager.current_index(), Some(1));

        let loads = engine.log().iter().filter(|c| c.starts_with("load")).count();
        assert_eq!(loads, 3);
    }

    #[test]
    fn test_shuffle_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let index = next_index(Some(0), 4, RepeatMode::All, true, &mut rng).unwrap();
            assert!(index < 4);
            let index = previous_index(None, 4, RepeatMode::None, true, &mut rng).unwrap();
            assert!(index < 4);
        }
    }

    #[test]
    fn test_repeat_cycle() {
        let mut mode = RepeatMode::None;
        let mut seen = Vec::new();
        for _ in 0..3 {
            mode = mode.cycle();
            seen.push(mode);
        }
        assert_eq!(seen, vec![RepeatMode::All, RepeatMode::One, RepeatMode::None]);

        let (mut manager, _) = manager_with(1);
        assert_eq!(manager.cycle_repeat_mode(), RepeatMode::All);
        assert_eq!(manager.cycle_repeat_mode(), RepeatMode::One);
        assert_eq!(manager.cycle_repeat_mode(), RepeatMode::None);
    }

    #[test]
    fn test_volume_clamps() {
        let (mut manager, engine) = manager_with(1);

        manager.set_volume(-0.5).unwrap();
        assert_eq!(manager.volume(), 0.0);
        manager.set_volume(1.5).unwrap();
        assert_eq!(manager.volume(), 1.0);
        manager.set_volume(0.3).unwrap();
        assert_eq!(manager.volume(), 0.3);

        assert_eq!(engine.log().last().map(String::as_str), Some("volume 0.30"));
    }

    #[test]
    fn test_volume_reapplied_after_load() {
        let (mut manager, engine) = manager_with(2);
        manager.set_volume(0.4).unwrap();
        manager.play_at(1).unwrap();

        let log = engine.log();
        let load = log.iter().position(|c| c.starts_with("load")).unwrap();
        assert_eq!(log[load + 1], "volume 0.40");
    }

    #[test]
    fn test_empty_queue_is_an_error() {
        let (mut manager, engine) = manager_with(0);

        assert!(matches!(manager.play_next_song(), Err(PlayerError::EmptyLibrary)));
        assert!(matches!(manager.play_previous_song(), Err(PlayerError::EmptyLibrary)));
        assert!(matches!(manager.play_at(0), Err(PlayerError::EmptyLibrary)));
        assert!(engine.log().iter().all(|c| !c.starts_with("load")));
    }

    #[test]
    fn test_play_at_out_of_range() {
        let (mut manager, _) = manager_with(2);
        assert!(matches!(
            manager.play_at(5),
            Err(PlayerError::IndexOutOfRange { index: 5, len: 2 })
        ));
        assert_eq!(manager.current_index(), None);
    }

    #[test]
    fn test_play_tracks_queue_position() {
        let (mut manager, engine) = manager_with(3);
        let third = manager.songs()[2].clone();

        manager.play(&third).unwrap();
        assert_eq!(manager.current_index(), Some(2));
        assert_eq!(manager.current_song(), Some(&third));
        assert_eq!(engine.loaded.borrow().as_ref(), Some(&third.locator));

        let first = manager.songs()[0].clone();
        manager.play_song(&first).unwrap();
        assert_eq!(manager.current_index(), Some(0));
    }

    #[test]
    fn test_first_next_starts_at_top() {
        let (mut manager, _) = manager_with(3);
        manager.play_next_song().unwrap();
        assert_eq!(manager.current_index(), Some(0));

        let (mut manager, _) = manager_with(3);
        manager.play_previous_song().unwrap();
        assert_eq!(manager.current_index(), Some(2));
    }

    #[test]
    fn test_stop_resets_position() {
        let (mut manager, _) = manager_with(1);
        manager.play_at(0).unwrap();
        manager.seek_to(Duration::from_secs(42)).unwrap();
        assert_eq!(manager.current_position(), Duration::from_secs(42));

        manager.stop().unwrap();
        assert_eq!(manager.current_position(), Duration::ZERO);
        assert!(!manager.is_playing());
    }

    #[test]
    fn test_seek_is_not_clamped() {
        let (mut manager, engine) = manager_with(1);
        manager.play_at(0).unwrap();
        manager.seek_to(Duration::from_secs(3600)).unwrap();
        assert_eq!(engine.log().last().map(String::as_str), Some("seek 3600000"));
    }

    #[test]
    fn test_pause_and_resume() {
        let (mut manager, _) = manager_with(1);
        manager.play_at(0).unwrap();
        assert!(manager.is_playing());

        manager.pause().unwrap();
        assert_eq!(manager.engine_state(), EngineState::Paused);
        manager.resume().unwrap();
        assert!(manager.is_playing());
    }

    #[test]
    fn test_released_manager_rejects_calls() {
        let (mut manager, engine) = manager_with(2);
        manager.release();
        manager.release();

        assert!(matches!(manager.play_at(0), Err(PlayerError::Released)));
        assert!(matches!(manager.pause(), Err(PlayerError::Released)));
        assert!(matches!(manager.set_volume(0.5), Err(PlayerError::Released)));
        assert!(matches!(manager.play_next_song(), Err(PlayerError::Released)));
        assert_eq!(engine.log().iter().filter(|c| *c == "release").count(), 1);
    }

    #[test]
    fn test_engine_failure_keeps_previous_song() {
        let (mut manager, engine) = manager_with(2);
        manager.play_at(0).unwrap();

        *engine.fail_loads.borrow_mut() = true;
        let song = manager.songs()[1].clone();
        assert!(matches!(manager.play(&song), Err(PlayerError::Engine(_))));
        assert_eq!(manager.current_song().map(|s| s.id), Some(1));
        assert_eq!(manager.current_index(), Some(0));
        assert_eq!(manager.engine_state(), EngineState::Playing);
        assert_eq!(
            engine.loaded.borrow().clone(),
            Some(MediaLocator::from_path(&manager.songs()[0].path))
        );
        assert!(!engine.log().contains(&"stop".to_string()));
    }

    #[test]
    fn test_set_queue_keeps_playing_song_position() {
        let (mut manager, _) = manager_with(3);
        manager.play_at(2).unwrap();

        // Same files, fresh ids, different order
        manager.set_queue(vec![song(10, "song2"), song(11, "song0"), song(12, "song1")]);
        assert_eq!(manager.current_index(), Some(0));
        assert_eq!(manager.current_song().map(|s| s.id), Some(10));

        manager.play_next_song().unwrap();
        assert_eq!(manager.current_song().map(|s| s.title.as_str()), Some("song0"));
    }

    #[test]
    fn test_set_queue_forgets_missing_song() {
        let (mut manager, _) = manager_with(3);
        manager.play_at(1).unwrap();

        manager.set_queue(vec![song(1, "song0"), song(2, "song2")]);
        assert_eq!(manager.current_index(), None);
    }

    #[test]
    fn test_duration_falls_back_to_index() {
        let (mut manager, _) = manager_with(1);
        assert_eq!(manager.duration(), None);
        manager.play_at(0).unwrap();
        assert_eq!(manager.duration(), Some(Duration::from_millis(180_000)));
    }

    #[test]
    fn test_advance_after_finish() {
        let (mut manager, engine) = manager_with(2);
        manager.play_at(1).unwrap();

        assert!(!manager.advance_after_finish().unwrap());
        assert_eq!(engine.log().last().map(String::as_str), Some("stop"));

        manager.set_repeat_mode(RepeatMode::All);
        assert!(manager.advance_after_finish().unwrap());
        assert_eq!(manager.current_index(), Some(0));

        manager.set_repeat_mode(RepeatMode::One);
        assert!(manager.advance_after_finish().unwrap());
        assert_eq!(manager.current_index(), Some(0));
    }
}
