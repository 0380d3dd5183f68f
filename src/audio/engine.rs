// Playback engine seam
// The manager only ever talks to this trait; rodio sits behind it in production

use super::MediaLocator;
use crate::error::Result;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Playing,
    Paused,
}

/// Transport surface of a third-party playback engine.
///
/// There is deliberately no volume getter: engines like rodio's `Sink` only
/// accept a volume, so callers keep their own shadow copy.
pub trait PlaybackEngine {
    /// Replace whatever is loaded with `locator` and start playing it.
    ///
    /// On error the previously loaded source keeps its state.
    fn load_and_play(&mut self, locator: &MediaLocator) -> Result<()>;
    fn pause(&mut self);
    fn resume(&mut self);
    /// Halt playback; the next load starts from zero
    fn stop(&mut self);
    fn seek(&mut self, position: Duration) -> Result<()>;
    fn set_volume(&mut self, volume: f32);
    fn position(&self) -> Duration;
    /// Total length when the decoder knows it
    fn duration(&self) -> Option<Duration>;
    fn state(&self) -> EngineState;
    /// True once the loaded source has been fully rendered
    fn is_finished(&self) -> bool;
    fn release(&mut self);
}

#[cfg(feature = "audio")]
pub use self::rodio_engine::RodioEngine;

#[cfg(feature = "audio")]
mod rodio_engine {
    use super::{EngineState, PlaybackEngine};
    use crate::audio::{AudioConfig, MediaLocator};
    use crate::error::{PlayerError, Result};
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
    use std::fs::File;
    use std::io::BufReader;
    use std::time::Duration;
    use tracing::{debug, error};

    pub struct RodioEngine {
        // Dropping the stream silences every sink, so it lives as long as the engine
        stream: Option<OutputStream>,
        stream_handle: OutputStreamHandle,
        sink: Option<Sink>,
        total_duration: Option<Duration>,
        state: EngineState,
        volume: f32,
        config: AudioConfig,
    }

    impl RodioEngine {
        pub fn new(config: AudioConfig) -> Result<Self> {
            let (stream, stream_handle) = OutputStream::try_default().map_err(PlayerError::engine)?;

            Ok(Self {
                stream: Some(stream),
                stream_handle,
                sink: None,
                total_duration: None,
                state: EngineState::Idle,
                volume: config.initial_volume,
                config,
            })
        }
    }

    impl PlaybackEngine for RodioEngine {
        fn load_and_play(&mut self, locator: &MediaLocator) -> Result<()> {
            if self.stream.is_none() {
                return Err(PlayerError::Released);
            }

            // Everything that can fail happens before the current sink is touched
            let path = locator
                .to_path()
                .ok_or_else(|| PlayerError::Engine(format!("Unsupported media locator: {}", locator)))?;

            let file = File::open(&path).map_err(|e| {
                error!("Failed to open {}: {}", path.display(), e);
                PlayerError::Engine(format!("Failed to open audio file: {}", e))
            })?;

            let source = Decoder::new(BufReader::new(file)).map_err(|e| {
                error!("Failed to decode {}: {}", path.display(), e);
                PlayerError::Engine(format!(
                    "Failed to decode audio file '{}': {}. This file may be corrupted or use an unsupported format.",
                    path.display(),
                    e
                ))
            })?;

            let sink = Sink::try_new(&self.stream_handle).map_err(PlayerError::engine)?;
            sink.set_volume(self.volume);

            self.stop();
            self.total_duration = source.total_duration();

            // The ramp runs inside the source on rodio's mixer thread
            match self.config.fade_in() {
                Some(fade) => sink.append(source.fade_in(fade)),
                None => sink.append(source),
            }

            debug!("Engine playing {}", locator);
            self.sink = Some(sink);
            self.state = EngineState::Playing;
            Ok(())
        }

        fn pause(&mut self) {
            if let Some(sink) = self.sink.as_ref() {
                sink.pause();
                self.state = EngineState::Paused;
            }
        }

        fn resume(&mut self) {
            if let Some(sink) = self.sink.as_ref() {
                sink.play();
                self.state = EngineState::Playing;
            }
        }

        fn stop(&mut self) {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
            self.total_duration = None;
            self.state = EngineState::Idle;
        }

        fn seek(&mut self, position: Duration) -> Result<()> {
            match self.sink.as_ref() {
                Some(sink) => sink.try_seek(position).map_err(PlayerError::engine),
                None => Ok(()),
            }
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
            if let Some(sink) = self.sink.as_ref() {
                sink.set_volume(volume);
            }
        }

        fn position(&self) -> Duration {
            self.sink
                .as_ref()
                .map(|sink| sink.get_pos())
                .unwrap_or(Duration::ZERO)
        }

        fn duration(&self) -> Option<Duration> {
            self.total_duration
        }

        fn state(&self) -> EngineState {
            self.state
        }

        fn is_finished(&self) -> bool {
            self.state == EngineState::Playing
                && self.sink.as_ref().map(|sink| sink.empty()).unwrap_or(false)
        }

        fn release(&mut self) {
            self.stop();
            self.stream.take();
        }
    }
}
