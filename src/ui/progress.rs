use crate::audio::{MusicPlayerManager, PlaybackEngine};
use std::time::Duration;

/// What the progress gauge shows.
///
/// Filled by exactly one poll per UI tick. A scrub is held as a pending seek
/// and shown right away; the next tick hands it to the player.
#[derive(Debug, Default, Clone)]
pub struct PlaybackProgress {
    position: Duration,
    duration: Option<Duration>,
    pending_seek: Option<Duration>,
}

impl PlaybackProgress {
    pub fn poll<E: PlaybackEngine>(&mut self, manager: &MusicPlayerManager<E>) {
        self.position = manager.current_position();
        self.duration = manager.duration();
    }

    /// Move the pending position by `delta_ms`, kept inside `0..=duration`
    pub fn scrub(&mut self, delta_ms: i64) {
        let base = self.displayed_position().as_millis() as i64;
        let mut target = (base + delta_ms).max(0) as u64;
        if let Some(duration) = self.duration {
            target = target.min(duration.as_millis() as u64);
        }
        self.pending_seek = Some(Duration::from_millis(target));
    }

    pub fn take_pending_seek(&mut self) -> Option<Duration> {
        let pending = self.pending_seek.take();
        if let Some(position) = pending {
            self.position = position;
        }
        pending
    }

    pub fn displayed_position(&self) -> Duration {
        self.pending_seek.unwrap_or(self.position)
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn ratio(&self) -> f64 {
        match self.duration {
            Some(total) if !total.is_zero() => {
                (self.displayed_position().as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
