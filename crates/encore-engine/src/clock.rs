//! Sample-accurate playback position without an audio callback
//!
//! The clock stores two variables while playing: the instant playback
//! started and the position it started from. The current position is
//! interpolated from those on demand, so reads never drift and never
//! require a background thread to stay correct. Pausing and seeking fold
//! the interpolated value back into the stored position so every state
//! change starts from a consistent base.

use std::time::Instant;

use crate::types::DEFAULT_SAMPLE_RATE;

/// Interpolating playback clock
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    sample_rate: u32,
    /// Folded position; authoritative while paused
    position_samples: u64,
    /// Song length; seeks clamp to this when known
    duration_samples: Option<u64>,
    playing: bool,
    /// Wall-clock base for interpolation; `Some` iff playing
    play_start: Option<Instant>,
    /// Position at `play_start`
    play_start_position: u64,
}

impl PlaybackClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: if sample_rate == 0 {
                DEFAULT_SAMPLE_RATE
            } else {
                sample_rate
            },
            position_samples: 0,
            duration_samples: None,
            playing: false,
            play_start: None,
            play_start_position: 0,
        }
    }

    /// Reset to position zero, stopped, with a new song duration
    pub fn reset(&mut self, duration_sec: Option<f64>) {
        self.position_samples = 0;
        self.duration_samples = duration_sec
            .filter(|d| *d >= 0.0)
            .map(|d| (d * self.sample_rate as f64) as u64);
        self.playing = false;
        self.play_start = None;
        self.play_start_position = 0;
    }

    /// Start playback; a no-op if already playing
    pub fn play(&mut self) {
        if self.playing {
            return;
        }
        self.playing = true;
        self.play_start = Some(Instant::now());
        self.play_start_position = self.position_samples;
    }

    /// Stop playback, folding the interpolated position; a no-op if paused
    pub fn pause(&mut self) {
        if !self.playing {
            return;
        }
        self.position_samples = self.interpolated();
        self.playing = false;
        self.play_start = None;
    }

    /// Fold the interpolated position into the stored one
    ///
    /// Called periodically while playing so a crash or snapshot never sees
    /// a stale stored position. Idempotent: folding twice in a row reads
    /// the same instant-based interpolation both times.
    pub fn fold(&mut self) {
        if !self.playing {
            return;
        }
        self.position_samples = self.interpolated();
        self.play_start = Some(Instant::now());
        self.play_start_position = self.position_samples;
    }

    /// Jump to an absolute position in seconds, clamped to `[0, duration]`
    ///
    /// Works in any state; when playing, the interpolation base is rebased
    /// so playback continues seamlessly from the new position.
    pub fn seek(&mut self, seconds: f64) {
        let seconds = seconds.max(0.0);
        let mut target = (seconds * self.sample_rate as f64) as u64;
        if let Some(duration) = self.duration_samples {
            target = target.min(duration);
        }
        self.position_samples = target;
        if self.playing {
            self.play_start = Some(Instant::now());
            self.play_start_position = target;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Current position in samples (interpolated while playing)
    pub fn position_samples(&self) -> u64 {
        if self.playing {
            self.interpolated()
        } else {
            self.position_samples
        }
    }

    /// Current position in seconds
    pub fn position_seconds(&self) -> f64 {
        self.position_samples() as f64 / self.sample_rate as f64
    }

    fn interpolated(&self) -> u64 {
        let Some(start) = self.play_start else {
            return self.position_samples;
        };
        let elapsed = start.elapsed().as_secs_f64();
        let mut position =
            self.play_start_position + (elapsed * self.sample_rate as f64) as u64;
        if let Some(duration) = self.duration_samples {
            position = position.min(duration);
        }
        position
    }
}
