//! Core mixer types and constants

use serde::{Deserialize, Serialize};

/// Number of output buses
pub const NUM_BUSES: usize = 2;

/// Gain floor in dB (practically silent)
pub const GAIN_MIN_DB: f32 = -60.0;

/// Gain ceiling in dB
pub const GAIN_MAX_DB: f32 = 12.0;

/// Default playback sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Output bus identifier
///
/// Every stem carries an independent mute flag per bus, so the house mix
/// and the performer's monitor mix can diverge (vocals muted for the
/// audience but audible in the singer's ears).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bus {
    /// Front-of-house PA
    Pa = 0,
    /// In-ear monitor feed
    Iem = 1,
}

impl Bus {
    /// Bus index into per-bus arrays
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Human-readable name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Bus::Pa => "PA",
            Bus::Iem => "IEM",
        }
    }
}

/// Scene slot identifier
///
/// Two snapshot slots for instant A/B comparison of mix states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SceneId {
    A = 0,
    B = 1,
}

impl SceneId {
    /// Slot index into the scene array
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Human-readable name for logging
    pub fn name(&self) -> &'static str {
        match self {
            SceneId::A => "A",
            SceneId::B => "B",
        }
    }
}

/// Clamp a requested gain to the legal dB range
pub fn clamp_gain_db(db: f32) -> f32 {
    db.clamp(GAIN_MIN_DB, GAIN_MAX_DB)
}
