//! Serializable mixer state
//!
//! These types are the external face of the mixer: remote displays and
//! persistence see [`MixerSnapshot`], never the live mixer. Maps use
//! `BTreeMap` so serialized snapshots are deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{SceneId, NUM_BUSES};

/// Live mix parameters for one stem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StemChannel {
    /// Gain in dB, always within the legal range
    pub gain_db: f32,
    /// Per-bus mute flags, indexed by [`crate::types::Bus::index`]
    pub mute: [bool; NUM_BUSES],
    pub solo: bool,
}

impl Default for StemChannel {
    fn default() -> Self {
        Self {
            gain_db: 0.0,
            mute: [false; NUM_BUSES],
            solo: false,
        }
    }
}

/// A saved copy of every stem's mix parameters
///
/// Scenes are value snapshots: recalling one copies the values back, and
/// editing the live mix afterwards never mutates the saved scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub stems: BTreeMap<String, StemChannel>,
}

impl SceneSnapshot {
    /// Capture the given live channels by value
    pub fn capture(channels: &BTreeMap<String, StemChannel>) -> Self {
        Self {
            stems: channels.clone(),
        }
    }
}

/// Point-in-time copy of the complete mixer state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerSnapshot {
    /// Every loaded stem's live parameters
    pub stems: BTreeMap<String, StemChannel>,
    /// Which scene slot was recalled last
    pub active_scene: SceneId,
    /// Saved scene slots, indexed by [`SceneId::index`]
    pub scenes: [Option<SceneSnapshot>; 2],
}
