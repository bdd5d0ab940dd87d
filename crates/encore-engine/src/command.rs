//! Commands accepted by the mixer runtime
//!
//! Every mutation of the mixer travels through this enum, so the runtime
//! thread is the single writer and callers never need a lock. Queries that
//! need an answer carry a reply channel.

use crossbeam::channel::Sender;
use encore_archive::SongBundle;

use crate::state::MixerSnapshot;
use crate::types::{Bus, SceneId};

/// A command sent to the mixer runtime thread
#[derive(Debug)]
pub enum MixerCommand {
    /// Replace the loaded song and rebuild mixer state
    LoadSong(Box<SongBundle>),
    Play,
    Pause,
    /// Seek to an absolute position in seconds
    Seek { seconds: f64 },
    SetGain { stem: String, db: f32 },
    ToggleMute { stem: String, bus: Bus },
    ToggleSolo { stem: String },
    SaveScene(SceneId),
    RecallScene(SceneId),
    /// Request a point-in-time state copy
    GetSnapshot { reply: Sender<MixerSnapshot> },
    /// Request the current playback position in seconds
    GetPosition { reply: Sender<f64> },
    /// Stop the runtime thread
    Shutdown,
}
