//! Encore Engine - Two-bus stem mixer and playback runtime
//!
//! The live half of the Encore karaoke player: a [`StemMixer`] that owns
//! all mix state for the loaded song pack (per-stem gain, independent PA
//! and IEM mutes, solo, A/B scenes, and an interpolating playback clock),
//! a [`MixerRuntime`] that serializes all mutation on a dedicated command
//! thread, and an [`EventBus`] that fans state changes out to remote
//! displays.
//!
//! Audio decoding and DSP live elsewhere; this crate models the mix and
//! announces it.

pub mod clock;
pub mod command;
pub mod config;
pub mod events;
pub mod mixer;
pub mod runtime;
pub mod state;
pub mod types;

pub use clock::PlaybackClock;
pub use command::MixerCommand;
pub use config::{MixerConfig, PlayerConfig};
pub use events::{EventBus, MixerEvent};
pub use mixer::StemMixer;
pub use runtime::MixerRuntime;
pub use state::{MixerSnapshot, SceneSnapshot, StemChannel};
pub use types::{Bus, SceneId, GAIN_MAX_DB, GAIN_MIN_DB};
