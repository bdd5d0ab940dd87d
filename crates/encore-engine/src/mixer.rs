//! Two-bus stem mixer
//!
//! Holds the live mix state for the loaded song: per-stem gain, per-bus
//! mutes, solo flags, two scene slots, and the playback clock. All methods
//! are plain synchronous calls; the runtime thread owns the mixer and
//! serializes access, so there is no internal locking.
//!
//! Setters targeting an unknown stem id return `false` and change nothing.
//! Stem ids only exist between song loads, so a stale id from a remote
//! display is an expected no-op, never a panic.

use std::collections::BTreeMap;

use encore_archive::{SongBundle, SongInfo};

use crate::clock::PlaybackClock;
use crate::events::{EventBus, MixerEvent};
use crate::state::{MixerSnapshot, SceneSnapshot, StemChannel};
use crate::types::{clamp_gain_db, Bus, SceneId};

pub struct StemMixer {
    /// Live per-stem parameters; rebuilt wholesale on every load
    channels: BTreeMap<String, StemChannel>,
    scenes: [Option<SceneSnapshot>; 2],
    active_scene: SceneId,
    clock: PlaybackClock,
    song: Option<SongInfo>,
    events: EventBus,
}

impl StemMixer {
    pub fn new(sample_rate: u32, events: EventBus) -> Self {
        Self {
            channels: BTreeMap::new(),
            scenes: [None, None],
            active_scene: SceneId::A,
            clock: PlaybackClock::new(sample_rate),
            song: None,
            events,
        }
    }

    /// Replace the loaded song and rebuild all mix state
    ///
    /// Every stem registers at 0 dB, unmuted, unsoloed. If the bundle
    /// ships a preset flagged `default`, its overrides are applied on
    /// top; a preset that merely comes first in the list is ignored.
    /// Scene slots are cleared so no stale stem ids survive a song change.
    pub fn load_song(&mut self, bundle: &SongBundle) {
        log::info!(
            "Loading song '{}' by '{}' ({} stems)",
            bundle.song.title,
            bundle.song.artist,
            bundle.tracks.len()
        );

        self.channels.clear();
        for track in &bundle.tracks {
            self.channels
                .insert(track.id.clone(), StemChannel::default());
        }

        if let Some(preset) = bundle.default_preset() {
            log::info!("Applying default preset '{}'", preset.name);
            self.apply_preset_overrides(preset);
        }

        self.scenes = [None, None];
        self.active_scene = SceneId::A;
        self.clock.reset(bundle.song.duration_sec);
        self.song = Some(bundle.song.clone());

        self.events.publish(MixerEvent::SongLoaded(bundle.song.clone()));
        self.emit_state();
    }

    fn apply_preset_overrides(&mut self, preset: &encore_archive::Preset) {
        for (id, db) in &preset.gain_db {
            match self.channels.get_mut(id) {
                Some(channel) => channel.gain_db = clamp_gain_db(*db),
                None => log::warn!("Preset '{}' names unknown stem '{}'", preset.name, id),
            }
        }
        for id in &preset.mute {
            match self.channels.get_mut(id) {
                Some(channel) => channel.mute = [true, true],
                None => log::warn!("Preset '{}' names unknown stem '{}'", preset.name, id),
            }
        }
    }

    /// Set a stem's gain in dB, clamped to the legal range
    pub fn set_gain(&mut self, stem: &str, db: f32) -> bool {
        let Some(channel) = self.channels.get_mut(stem) else {
            log::warn!("set_gain: unknown stem '{}'", stem);
            return false;
        };
        channel.gain_db = clamp_gain_db(db);
        self.emit_state();
        true
    }

    /// Toggle a stem's mute flag on one bus
    pub fn toggle_mute(&mut self, stem: &str, bus: Bus) -> bool {
        let Some(channel) = self.channels.get_mut(stem) else {
            log::warn!("toggle_mute: unknown stem '{}'", stem);
            return false;
        };
        channel.mute[bus.index()] = !channel.mute[bus.index()];
        log::debug!(
            "Stem '{}' {} on {}",
            stem,
            if channel.mute[bus.index()] { "muted" } else { "unmuted" },
            bus.name()
        );
        self.emit_state();
        true
    }

    /// Toggle a stem's solo flag
    pub fn toggle_solo(&mut self, stem: &str) -> bool {
        let Some(channel) = self.channels.get_mut(stem) else {
            log::warn!("toggle_solo: unknown stem '{}'", stem);
            return false;
        };
        channel.solo = !channel.solo;
        self.emit_state();
        true
    }

    /// True if any loaded stem is soloed
    pub fn any_solo(&self) -> bool {
        self.channels.values().any(|c| c.solo)
    }

    /// Whether a stem is audible on a bus right now
    ///
    /// Solo is exclusive: while any stem is soloed, only soloed stems are
    /// audible. Mute still wins on its bus. Audibility is derived live,
    /// never stored, so it can never go stale.
    pub fn is_audible(&self, stem: &str, bus: Bus) -> bool {
        let Some(channel) = self.channels.get(stem) else {
            return false;
        };
        if channel.mute[bus.index()] {
            return false;
        }
        !self.any_solo() || channel.solo
    }

    /// Save the live mix into a scene slot
    pub fn save_scene(&mut self, scene: SceneId) {
        log::info!("Saving scene {}", scene.name());
        self.scenes[scene.index()] = Some(SceneSnapshot::capture(&self.channels));
        self.emit_state();
    }

    /// Recall a saved scene into the live mix
    ///
    /// Returns `false` if the slot was never saved. Values are copied out
    /// of the snapshot, so later edits leave the saved scene intact.
    pub fn recall_scene(&mut self, scene: SceneId) -> bool {
        let Some(snapshot) = self.scenes[scene.index()].clone() else {
            log::warn!("recall_scene: scene {} was never saved", scene.name());
            return false;
        };
        for (id, saved) in &snapshot.stems {
            if let Some(channel) = self.channels.get_mut(id) {
                *channel = saved.clone();
            }
        }
        self.active_scene = scene;
        log::info!("Recalled scene {}", scene.name());
        self.emit_state();
        true
    }

    /// Start playback; requires a loaded song
    pub fn play(&mut self) -> bool {
        if self.song.is_none() {
            log::warn!("play: no song loaded");
            return false;
        }
        self.clock.play();
        true
    }

    /// Pause playback; safe in any state
    pub fn pause(&mut self) {
        self.clock.pause();
    }

    /// Seek to an absolute position in seconds
    pub fn seek(&mut self, seconds: f64) {
        self.clock.seek(seconds);
    }

    /// Periodic clock fold, driven by the runtime's tick timer
    pub fn fold_clock(&mut self) {
        self.clock.fold();
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn position_seconds(&self) -> f64 {
        self.clock.position_seconds()
    }

    pub fn song(&self) -> Option<&SongInfo> {
        self.song.as_ref()
    }

    /// Stem ids of the loaded song, in sorted order
    pub fn stem_ids(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    /// Point-in-time copy of the complete mixer state
    pub fn snapshot(&self) -> MixerSnapshot {
        MixerSnapshot {
            stems: self.channels.clone(),
            active_scene: self.active_scene,
            scenes: self.scenes.clone(),
        }
    }

    fn emit_state(&self) {
        self.events.publish(MixerEvent::MixStateChanged(self.snapshot()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_archive::Entry;
    use serde_json::json;

    fn bundle(doc: serde_json::Value, entries: Vec<Entry>) -> SongBundle {
        SongBundle::assemble(doc, entries).unwrap()
    }

    fn three_stem_bundle() -> SongBundle {
        bundle(
            json!({
                "song": {"title": "T", "artist": "A", "durationSec": 200.0},
                "tracks": [
                    {"file": "vocals.ogg"},
                    {"file": "drums.ogg"},
                    {"file": "bass.ogg"}
                ]
            }),
            vec![],
        )
    }

    fn mixer_with(bundle: &SongBundle) -> StemMixer {
        let mut mixer = StemMixer::new(48_000, EventBus::new());
        mixer.load_song(bundle);
        mixer
    }

    #[test]
    fn test_load_rebuilds_channels() {
        let mixer = mixer_with(&three_stem_bundle());
        assert_eq!(mixer.stem_ids(), vec!["bass", "drums", "vocals"]);
        let snapshot = mixer.snapshot();
        assert_eq!(snapshot.stems["vocals"].gain_db, 0.0);
        assert!(!snapshot.stems["vocals"].mute[Bus::Pa.index()]);
    }

    #[test]
    fn test_second_load_drops_stale_stems() {
        let mut mixer = mixer_with(&three_stem_bundle());
        mixer.set_gain("drums", -10.0);
        mixer.save_scene(SceneId::A);

        let next = bundle(
            json!({
                "song": {"title": "U", "artist": "B"},
                "tracks": [{"file": "piano.ogg"}]
            }),
            vec![],
        );
        mixer.load_song(&next);

        assert_eq!(mixer.stem_ids(), vec!["piano"]);
        assert!(!mixer.set_gain("drums", 0.0));
        assert!(!mixer.recall_scene(SceneId::A));
    }

    #[test]
    fn test_gain_is_clamped() {
        let mut mixer = mixer_with(&three_stem_bundle());
        assert!(mixer.set_gain("vocals", -200.0));
        assert_eq!(mixer.snapshot().stems["vocals"].gain_db, -60.0);
        assert!(mixer.set_gain("vocals", 99.0));
        assert_eq!(mixer.snapshot().stems["vocals"].gain_db, 12.0);
    }

    #[test]
    fn test_unknown_stem_is_a_noop() {
        let mut mixer = mixer_with(&three_stem_bundle());
        let before = mixer.snapshot();
        assert!(!mixer.set_gain("keys", -6.0));
        assert!(!mixer.toggle_mute("keys", Bus::Pa));
        assert!(!mixer.toggle_solo("keys"));
        assert!(!mixer.is_audible("keys", Bus::Pa));
        assert_eq!(mixer.snapshot(), before);
    }

    #[test]
    fn test_mute_is_per_bus() {
        let mut mixer = mixer_with(&three_stem_bundle());
        assert!(mixer.toggle_mute("vocals", Bus::Pa));
        assert!(!mixer.is_audible("vocals", Bus::Pa));
        assert!(mixer.is_audible("vocals", Bus::Iem));
    }

    #[test]
    fn test_solo_is_exclusive_and_mute_still_wins() {
        let mut mixer = mixer_with(&three_stem_bundle());
        assert!(mixer.toggle_solo("vocals"));

        assert!(mixer.is_audible("vocals", Bus::Pa));
        assert!(!mixer.is_audible("drums", Bus::Pa));
        assert!(!mixer.is_audible("bass", Bus::Iem));

        // A muted soloed stem stays silent on that bus.
        mixer.toggle_mute("vocals", Bus::Pa);
        assert!(!mixer.is_audible("vocals", Bus::Pa));
        assert!(mixer.is_audible("vocals", Bus::Iem));

        // Dropping the last solo restores everyone.
        mixer.toggle_solo("vocals");
        assert!(mixer.is_audible("drums", Bus::Pa));
    }

    #[test]
    fn test_scene_recall_restores_values() {
        let mut mixer = mixer_with(&three_stem_bundle());
        mixer.set_gain("drums", -12.0);
        mixer.toggle_mute("bass", Bus::Iem);
        mixer.save_scene(SceneId::A);

        mixer.set_gain("drums", 6.0);
        mixer.toggle_mute("bass", Bus::Iem);
        mixer.toggle_solo("vocals");
        mixer.save_scene(SceneId::B);

        assert!(mixer.recall_scene(SceneId::A));
        let snapshot = mixer.snapshot();
        assert_eq!(snapshot.stems["drums"].gain_db, -12.0);
        assert!(snapshot.stems["bass"].mute[Bus::Iem.index()]);
        assert!(!snapshot.stems["vocals"].solo);
        assert_eq!(snapshot.active_scene, SceneId::A);
    }

    #[test]
    fn test_saved_scene_is_isolated_from_live_edits() {
        let mut mixer = mixer_with(&three_stem_bundle());
        mixer.set_gain("vocals", -6.0);
        mixer.save_scene(SceneId::B);

        mixer.set_gain("vocals", 3.0);
        assert!(mixer.recall_scene(SceneId::B));
        assert_eq!(mixer.snapshot().stems["vocals"].gain_db, -6.0);
    }

    #[test]
    fn test_recall_unsaved_scene_fails() {
        let mut mixer = mixer_with(&three_stem_bundle());
        assert!(!mixer.recall_scene(SceneId::B));
        assert_eq!(mixer.snapshot().active_scene, SceneId::A);
    }

    #[test]
    fn test_default_preset_applied_on_load() {
        let bundle = bundle(
            json!({
                "song": {"title": "T", "artist": "A"},
                "tracks": [{"file": "vocals.ogg"}, {"file": "drums.ogg"}],
                "presets": [
                    {"name": "first-but-not-default", "mute": ["drums"]},
                    {"name": "practice", "default": true,
                     "mute": ["vocals"], "gainDb": {"drums": -6.0}}
                ]
            }),
            vec![],
        );
        let mixer = mixer_with(&bundle);
        let snapshot = mixer.snapshot();

        // Only the flagged preset applies; the first-in-list one does not.
        assert!(snapshot.stems["vocals"].mute[Bus::Pa.index()]);
        assert!(snapshot.stems["vocals"].mute[Bus::Iem.index()]);
        assert_eq!(snapshot.stems["drums"].gain_db, -6.0);
        assert!(!snapshot.stems["drums"].mute[Bus::Pa.index()]);
    }

    #[test]
    fn test_unflagged_presets_do_not_apply() {
        let bundle = bundle(
            json!({
                "song": {"title": "T", "artist": "A"},
                "tracks": [{"file": "vocals.ogg"}],
                "presets": [{"name": "vocals-off", "mute": ["vocals"]}]
            }),
            vec![],
        );
        let mixer = mixer_with(&bundle);
        assert!(!mixer.snapshot().stems["vocals"].mute[Bus::Pa.index()]);
    }

    #[test]
    fn test_load_registers_stems_with_clean_defaults() {
        // Track-list gain/mute/solo values are authoring metadata; the
        // live mix always starts clean.
        let bundle = bundle(
            json!({
                "song": {"title": "T", "artist": "A"},
                "tracks": [
                    {"file": "vocals.ogg", "gainDb": -4.5, "mute": true},
                    {"file": "drums.ogg", "solo": true}
                ]
            }),
            vec![],
        );
        let mixer = mixer_with(&bundle);
        let snapshot = mixer.snapshot();
        assert_eq!(snapshot.stems["vocals"].gain_db, 0.0);
        assert!(!snapshot.stems["vocals"].mute[Bus::Pa.index()]);
        assert!(!snapshot.stems["drums"].solo);
    }

    #[test]
    fn test_play_requires_loaded_song() {
        let mut mixer = StemMixer::new(48_000, EventBus::new());
        assert!(!mixer.play());

        mixer.load_song(&three_stem_bundle());
        assert!(mixer.play());
        assert!(mixer.is_playing());
        mixer.pause();
        assert!(!mixer.is_playing());
    }

    #[test]
    fn test_load_emits_song_loaded_then_state() {
        let events = EventBus::new();
        let rx = events.subscribe();
        let mut mixer = StemMixer::new(48_000, events);
        mixer.load_song(&three_stem_bundle());

        assert!(matches!(rx.try_recv(), Ok(MixerEvent::SongLoaded(s)) if s.title == "T"));
        assert!(matches!(rx.try_recv(), Ok(MixerEvent::MixStateChanged(_))));
    }

    #[test]
    fn test_setters_emit_state_changes() {
        let events = EventBus::new();
        let rx = events.subscribe();
        let mut mixer = StemMixer::new(48_000, events);
        mixer.load_song(&three_stem_bundle());
        while rx.try_recv().is_ok() {}

        mixer.set_gain("vocals", -3.0);
        assert!(matches!(rx.try_recv(), Ok(MixerEvent::MixStateChanged(_))));

        // Failed setters emit nothing.
        mixer.set_gain("nope", -3.0);
        assert!(rx.try_recv().is_err());
    }
}
