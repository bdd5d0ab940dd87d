//! Mixer runtime thread
//!
//! Owns the [`StemMixer`] on a dedicated thread and drains a command
//! channel, so the mixer itself never needs locks. While playing, a tick
//! timer periodically folds the playback clock; while paused, the timer is
//! swapped for a `never()` channel so the thread sleeps until the next
//! command.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, never, tick, Receiver, Sender};
use crossbeam::select;

use crate::command::MixerCommand;
use crate::config::MixerConfig;
use crate::events::EventBus;
use crate::mixer::StemMixer;
use crate::state::MixerSnapshot;

/// How long a blocking query waits for the runtime thread
const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Handle to the running mixer thread
///
/// Dropping the handle shuts the thread down and joins it.
pub struct MixerRuntime {
    command_tx: Sender<MixerCommand>,
    thread: Option<JoinHandle<()>>,
}

impl MixerRuntime {
    /// Spawn the mixer runtime thread
    pub fn spawn(config: &MixerConfig, events: EventBus) -> Result<Self, String> {
        let (command_tx, command_rx) = channel::unbounded();
        let mut mixer = StemMixer::new(config.sample_rate, events);
        let fold_interval = Duration::from_millis(config.fold_interval_ms.max(1));

        let thread = thread::Builder::new()
            .name("mixer-runtime".into())
            .spawn(move || run(&mut mixer, command_rx, fold_interval))
            .map_err(|e| format!("Failed to spawn mixer runtime thread: {}", e))?;

        Ok(Self {
            command_tx,
            thread: Some(thread),
        })
    }

    /// Queue a command for the runtime thread
    pub fn send(&self, command: MixerCommand) -> Result<(), String> {
        self.command_tx
            .send(command)
            .map_err(|_| "mixer runtime is not running".to_string())
    }

    /// A cloneable sender for other threads to queue commands
    pub fn sender(&self) -> Sender<MixerCommand> {
        self.command_tx.clone()
    }

    /// Blocking query for a point-in-time state copy
    pub fn snapshot(&self) -> Result<MixerSnapshot, String> {
        let (reply, rx) = channel::bounded(1);
        self.send(MixerCommand::GetSnapshot { reply })?;
        rx.recv_timeout(REPLY_TIMEOUT)
            .map_err(|_| "mixer runtime did not reply".to_string())
    }

    /// Blocking query for the current playback position in seconds
    pub fn position_seconds(&self) -> Result<f64, String> {
        let (reply, rx) = channel::bounded(1);
        self.send(MixerCommand::GetPosition { reply })?;
        rx.recv_timeout(REPLY_TIMEOUT)
            .map_err(|_| "mixer runtime did not reply".to_string())
    }

    /// Stop the runtime thread and wait for it to exit
    pub fn shutdown(&mut self) {
        let _ = self.command_tx.send(MixerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Mixer runtime thread panicked");
            }
        }
    }
}

impl Drop for MixerRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(mixer: &mut StemMixer, command_rx: Receiver<MixerCommand>, fold_interval: Duration) {
    log::info!("Mixer runtime started");

    // never() while paused so an idle mixer costs no wakeups.
    let mut fold_timer: Receiver<std::time::Instant> = never();

    loop {
        select! {
            recv(command_rx) -> msg => {
                let Ok(command) = msg else {
                    // All senders dropped without an explicit shutdown.
                    break;
                };
                match command {
                    MixerCommand::Shutdown => break,
                    MixerCommand::LoadSong(bundle) => {
                        mixer.load_song(&bundle);
                        fold_timer = never();
                    }
                    MixerCommand::Play => {
                        if mixer.play() {
                            fold_timer = tick(fold_interval);
                        }
                    }
                    MixerCommand::Pause => {
                        mixer.pause();
                        fold_timer = never();
                    }
                    MixerCommand::Seek { seconds } => mixer.seek(seconds),
                    MixerCommand::SetGain { stem, db } => {
                        mixer.set_gain(&stem, db);
                    }
                    MixerCommand::ToggleMute { stem, bus } => {
                        mixer.toggle_mute(&stem, bus);
                    }
                    MixerCommand::ToggleSolo { stem } => {
                        mixer.toggle_solo(&stem);
                    }
                    MixerCommand::SaveScene(scene) => mixer.save_scene(scene),
                    MixerCommand::RecallScene(scene) => {
                        mixer.recall_scene(scene);
                    }
                    MixerCommand::GetSnapshot { reply } => {
                        let _ = reply.send(mixer.snapshot());
                    }
                    MixerCommand::GetPosition { reply } => {
                        let _ = reply.send(mixer.position_seconds());
                    }
                }
            }
            recv(fold_timer) -> _ => mixer.fold_clock(),
        }
    }

    mixer.pause();
    log::info!("Mixer runtime stopped");
}
