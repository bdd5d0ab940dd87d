//! Mixer event broadcasting
//!
//! Every state change the mixer makes is announced as an event so remote
//! displays (lyrics screen, operator UI) stay in sync without polling.
//! Each subscriber gets its own channel; publishing fans the event out to
//! all of them, so subscribers never compete for messages.

use std::sync::{Arc, Mutex, PoisonError};

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use encore_archive::SongInfo;

use crate::state::MixerSnapshot;

/// Per-subscriber queue depth; a stalled subscriber drops events rather
/// than blocking the mixer thread.
const SUBSCRIBER_QUEUE_DEPTH: usize = 256;

/// Events emitted by the mixer
#[derive(Debug, Clone)]
pub enum MixerEvent {
    /// A new song bundle was loaded and the mixer state rebuilt
    SongLoaded(SongInfo),
    /// Any mix parameter, scene, or stem set changed
    MixStateChanged(MixerSnapshot),
}

/// Fan-out event bus
///
/// Cloning the bus shares the subscriber table; the mixer holds one clone
/// for publishing while callers keep another for subscribing.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<MixerEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and return its receiving end
    pub fn subscribe(&self) -> Receiver<MixerEvent> {
        let (tx, rx) = bounded(SUBSCRIBER_QUEUE_DEPTH);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Broadcast an event to every live subscriber
    ///
    /// Disconnected subscribers are dropped from the table; a subscriber
    /// with a full queue loses this event but stays registered.
    pub fn publish(&self, event: MixerEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("Event subscriber queue full, dropping event");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Number of live subscribers (drops disconnected ones first)
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::types::SceneId;

    fn snapshot() -> MixerSnapshot {
        MixerSnapshot {
            stems: BTreeMap::new(),
            active_scene: SceneId::A,
            scenes: [None, None],
        }
    }

    #[test]
    fn test_every_subscriber_receives_each_event() {
        let bus = EventBus::new();
        let rx1 = bus.subscribe();
        let rx2 = bus.subscribe();

        bus.publish(MixerEvent::MixStateChanged(snapshot()));

        assert!(matches!(
            rx1.try_recv(),
            Ok(MixerEvent::MixStateChanged(_))
        ));
        assert!(matches!(
            rx2.try_recv(),
            Ok(MixerEvent::MixStateChanged(_))
        ));
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let bus = EventBus::new();
        let rx1 = bus.subscribe();
        let rx2 = bus.subscribe();
        drop(rx2);

        bus.publish(MixerEvent::MixStateChanged(snapshot()));
        assert_eq!(bus.subscriber_count(), 1);
        assert!(rx1.try_recv().is_ok());
    }

    #[test]
    fn test_publish_with_no_subscribers_is_harmless() {
        let bus = EventBus::new();
        bus.publish(MixerEvent::MixStateChanged(snapshot()));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
