use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::errors::TransportError;
use crate::domain::notification::RealtimeMessage;
use crate::domain::ports::RealtimeChannel;

const CHANNEL_CAPACITY: usize = 32;

/// In-process fan-out of live notifications, one broadcast channel per
/// recipient. Channels are created on first subscribe. A channel whose last
/// subscriber has gone is dropped on the next push to it or the next
/// subscribe by anyone.
#[derive(Default)]
pub struct BroadcastHub {
    channels: Mutex<HashMap<Uuid, broadcast::Sender<RealtimeMessage>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<Uuid, broadcast::Sender<RealtimeMessage>>> {
        // A panic while holding the lock cannot leave the map inconsistent.
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Opens a receiver for `recipient_id`, dropping channels whose
    /// subscribers have all disconnected.
    pub fn subscribe(&self, recipient_id: Uuid) -> broadcast::Receiver<RealtimeMessage> {
        let mut channels = self.channels();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        channels
            .entry(recipient_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }
}

#[async_trait]
impl RealtimeChannel for BroadcastHub {
    async fn push(&self, recipient_id: Uuid, message: RealtimeMessage) -> Result<(), TransportError> {
        let mut channels = self.channels();
        let Some(sender) = channels.get(&recipient_id) else {
            return Err(TransportError::Failed(format!(
                "{recipient_id} is not connected"
            )));
        };
        if sender.send(message).is_err() {
            channels.remove(&recipient_id);
            return Err(TransportError::Failed(format!(
                "{recipient_id} is not connected"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str) -> RealtimeMessage {
        RealtimeMessage {
            kind: "order_placed".to_string(),
            message: text.to_string(),
            created_at: "2025-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_only_their_messages() {
        let hub = BroadcastHub::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let mut alice_rx = hub.subscribe(alice);
        let mut bob_rx = hub.subscribe(bob);

        hub.push(alice, message("for alice")).await.unwrap();

        assert_eq!(alice_rx.recv().await.unwrap().message, "for alice");
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn push_without_subscriber_reports_failure() {
        let hub = BroadcastHub::new();
        assert!(hub.push(Uuid::new_v4(), message("nobody")).await.is_err());
    }

    #[tokio::test]
    async fn dropped_subscriber_channel_is_cleaned_up() {
        let hub = BroadcastHub::new();
        let id = Uuid::new_v4();
        drop(hub.subscribe(id));

        assert!(hub.push(id, message("gone")).await.is_err());
        assert!(hub.channels().is_empty());
    }

    #[tokio::test]
    async fn subscribing_prunes_channels_nobody_listens_to() {
        let hub = BroadcastHub::new();
        let gone = Uuid::new_v4();
        let still_here = Uuid::new_v4();
        drop(hub.subscribe(gone));
        let _kept = hub.subscribe(still_here);

        let _fresh = hub.subscribe(Uuid::new_v4());

        let channels = hub.channels();
        assert!(!channels.contains_key(&gone));
        assert!(channels.contains_key(&still_here));
        assert_eq!(channels.len(), 2);
    }
}
