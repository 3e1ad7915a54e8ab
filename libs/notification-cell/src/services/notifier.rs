use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use crate::models::{ScheduleEvent, SubscriberScope};
use crate::NotificationError;

pub type EventSender = broadcast::Sender<String>;
pub type EventReceiver = broadcast::Receiver<String>;

const SCOPE_CHANNEL_CAPACITY: usize = 100;
const GLOBAL_CHANNEL_CAPACITY: usize = 1000;

/// Fan-out hub for schedule change events. Delivery is at-most-once:
/// a scope with no live subscribers simply drops the event, and a slow
/// subscriber that overruns the channel loses the oldest messages.
/// Emitting never blocks a booking request.
pub struct ChangeNotifier {
    channels: Arc<RwLock<HashMap<SubscriberScope, EventSender>>>,
    global_sender: EventSender,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (global_sender, _) = broadcast::channel(GLOBAL_CHANNEL_CAPACITY);

        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            global_sender,
        }
    }

    /// Subscribe to one audience, creating its channel on first use.
    pub async fn subscribe(&self, scope: SubscriberScope) -> EventReceiver {
        let mut channels = self.channels.write().await;
        let sender = channels.entry(scope).or_insert_with(|| {
            let (sender, _) = broadcast::channel(SCOPE_CHANNEL_CAPACITY);
            debug!("Created event channel for scope {}", scope);
            sender
        });
        sender.subscribe()
    }

    pub fn subscribe_global(&self) -> EventReceiver {
        self.global_sender.subscribe()
    }

    pub async fn emit(&self, event: ScheduleEvent) -> Result<(), NotificationError> {
        let message = serde_json::to_string(&event)?;

        {
            let channels = self.channels.read().await;
            for scope in event.scopes() {
                if let Some(sender) = channels.get(&scope) {
                    if let Err(e) = sender.send(message.clone()) {
                        // All receivers for this scope have dropped.
                        warn!("No live subscribers for scope {}: {}", scope, e);
                    }
                }
            }
        }

        let global_message = serde_json::json!({
            "type": "schedule_event",
            "kind": event.kind,
            "appointment_id": event.appointment_id,
            "timestamp": Utc::now().to_rfc3339(),
            "data": event,
        })
        .to_string();

        if let Err(e) = self.global_sender.send(global_message) {
            debug!("Failed to send to global channel: {}", e);
        }

        debug!(
            "Emitted {} event for appointment {}",
            event.kind, event.appointment_id
        );
        Ok(())
    }

    /// Drop channels that no longer have any subscribers.
    pub async fn prune_idle_channels(&self) {
        let mut channels = self.channels.write().await;
        channels.retain(|scope, sender| {
            let live = sender.receiver_count() > 0;
            if !live {
                debug!("Pruned idle event channel for scope {}", scope);
            }
            live
        });
    }

    pub async fn active_scopes(&self) -> Vec<SubscriberScope> {
        let channels = self.channels.read().await;
        channels.keys().cloned().collect()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ChangeNotifier {
    fn clone(&self) -> Self {
        Self {
            channels: Arc::clone(&self.channels),
            global_sender: self.global_sender.clone(),
        }
    }
}
