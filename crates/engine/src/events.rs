//! Alert event bus. The engine publishes here; the WebSocket layer and the
//! in-app channel are passive subscribers, so the UI never has to poll.

use alert_core::types::{Alert, AlertStatus};
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AlertEvent {
    /// A rule fired and the alert is durably recorded.
    #[serde(rename_all = "camelCase")]
    Created { alert: Alert },
    /// In-app delivery: show this alert to its user right now.
    #[serde(rename_all = "camelCase")]
    Notified { alert: Alert },
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        alert_id: String,
        user_id: String,
        status: AlertStatus,
    },
}

impl AlertEvent {
    pub fn user_id(&self) -> &str {
        match self {
            AlertEvent::Created { alert } | AlertEvent::Notified { alert } => &alert.user_id,
            AlertEvent::StatusChanged { user_id, .. } => user_id,
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AlertEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// With no subscribers the event is dropped; a slow subscriber sees
    /// `Lagged` instead of backpressuring the engine.
    pub fn publish(&self, event: AlertEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
