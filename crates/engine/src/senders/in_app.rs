use alert_core::types::{Alert, ChannelConfig, ChannelKind};
use async_trait::async_trait;

use crate::events::{AlertEvent, EventBus};
use crate::senders::{ChannelSender, SendError};

/// In-app delivery pushes the alert onto the event bus; connected clients
/// render it immediately. No provider round trip, so it cannot fail and is
/// never deferred by quiet hours.
pub struct InAppSender {
    events: EventBus,
}

impl InAppSender {
    pub fn new(events: EventBus) -> Self {
        Self { events }
    }
}

#[async_trait]
impl ChannelSender for InAppSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::InApp
    }

    async fn send(&self, alert: &Alert, _config: &ChannelConfig) -> Result<(), SendError> {
        self.events.publish(AlertEvent::Notified {
            alert: alert.clone(),
        });
        Ok(())
    }
}
