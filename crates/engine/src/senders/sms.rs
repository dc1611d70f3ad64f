use alert_core::types::{Alert, ChannelConfig, ChannelKind};
use async_trait::async_trait;
use serde_json::json;

use crate::senders::{ChannelSender, SendError};

pub struct SmsSender {
    client: reqwest::Client,
    provider_url: String,
}

impl SmsSender {
    pub fn new(client: reqwest::Client, provider_url: String) -> Self {
        Self {
            client,
            provider_url,
        }
    }
}

#[async_trait]
impl ChannelSender for SmsSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    async fn send(&self, alert: &Alert, config: &ChannelConfig) -> Result<(), SendError> {
        let to = config
            .phone
            .as_deref()
            .ok_or_else(|| SendError::Config("phone number missing".to_string()))?;

        // SMS is the terse channel: the message sentence already carries
        // symbol, commodity and the triggering value.
        let payload = json!({
            "to": to,
            "message": alert.message,
        });

        let response = self
            .client
            .post(&self.provider_url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| SendError::Transport(err.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(SendError::Provider {
                status: response.status().as_u16(),
            })
        }
    }
}
