use alert_core::types::{Alert, ChannelConfig, ChannelKind};
use async_trait::async_trait;
use serde_json::json;

use crate::senders::{ChannelSender, SendError};

pub struct EmailSender {
    client: reqwest::Client,
    provider_url: String,
}

impl EmailSender {
    pub fn new(client: reqwest::Client, provider_url: String) -> Self {
        Self {
            client,
            provider_url,
        }
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, alert: &Alert, config: &ChannelConfig) -> Result<(), SendError> {
        let to = config
            .email
            .as_deref()
            .ok_or_else(|| SendError::Config("email address missing".to_string()))?;

        let payload = json!({
            "to": to,
            "subject": format!("GCX alert: {}", alert.rule_name),
            "body": alert.message,
            "alertId": alert.id,
            "severity": alert.severity,
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
