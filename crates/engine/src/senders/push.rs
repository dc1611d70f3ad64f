use alert_core::types::{Alert, ChannelConfig, ChannelKind};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::senders::{sign_payload, ChannelSender, SendError};

/// Push notifications go to a gateway that fans out to device platforms.
/// Payloads are HMAC-signed so the gateway can authenticate the engine.
pub struct PushSender {
    client: reqwest::Client,
    provider_url: String,
    signing_secret: String,
}

impl PushSender {
    pub fn new(client: reqwest::Client, provider_url: String, signing_secret: String) -> Self {
        Self {
            client,
            provider_url,
            signing_secret,
        }
    }
}

#[async_trait]
impl ChannelSender for PushSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Push
    }

    async fn send(&self, alert: &Alert, config: &ChannelConfig) -> Result<(), SendError> {
        let token = config
            .push_token
            .as_deref()
            .ok_or_else(|| SendError::Config("push token missing".to_string()))?;

        let payload = json!({
            "token": token,
            "title": alert.rule_name,
            "body": alert.message,
            "alertId": alert.id,
            "severity": alert.severity,
        });
        let body = serde_json::to_string(&payload)
            .map_err(|err| SendError::Transport(err.to_string()))?;
        let timestamp = Utc::now().timestamp();
        let signature = sign_payload(&self.signing_secret, timestamp, &body);

        let response = self
            .client
            .post(&self.provider_url)
            .header("Content-Type", "application/json")
            .header("X-Gcx-Signature", signature)
            .header("X-Gcx-Timestamp", timestamp.to_string())
            .body(body)
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
