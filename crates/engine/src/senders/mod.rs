//! Channel senders: one implementation per delivery method.

mod email;
mod in_app;
mod push;
mod sms;

pub use email::EmailSender;
pub use in_app::InAppSender;
pub use push::PushSender;
pub use sms::SmsSender;

use alert_core::types::{Alert, ChannelConfig, ChannelKind};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// The channel is enabled but its config lacks an address/token.
    #[error("channel config incomplete: {0}")]
    Config(String),
    #[error("provider returned HTTP {status}")]
    Provider { status: u16 },
    #[error("transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait ChannelSender: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// One delivery attempt. Retries, timeouts and outcome records belong
    /// to the dispatcher, not here.
    async fn send(&self, alert: &Alert, config: &ChannelConfig) -> Result<(), SendError>;
}

/// Signature over `timestamp.body`, sent alongside outbound payloads so a
/// receiver can verify the push really came from us.
pub fn sign_payload(secret: &str, timestamp: i64, body: &str) -> String {
    let data = format!("{}.{}", timestamp, body);
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(data.as_bytes());
    format!("sha256={:x}", mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic_and_keyed() {
        let a = sign_payload("secret", 1700000000, r#"{"x":1}"#);
        let b = sign_payload("secret", 1700000000, r#"{"x":1}"#);
        let c = sign_payload("other", 1700000000, r#"{"x":1}"#);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("sha256="));
    }
}
