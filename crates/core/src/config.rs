use serde::Deserialize;

use crate::severity::SeverityPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub gcx_env: String,
    pub api_bind: String,
    /// Upper bound on concurrent channel sends across all alerts.
    pub dispatch_concurrency: usize,
    /// Per-attempt timeout against a channel provider, seconds.
    pub dispatch_timeout_secs: u64,
    /// Fixed pause before the single retry of a failed channel attempt.
    pub retry_backoff_secs: u64,
    pub email_provider_url: String,
    pub sms_provider_url: String,
    pub push_provider_url: String,
    pub signing_secret: String,
    pub severity: SeverityPolicy,
}

impl Settings {
    pub fn from_env() -> Result<Self, std::env::VarError> {
        let database_url =
            std::env::var("DATABASE_URL").or_else(|_| std::env::var("GCX_DATABASE_URL"))?;
        let gcx_env = std::env::var("GCX_ENV").unwrap_or_else(|_| "dev".to_string());
        let api_bind =
            std::env::var("GCX_API_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let dispatch_concurrency = std::env::var("GCX_DISPATCH_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8);
        let dispatch_timeout_secs = std::env::var("GCX_DISPATCH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        let retry_backoff_secs = std::env::var("GCX_RETRY_BACKOFF_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);
        let email_provider_url = std::env::var("GCX_EMAIL_PROVIDER_URL")
            .unwrap_or_else(|_| "http://localhost:8301/v1/messages".to_string());
        let sms_provider_url = std::env::var("GCX_SMS_PROVIDER_URL")
            .unwrap_or_else(|_| "http://localhost:8302/v1/messages".to_string());
        let push_provider_url = std::env::var("GCX_PUSH_PROVIDER_URL")
            .unwrap_or_else(|_| "http://localhost:8303/v1/push".to_string());
        let signing_secret =
            std::env::var("GCX_SIGNING_SECRET").or_else(|_| std::env::var("SIGNING_SECRET"))?;

        let default_policy = SeverityPolicy::default();
        let severity = SeverityPolicy {
            medium: env_f64("GCX_SEVERITY_MEDIUM", default_policy.medium),
            high: env_f64("GCX_SEVERITY_HIGH", default_policy.high),
            critical: env_f64("GCX_SEVERITY_CRITICAL", default_policy.critical),
        };

        Ok(Self {
            database_url,
            gcx_env,
            api_bind,
            dispatch_concurrency,
            dispatch_timeout_secs,
            retry_backoff_secs,
            email_provider_url,
            sms_provider_url,
            push_provider_url,
            signing_secret,
            severity,
        })
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
