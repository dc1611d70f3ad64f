use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use alert_api::middleware::auth::api_key_auth;
use alert_api::middleware::request_id::request_id;
use alert_api::routes;
use alert_api::state::AppState;
use alert_core::config::Settings;
use alert_db::{PgAlertLedger, PgPreferenceStore, PgRuleStore};
use alert_engine::dispatch::{DispatchConfig, Dispatcher};
use alert_engine::senders::{ChannelSender, EmailSender, InAppSender, PushSender, SmsSender};
use alert_engine::worker::spawn_tick_worker;
use alert_engine::{AlertEngine, EventBus};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let settings = Settings::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&settings.database_url)
        .await?;

    let events = EventBus::default();
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.dispatch_timeout_secs))
        .build()?;

    let senders: Vec<Arc<dyn ChannelSender>> = vec![
        Arc::new(InAppSender::new(events.clone())),
        Arc::new(EmailSender::new(
            client.clone(),
            settings.email_provider_url.clone(),
        )),
        Arc::new(SmsSender::new(
            client.clone(),
            settings.sms_provider_url.clone(),
        )),
        Arc::new(PushSender::new(
            client,
            settings.push_provider_url.clone(),
            settings.signing_secret.clone(),
        )),
    ];

    let dispatcher = Dispatcher::new(
        senders,
        DispatchConfig {
            concurrency: settings.dispatch_concurrency,
            attempt_timeout: Duration::from_secs(settings.dispatch_timeout_secs),
            retry_backoff: Duration::from_secs(settings.retry_backoff_secs),
        },
    );

    let engine = Arc::new(AlertEngine::new(
        Arc::new(PgRuleStore::new(db.clone())),
        Arc::new(PgAlertLedger::new(db.clone())),
        Arc::new(PgPreferenceStore::new(db.clone())),
        dispatcher,
        events,
        settings.severity,
    ));

    let (tick_tx, tick_rx) = mpsc::channel(1024);
    spawn_tick_worker(Arc::clone(&engine), tick_rx);

    let state = AppState {
        engine,
        ticks: tick_tx,
    };

    let api = routes::api_router(state).layer(from_fn_with_state(db, api_key_auth));

    let app = Router::new()
        .merge(routes::health_router())
        .merge(api)
        .layer(from_fn(request_id));

    let addr: SocketAddr = settings.api_bind.parse()?;
    info!(%addr, env = %settings.gcx_env, "starting alert api");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
