use std::sync::Arc;

use alert_core::types::MarketTick;
use alert_engine::AlertEngine;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AlertEngine>,
    /// Ingestion seam: ticks posted to the API are queued here for the
    /// engine's tick worker.
    pub ticks: mpsc::Sender<MarketTick>,
}

#[derive(Debug, Clone)]
pub struct RequestId(pub String);
