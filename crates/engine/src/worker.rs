//! Tick intake worker: drains the ingestion channel and evaluates each tick
//! in its own task so a burst of ticks never serializes behind one slow
//! evaluation.

use std::sync::Arc;

use alert_core::types::MarketTick;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::service::AlertEngine;

pub fn spawn_tick_worker(
    engine: Arc<AlertEngine>,
    mut ticks: mpsc::Receiver<MarketTick>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("tick worker started");
        while let Some(tick) = ticks.recv().await {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                let symbol = tick.symbol.clone();
                if let Err(err) = engine.handle_tick(tick).await {
                    warn!(symbol = %symbol, error = %err, "tick evaluation failed");
                }
            });
        }
        info!("tick channel closed, worker stopping");
    })
}
