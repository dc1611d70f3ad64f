//! WebSocket alert stream. Clients subscribe once and receive their own
//! alert events as they happen instead of polling the list endpoint.

use alert_engine::AlertEvent;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Extension, Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::debug;

use crate::{middleware::auth::AuthContext, state::AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/alerts/stream", get(stream))
        .with_state(state)
}

async fn stream(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ws: WebSocketUpgrade,
) -> Response {
    let events = state.engine.subscribe();
    ws.on_upgrade(move |socket| serve_stream(socket, events, auth.user_id))
}

async fn serve_stream(
    socket: WebSocket,
    mut events: broadcast::Receiver<AlertEvent>,
    user_id: String,
) {
    debug!(user_id = %user_id, "alert stream connected");
    let (mut sink, mut source) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) if event.user_id() == user_id => {
                    let Ok(text) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                // Another user's event.
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(user_id = %user_id, skipped, "alert stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = source.next() => match message {
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }
    debug!(user_id = %user_id, "alert stream disconnected");
}
