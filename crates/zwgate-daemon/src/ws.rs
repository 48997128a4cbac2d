//! WebSocket event-stream subscribers

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

use crate::fanout::Fanout;
use crate::state::AppState;

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut events) = Fanout::channel();
    let channel = state.fanout.register_events(tx);

    info!(channel = %channel, "WebSocket event subscriber connected");

    loop {
        tokio::select! {
            // Forward event lines to the client
            line = events.recv() => {
                let Some(line) = line else { break };
                if sender.send(Message::Text(line.into())).await.is_err() {
                    break;
                }
            }

            // Handle incoming messages from client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Text(text))) if text.as_str() == "ping" => {
                        if sender.send(Message::Text("pong".into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    state.fanout.unregister_events(channel);
    info!(channel = %channel, "WebSocket event subscriber disconnected");
}
