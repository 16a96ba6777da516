pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt, Sink};
use serde::Deserialize;
use std::sync::Arc;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Participant;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Chat identity of the connecting participant
    pub user: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let identity = params
        .user
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());

    let Some(identity) = identity else {
        tracing::warn!("WebSocket connection without user rejected");
        return (StatusCode::BAD_REQUEST, "missing user query parameter").into_response();
    };

    tracing::info!(%identity, "WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, identity, state))
}

/// Handle one participant connection
async fn handle_socket(socket: WebSocket, identity: String, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Every connection is its own delivery address
    let me = Participant {
        identity,
        handle: ulid::Ulid::new().to_string(),
    };

    let welcome = {
        let session = state.session.lock().await;
        ServerMessage::Welcome {
            protocol: "1.0".to_string(),
            identity: me.identity.clone(),
            phase: session.phase(),
            admin: session.admin().cloned(),
            server_now: chrono::Utc::now().to_rfc3339(),
        }
    };
    if send_json(&mut sender, &welcome).await.is_err() {
        tracing::error!("Failed to send welcome message");
        return;
    }

    let mut outbox_rx = state.connect(&me.handle).await;

    loop {
        tokio::select! {
            queued = outbox_rx.recv() => {
                match queued {
                    Some(msg) => {
                        if send_json(&mut sender, &msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let deliveries = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => handlers::handle_message(client_msg, &me, &state).await,
                            Err(e) => {
                                tracing::error!("Failed to parse client message: {}", e);
                                let error = ServerMessage::error(
                                    "PARSE_ERROR",
                                    format!("Invalid message format: {}", e),
                                );
                                let _ = send_json(&mut sender, &error).await;
                                continue;
                            }
                        };

                        let mut closed = false;
                        for delivery in deliveries {
                            if delivery.to == me.handle {
                                if send_json(&mut sender, &delivery.msg).await.is_err() {
                                    closed = true;
                                    break;
                                }
                            } else {
                                state.deliver(delivery).await;
                            }
                        }
                        if closed {
                            tracing::error!("Failed to send response");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    state.disconnect(&me.handle).await;
    tracing::info!(identity = %me.identity, "WebSocket connection closed");
}

async fn send_json<S>(sender: &mut S, msg: &ServerMessage) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            Ok(())
        }
    }
}
