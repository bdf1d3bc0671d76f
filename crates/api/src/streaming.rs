//! WebSocket streaming API.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use foodtrack_common::{AppError, AppResult};
use foodtrack_core::{ConnectionRegistry, RealtimeMessage};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::middleware::AppState;

/// Streaming query parameters.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Bearer token; browsers cannot set headers on an upgrade.
    pub token: Option<String>,
}

/// Messages a client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Ping,
}

/// Streaming WebSocket handler.
///
/// The token is checked before the upgrade, so a bad token answers 401
/// without opening a socket.
pub async fn streaming_handler(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let user_id = match authenticate(&state, query.token.as_deref()) {
        Ok(user_id) => user_id,
        Err(e) => return e.into_response(),
    };

    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, user_id, state)),
        Err(rejection) => rejection.into_response(),
    }
}

fn authenticate(state: &AppState, token: Option<&str>) -> AppResult<i64> {
    let token = token.ok_or(AppError::Unauthorized)?;
    state.token_verifier.verify(token)
}

async fn handle_socket(socket: WebSocket, user_id: i64, state: AppState) {
    let (sender, receiver) = socket.split();
    run_session(sender, receiver, user_id, &state.registry).await;
}

/// Pump one client session until either side goes away.
///
/// Registers the client for fan-out on entry and always unregisters on exit.
async fn run_session<S, R, E>(
    mut sender: S,
    mut receiver: R,
    user_id: i64,
    registry: &ConnectionRegistry,
) where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let connection = registry.register(user_id, tx).await;
    info!(user_id, connection = %connection, "Streaming connection established");

    loop {
        tokio::select! {
            // Registry fan-out
            outgoing = rx.recv() => {
                let Some(text) = outgoing else { break };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }

            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Ping) => {
                                let Ok(json) = serde_json::to_string(&RealtimeMessage::Pong) else {
                                    continue;
                                };
                                if sender.send(Message::Text(json.into())).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                debug!(user_id, error = %e, "Ignoring client message");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(user_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }
        }
    }

    registry.unregister(user_id, connection).await;
    info!(user_id, connection = %connection, "Streaming connection closed");
}
