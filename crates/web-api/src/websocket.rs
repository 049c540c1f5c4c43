//! WebSocket endpoint. Each socket becomes a registered transport; pushes
//! flow out through an unbounded channel, incoming frames are drained and
//! ignored until the client closes.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use application::{ClientTransport, TransportError};
use domain::UserId;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    user_id: Uuid,
}

/// Bridges the shared transport trait onto one axum socket. Sends go
/// through a channel so the trait object never needs the sink itself.
struct WsTransport {
    tx: mpsc::UnboundedSender<WsMessage>,
}

#[async_trait]
impl ClientTransport for WsTransport {
    async fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        let text = String::from_utf8(payload.to_vec())
            .map_err(|err| TransportError::Send(err.to_string()))?;
        self.tx
            .send(WsMessage::Text(text.into()))
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.tx
            .send(WsMessage::Close(None))
            .map_err(|_| TransportError::Closed)
    }
}

pub async fn websocket_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, UserId::from(query.user_id))))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: UserId) {
    let (mut sink, mut incoming) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(frame).await.is_err() {
                break;
            }
        }
    });

    let transport = Arc::new(WsTransport { tx });
    if let Err(err) = state.connection_service.connect(user_id, transport).await {
        tracing::warn!(user_id = %user_id, error = %err, "websocket connect rejected");
        send_task.abort();
        return;
    }

    // Clients publish through the HTTP API; only a close frame matters here.
    while let Some(Ok(frame)) = incoming.next().await {
        if matches!(frame, WsMessage::Close(_)) {
            break;
        }
    }

    state.connection_service.disconnect(user_id).await;
    send_task.abort();
}
