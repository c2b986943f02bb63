//! WebSocket upgrade handler for real-time enrollment updates.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection
//! lifecycle: join the user's room, forward broadcasts, respond to
//! pings, clean up on disconnect.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use crate::domain::foundation::{Timestamp, UserId};

use super::{
    messages::{ClientMessage, ConnectedMessage, EnrollmentUpdate, PongMessage, ServerMessage},
    rooms::{ClientId, RoomManager},
};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    /// Room manager for user-scoped routing.
    pub room_manager: Arc<RoomManager>,
}

impl WebSocketState {
    pub fn new(room_manager: Arc<RoomManager>) -> Self {
        Self { room_manager }
    }
}

/// Handle WebSocket upgrade requests for a user's enrollment feed.
///
/// Route: `GET /users/:user_id/live`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(user_id): Path<String>,
    State(state): State<WebSocketState>,
) -> Response {
    let user_id = match UserId::new(user_id) {
        Ok(id) => id,
        Err(_) => {
            return Response::builder()
                .status(400)
                .body("Invalid user ID".into())
                .unwrap();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

/// Handle an established WebSocket connection.
///
/// Runs for the lifetime of the connection: joins the user room,
/// forwards room broadcasts to the client, answers pings, and leaves
/// the room on disconnect.
async fn handle_socket(socket: WebSocket, user_id: UserId, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();

    let client_id = ClientId::new();

    let mut room_rx: broadcast::Receiver<EnrollmentUpdate> =
        state.room_manager.join(&user_id, client_id.clone()).await;

    let connected = ServerMessage::Connected(ConnectedMessage {
        user_id: user_id.to_string(),
        client_id: client_id.to_string(),
        timestamp: Timestamp::now().as_datetime().to_rfc3339(),
    });

    if let Err(e) = send_message(&mut sender, &connected).await {
        tracing::debug!("Failed to send connected message: {}", e);
        return;
    }

    let (pong_tx, mut pong_rx) = tokio::sync::mpsc::channel::<()>(8);

    // Forward room broadcasts and pong replies to the client
    let mut send_task = {
        let client_id_clone = client_id.clone();
        tokio::spawn(async move {
            loop {
                let msg = tokio::select! {
                    update = room_rx.recv() => match update {
                        Ok(update) => update.to_server_message(),
                        Err(_) => break,
                    },
                    pong = pong_rx.recv() => match pong {
                        Some(()) => ServerMessage::Pong(PongMessage {
                            timestamp: Timestamp::now().as_datetime().to_rfc3339(),
                        }),
                        None => break,
                    },
                };
                if let Err(e) = send_message(&mut sender, &msg).await {
                    tracing::debug!(
                        client_id = %client_id_clone,
                        "Send error, closing connection: {}",
                        e
                    );
                    break;
                }
            }
        })
    };

    // Handle incoming messages from the client
    let room_manager = state.room_manager.clone();
    let client_id_for_recv = client_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    if let Ok(ClientMessage::Ping) = serde_json::from_str::<ClientMessage>(&text) {
                        let _ = pong_tx.send(()).await;
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::warn!(
                        client_id = %client_id_for_recv,
                        "Received unsupported binary message"
                    );
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Protocol-level frames handled by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(
                        client_id = %client_id_for_recv,
                        "Client sent close frame"
                    );
                    break;
                }
                Err(e) => {
                    tracing::debug!(
                        client_id = %client_id_for_recv,
                        "Receive error: {}",
                        e
                    );
                    break;
                }
            }
        }

        room_manager
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        result = &mut recv_task => {
            send_task.abort();
            if let Ok(room_manager) = result {
                room_manager.leave(&client_id).await;
            }
            return;
        }
    }

    state.room_manager.leave(&client_id).await;
}

/// Send a JSON message over the WebSocket.
async fn send_message(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).expect("ServerMessage serialization should not fail");
    sender.send(Message::Text(json)).await
}

/// Create axum router for the WebSocket endpoint.
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/users/:user_id/live", get(ws_handler))
}
