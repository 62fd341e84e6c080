//! `WebSocket` handler for live board updates.
//!
//! Clients connect to `GET /ws`. Each connection opens a
//! [`ClientSession`] that forwards [`topics::BOARD_UPDATED`] and
//! [`topics::GENERATION_ENDED`] from the game's event bus into a bounded
//! per-connection queue; the connection loop drains that queue into text
//! frames. Dropping the session removes its bus subscriptions, so a
//! closed connection stops receiving events.
//!
//! Clients may also send [`ClientCommand`]s. Every command is answered
//! with an `ack` or `error` frame.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde_json::Value;
use tharsis_events::{EventBus, HandlerError, Subscription};
use tharsis_types::{ClientCommand, ConnectionId, PushMessage, client_topics, topics};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::handlers::TurnReport;
use crate::state::AppState;

/// Frames buffered per connection before new events are dropped.
pub const CLIENT_BUFFER: usize = 256;

/// One connected viewer's bus subscriptions.
///
/// Handlers only enqueue; they never wait on the socket. A full queue
/// drops the frame and a closed queue reports
/// [`HandlerError::Disconnected`].
#[derive(Debug)]
pub struct ClientSession {
    id: ConnectionId,
    subscriptions: Vec<Subscription>,
}

impl ClientSession {
    /// Subscribe connection `id` to the viewer topics on `bus`.
    pub fn open(bus: &EventBus, id: ConnectionId, tx: &mpsc::Sender<PushMessage>) -> Self {
        let subscriptions = vec![
            forward(bus, id, topics::BOARD_UPDATED, client_topics::BOARD_UPDATED, tx.clone()),
            forward(bus, id, topics::GENERATION_ENDED, client_topics::NEW_GENERATION, tx.clone()),
        ];
        debug!(connection = %id, "session opened");
        Self { id, subscriptions }
    }

    /// Number of bus subscriptions held.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        for subscription in &self.subscriptions {
            subscription.unsubscribe();
        }
        debug!(connection = %self.id, "session closed, subscriptions released");
    }
}

fn forward(
    bus: &EventBus,
    id: ConnectionId,
    topic: &str,
    client_topic: &'static str,
    tx: mpsc::Sender<PushMessage>,
) -> Subscription {
    bus.subscribe(topic, move |payload| {
        match tx.try_send(PushMessage::new(client_topic, payload.clone())) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_frame)) => {
                warn!(connection = %id, topic = client_topic, "viewer lagging, frame dropped");
                Err(HandlerError::Failed(String::from("viewer queue full")))
            }
            Err(TrySendError::Closed(_frame)) => Err(HandlerError::Disconnected),
        }
    })
}

/// Upgrade an HTTP request to a `WebSocket` connection.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_connect(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Run one connection: forward queued events and answer commands until the
/// client goes away.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let id = ConnectionId::new();
    let (tx, mut rx) = mpsc::channel(CLIENT_BUFFER);
    let session = ClientSession::open(state.game.bus(), id, &tx);
    drop(tx);
    info!(connection = %id, "Viewer connected");

    loop {
        tokio::select! {
            Some(frame) = rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    debug!(connection = %id, "Viewer disconnected (send failed)");
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_command(&state, id, text.as_str()).await;
                        if send_frame(&mut socket, &reply).await.is_err() {
                            debug!(connection = %id, "Viewer disconnected (reply failed)");
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(connection = %id, "Viewer disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(connection = %id, "Viewer disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(connection = %id, "WebSocket error: {e}");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    drop(session);
    info!(connection = %id, "Viewer left");
}

async fn send_frame(socket: &mut WebSocket, frame: &PushMessage) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize frame: {e}");
            return Ok(());
        }
    };
    socket.send(Message::Text(json.into())).await
}

/// Execute one client command and build the reply frame.
pub async fn handle_command(state: &AppState, id: ConnectionId, text: &str) -> PushMessage {
    let command = match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => command,
        Err(e) => {
            debug!(connection = %id, "Unreadable command: {e}");
            return error_frame(&format!("invalid command: {e}"));
        }
    };

    let result = match command {
        ClientCommand::Join { player } => {
            info!(connection = %id, %player, "Viewer joined");
            Ok(serde_json::json!({ "joined": player }))
        }
        ClientCommand::FinishGeneration { player } => state
            .run(move |game| game.finish_generation(&player))
            .await
            .and_then(|board| to_payload(&board)),
        ClientCommand::EndTurn { player } => state
            .run(move |game| game.end_turn(&player))
            .await
            .and_then(|outcome| to_payload(&TurnReport::from(outcome))),
        ClientCommand::Message { data } => {
            debug!(connection = %id, %data, "Viewer message");
            Ok(serde_json::json!({ "data": "Hello from server" }))
        }
    };

    match result {
        Ok(payload) => PushMessage::new(client_topics::ACK, payload),
        Err(e) => {
            debug!(connection = %id, error = %e, "Command failed");
            error_frame(&e.to_string())
        }
    }
}

fn to_payload<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(format!("reply encoding: {e}")))
}

fn error_frame(message: &str) -> PushMessage {
    PushMessage::new(client_topics::ERROR, serde_json::json!({ "error": message }))
}
