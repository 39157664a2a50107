//! WebSocket surface for live availability and holds.
//!
//! Each connection is one holder: a fresh [`HolderId`] is generated on
//! upgrade and announced in a `welcome` message. When the connection closes,
//! every hold of that holder is released.
//!
//! # Architecture
//!
//! ```text
//! Client            Session               Coordinator
//!   │                  │                       │
//!   ├─ subscribe ─────>├─ subscribe(unit) ────>│
//!   │<─ availability ──┤                       │
//!   ├─ hold ──────────>├─ request_hold ───────>│
//!   │<─ hold_result ───┤                       │
//!   │<─ availability ──┤<── push ──────────────┤
//!   ├─ close ─────────>├─ disconnect(holder) ─>│
//! ```
//!
//! # Message Protocol
//!
//! **Client → Server:**
//! ```json
//! {"type": "subscribe", "unit": {"event_id": "..."}}
//! {"type": "unsubscribe", "unit": {"event_id": "..."}}
//! {"type": "hold", "unit": {"event_id": "...", "category_id": "..."}, "quantity": 2}
//! {"type": "release", "unit": {"event_id": "..."}}
//! {"type": "ping"}
//! ```
//!
//! **Server → Client:**
//! ```json
//! {"type": "welcome", "holder_id": "..."}
//! {"type": "availability", "snapshot": {"unit_id": {...}, "available": 4, ...}}
//! {"type": "hold_result", "outcome": {"status": "held", ...}}
//! {"type": "released", "unit": {...}, "released": true}
//! {"type": "error", "message": "..."}
//! {"type": "pong"}
//! ```
//!
//! Pushed availability is holder-agnostic; a holder's own seats are reported
//! through `hold_result`.

use crate::state::AppState;
use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use seat_inventory_core::{AvailabilitySnapshot, HoldOutcome, HolderId, UnitId};
use seat_inventory_runtime::{AvailabilitySubscription, ReservationCoordinator};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, mpsc, oneshot};
use tracing::{debug, info, warn};

/// Outbound queue per connection.
const OUTBOUND_BUFFER: usize = 64;

/// Message from the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start receiving availability for `unit`
    Subscribe {
        /// Unit to follow
        unit: UnitId,
    },
    /// Stop receiving availability for `unit`
    Unsubscribe {
        /// Unit to stop following
        unit: UnitId,
    },
    /// Place or refresh this connection's hold on `unit`
    Hold {
        /// Unit to hold
        unit: UnitId,
        /// Seats wanted
        quantity: u32,
    },
    /// Release this connection's hold on `unit`
    Release {
        /// Unit to release
        unit: UnitId,
    },
    /// Keep-alive
    Ping,
}

/// Message to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once after the upgrade
    Welcome {
        /// Holder id of this connection
        holder_id: HolderId,
    },
    /// Current availability of a followed unit
    Availability {
        /// The snapshot
        snapshot: AvailabilitySnapshot,
    },
    /// Answer to `hold`
    HoldResult {
        /// Held or capacity exceeded
        outcome: HoldOutcome,
    },
    /// Answer to `release`
    Released {
        /// Unit released
        unit: UnitId,
        /// Whether a hold existed
        released: bool,
    },
    /// The last client message could not be processed
    Error {
        /// Error description
        message: String,
    },
    /// Answer to `ping`
    Pong,
}

/// Upgrade to a WebSocket session.
#[allow(clippy::unused_async)] // Axum handler signature requires async
pub async fn handle(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_socket(socket, state.coordinator))
}

async fn run_socket(socket: WebSocket, coordinator: Arc<ReservationCoordinator>) {
    let (mut sink, mut stream) = socket.split();
    let (outbound, mut queue) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);
    let mut session = Session::new(coordinator, outbound);
    info!(holder_id = %session.holder_id(), "WebSocket connection established");

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = queue.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize WebSocket message");
                    continue;
                },
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        debug!("WebSocket send task terminated");
    });

    session.greet().await;

    loop {
        tokio::select! {
            _ = &mut send_task => break,
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => session.handle_text(&text).await,
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {},
            },
        }
    }

    session.close().await;
    send_task.abort();
}

/// State of one WebSocket connection.
///
/// Socket-independent so that the protocol can be driven directly.
pub struct Session {
    holder_id: HolderId,
    coordinator: Arc<ReservationCoordinator>,
    outbound: mpsc::Sender<ServerMessage>,
    /// Cancels the forwarding task of each followed unit
    subscriptions: HashMap<UnitId, oneshot::Sender<()>>,
}

impl Session {
    /// Start a session with a freshly generated holder id.
    #[must_use]
    pub fn new(
        coordinator: Arc<ReservationCoordinator>,
        outbound: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            holder_id: HolderId::generate(),
            coordinator,
            outbound,
            subscriptions: HashMap::new(),
        }
    }

    /// Holder id of this connection.
    #[must_use]
    pub const fn holder_id(&self) -> &HolderId {
        &self.holder_id
    }

    /// Units this connection follows.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Announce the holder id.
    pub async fn greet(&self) {
        self.send(ServerMessage::Welcome {
            holder_id: self.holder_id.clone(),
        })
        .await;
    }

    /// Parse and handle one text frame.
    pub async fn handle_text(&mut self, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.handle(message).await,
            Err(e) => {
                debug!(holder_id = %self.holder_id, error = %e, "Malformed WebSocket message");
                self.send(ServerMessage::Error {
                    message: format!("invalid message: {e}"),
                })
                .await;
            },
        }
    }

    /// Handle one client message.
    pub async fn handle(&mut self, message: ClientMessage) {
        match message {
            ClientMessage::Subscribe { unit } => self.subscribe(unit).await,
            ClientMessage::Unsubscribe { unit } => {
                // Dropping the sender stops the forwarder, which unsubscribes.
                self.subscriptions.remove(&unit);
            },
            ClientMessage::Hold { unit, quantity } => {
                let reply = match self
                    .coordinator
                    .request_hold(unit, self.holder_id.clone(), quantity)
                    .await
                {
                    Ok(outcome) => ServerMessage::HoldResult { outcome },
                    Err(e) => ServerMessage::Error {
                        message: e.to_string(),
                    },
                };
                self.send(reply).await;
            },
            ClientMessage::Release { unit } => {
                let released = self.coordinator.release_hold(unit, &self.holder_id).await;
                self.send(ServerMessage::Released { unit, released }).await;
            },
            ClientMessage::Ping => self.send(ServerMessage::Pong).await,
        }
    }

    /// Stop every forwarder and release this holder's holds.
    pub async fn close(mut self) {
        self.subscriptions.clear();
        let released = self.coordinator.disconnect(&self.holder_id).await;
        info!(holder_id = %self.holder_id, released, "WebSocket connection closed");
    }

    async fn subscribe(&mut self, unit: UnitId) {
        if self.subscriptions.contains_key(&unit) {
            return;
        }

        // Subscribe before reading so no change between the two is missed.
        let subscription = self.coordinator.subscribe(unit).await;
        match self.coordinator.availability(unit, None).await {
            Ok(snapshot) => self.send(ServerMessage::Availability { snapshot }).await,
            Err(e) => {
                self.coordinator.unsubscribe(subscription).await;
                self.send(ServerMessage::Error {
                    message: e.to_string(),
                })
                .await;
                return;
            },
        }

        let (cancel, cancelled) = oneshot::channel();
        self.subscriptions.insert(unit, cancel);
        tokio::spawn(forward(
            Arc::clone(&self.coordinator),
            subscription,
            self.outbound.clone(),
            cancelled,
        ));
    }

    async fn send(&self, message: ServerMessage) {
        if self.outbound.send(message).await.is_err() {
            debug!(holder_id = %self.holder_id, "Outbound queue closed");
        }
    }
}

/// Relay pushes for one unit until cancelled or the connection goes away.
async fn forward(
    coordinator: Arc<ReservationCoordinator>,
    mut subscription: AvailabilitySubscription,
    outbound: mpsc::Sender<ServerMessage>,
    mut cancelled: oneshot::Receiver<()>,
) {
    let unit_id = subscription.unit_id();
    loop {
        let snapshot = tokio::select! {
            _ = &mut cancelled => break,
            received = subscription.recv() => match received {
                Ok(snapshot) => snapshot,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(%unit_id, skipped, "Subscriber lagged, sending a fresh snapshot");
                    match coordinator.availability(unit_id, None).await {
                        Ok(snapshot) => snapshot,
                        Err(e) => {
                            warn!(%unit_id, error = %e, "Could not refresh lagged subscriber");
                            continue;
                        },
                    }
                },
                Err(RecvError::Closed) => break,
            },
        };

        if outbound
            .send(ServerMessage::Availability { snapshot })
            .await
            .is_err()
        {
            break;
        }
    }

    coordinator.unsubscribe(subscription).await;
}
