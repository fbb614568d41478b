//! Live location channel.
//!
//! Tracks WebSocket connections and their per-vehicle subscriptions, and
//! fans location updates out to every connection subscribed to the vehicle.
//! Delivery goes through an unbounded per-connection queue so a slow
//! consumer never stalls the publisher or its sibling connections.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use domain::models::{ServerMessage, VehicleLocationUpdate, SERVER_SHUTDOWN_CLOSE_CODE};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::middleware::metrics::{record_events_published, set_live_connections};

/// Frame queued for a connection's writer task.
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    /// A protocol message to serialize and send.
    Message(ServerMessage),
    /// Instruct the writer to close the socket with this code.
    Close(u16),
}

struct ConnectionEntry {
    tx: mpsc::UnboundedSender<OutboundFrame>,
    vehicles: HashSet<Uuid>,
}

/// Registry of live connections and subscriptions.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct LiveChannel {
    connections: Arc<RwLock<HashMap<Uuid, ConnectionEntry>>>,
}

impl Default for LiveChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveChannel {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a new connection with no subscriptions.
    ///
    /// Returns the connection id and the receiving end of its outbound
    /// queue; the caller owns draining it into the socket.
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<OutboundFrame>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut connections = self.connections.write().await;
        connections.insert(
            conn_id,
            ConnectionEntry {
                tx,
                vehicles: HashSet::new(),
            },
        );
        set_live_connections(connections.len());
        tracing::info!(connection_id = %conn_id, "Live channel connection registered");

        (conn_id, rx)
    }

    /// Queue a message for one connection.
    ///
    /// Returns false when the connection is gone or its writer has hung up.
    pub async fn send(&self, conn_id: Uuid, message: ServerMessage) -> bool {
        let connections = self.connections.read().await;
        match connections.get(&conn_id) {
            Some(entry) => entry.tx.send(OutboundFrame::Message(message)).is_ok(),
            None => false,
        }
    }

    /// Subscribe a connection to a vehicle. Idempotent.
    pub async fn subscribe(&self, conn_id: Uuid, vehicle_id: Uuid) {
        let mut connections = self.connections.write().await;
        if let Some(entry) = connections.get_mut(&conn_id) {
            entry.vehicles.insert(vehicle_id);
        }
    }

    /// Unsubscribe a connection from a vehicle. Unknown subscriptions are
    /// a no-op.
    pub async fn unsubscribe(&self, conn_id: Uuid, vehicle_id: Uuid) {
        let mut connections = self.connections.write().await;
        if let Some(entry) = connections.get_mut(&conn_id) {
            entry.vehicles.remove(&vehicle_id);
        }
    }

    /// Fan a location update out to every connection subscribed to its
    /// vehicle. Returns the number of connections the update was queued for.
    pub async fn publish(&self, update: VehicleLocationUpdate) -> usize {
        let connections = self.connections.read().await;
        let mut delivered = 0;

        for (conn_id, entry) in connections.iter() {
            if !entry.vehicles.contains(&update.vehicle_id) {
                continue;
            }
            let message = ServerMessage::VehicleLocationReceived(update.clone());
            if entry.tx.send(OutboundFrame::Message(message)).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(
                    connection_id = %conn_id,
                    "Skipping publish to connection with closed queue"
                );
            }
        }

        record_events_published(delivered);
        delivered
    }

    /// Remove a connection and all its subscriptions.
    pub async fn close(&self, conn_id: Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(&conn_id).is_some() {
            tracing::info!(connection_id = %conn_id, "Live channel connection closed");
        }
        set_live_connections(connections.len());
    }

    /// Broadcast a shutdown close frame to every connection and drop them
    /// all from the registry.
    pub async fn shutdown(&self) {
        let mut connections = self.connections.write().await;
        let count = connections.len();
        for (_, entry) in connections.drain() {
            let _ = entry.tx.send(OutboundFrame::Close(SERVER_SHUTDOWN_CLOSE_CODE));
        }
        set_live_connections(0);
        tracing::info!(connections = count, "Live channel shut down");
    }

    /// Number of currently registered connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    #[cfg(test)]
    async fn subscription_count(&self, conn_id: Uuid) -> usize {
        self.connections
            .read()
            .await
            .get(&conn_id)
            .map(|e| e.vehicles.len())
            .unwrap_or(0)
    }
}
