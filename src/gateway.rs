//! Outbound side of the transport: push notifications and forced disconnects.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, instrument, warn};

use crate::{ConnectionId, Notification, Tag};

/// Fire-and-forget delivery to connections by id.
///
/// Delivery failures are logged by the implementation and never surface to
/// the caller.
#[async_trait]
pub trait Gateway: Send + Sync + std::fmt::Debug {
    /// Pushes a notification to one connection.
    async fn send(&self, connection_id: &str, notification: &Notification);

    /// Closes a connection's transport session.
    async fn disconnect(&self, connection_id: &str);
}

/// Frames queued for a live socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Push a notification.
    Push(Notification),
    /// Close the socket.
    Close,
}

/// Gateway backed by one channel per live WebSocket.
#[derive(Debug, Default)]
pub struct ChannelGateway {
    connections: Mutex<HashMap<ConnectionId, mpsc::UnboundedSender<Outbound>>>,
}

impl ChannelGateway {
    /// Creates a gateway with no connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns the receiving end of its channel.
    #[instrument(skip(self))]
    pub async fn register(&self, connection_id: &str) -> mpsc::UnboundedReceiver<Outbound> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections
            .lock()
            .await
            .insert(connection_id.to_string(), tx);
        debug!("Connection registered");
        rx
    }

    /// Forgets a connection.
    #[instrument(skip(self))]
    pub async fn unregister(&self, connection_id: &str) {
        self.connections.lock().await.remove(connection_id);
    }

    async fn deliver(&self, connection_id: &str, frame: Outbound) {
        let connections = self.connections.lock().await;
        match connections.get(connection_id) {
            Some(tx) => {
                if tx.send(frame).is_err() {
                    warn!(connection_id, "Connection channel closed");
                }
            }
            None => warn!(connection_id, "Unknown connection"),
        }
    }
}

#[async_trait]
impl Gateway for ChannelGateway {
    #[instrument(skip(self, notification), fields(message = %notification.message()))]
    async fn send(&self, connection_id: &str, notification: &Notification) {
        self.deliver(connection_id, Outbound::Push(notification.clone()))
            .await;
    }

    #[instrument(skip(self))]
    async fn disconnect(&self, connection_id: &str) {
        self.deliver(connection_id, Outbound::Close).await;
        self.unregister(connection_id).await;
    }
}

/// Something the [`RecordingGateway`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// A notification was pushed.
    Sent(ConnectionId, Notification),
    /// A connection was force-closed.
    Disconnected(ConnectionId),
}

/// Gateway that records every call, for tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    events: Mutex<Vec<GatewayEvent>>,
}

impl RecordingGateway {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded event in call order.
    pub async fn events(&self) -> Vec<GatewayEvent> {
        self.events.lock().await.clone()
    }

    /// Notifications pushed to `connection_id`, in order.
    pub async fn sent_to(&self, connection_id: &str) -> Vec<Notification> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| match event {
                GatewayEvent::Sent(id, n) if id == connection_id => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    /// Tags pushed to `connection_id`, in order.
    pub async fn tags_for(&self, connection_id: &str) -> Vec<Tag> {
        self.sent_to(connection_id)
            .await
            .into_iter()
            .map(|n| *n.message())
            .collect()
    }

    /// Connections that were force-closed, in order.
    pub async fn disconnected(&self) -> Vec<ConnectionId> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| match event {
                GatewayEvent::Disconnected(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Drops everything recorded so far.
    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}

#[async_trait]
impl Gateway for RecordingGateway {
    async fn send(&self, connection_id: &str, notification: &Notification) {
        self.events.lock().await.push(GatewayEvent::Sent(
            connection_id.to_string(),
            notification.clone(),
        ));
    }

    async fn disconnect(&self, connection_id: &str) {
        self.events
            .lock()
            .await
            .push(GatewayEvent::Disconnected(connection_id.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_gateway_routes_by_connection() {
        let gateway = ChannelGateway::new();
        let mut alice = gateway.register("alice").await;
        let mut bob = gateway.register("bob").await;

        gateway
            .send("alice", &Notification::new(Tag::PleaseWait))
            .await;
        gateway.disconnect("bob").await;

        assert_eq!(
            alice.recv().await,
            Some(Outbound::Push(Notification::new(Tag::PleaseWait)))
        );
        assert_eq!(bob.recv().await, Some(Outbound::Close));
        // Unregistered on disconnect, so the sender is gone.
        assert_eq!(bob.recv().await, None);
    }

    #[tokio::test]
    async fn sending_to_unknown_connection_is_silent() {
        let gateway = ChannelGateway::new();
        gateway
            .send("ghost", &Notification::new(Tag::YouWin))
            .await;
        gateway.disconnect("ghost").await;
    }
}
