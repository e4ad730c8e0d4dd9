//! Broadcast router for session, unicast and global events

use crate::connection::ConnectionRegistry;
use crate::metrics::MetricsCollector;
use crate::session::instance::Session;
use crate::types::{ConnectionId, ServerMessage};
use tracing::{debug, error};

/// Routes serialized events to live connections
///
/// Closed connections are skipped. A closed channel found here is not treated
/// as a disconnect; the transport reports that on its own.
pub struct BroadcastRouter<'a> {
    connections: &'a ConnectionRegistry,
    metrics: &'a MetricsCollector,
}

impl<'a> BroadcastRouter<'a> {
    pub fn new(connections: &'a ConnectionRegistry, metrics: &'a MetricsCollector) -> Self {
        Self {
            connections,
            metrics,
        }
    }

    /// Build a roster update from the session's current state
    pub fn roster_update(session: &Session) -> ServerMessage {
        ServerMessage::UpdateLobby {
            players: session.roster(),
        }
    }

    /// Send an event to every open connection seated in the session
    pub fn notify_session(&self, session: &Session, event: &ServerMessage) -> usize {
        let Some(payload) = Self::encode(event) else {
            return 0;
        };

        let delivered = self.deliver(session.connections(), &payload, event);
        debug!(
            session_code = %session.code(),
            event = event.type_name(),
            delivered,
            members = session.player_count(),
            "Session broadcast"
        );
        delivered
    }

    /// Send an event to a single connection
    pub fn notify_player(&self, connection: ConnectionId, event: &ServerMessage) -> bool {
        let Some(payload) = Self::encode(event) else {
            return false;
        };

        self.deliver(std::iter::once(connection), &payload, event) == 1
    }

    /// Send an event to every registered connection
    pub fn notify_all(&self, event: &ServerMessage) -> usize {
        let Some(payload) = Self::encode(event) else {
            return 0;
        };

        let delivered = self.deliver(self.connections.ids(), &payload, event);
        debug!(
            event = event.type_name(),
            delivered,
            connections = self.connections.len(),
            "Global broadcast"
        );
        delivered
    }

    fn deliver(
        &self,
        recipients: impl Iterator<Item = ConnectionId>,
        payload: &str,
        event: &ServerMessage,
    ) -> usize {
        let mut delivered = 0;
        let mut skipped = 0;

        for connection in recipients {
            if self.connections.send(connection, payload.to_string()) {
                delivered += 1;
            } else {
                skipped += 1;
                debug!(
                    connection_id = %connection,
                    event = event.type_name(),
                    "Skipping closed connection"
                );
            }
        }

        self.metrics
            .record_delivery(event.type_name(), delivered, skipped);
        delivered
    }

    fn encode(event: &ServerMessage) -> Option<String> {
        match serde_json::to_string(event) {
            Ok(payload) => Some(payload),
            Err(e) => {
                error!(event = event.type_name(), "Failed to serialize event: {}", e);
                None
            }
        }
    }
}
