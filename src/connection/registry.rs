//! Registry of live connections and their lobby state

use crate::types::{ConnectionId, SessionCode};
use crate::utils::{current_timestamp, generate_connection_id};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Outbound half of a connection: serialized text frames
pub type OutboundSender = mpsc::UnboundedSender<String>;

/// Where a connection currently stands in the lobby flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected but not a member of any session
    Unaffiliated,
    /// Member of a session that has not started
    InLobby(SessionCode),
    /// Member of a session whose game has started
    InGame(SessionCode),
    /// Transport closed (terminal)
    Disconnected,
}

impl ConnectionState {
    /// Session the connection belongs to, if any
    pub fn session_code(&self) -> Option<&str> {
        match self {
            ConnectionState::InLobby(code) | ConnectionState::InGame(code) => Some(code),
            ConnectionState::Unaffiliated | ConnectionState::Disconnected => None,
        }
    }
}

/// A live connection as seen by the lobby
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: OutboundSender,
    state: ConnectionState,
    connected_at: DateTime<Utc>,
    remote_addr: Option<SocketAddr>,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Whether the transport side is still draining this channel
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queue a frame for delivery; never blocks
    pub fn send(&self, payload: String) -> bool {
        self.sender.send(payload).is_ok()
    }
}

/// Tracks live connection handles and the id -> session membership index
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection and return its id
    pub fn register(
        &mut self,
        sender: OutboundSender,
        remote_addr: Option<SocketAddr>,
    ) -> ConnectionId {
        let id = generate_connection_id();
        let handle = ConnectionHandle {
            id,
            sender,
            state: ConnectionState::Unaffiliated,
            connected_at: current_timestamp(),
            remote_addr,
        };
        self.connections.insert(id, handle);

        info!(
            connection_id = %id,
            remote = ?remote_addr,
            active = self.connections.len(),
            "Connection registered"
        );
        id
    }

    /// Drop a connection; the returned handle is in the `Disconnected` state
    pub fn unregister(&mut self, id: ConnectionId) -> Option<ConnectionHandle> {
        let mut handle = self.connections.remove(&id)?;
        handle.state = ConnectionState::Disconnected;

        info!(
            connection_id = %id,
            active = self.connections.len(),
            "Connection unregistered"
        );
        Some(handle)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&ConnectionHandle> {
        self.connections.get(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// State of a connection; unknown ids are reported as disconnected
    pub fn state(&self, id: ConnectionId) -> ConnectionState {
        self.connections
            .get(&id)
            .map(|handle| handle.state.clone())
            .unwrap_or(ConnectionState::Disconnected)
    }

    /// Session a connection is affiliated with
    pub fn session_of(&self, id: ConnectionId) -> Option<SessionCode> {
        self.connections
            .get(&id)
            .and_then(|handle| handle.state.session_code().map(str::to_string))
    }

    pub fn set_state(&mut self, id: ConnectionId, state: ConnectionState) {
        if let Some(handle) = self.connections.get_mut(&id) {
            debug!(connection_id = %id, from = ?handle.state, to = ?state, "Connection state change");
            handle.state = state;
        }
    }

    /// Send a frame to one connection; false if unknown or closed
    pub fn send(&self, id: ConnectionId, payload: String) -> bool {
        match self.connections.get(&id) {
            Some(handle) if handle.is_open() => handle.send(payload),
            _ => false,
        }
    }

    pub fn is_open(&self, id: ConnectionId) -> bool {
        self.connections
            .get(&id)
            .map(ConnectionHandle::is_open)
            .unwrap_or(false)
    }

    pub fn ids(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
