//! Transport-facing message handler interface

use crate::connection::registry::OutboundSender;
use crate::types::ConnectionId;
use async_trait::async_trait;
use std::net::SocketAddr;

/// Trait defining the interface between a transport and the lobby
///
/// A transport calls `on_connect` once per accepted connection, `on_text` for
/// every inbound text frame in arrival order, and `on_disconnect` exactly once
/// when the connection closes.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Register a new connection and return its id
    async fn on_connect(
        &self,
        sender: OutboundSender,
        remote_addr: Option<SocketAddr>,
    ) -> ConnectionId;

    /// Handle one inbound text frame
    async fn on_text(&self, connection: ConnectionId, text: String);

    /// Handle transport close
    async fn on_disconnect(&self, connection: ConnectionId);
}
