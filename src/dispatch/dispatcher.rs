//! Inbound message dispatcher
//!
//! Decodes client frames, routes each intent to the membership manager and
//! turns domain failures into an `error` event for the sender. Malformed
//! frames and unknown message types are dropped without a reply.

use crate::connection::registry::OutboundSender;
use crate::error::{LobbyError, LobbyResult};
use crate::metrics::MetricsCollector;
use crate::session::{LobbySettings, MembershipManager};
use crate::types::{ClientMessage, ConnectionId, ServerMessage};
use crate::utils::normalize_session_code;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// What happened to one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The intent was applied
    Handled,
    /// The intent was refused and the sender was sent an `error` event
    Rejected(LobbyError),
    /// Valid JSON with an unrecognized `type`
    Ignored,
    /// Not a decodable client message
    Malformed,
}

/// Routes decoded client intents to the membership manager
pub struct MessageDispatcher {
    membership: MembershipManager,
    metrics: Arc<MetricsCollector>,
}

impl MessageDispatcher {
    pub fn new(settings: LobbySettings, metrics: Arc<MetricsCollector>) -> Self {
        let membership = MembershipManager::new(settings, metrics.clone());
        Self::with_membership(membership, metrics)
    }

    pub fn with_membership(membership: MembershipManager, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            membership,
            metrics,
        }
    }

    pub fn membership(&self) -> &MembershipManager {
        &self.membership
    }

    pub fn on_connect(
        &mut self,
        sender: OutboundSender,
        remote_addr: Option<SocketAddr>,
    ) -> ConnectionId {
        self.membership.register_connection(sender, remote_addr)
    }

    pub fn on_disconnect(&mut self, connection: ConnectionId) {
        self.membership.handle_disconnection(connection);
    }

    /// Decode and apply one inbound text frame
    pub fn on_text(&mut self, connection: ConnectionId, text: &str) -> DispatchOutcome {
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    connection_id = %connection,
                    bytes = text.len(),
                    "Dropping malformed message: {}",
                    e
                );
                self.metrics.record_decode_failure();
                return DispatchOutcome::Malformed;
            }
        };

        if message == ClientMessage::Unknown {
            debug!(connection_id = %connection, "Ignoring message with unknown type");
            self.metrics.record_ignored_message();
            return DispatchOutcome::Ignored;
        }

        let message_type = message.type_name();
        let timer = self.metrics.start_timer();
        let result = self.dispatch(connection, message);
        self.metrics
            .record_message(message_type, result.is_ok(), timer.stop());

        match result {
            Ok(()) => DispatchOutcome::Handled,
            Err(e) => {
                debug!(
                    connection_id = %connection,
                    message_type,
                    error_kind = e.kind(),
                    "Request rejected: {}",
                    e
                );
                self.membership
                    .notify_player(connection, &ServerMessage::error(e.to_string()));
                DispatchOutcome::Rejected(e)
            }
        }
    }

    /// Apply a decoded intent on behalf of `connection`
    pub fn dispatch(&mut self, connection: ConnectionId, message: ClientMessage) -> LobbyResult<()> {
        match message {
            ClientMessage::CreateSession(request) => {
                self.leave_current_session(connection);
                self.membership
                    .create_session(&request.player_name, connection)?;
            }
            ClientMessage::JoinSession(request) => {
                let code = normalize_session_code(&request.session_code);
                let current = self.membership.connections().session_of(connection);
                if current.as_deref() != Some(code.as_str()) {
                    // a rejected join keeps the current seat
                    self.membership
                        .can_join(&code, &request.player_name, connection)?;
                    self.leave_current_session(connection);
                }
                self.membership
                    .join_session(&code, &request.player_name, connection)?;
            }
            ClientMessage::JoinTeam(request) => {
                self.membership.assign_team(
                    &request.session_code,
                    &request.player_name,
                    &request.team,
                )?;
            }
            ClientMessage::StartGame(request) => {
                self.membership.start_game(&request.session_code, connection)?;
            }
            ClientMessage::EndGame(request) => {
                self.membership.end_game(&request.session_code, connection)?;
            }
            ClientMessage::LeaveSession(request) => {
                self.membership
                    .leave_session(&request.session_code, connection)?;
            }
            ClientMessage::Unknown => {}
        }
        Ok(())
    }

    fn leave_current_session(&mut self, connection: ConnectionId) {
        let Some(code) = self.membership.connections().session_of(connection) else {
            return;
        };

        debug!(
            connection_id = %connection,
            session_code = %code,
            "Leaving previous session"
        );
        if let Err(e) = self.membership.leave_session(&code, connection) {
            warn!(
                connection_id = %connection,
                session_code = %code,
                "Failed to leave previous session: {}",
                e
            );
        }
    }
}
