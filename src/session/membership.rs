//! Membership manager for session rosters and host authority
//!
//! This module applies every roster mutation (join, leave, disconnect, team
//! selection, start and end of a game), keeps the connection state machine in
//! step with it, and triggers the resulting broadcasts.

use crate::broadcast::BroadcastRouter;
use crate::connection::registry::OutboundSender;
use crate::connection::{ConnectionRegistry, ConnectionState};
use crate::error::{LobbyError, LobbyResult};
use crate::metrics::MetricsCollector;
use crate::session::instance::{Departure, Player};
use crate::session::store::{SessionStore, DEFAULT_MAX_CODE_ATTEMPTS};
use crate::types::{BroadcastScope, ConnectionId, RosterEntry, ServerMessage, SessionCode};
use crate::utils::normalize_session_code;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// Behaviour switches for the lobby
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbySettings {
    /// Recipients of the roster update sent when a session is created
    pub broadcast_scope: BroadcastScope,
    /// Send the legacy `playerJoined` event to the host on every join
    pub notify_owner_on_join: bool,
    /// Candidate codes tried before giving up on a creation
    pub max_code_attempts: usize,
}

impl Default for LobbySettings {
    fn default() -> Self {
        Self {
            broadcast_scope: BroadcastScope::Session,
            notify_owner_on_join: true,
            max_code_attempts: DEFAULT_MAX_CODE_ATTEMPTS,
        }
    }
}

/// Statistics about membership operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MembershipStats {
    /// Total sessions created
    pub sessions_created: u64,
    /// Total sessions deleted (emptied or ended)
    pub sessions_deleted: u64,
    /// Total successful joins
    pub players_joined: u64,
    /// Total players removed by leave or disconnect
    pub players_left: u64,
    /// Total games started
    pub games_started: u64,
    /// Total games ended
    pub games_ended: u64,
    /// Current number of live sessions
    pub active_sessions: usize,
    /// Current number of seated players
    pub active_players: usize,
    /// Current number of registered connections
    pub active_connections: usize,
}

/// Owns the session store and connection registry and mutates both together
pub struct MembershipManager {
    store: SessionStore,
    connections: ConnectionRegistry,
    settings: LobbySettings,
    metrics: Arc<MetricsCollector>,
    stats: MembershipStats,
}

impl MembershipManager {
    pub fn new(settings: LobbySettings, metrics: Arc<MetricsCollector>) -> Self {
        let store = SessionStore::with_generator(
            Box::new(crate::session::store::RandomCodeGenerator),
            settings.max_code_attempts,
        );
        Self::with_store(store, settings, metrics)
    }

    /// Create a manager around a pre-built store (custom code source)
    pub fn with_store(
        store: SessionStore,
        settings: LobbySettings,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            store,
            connections: ConnectionRegistry::new(),
            settings,
            metrics,
            stats: MembershipStats::default(),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    pub fn settings(&self) -> &LobbySettings {
        &self.settings
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Snapshot of counters plus the live gauges
    pub fn stats(&self) -> MembershipStats {
        MembershipStats {
            active_sessions: self.store.len(),
            active_players: self.store.player_count(),
            active_connections: self.connections.len(),
            ..self.stats.clone()
        }
    }

    fn router(&self) -> BroadcastRouter<'_> {
        BroadcastRouter::new(&self.connections, &self.metrics)
    }

    /// Track a freshly opened transport channel
    pub fn register_connection(
        &mut self,
        sender: OutboundSender,
        remote_addr: Option<SocketAddr>,
    ) -> ConnectionId {
        let id = self.connections.register(sender, remote_addr);
        self.metrics.record_connection_opened();
        id
    }

    /// Send a single event to one connection
    pub fn notify_player(&self, connection: ConnectionId, event: &ServerMessage) -> bool {
        self.router().notify_player(connection, event)
    }

    /// Create a session hosted by `connection`
    ///
    /// Replies `sessionCreated` to the host, then sends the roster according
    /// to the configured broadcast scope.
    pub fn create_session(
        &mut self,
        player_name: &str,
        connection: ConnectionId,
    ) -> LobbyResult<SessionCode> {
        let collisions_before = self.store.code_collisions();
        let result = self.store.create_session(player_name, connection);
        let collisions = self.store.code_collisions() - collisions_before;
        if collisions > 0 {
            self.metrics.record_code_collisions(collisions);
        }
        let code = result?;

        self.connections
            .set_state(connection, ConnectionState::InLobby(code.clone()));
        self.stats.sessions_created += 1;
        self.metrics.record_session_created();

        let session = self.store.get_session(&code)?;
        let router = self.router();
        router.notify_player(
            connection,
            &ServerMessage::SessionCreated {
                session_code: code.clone(),
            },
        );

        let update = BroadcastRouter::roster_update(session);
        match self.settings.broadcast_scope {
            BroadcastScope::Session => router.notify_session(session, &update),
            BroadcastScope::Global => router.notify_all(&update),
        };

        Ok(code)
    }

    /// Check a join without applying it
    pub fn can_join(
        &self,
        code: &str,
        player_name: &str,
        connection: ConnectionId,
    ) -> LobbyResult<()> {
        let session = self.store.get_session(&normalize_session_code(code))?;

        if player_name.is_empty() {
            return Err(LobbyError::validation("Name field cannot be empty"));
        }
        if session.is_started() {
            return Err(LobbyError::validation("Game already started"));
        }
        if session.contains(connection) {
            return Err(LobbyError::validation("Already in this session"));
        }
        Ok(())
    }

    /// Seat `connection` in an existing session
    ///
    /// Replies `sessionJoined` to the joiner, optionally tells the host, and
    /// broadcasts the new roster to the session.
    pub fn join_session(
        &mut self,
        code: &str,
        player_name: &str,
        connection: ConnectionId,
    ) -> LobbyResult<SessionCode> {
        let code = normalize_session_code(code);
        self.can_join(&code, player_name, connection)?;

        let session = self.store.get_session_mut(&code)?;
        session.add_player(Player::new(connection, player_name))?;
        let owner = session.owner();

        self.connections
            .set_state(connection, ConnectionState::InLobby(code.clone()));
        self.stats.players_joined += 1;
        self.metrics.record_player_joined();

        info!(
            session_code = %code,
            connection_id = %connection,
            player = player_name,
            "Player joined session"
        );

        let session = self.store.get_session(&code)?;
        let router = self.router();
        router.notify_player(
            connection,
            &ServerMessage::SessionJoined {
                session_code: code.clone(),
            },
        );
        if self.settings.notify_owner_on_join && owner != connection {
            router.notify_player(
                owner,
                &ServerMessage::PlayerJoined {
                    player_name: player_name.to_string(),
                },
            );
        }
        router.notify_session(session, &BroadcastRouter::roster_update(session));

        Ok(code)
    }

    /// Remove `connection` from a session at its own request
    pub fn leave_session(&mut self, code: &str, connection: ConnectionId) -> LobbyResult<()> {
        let code = normalize_session_code(code);
        let session = self.store.get_session_mut(&code)?;
        let departure = session
            .remove_connection(connection)
            .ok_or_else(|| LobbyError::player_not_found(connection.to_string()))?;

        self.connections
            .set_state(connection, ConnectionState::Unaffiliated);
        self.metrics.record_player_left("leave");
        self.after_departure(&code, departure);
        Ok(())
    }

    /// Remove a closed connection from every session and forget it
    ///
    /// Returns the codes of the sessions it was removed from.
    pub fn handle_disconnection(&mut self, connection: ConnectionId) -> Vec<SessionCode> {
        let codes = self.store.sessions_with(connection);

        for code in &codes {
            let departure = match self.store.get_session_mut(code) {
                Ok(session) => session.remove_connection(connection),
                Err(_) => None,
            };
            if let Some(departure) = departure {
                self.metrics.record_player_left("disconnect");
                self.after_departure(code, departure);
            }
        }

        if self.connections.unregister(connection).is_some() {
            self.metrics.record_connection_closed();
        }

        debug!(
            connection_id = %connection,
            sessions = codes.len(),
            "Disconnection handled"
        );
        codes
    }

    /// Delete an emptied session, or re-broadcast the roster of a survivor
    fn after_departure(&mut self, code: &str, departure: Departure) {
        self.stats.players_left += 1;

        info!(
            session_code = %code,
            connection_id = %departure.player.connection,
            player = %departure.player.name,
            "Player left session"
        );

        if departure.emptied {
            self.store.delete_session(code);
            self.stats.sessions_deleted += 1;
            self.metrics.record_session_deleted("empty");
            return;
        }

        if let Some(new_owner) = departure.new_owner {
            info!(session_code = %code, new_owner = %new_owner, "Host transferred");
        }

        if let Ok(session) = self.store.get_session(code) {
            self.router()
                .notify_session(session, &BroadcastRouter::roster_update(session));
        }
    }

    /// Set a player's team, looked up by display name (first match)
    pub fn assign_team(&mut self, code: &str, player_name: &str, team: &str) -> LobbyResult<()> {
        let code = normalize_session_code(code);
        if code.is_empty() || player_name.is_empty() || team.is_empty() {
            return Err(LobbyError::validation(
                "Session code, player name and team are required",
            ));
        }

        let session = self.store.get_session_mut(&code)?;
        session.assign_team(player_name, team)?;

        info!(session_code = %code, player = player_name, team, "Team assigned");

        let session = self.store.get_session(&code)?;
        self.router()
            .notify_session(session, &BroadcastRouter::roster_update(session));
        Ok(())
    }

    /// Start the game; host only
    pub fn start_game(&mut self, code: &str, connection: ConnectionId) -> LobbyResult<()> {
        let code = normalize_session_code(code);
        let session = self.store.get_session_mut(&code)?;
        if !session.is_owner(connection) {
            return Err(LobbyError::authorization("start the game"));
        }
        session.mark_started()?;

        let members: Vec<ConnectionId> = session.connections().collect();
        for member in &members {
            self.connections
                .set_state(*member, ConnectionState::InGame(code.clone()));
        }
        self.stats.games_started += 1;
        self.metrics.record_game_started(members.len());

        info!(session_code = %code, players = members.len(), "Game started");

        let session = self.store.get_session(&code)?;
        self.router().notify_session(session, &ServerMessage::GameStarted);
        Ok(())
    }

    /// End the game and tear the session down; host only
    pub fn end_game(&mut self, code: &str, connection: ConnectionId) -> LobbyResult<()> {
        let code = normalize_session_code(code);
        let session = self.store.get_session(&code)?;
        if !session.is_owner(connection) {
            return Err(LobbyError::authorization("end the game"));
        }

        self.router().notify_session(session, &ServerMessage::GameEnded);
        let members: Vec<ConnectionId> = session.connections().collect();

        for member in members {
            self.connections
                .set_state(member, ConnectionState::Unaffiliated);
        }
        self.store.delete_session(&code);
        self.stats.games_ended += 1;
        self.stats.sessions_deleted += 1;
        self.metrics.record_game_ended();
        self.metrics.record_session_deleted("ended");

        info!(session_code = %code, "Game ended, session closed");
        Ok(())
    }

    /// Current roster of a session
    pub fn roster(&self, code: &str) -> LobbyResult<Vec<RosterEntry>> {
        let code = normalize_session_code(code);
        Ok(self.store.get_session(&code)?.roster())
    }
}
