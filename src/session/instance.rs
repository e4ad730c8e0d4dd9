//! Session instance and roster bookkeeping
//!
//! A session owns its ordered player list. The host is never stored on a
//! player: it is whichever player's connection equals the session owner.

use crate::error::{LobbyError, LobbyResult};
use crate::types::{ConnectionId, RosterEntry, SessionCode};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};

/// A player seated in a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub connection: ConnectionId,
    pub name: String,
    pub team: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl Player {
    pub fn new(connection: ConnectionId, name: impl Into<String>) -> Self {
        Self {
            connection,
            name: name.into(),
            team: None,
            joined_at: current_timestamp(),
        }
    }
}

/// What happened when a connection was removed from a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    /// The player that was removed
    pub player: Player,
    /// Set when host authority moved to another connection
    pub new_owner: Option<ConnectionId>,
    /// The session has no players left
    pub emptied: bool,
}

/// A lobby instance identified by its code
#[derive(Debug, Clone)]
pub struct Session {
    code: SessionCode,
    owner: ConnectionId,
    players: Vec<Player>,
    started: bool,
    created_at: DateTime<Utc>,
}

impl Session {
    /// Create a session seated with its host
    pub fn new(code: SessionCode, host: Player) -> Self {
        Self {
            code,
            owner: host.connection,
            players: vec![host],
            started: false,
            created_at: current_timestamp(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn owner(&self) -> ConnectionId {
        self.owner
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_owner(&self, connection: ConnectionId) -> bool {
        self.owner == connection
    }

    pub fn contains(&self, connection: ConnectionId) -> bool {
        self.players.iter().any(|p| p.connection == connection)
    }

    /// Connections of every seated player, in join order
    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.players.iter().map(|p| p.connection)
    }

    /// Seat a player at the end of the roster
    pub fn add_player(&mut self, player: Player) -> LobbyResult<()> {
        if self.contains(player.connection) {
            return Err(LobbyError::validation("Already in this session"));
        }

        self.players.push(player);
        Ok(())
    }

    /// Remove a connection's player, passing host authority to the first
    /// remaining player when the owner leaves
    pub fn remove_connection(&mut self, connection: ConnectionId) -> Option<Departure> {
        let index = self
            .players
            .iter()
            .position(|p| p.connection == connection)?;
        let player = self.players.remove(index);

        let mut new_owner = None;
        if self.owner == connection {
            if let Some(first) = self.players.first() {
                self.owner = first.connection;
                new_owner = Some(first.connection);
            }
        }

        Some(Departure {
            player,
            new_owner,
            emptied: self.players.is_empty(),
        })
    }

    /// Set the team of the first player with this display name
    pub fn assign_team(&mut self, player_name: &str, team: &str) -> LobbyResult<&Player> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.name == player_name)
            .ok_or_else(|| LobbyError::player_not_found(player_name))?;

        player.team = Some(team.to_string());
        Ok(player)
    }

    pub fn mark_started(&mut self) -> LobbyResult<()> {
        if self.started {
            return Err(LobbyError::validation("Game already started"));
        }

        self.started = true;
        Ok(())
    }

    /// Roster snapshot computed from the current state
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.players
            .iter()
            .map(|p| RosterEntry {
                name: p.name.clone(),
                team: p.team.clone(),
                is_host: p.connection == self.owner,
            })
            .collect()
    }
}
