//! Common types used throughout the lobby service

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a live transport connection
pub type ConnectionId = Uuid;

/// Six-character uppercase session code
pub type SessionCode = String;

/// Who receives roster updates after a session is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastScope {
    /// Only the members of the affected session
    #[default]
    Session,
    /// Every open connection, regardless of session
    Global,
}

impl std::fmt::Display for BroadcastScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BroadcastScope::Session => write!(f, "session"),
            BroadcastScope::Global => write!(f, "global"),
        }
    }
}

impl std::str::FromStr for BroadcastScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "session" => Ok(BroadcastScope::Session),
            "global" => Ok(BroadcastScope::Global),
            other => Err(format!("unknown broadcast scope: {}", other)),
        }
    }
}

/// One entry of a roster snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub name: String,
    pub team: Option<String>,
    pub is_host: bool,
}

impl RosterEntry {
    pub fn new(name: impl Into<String>, team: Option<&str>, is_host: bool) -> Self {
        Self {
            name: name.into(),
            team: team.map(str::to_string),
            is_host,
        }
    }
}

/// Request to open a new session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub player_name: String,
}

/// Request to join an existing session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JoinSessionRequest {
    pub session_code: String,
    pub player_name: String,
}

/// Request to pick a team inside a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JoinTeamRequest {
    pub session_code: String,
    pub player_name: String,
    pub team: String,
}

/// Requests that only carry a session code (start, end, leave)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_code: String,
}

/// Inbound client intents
///
/// Missing string fields decode as empty strings so they are rejected with a
/// validation error rather than dropped as malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    CreateSession(CreateSessionRequest),
    JoinSession(JoinSessionRequest),
    JoinTeam(JoinTeamRequest),
    StartGame(SessionRequest),
    EndGame(SessionRequest),
    #[serde(alias = "leftSession")]
    LeaveSession(SessionRequest),
    /// Any unrecognized `type` value
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Wire name of the message type, used for logs and metric labels
    pub fn type_name(&self) -> &'static str {
        match self {
            ClientMessage::CreateSession(_) => "createSession",
            ClientMessage::JoinSession(_) => "joinSession",
            ClientMessage::JoinTeam(_) => "joinTeam",
            ClientMessage::StartGame(_) => "startGame",
            ClientMessage::EndGame(_) => "endGame",
            ClientMessage::LeaveSession(_) => "leaveSession",
            ClientMessage::Unknown => "unknown",
        }
    }
}

/// Outbound server events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    SessionCreated { session_code: SessionCode },
    SessionJoined { session_code: SessionCode },
    PlayerJoined { player_name: String },
    UpdateLobby { players: Vec<RosterEntry> },
    GameStarted,
    GameEnded,
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Wire name of the event type
    pub fn type_name(&self) -> &'static str {
        match self {
            ServerMessage::SessionCreated { .. } => "sessionCreated",
            ServerMessage::SessionJoined { .. } => "sessionJoined",
            ServerMessage::PlayerJoined { .. } => "playerJoined",
            ServerMessage::UpdateLobby { .. } => "updateLobby",
            ServerMessage::GameStarted => "gameStarted",
            ServerMessage::GameEnded => "gameEnded",
            ServerMessage::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_join_session() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "joinSession",
            "sessionCode": "ABC123",
            "playerName": "Bob"
        }))
        .unwrap();

        assert_eq!(
            msg,
            ClientMessage::JoinSession(JoinSessionRequest {
                session_code: "ABC123".to_string(),
                player_name: "Bob".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let msg: ClientMessage =
            serde_json::from_value(json!({ "type": "createSession" })).unwrap();
        assert_eq!(
            msg,
            ClientMessage::CreateSession(CreateSessionRequest::default())
        );
    }

    #[test]
    fn test_unknown_type_is_not_an_error() {
        let msg: ClientMessage =
            serde_json::from_value(json!({ "type": "danceParty", "x": 1 })).unwrap();
        assert_eq!(msg, ClientMessage::Unknown);
    }

    #[test]
    fn test_left_session_alias() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "leftSession",
            "sessionCode": "ABC123"
        }))
        .unwrap();
        assert_eq!(msg.type_name(), "leaveSession");
    }

    #[test]
    fn test_missing_type_is_malformed() {
        assert!(serde_json::from_value::<ClientMessage>(json!({ "playerName": "A" })).is_err());
        assert!(serde_json::from_str::<ClientMessage>("not json").is_err());
    }

    #[test]
    fn test_update_lobby_wire_format() {
        let msg = ServerMessage::UpdateLobby {
            players: vec![
                RosterEntry::new("Alice", None, true),
                RosterEntry::new("Bob", Some("Red"), false),
            ],
        };

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "updateLobby",
                "players": [
                    { "name": "Alice", "team": null, "isHost": true },
                    { "name": "Bob", "team": "Red", "isHost": false }
                ]
            })
        );
    }

    #[test]
    fn test_event_wire_format() {
        assert_eq!(
            serde_json::to_value(ServerMessage::SessionCreated {
                session_code: "Q1W2E3".to_string()
            })
            .unwrap(),
            json!({ "type": "sessionCreated", "sessionCode": "Q1W2E3" })
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::GameStarted).unwrap(),
            json!({ "type": "gameStarted" })
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::error("Session not found")).unwrap(),
            json!({ "type": "error", "message": "Session not found" })
        );
    }

    #[test]
    fn test_broadcast_scope_parsing() {
        assert_eq!("Global".parse::<BroadcastScope>(), Ok(BroadcastScope::Global));
        assert_eq!(BroadcastScope::default(), BroadcastScope::Session);
        assert!("everyone".parse::<BroadcastScope>().is_err());
    }
}
