//! Error types for the lobby service
//!
//! Core lobby operations return [`LobbyResult`] so the dispatcher can turn the
//! failure into an `error` event for the requesting client. Service and
//! bootstrap code uses anyhow, like the rest of the application.

/// Result type alias for service-level code
pub type Result<T> = anyhow::Result<T>;

/// Result type alias for core lobby operations
pub type LobbyResult<T> = std::result::Result<T, LobbyError>;

/// Errors raised by session and membership operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    /// A required field was empty or the request is not valid in the current state
    #[error("{message}")]
    Validation { message: String },

    #[error("Session not found")]
    SessionNotFound { code: String },

    #[error("Player not found: {player}")]
    PlayerNotFound { player: String },

    /// A non-owner attempted an owner-only action
    #[error("Only the host can {action}")]
    Authorization { action: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl LobbyError {
    pub fn validation(message: impl Into<String>) -> Self {
        LobbyError::Validation {
            message: message.into(),
        }
    }

    pub fn session_not_found(code: impl Into<String>) -> Self {
        LobbyError::SessionNotFound { code: code.into() }
    }

    pub fn player_not_found(player: impl Into<String>) -> Self {
        LobbyError::PlayerNotFound {
            player: player.into(),
        }
    }

    pub fn authorization(action: impl Into<String>) -> Self {
        LobbyError::Authorization {
            action: action.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        LobbyError::Internal {
            message: message.into(),
        }
    }

    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            LobbyError::Validation { .. } => "validation",
            LobbyError::SessionNotFound { .. } => "session_not_found",
            LobbyError::PlayerNotFound { .. } => "player_not_found",
            LobbyError::Authorization { .. } => "authorization",
            LobbyError::Internal { .. } => "internal",
        }
    }
}
