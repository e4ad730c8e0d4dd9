//! Authoritative session store
//!
//! Maps session codes to live sessions. Codes are unique at all times: a
//! freshly generated candidate is only inserted after checking it against the
//! live set, and regenerated on collision.

use crate::error::{LobbyError, LobbyResult};
use crate::session::instance::{Player, Session};
use crate::types::{ConnectionId, SessionCode};
use crate::utils::random_session_code;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Default upper bound on candidate codes tried per creation
pub const DEFAULT_MAX_CODE_ATTEMPTS: usize = 32;

/// Source of candidate session codes
#[cfg_attr(test, mockall::automock)]
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> SessionCode;
}

/// Uniform random codes over `A-Z0-9`
#[derive(Debug, Clone, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> SessionCode {
        random_session_code(&mut rand::thread_rng())
    }
}

/// Owned store of every live session
pub struct SessionStore {
    sessions: HashMap<SessionCode, Session>,
    generator: Box<dyn CodeGenerator>,
    max_code_attempts: usize,
    code_collisions: u64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_generator(Box::new(RandomCodeGenerator), DEFAULT_MAX_CODE_ATTEMPTS)
    }

    /// Create a store with a custom code source
    pub fn with_generator(generator: Box<dyn CodeGenerator>, max_code_attempts: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            generator,
            max_code_attempts: max_code_attempts.max(1),
            code_collisions: 0,
        }
    }

    /// Open a session hosted by `connection` and return its code
    ///
    /// Nothing is broadcast here; announcing the session is up to the caller.
    pub fn create_session(
        &mut self,
        player_name: &str,
        connection: ConnectionId,
    ) -> LobbyResult<SessionCode> {
        if player_name.is_empty() {
            return Err(LobbyError::validation("Name field cannot be empty"));
        }

        let code = self.next_free_code()?;
        let session = Session::new(code.clone(), Player::new(connection, player_name));
        self.sessions.insert(code.clone(), session);

        info!(
            session_code = %code,
            host = %connection,
            active_sessions = self.sessions.len(),
            "Session created"
        );
        Ok(code)
    }

    fn next_free_code(&mut self) -> LobbyResult<SessionCode> {
        for attempt in 1..=self.max_code_attempts {
            let candidate = self.generator.generate();
            if !self.sessions.contains_key(&candidate) {
                return Ok(candidate);
            }

            self.code_collisions += 1;
            warn!(
                candidate = %candidate,
                attempt,
                "Session code collision, regenerating"
            );
        }

        error!(
            attempts = self.max_code_attempts,
            active_sessions = self.sessions.len(),
            "Could not find a free session code"
        );
        Err(LobbyError::internal("Could not allocate a session code"))
    }

    pub fn get_session(&self, code: &str) -> LobbyResult<&Session> {
        self.sessions
            .get(code)
            .ok_or_else(|| LobbyError::session_not_found(code))
    }

    pub fn get_session_mut(&mut self, code: &str) -> LobbyResult<&mut Session> {
        self.sessions
            .get_mut(code)
            .ok_or_else(|| LobbyError::session_not_found(code))
    }

    /// Remove a session; absent codes are a no-op
    pub fn delete_session(&mut self, code: &str) -> Option<Session> {
        let removed = self.sessions.remove(code);
        if removed.is_some() {
            info!(
                session_code = %code,
                active_sessions = self.sessions.len(),
                "Session deleted"
            );
        } else {
            debug!(session_code = %code, "Delete of unknown session ignored");
        }
        removed
    }

    pub fn contains(&self, code: &str) -> bool {
        self.sessions.contains_key(code)
    }

    /// Codes of every session the connection is seated in
    pub fn sessions_with(&self, connection: ConnectionId) -> Vec<SessionCode> {
        self.sessions
            .values()
            .filter(|s| s.contains(connection))
            .map(|s| s.code().to_string())
            .collect()
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn player_count(&self) -> usize {
        self.sessions.values().map(Session::player_count).sum()
    }

    /// Total candidate codes rejected because they were already live
    pub fn code_collisions(&self) -> u64 {
        self.code_collisions
    }
}
