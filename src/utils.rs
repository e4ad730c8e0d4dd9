//! Utility functions for the lobby service

use crate::types::ConnectionId;
use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

/// Symbols a session code is drawn from
pub const SESSION_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Number of characters in a session code
pub const SESSION_CODE_LENGTH: usize = 6;

/// Generate a new unique connection ID
pub fn generate_connection_id() -> ConnectionId {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Draw a random session code, uniformly per character
pub fn random_session_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SESSION_CODE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..SESSION_CODE_ALPHABET.len());
            SESSION_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Check that a code has the generated shape
pub fn is_valid_session_code(code: &str) -> bool {
    code.len() == SESSION_CODE_LENGTH && code.bytes().all(|b| SESSION_CODE_ALPHABET.contains(&b))
}

/// Normalize a client-supplied code for lookup
pub fn normalize_session_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
