//! Session management for the lobby service
//!
//! This module owns the session store, the per-session roster and the
//! membership operations (join, leave, teams, host transfer, start/end).

pub mod instance;
pub mod membership;
pub mod store;

// Re-export commonly used types
pub use instance::{Departure, Player, Session};
pub use membership::{LobbySettings, MembershipManager, MembershipStats};
pub use store::{CodeGenerator, RandomCodeGenerator, SessionStore};
