//! Party Lobby - real-time multiplayer lobby coordinator
//!
//! Clients connect over WebSocket, create or join sessions identified by a
//! six-character code, pick teams and receive live roster updates. The crate
//! owns the session state machine and its broadcast protocol, plus the
//! transport, configuration and monitoring surfaces around it.

pub mod broadcast;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod service;
pub mod session;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{LobbyError, LobbyResult, Result};
pub use types::*;

// Re-export key components
pub use dispatch::{MessageDispatcher, MessageHandler};
pub use session::{MembershipManager, SessionStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
