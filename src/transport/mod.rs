//! Client-facing transports

pub mod ws;

pub use ws::{WsServer, WsServerConfig, WELCOME_BANNER};
