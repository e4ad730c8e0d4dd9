//! Connection tracking for the lobby service
//!
//! Every live transport channel is registered here under a generated
//! [`ConnectionId`](crate::types::ConnectionId). Sessions only ever refer to
//! connections by id.

pub mod registry;

pub use registry::{ConnectionHandle, ConnectionRegistry, ConnectionState};
