//! Message dispatch between the transport and the lobby core

pub mod dispatcher;
pub mod handler;

pub use dispatcher::{DispatchOutcome, MessageDispatcher};
pub use handler::MessageHandler;
