//! Outbound event delivery
//!
//! Computes recipients for an event and queues the serialized frame on each
//! recipient's connection. Delivery is best-effort and never blocks.

pub mod router;

pub use router::BroadcastRouter;
