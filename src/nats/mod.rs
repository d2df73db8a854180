/// NATS integration module
///
/// Provides the raw message type handed to the forwarder and the client that
/// subscribes to the configured subject

pub mod message;
pub mod client;

pub use message::RawMessage;
pub use client::{NatsClient, NatsConfig};
