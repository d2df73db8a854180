//! # nats-es-forwarder: NATS to Elasticsearch bridge
//!
//! Subscribes to a NATS subject and forwards every JSON message as a document
//! into a per-day, per-subject index of an Elasticsearch-compatible store.
//!
//! ## Pipeline
//!
//! For a message on `app.auth.login` carrying `{"level":"info","msg":"hello"}`:
//!
//! 1. the payload is decoded as a JSON object,
//! 2. a `time` field is set to the current local time (RFC3339),
//! 3. the document is re-encoded,
//! 4. the subject becomes the index base `app-auth-login`,
//! 5. the document is POSTed to `<endpoint>/app-auth-login-<YYYY-MM-DD>/<doc_type>`.
//!
//! Failures drop the message and are reported through `tracing`; nothing is
//! retried or buffered.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use nats_es_forwarder::{EndpointClient, MessageHandler, RawMessage};
//!
//! let endpoint = EndpointClient::new("http://localhost:9200", "log")?;
//! let handler = Arc::new(MessageHandler::new(endpoint));
//! handler.handle(&RawMessage::new("app.auth.login", r#"{"msg":"hello"}"#)).await;
//! ```

pub mod config;
pub mod error;
pub mod es;
pub mod forwarder;
pub mod nats;
pub mod telemetry;

pub use config::BridgeConfig;
pub use error::ForwardError;
pub use es::{dated_index, EndpointClient};
pub use forwarder::{MessageHandler, RunSummary};
pub use nats::{NatsClient, NatsConfig, RawMessage};
