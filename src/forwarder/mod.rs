/// NATS → index forwarding
///
/// Document transformation, the per-message handler, and the runner that
/// drives a subscription through it

pub mod document;
pub mod handler;
pub mod runner;

pub use document::{decode_document, encode_document, index_base, stamp_document, Document, TIME_FIELD};
pub use handler::MessageHandler;
pub use runner::{run, shutdown_signal, RunSummary};
