//! Message handler: turns one bus message into one indexed document.

use chrono::{DateTime, Local};

use crate::error::ForwardError;
use crate::es::EndpointClient;
use crate::forwarder::document::{decode_document, encode_document, index_base, stamp_document};
use crate::nats::RawMessage;

/// Forwards bus messages into dated indices.
///
/// Holds no mutable state, so a single instance behind an `Arc` can serve
/// any number of concurrent invocations.
#[derive(Clone, Debug)]
pub struct MessageHandler {
    endpoint: EndpointClient,
}

impl MessageHandler {
    pub fn new(endpoint: EndpointClient) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &EndpointClient {
        &self.endpoint
    }

    /// Run the pipeline for `message` and return its outcome.
    ///
    /// Nothing is sent when the payload is not a JSON object.
    pub async fn process(&self, message: &RawMessage) -> Result<(), ForwardError> {
        self.process_at(message, Local::now()).await
    }

    /// Run the pipeline as of `now`.
    ///
    /// The `time` field and the index date both come from `now`, so a document
    /// stamped just before midnight lands in that day's index.
    pub async fn process_at(
        &self,
        message: &RawMessage,
        now: DateTime<Local>,
    ) -> Result<(), ForwardError> {
        let mut document = decode_document(&message.payload)?;
        stamp_document(&mut document, &now);
        let body = encode_document(&document)?;

        let index = index_base(&message.subject);
        self.endpoint.deliver_at(body, &index, now.date_naive()).await
    }

    /// Process `message`, reporting any failure instead of returning it.
    ///
    /// A failing message is dropped; the caller keeps receiving.
    pub async fn handle(&self, message: &RawMessage) {
        match self.process(message).await {
            Ok(()) => {
                tracing::debug!(subject = %message.subject, "Emitted sample");
            }
            Err(e @ ForwardError::Decode(_)) => {
                tracing::error!(
                    subject = %message.subject,
                    error = %e,
                    data = %message.payload_lossy(),
                    "Failed to load json from nats"
                );
            }
            Err(e @ ForwardError::Encode(_)) => {
                tracing::error!(subject = %message.subject, error = %e, "Can't reserialize log");
            }
            Err(e) => {
                tracing::error!(
                    subject = %message.subject,
                    kind = e.kind(),
                    status = e.status(),
                    error = %e,
                    data = %message.payload_lossy(),
                    "Failed to post data at index"
                );
            }
        }
    }
}
