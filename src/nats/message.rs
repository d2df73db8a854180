/// Raw message as received from a NATS subject
///
/// The payload is kept opaque until the forwarder decodes it.

/// One inbound message, consumed once and never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Dot-delimited subject the message was published on
    pub subject: String,

    /// Payload bytes, expected to be a UTF-8 JSON object
    pub payload: Vec<u8>,
}

impl RawMessage {
    /// Create a new raw message
    pub fn new(subject: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            subject: subject.into(),
            payload: payload.into(),
        }
    }

    /// Payload as text for diagnostics, replacing invalid UTF-8
    pub fn payload_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

impl From<async_nats::Message> for RawMessage {
    fn from(message: async_nats::Message) -> Self {
        Self {
            subject: message.subject.to_string(),
            payload: message.payload.to_vec(),
        }
    }
}
