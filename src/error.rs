//! Error type shared by the endpoint client, the message handler and bootstrap.

use std::fmt;

/// Response bodies attached to delivery errors are cut to this many bytes.
pub const MAX_ERROR_BODY: usize = 512;

/// Error type for forwarding operations
#[derive(Debug)]
pub enum ForwardError {
    /// Invalid or missing configuration (endpoint URL, subject, ...)
    Config(String),
    /// Reachability check did not answer 200
    Reachability {
        status: Option<u16>,
        reason: String,
    },
    /// Payload is not a well-formed JSON object
    Decode(String),
    /// Document could not be re-serialized after timestamp injection
    Encode(serde_json::Error),
    /// POST to the dated index failed at transport level or returned non-2xx
    Delivery {
        status: Option<u16>,
        body: Option<String>,
        source: Option<reqwest::Error>,
    },
    /// NATS connection or subscription failure
    Nats(String),
}

impl ForwardError {
    pub(crate) fn delivery_transport(err: reqwest::Error) -> Self {
        ForwardError::Delivery {
            status: err.status().map(|s| s.as_u16()),
            body: None,
            source: Some(err),
        }
    }

    pub(crate) fn delivery_status(status: u16, body: &str) -> Self {
        ForwardError::Delivery {
            status: Some(status),
            body: Some(truncate_body(body, MAX_ERROR_BODY)),
            source: None,
        }
    }

    /// HTTP status observed by the failed operation, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ForwardError::Reachability { status, .. } | ForwardError::Delivery { status, .. } => {
                *status
            }
            _ => None,
        }
    }

    /// Short label used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::Config(_) => "config",
            ForwardError::Reachability { .. } => "reachability",
            ForwardError::Decode(_) => "decode",
            ForwardError::Encode(_) => "encode",
            ForwardError::Delivery { .. } => "delivery",
            ForwardError::Nats(_) => "nats",
        }
    }
}

impl fmt::Display for ForwardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ForwardError::Reachability { status: Some(code), reason } => {
                write!(f, "Endpoint not healthy (status {}): {}", code, reason)
            }
            ForwardError::Reachability { status: None, reason } => {
                write!(f, "Endpoint not reachable: {}", reason)
            }
            ForwardError::Decode(msg) => write!(f, "Failed to decode message: {}", msg),
            ForwardError::Encode(e) => write!(f, "Failed to re-serialize document: {}", e),
            ForwardError::Delivery { status: Some(code), body, .. } => write!(
                f,
                "Can't post data to index, code: {} message: [{}]",
                code,
                body.as_deref().unwrap_or("")
            ),
            ForwardError::Delivery { status: None, source, .. } => match source {
                Some(e) => write!(f, "Can't post data to index: {}", e),
                None => write!(f, "Can't post data to index"),
            },
            ForwardError::Nats(msg) => write!(f, "NATS error: {}", msg),
        }
    }
}

impl std::error::Error for ForwardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ForwardError::Encode(e) => Some(e),
            ForwardError::Delivery { source: Some(e), .. } => Some(e),
            _ => None,
        }
    }
}

/// Cut `body` to at most `max` bytes without splitting a UTF-8 character.
fn truncate_body(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
