//! Per-message document transformation.
//!
//! Each step of the forwarding pipeline that does not touch the network lives
//! here: decoding the payload, stamping it, re-encoding it, and naming its index.

use chrono::{DateTime, Local, SecondsFormat, TimeZone};
use serde_json::{Map, Value as JsonValue};

use crate::error::ForwardError;

/// Field injected into every forwarded document
pub const TIME_FIELD: &str = "time";

/// Decoded document: field name -> arbitrary JSON value
pub type Document = Map<String, JsonValue>;

/// Parse `payload` as a JSON object.
///
/// Arrays, scalars and malformed input are rejected.
pub fn decode_document(payload: &[u8]) -> Result<Document, ForwardError> {
    match serde_json::from_slice::<JsonValue>(payload) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(other) => Err(ForwardError::Decode(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
        Err(e) => Err(ForwardError::Decode(e.to_string())),
    }
}

/// Insert or overwrite the `time` field with `now` as RFC3339.
pub fn stamp_document<Tz: TimeZone>(document: &mut Document, now: &DateTime<Tz>)
where
    Tz::Offset: std::fmt::Display,
{
    document.insert(
        TIME_FIELD.to_string(),
        JsonValue::String(now.to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
}

/// Stamp with the local wall clock
pub fn stamp_document_now(document: &mut Document) {
    stamp_document(document, &Local::now());
}

pub fn encode_document(document: &Document) -> Result<Vec<u8>, ForwardError> {
    serde_json::to_vec(document).map_err(ForwardError::Encode)
}

/// Index base for a subject: every `.` becomes `-`.
pub fn index_base(subject: &str) -> String {
    subject.replace('.', "-")
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
