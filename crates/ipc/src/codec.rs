//! Line framing: one JSON object per line,
//! `{"id": <u64|absent>, "command": <str>, "data": <json|absent>}`.

use {
    bytes::Bytes,
    imbridge_protocol::{CorrelationId, Envelope},
    serde::{Deserialize, Serialize},
    serde_json::{Value, value::RawValue},
};

use crate::error::TransportError;

#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<CorrelationId>,
    command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Box<RawValue>>,
}

/// Encode an envelope as one newline-terminated frame. The payload must be
/// JSON; it is embedded verbatim unless it spans lines, in which case it is
/// compacted first.
pub fn encode_frame(envelope: &Envelope) -> Result<String, TransportError> {
    let data = if envelope.payload.is_empty() {
        None
    } else {
        let text = std::str::from_utf8(&envelope.payload).map_err(|e| {
            TransportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        let raw = if text.contains('\n') {
            RawValue::from_string(serde_json::from_str::<Value>(text)?.to_string())?
        } else {
            RawValue::from_string(text.to_owned())?
        };
        Some(raw)
    };
    let frame = Frame {
        id: envelope.correlation_id,
        command: envelope.command_name.clone(),
        data,
    };
    let mut line = serde_json::to_string(&frame)?;
    line.push('\n');
    Ok(line)
}

pub fn decode_frame(line: &str) -> Result<Envelope, TransportError> {
    let frame: Frame = serde_json::from_str(line)?;
    let payload = frame
        .data
        .map(|raw| Bytes::copy_from_slice(raw.get().as_bytes()))
        .unwrap_or_default();
    Ok(Envelope::new(frame.id, frame.command, payload))
}
