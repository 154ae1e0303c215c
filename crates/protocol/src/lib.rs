//! Bridge IPC protocol definitions.
//!
//! Every message exchanged with the peer process is an [`Envelope`]:
//! - a request carries a correlation id and expects a `response` or `error`
//!   envelope with the same id
//! - a one-way command (e.g. `log`) carries no id and gets no reply
//!
//! Payloads are opaque bytes at this layer; their shape is selected by the
//! command name (see [`commands`] and [`payloads`]).

pub mod payloads;
pub mod wire;

use std::fmt;

use {
    bytes::Bytes,
    serde::{Deserialize, Serialize, de::DeserializeOwned},
};

pub use wire::{Ack, Response, WireAttachment, WireChat, WireContact, WireMessage, WireTapback};

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000; // 30s
pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024; // 4 MiB

// ── Command names ────────────────────────────────────────────────────────────

pub mod commands {
    pub const GET_CHATS: &str = "get_chats";
    pub const GET_CHAT: &str = "get_chat";
    pub const GET_CHAT_AVATAR: &str = "get_chat_avatar";
    pub const GET_CONTACT: &str = "get_contact";
    pub const GET_RECENT_MESSAGES: &str = "get_recent_messages";
    pub const GET_MESSAGES_AFTER: &str = "get_messages_after";
    pub const RESOLVE_IDENTIFIER: &str = "resolve_identifier";
    pub const PREPARE_DM: &str = "prepare_dm";
    pub const PING: &str = "ping";
    pub const LOG: &str = "log";

    /// Success reply to a correlated request.
    pub const RESPONSE: &str = "response";
    /// Failure reply to a correlated request.
    pub const ERROR: &str = "error";

    /// Reply envelopes are routed to waiters instead of being dispatched.
    pub fn is_reply(name: &str) -> bool {
        name == RESPONSE || name == ERROR
    }
}

// ── Error codes ──────────────────────────────────────────────────────────────

pub mod error_codes {
    pub const NOT_FOUND: &str = "not_found";
    pub const INTERNAL_ERROR: &str = "internal_error";
    pub const INVALID_PAYLOAD: &str = "invalid_payload";
}

// ── Error shape ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorShape {
    pub code: String,
    pub message: String,
    /// Name of the command that failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl ErrorShape {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            command: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(error_codes::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_PAYLOAD, message)
    }

    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }
}

impl fmt::Display for ErrorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

// ── Envelope ─────────────────────────────────────────────────────────────────

/// Opaque token pairing a request with its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub u64);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub correlation_id: Option<CorrelationId>,
    pub command_name: String,
    pub payload: Bytes,
}

impl Envelope {
    pub fn new(
        correlation_id: Option<CorrelationId>,
        command_name: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            correlation_id,
            command_name: command_name.into(),
            payload: payload.into(),
        }
    }

    /// A command envelope with a JSON-encoded payload. The transport assigns
    /// the correlation id when the envelope is sent as a request.
    pub fn command<T: Serialize>(
        command_name: impl Into<String>,
        payload: &T,
    ) -> serde_json::Result<Self> {
        Ok(Self::new(None, command_name, encode_payload(payload)?))
    }

    pub fn response(correlation_id: Option<CorrelationId>, payload: impl Into<Bytes>) -> Self {
        Self::new(correlation_id, commands::RESPONSE, payload)
    }

    pub fn error(correlation_id: Option<CorrelationId>, error: &ErrorShape) -> Self {
        // ErrorShape only holds strings; encoding cannot fail.
        let payload = encode_payload(error).unwrap_or_default();
        Self::new(correlation_id, commands::ERROR, payload)
    }

    pub fn is_reply(&self) -> bool {
        commands::is_reply(&self.command_name)
    }

    /// Decode the payload as `T`. An empty payload decodes as JSON `null`.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        decode_payload(&self.payload)
    }

    /// Turn a reply envelope into a [`Reply`]. Returns `None` for anything
    /// that is not a `response`/`error` envelope.
    pub fn into_reply(self) -> Option<Reply> {
        match self.command_name.as_str() {
            commands::RESPONSE => Some(Reply::Response(self.payload)),
            commands::ERROR => Some(Reply::Error(
                self.decode_payload::<ErrorShape>().unwrap_or_else(|e| {
                    ErrorShape::internal(format!("undecodable error reply: {e}"))
                }),
            )),
            _ => None,
        }
    }
}

pub fn encode_payload<T: Serialize + ?Sized>(payload: &T) -> serde_json::Result<Bytes> {
    serde_json::to_vec(payload).map(Bytes::from)
}

pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> serde_json::Result<T> {
    if payload.is_empty() {
        serde_json::from_slice(b"null")
    } else {
        serde_json::from_slice(payload)
    }
}

// ── Replies ──────────────────────────────────────────────────────────────────

/// What the peer answered to a correlated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Response(Bytes),
    Error(ErrorShape),
}

#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("peer returned error: {0}")]
    Peer(ErrorShape),
    #[error("failed to decode response payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Reply {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ReplyError> {
        match self {
            Self::Response(payload) => Ok(decode_payload(payload)?),
            Self::Error(shape) => Err(ReplyError::Peer(shape.clone())),
        }
    }
}
