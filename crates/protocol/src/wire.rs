//! Result shapes sent back to the peer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireChat {
    pub chat_guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireContact {
    pub user_guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_path: Option<String>,
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireAttachment {
    pub guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_on_disk: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTapback {
    pub target_guid: String,
    /// Native reaction code (2000-2005 add, 3000-3005 remove, or opaque).
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_guid: Option<String>,
    pub is_from_me: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub guid: String,
    pub chat_guid: String,
    /// Unix seconds.
    pub time: f64,
    pub is_from_me: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<WireAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_originator_guid: Option<String>,
    /// Set when this item is itself a reaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tapback: Option<WireTapback>,
    /// Reactions folded onto this message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<WireTapback>,
    /// Native type name of an unrecognised record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phantom_type: Option<String>,
}

/// Empty acknowledgement, serialized as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {}

/// Every result shape a command can produce.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    ChatResolved(WireChat),
    ChatsResolved(Vec<String>),
    Contact(WireContact),
    Messages(Vec<WireMessage>),
    ChatAvatar(Option<WireAttachment>),
    Guid(crate::payloads::ResolveIdentifierResponse),
    Ack(Ack),
}

impl Response {
    pub fn to_payload(&self) -> serde_json::Result<bytes::Bytes> {
        crate::encode_payload(self)
    }
}
