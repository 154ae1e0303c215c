use std::any::Any;

use serde_json::{Map, Value};

/// A raw history record of any native shape.
///
/// Shapes are recognised by downcasting through [`NativeRecord::as_any`].
pub trait NativeRecord: Any + Send + Sync {
    /// Runtime type name, reported for records nothing recognises.
    fn type_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    /// Reply-threading accessors, for records that support them.
    fn thread_metadata(&self) -> Option<&dyn ThreadMetadata> {
        None
    }
}

pub trait ThreadMetadata {
    fn thread_identifier(&self) -> Option<&str>;
    fn thread_originator(&self) -> Option<&str>;
}

/// Text and/or media message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageRecord {
    pub guid: String,
    pub chat_guid: Option<String>,
    pub from_me: bool,
    /// Platform nanoseconds.
    pub date: i64,
    pub sender: Option<String>,
    pub text: Option<String>,
    pub subject: Option<String>,
    pub service: Option<String>,
    pub attachment_guids: Vec<String>,
    pub thread_identifier: Option<String>,
    pub thread_originator_guid: Option<String>,
}

impl NativeRecord for MessageRecord {
    fn type_name(&self) -> &str {
        "MessageRecord"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn thread_metadata(&self) -> Option<&dyn ThreadMetadata> {
        Some(self)
    }
}

impl ThreadMetadata for MessageRecord {
    fn thread_identifier(&self) -> Option<&str> {
        self.thread_identifier.as_deref()
    }

    fn thread_originator(&self) -> Option<&str> {
        self.thread_originator_guid.as_deref()
    }
}

/// Reaction to another message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcknowledgmentRecord {
    pub guid: String,
    pub chat_guid: Option<String>,
    pub from_me: bool,
    pub date: i64,
    pub sender: Option<String>,
    /// Target message, possibly with a part prefix (`p:0/GUID`, `bp:GUID`).
    pub associated_guid: String,
    pub associated_type: i64,
}

impl AcknowledgmentRecord {
    /// Target message guid without the part prefix.
    pub fn target_guid(&self) -> &str {
        let raw = self.associated_guid.as_str();
        if let Some(rest) = raw.strip_prefix("bp:") {
            return rest;
        }
        if raw.starts_with("p:")
            && let Some((_, guid)) = raw.split_once('/')
        {
            return guid;
        }
        raw
    }
}

impl NativeRecord for AcknowledgmentRecord {
    fn type_name(&self) -> &str {
        "AcknowledgmentRecord"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Any other native item (group renames, participant changes, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpaqueRecord {
    pub type_name: String,
    pub columns: Map<String, Value>,
}

impl NativeRecord for OpaqueRecord {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
