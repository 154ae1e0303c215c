use {
    imbridge_guid::Service,
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

/// Attachment metadata referenced by a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub guid: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl AttachmentRef {
    /// Reference with only the guid known.
    pub fn bare(guid: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            mime_type: None,
            file_name: None,
            path: None,
        }
    }
}

/// Per-batch hints for [`crate::ingest`].
#[derive(Debug, Clone, Default)]
pub struct IngestionContext {
    /// Owning conversation, used when a record does not name its own.
    pub chat_id: Option<String>,
    /// Service assumed for records that carry no service tag.
    pub service: Option<Service>,
    attachments: HashMap<String, AttachmentRef>,
}

impl IngestionContext {
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: Some(chat_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_service(mut self, service: Service) -> Self {
        self.service = Some(service);
        self
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: impl IntoIterator<Item = AttachmentRef>) -> Self {
        self.attachments
            .extend(attachments.into_iter().map(|a| (a.guid.clone(), a)));
        self
    }

    /// Preloaded metadata for `guid`, or a bare reference.
    pub fn attachment(&self, guid: &str) -> AttachmentRef {
        self.attachments
            .get(guid)
            .cloned()
            .unwrap_or_else(|| AttachmentRef::bare(guid))
    }
}
