use std::sync::Arc;

use {
    imbridge_guid::{Guid, HandleKind, Service},
    imbridge_service_traits::{ConversationHandle, ConversationRegistry, ServiceResult},
    tracing::debug,
};

/// Resolves chat identifiers to live conversations, falling back once
/// across the two interchangeable services.
#[derive(Clone)]
pub struct ChatResolver {
    registry: Arc<dyn ConversationRegistry>,
}

impl ChatResolver {
    pub fn new(registry: Arc<dyn ConversationRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<dyn ConversationRegistry> {
        &self.registry
    }

    /// `None` means no such conversation, not a failure.
    ///
    /// 1. exact lookup of the formatted identifier
    /// 2. open a direct conversation if the local part is addressable
    /// 3. one exact lookup of the alternate-service identifier
    pub async fn resolve_chat(&self, guid: &Guid) -> ServiceResult<Option<ConversationHandle>> {
        let formatted = guid.format();
        if let Some(handle) = self.registry.lookup_existing(&formatted).await? {
            return Ok(Some(handle));
        }

        let kind = HandleKind::classify(guid.local());
        if kind.is_addressable() {
            let service = Service::normalize_direct(guid.service());
            debug!(chat_guid = %formatted, ?kind, %service, "opening direct conversation");
            if let Some(handle) = self
                .registry
                .open_or_create_direct(guid.local(), &service)
                .await?
            {
                return Ok(Some(handle));
            }
        }

        let Some(alternate) = guid.alternate() else {
            debug!(chat_guid = %formatted, "conversation not found");
            return Ok(None);
        };
        let alternate = alternate.format();
        let handle = self.registry.lookup_existing(&alternate).await?;
        debug!(
            chat_guid = %formatted,
            alternate = %alternate,
            found = handle.is_some(),
            "retried on alternate service"
        );
        Ok(handle)
    }

    /// Parse `raw` and resolve it.
    pub async fn resolve_raw(&self, raw: &str) -> ServiceResult<Option<ConversationHandle>> {
        self.resolve_chat(&Guid::parse(raw)).await
    }
}
