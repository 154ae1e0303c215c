//! [`Resolver`] implementations for chats, contacts and messages.

use std::{collections::HashSet, sync::Arc};

use {
    async_trait::async_trait,
    futures::future::try_join_all,
    imbridge_guid::{Guid, normalized_handle_id},
    imbridge_history::{IngestionContext, NormalizedItem},
    imbridge_service_traits::{
        Contact, ContactDirectory, ConversationHandle, Resolver, RowQuery, ServiceResult,
    },
    tracing::trace,
};

use crate::{
    queries::{HistoryQueries, normalize_rows},
    resolver::ChatResolver,
};

/// Chat guid to conversation, through the fallback-aware [`ChatResolver`].
#[derive(Clone)]
pub struct ChatInfoResolver {
    chats: ChatResolver,
}

impl ChatInfoResolver {
    pub fn new(chats: ChatResolver) -> Self {
        Self { chats }
    }
}

#[async_trait]
impl Resolver for ChatInfoResolver {
    type Entity = ConversationHandle;
    type Id = Guid;

    async fn resolve_many(&self, ids: &[Guid]) -> ServiceResult<Vec<ConversationHandle>> {
        let resolved = try_join_all(ids.iter().map(|id| self.chats.resolve_chat(id))).await?;
        Ok(resolved.into_iter().flatten().collect())
    }
}

/// Participant id to contact card, one directory query per batch.
#[derive(Clone)]
pub struct ContactResolver {
    directory: Arc<dyn ContactDirectory>,
}

impl ContactResolver {
    pub fn new(directory: Arc<dyn ContactDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Resolver for ContactResolver {
    type Entity = Contact;
    type Id = String;

    async fn resolve_many(&self, ids: &[String]) -> ServiceResult<Vec<Contact>> {
        let mut seen = HashSet::new();
        let handles: Vec<String> = ids
            .iter()
            .map(|id| normalized_handle_id(id))
            .filter(|id| !id.is_empty() && seen.insert(*id))
            .map(str::to_string)
            .collect();
        if handles.is_empty() {
            return Ok(Vec::new());
        }
        trace!(count = handles.len(), "resolving contacts");
        self.directory.contacts_for(&handles).await
    }
}

/// Message guid to normalized item, one row read per batch.
#[derive(Clone)]
pub struct MessageResolver {
    queries: HistoryQueries,
}

impl MessageResolver {
    pub fn new(queries: HistoryQueries) -> Self {
        Self { queries }
    }
}

#[async_trait]
impl Resolver for MessageResolver {
    type Entity = NormalizedItem;
    type Id = String;

    async fn resolve_many(&self, ids: &[String]) -> ServiceResult<Vec<NormalizedItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .queries
            .reader()
            .read_rows(&RowQuery::MessagesByGuid(ids.to_vec()))
            .await?;
        normalize_rows(&self.queries, IngestionContext::default(), rows).await
    }
}
