//! History reads for one conversation at a time.

use std::{collections::HashSet, sync::Arc};

use {
    imbridge_config::HistoryConfig,
    imbridge_history::{
        AttachmentRef, IngestionContext, NormalizedItem, PlatformTime, associate_reactions,
        decode_row, ingest_batch,
    },
    imbridge_service_traits::{
        ConversationHandle, ConversationRegistry, ReadApi, Row, RowQuery, ServiceResult,
    },
    serde_json::Value,
    tracing::debug,
};

#[derive(Clone)]
pub struct HistoryQueries {
    reader: Arc<dyn ReadApi>,
    limits: HistoryConfig,
}

impl HistoryQueries {
    pub fn new(reader: Arc<dyn ReadApi>, limits: HistoryConfig) -> Self {
        Self { reader, limits }
    }

    pub fn reader(&self) -> &Arc<dyn ReadApi> {
        &self.reader
    }

    /// Newest messages of `chat`, oldest first.
    pub async fn recent_messages(
        &self,
        chat: &ConversationHandle,
        limit: Option<usize>,
    ) -> ServiceResult<Vec<NormalizedItem>> {
        let query = RowQuery::RecentMessages {
            chat_id: chat.chat_id.clone(),
            limit: self.limits.clamp(limit),
        };
        let rows = self.reader.read_rows(&query).await?;
        self.normalize(chat, rows).await
    }

    /// Messages of `chat` after a Unix timestamp, oldest first.
    ///
    /// Returns nothing without reading messages when the conversation's
    /// newest message predates `after`.
    pub async fn messages_after(
        &self,
        chat: &ConversationHandle,
        after: f64,
        limit: Option<usize>,
    ) -> ServiceResult<Vec<NormalizedItem>> {
        let latest = self
            .reader
            .read_rows(&RowQuery::LatestMessageTimestamps(vec![chat.chat_id.clone()]))
            .await?;
        let newest = latest
            .iter()
            .filter_map(|row| row.get("date").and_then(Value::as_i64))
            .max();
        if let Some(newest) = newest {
            let newest = PlatformTime(newest).to_unix_seconds();
            if newest < after {
                debug!(
                    chat_id = %chat.chat_id,
                    newest,
                    after,
                    "last message predates bound, skipping read"
                );
                return Ok(Vec::new());
            }
        }

        let query = RowQuery::MessagesAfter {
            chat_id: chat.chat_id.clone(),
            after: PlatformTime::from_unix_seconds(after).as_nanos(),
            limit: self.limits.clamp(limit),
        };
        let rows = self.reader.read_rows(&query).await?;
        self.normalize(chat, rows).await
    }

    /// Conversations with activity at or after a Unix timestamp, or every
    /// conversation when the bound is zero or negative. No duplicates.
    pub async fn chats_active_since(
        &self,
        registry: &dyn ConversationRegistry,
        min_timestamp: f64,
    ) -> ServiceResult<Vec<ConversationHandle>> {
        let all = registry.all_conversations().await?;
        let selected: Vec<ConversationHandle> = if min_timestamp <= 0.0 {
            all
        } else {
            let since = PlatformTime::from_unix_seconds(min_timestamp).as_nanos();
            let rows = self
                .reader
                .read_rows(&RowQuery::ChatsActiveSince(since))
                .await?;
            let active: HashSet<&str> = rows
                .iter()
                .filter_map(|row| row.get("chat_id").and_then(Value::as_str))
                .collect();
            all.into_iter()
                .filter(|chat| active.contains(chat.chat_id.as_str()))
                .collect()
        };

        let mut seen = HashSet::new();
        Ok(selected
            .into_iter()
            .filter(|chat| seen.insert(chat.guid.format()))
            .collect())
    }

    /// Attachment metadata for `guids`; unknown guids are omitted.
    pub async fn attachments(&self, guids: &[String]) -> ServiceResult<Vec<AttachmentRef>> {
        if guids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .reader
            .read_rows(&RowQuery::AttachmentsByGuid(guids.to_vec()))
            .await?;
        Ok(rows.iter().filter_map(attachment_from_row).collect())
    }

    /// Decode, ingest and fold reactions for rows of one conversation.
    async fn normalize(
        &self,
        chat: &ConversationHandle,
        rows: Vec<Row>,
    ) -> ServiceResult<Vec<NormalizedItem>> {
        let mut ctx = IngestionContext::new(chat.guid.format());
        if let Some(service) = chat.service() {
            ctx = ctx.with_service(service.clone());
        }
        Ok(associate_reactions(normalize_rows(self, ctx, rows).await?))
    }
}

/// Rows to items with attachments preloaded in one read.
pub(crate) async fn normalize_rows(
    queries: &HistoryQueries,
    ctx: IngestionContext,
    rows: Vec<Row>,
) -> ServiceResult<Vec<NormalizedItem>> {
    let attachment_guids: Vec<String> = rows
        .iter()
        .filter_map(|row| row.get("attachment_guids").and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    let ctx = ctx.with_attachments(queries.attachments(&attachment_guids).await?);
    let records: Vec<_> = rows.iter().map(decode_row).collect();
    Ok(ingest_batch(&records, &ctx))
}

fn attachment_from_row(row: &Row) -> Option<AttachmentRef> {
    let text = |column: &str| row.get(column).and_then(Value::as_str).map(str::to_string);
    Some(AttachmentRef {
        guid: text("guid")?,
        mime_type: text("mime_type"),
        file_name: text("transfer_name"),
        path: text("filename"),
    })
}
