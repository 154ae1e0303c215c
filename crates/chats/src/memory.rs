//! In-memory backend loaded from a JSON snapshot.
//!
//! Message rows use the same columns as the history store (`guid`,
//! `chat_id`, `chat_guid`, `date`, `is_from_me`, `text`, ...).

use std::{collections::BTreeMap, path::Path};

use {
    async_trait::async_trait,
    imbridge_guid::{Guid, Service},
    imbridge_service_traits::{
        Contact, ContactDirectory, ConversationHandle, ConversationRegistry, ReadApi, Row,
        RowQuery, ServiceResult,
    },
    serde::{Deserialize, Serialize},
    serde_json::{Value, json},
    tokio::sync::RwLock,
    tracing::{debug, info},
};

use crate::error::{Context, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub chats: Vec<ConversationHandle>,
    #[serde(default)]
    pub messages: Vec<Row>,
    #[serde(default)]
    pub attachments: Vec<Row>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

/// Read API, conversation registry and contact directory over a
/// [`Snapshot`]. Reads never add conversations; only `create_direct` does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Snapshot>,
}

fn date(row: &Row) -> i64 {
    row.get("date").and_then(Value::as_i64).unwrap_or(0)
}

fn column<'a>(row: &'a Row, name: &str) -> Option<&'a str> {
    row.get(name).and_then(Value::as_str)
}

fn in_chat<'a>(rows: &'a [Row], chat_id: &'a str) -> impl Iterator<Item = &'a Row> + 'a {
    rows.iter()
        .filter(move |row| column(row, "chat_id") == Some(chat_id))
}

impl MemoryStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        let snapshot = serde_json::from_str::<Snapshot>(&raw)
            .with_context(|| format!("invalid snapshot {}", path.display()))?;
        info!(
            path = %path.display(),
            chats = snapshot.chats.len(),
            messages = snapshot.messages.len(),
            "loaded snapshot"
        );
        Ok(Self::new(snapshot))
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.read().await.clone()
    }
}

#[async_trait]
impl ReadApi for MemoryStore {
    async fn read_rows(&self, query: &RowQuery) -> ServiceResult<Vec<Row>> {
        let snapshot = self.inner.read().await;
        let rows = match query {
            RowQuery::MessagesByGuid(guids) => snapshot
                .messages
                .iter()
                .filter(|row| column(row, "guid").is_some_and(|g| guids.iter().any(|x| x == g)))
                .cloned()
                .collect(),
            RowQuery::RecentMessages { chat_id, limit } => {
                let mut rows: Vec<Row> = in_chat(&snapshot.messages, chat_id).cloned().collect();
                rows.sort_by_key(date);
                let skip = rows.len().saturating_sub(*limit);
                rows.split_off(skip)
            },
            RowQuery::MessagesAfter {
                chat_id,
                after,
                limit,
            } => {
                let mut rows: Vec<Row> = in_chat(&snapshot.messages, chat_id)
                    .filter(|row| date(row) > *after)
                    .cloned()
                    .collect();
                rows.sort_by_key(date);
                rows.truncate(*limit);
                rows
            },
            RowQuery::LatestMessageTimestamps(chat_ids) => {
                let mut latest: BTreeMap<&str, i64> = BTreeMap::new();
                for row in &snapshot.messages {
                    let Some(chat_id) = column(row, "chat_id") else {
                        continue;
                    };
                    if chat_ids.iter().any(|c| c == chat_id) {
                        let entry = latest.entry(chat_id).or_insert(i64::MIN);
                        *entry = (*entry).max(date(row));
                    }
                }
                latest
                    .into_iter()
                    .filter_map(|(chat_id, date)| match json!({ "chat_id": chat_id, "date": date }) {
                        Value::Object(row) => Some(row),
                        _ => None,
                    })
                    .collect()
            },
            RowQuery::ChatsActiveSince(since) => {
                let mut active: Vec<&str> = snapshot
                    .messages
                    .iter()
                    .filter(|row| date(row) >= *since)
                    .filter_map(|row| column(row, "chat_id"))
                    .collect();
                active.sort_unstable();
                active.dedup();
                active
                    .into_iter()
                    .filter_map(|chat_id| match json!({ "chat_id": chat_id }) {
                        Value::Object(row) => Some(row),
                        _ => None,
                    })
                    .collect()
            },
            RowQuery::AttachmentsByGuid(guids) => snapshot
                .attachments
                .iter()
                .filter(|row| column(row, "guid").is_some_and(|g| guids.iter().any(|x| x == g)))
                .cloned()
                .collect(),
        };
        debug!(query = query.kind(), rows = rows.len(), "memory read");
        Ok(rows)
    }
}

#[async_trait]
impl ConversationRegistry for MemoryStore {
    async fn lookup_existing(&self, formatted: &str) -> ServiceResult<Option<ConversationHandle>> {
        let snapshot = self.inner.read().await;
        Ok(snapshot
            .chats
            .iter()
            .find(|chat| chat.guid.format() == formatted)
            .cloned())
    }

    async fn open_or_create_direct(
        &self,
        local: &str,
        service: &Service,
    ) -> ServiceResult<Option<ConversationHandle>> {
        let guid = Guid::direct(service.clone(), local);
        let snapshot = self.inner.read().await;
        Ok(snapshot.chats.iter().find(|chat| chat.guid == guid).cloned())
    }

    async fn create_direct(
        &self,
        local: &str,
        service: &Service,
    ) -> ServiceResult<Option<ConversationHandle>> {
        let guid = Guid::direct(service.clone(), local);
        let mut snapshot = self.inner.write().await;
        if let Some(existing) = snapshot.chats.iter().find(|chat| chat.guid == guid) {
            return Ok(Some(existing.clone()));
        }
        let handle = ConversationHandle {
            guid,
            chat_id: local.to_string(),
            display_name: None,
            participants: vec![local.to_string()],
            avatar_guid: None,
        };
        debug!(chat_guid = %handle.guid, "created direct conversation");
        snapshot.chats.push(handle.clone());
        Ok(Some(handle))
    }

    async fn all_conversations(&self) -> ServiceResult<Vec<ConversationHandle>> {
        Ok(self.inner.read().await.chats.clone())
    }
}

#[async_trait]
impl ContactDirectory for MemoryStore {
    async fn contacts_for(&self, handle_ids: &[String]) -> ServiceResult<Vec<Contact>> {
        let snapshot = self.inner.read().await;
        Ok(handle_ids
            .iter()
            .filter_map(|id| {
                snapshot
                    .contacts
                    .iter()
                    .find(|c| &c.handle_id == id || c.phones.contains(id) || c.emails.contains(id))
                    .map(|c| Contact {
                        handle_id: id.clone(),
                        ..c.clone()
                    })
            })
            .collect())
    }
}
