//! Service trait interfaces shared by the bridge crates.
//!
//! - [`Resolver`]: bulk-first resolution of identifiers into entities.
//! - [`ReadApi`]: read-only row access to the history store.
//! - [`ConversationRegistry`]: lookup / open of live conversations.
//! - [`ContactDirectory`]: contact cards for participant handles.
//!
//! Each collaborator trait has a `Noop` implementation that finds nothing,
//! so the dispatcher can run before a real backend is wired in.

use {
    async_trait::async_trait,
    imbridge_guid::{Guid, Service},
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
    tracing::debug,
};

/// Error type returned by service methods.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{message}")]
    Message { message: String },
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ServiceError {
    #[must_use]
    pub fn message(message: impl std::fmt::Display) -> Self {
        Self::Message {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

impl From<String> for ServiceError {
    fn from(value: String) -> Self {
        Self::message(value)
    }
}

impl From<&str> for ServiceError {
    fn from(value: &str) -> Self {
        Self::message(value)
    }
}

impl From<ServiceError> for imbridge_protocol::ErrorShape {
    fn from(err: ServiceError) -> Self {
        Self::internal(err.to_string())
    }
}

pub type ServiceResult<T = Value> = Result<T, ServiceError>;

// ── Resolution ──────────────────────────────────────────────────────────────

/// Turns identifiers into domain entities.
///
/// `resolve_many` is authoritative: unresolvable ids are omitted (not
/// errors) and output order is unspecified. `resolve_one` is always derived
/// from it so the single and bulk paths can never filter differently.
#[async_trait]
pub trait Resolver: Send + Sync {
    type Id: Clone + Send + Sync;
    type Entity: Send;

    async fn resolve_many(&self, ids: &[Self::Id]) -> ServiceResult<Vec<Self::Entity>>;

    async fn resolve_one(&self, id: &Self::Id) -> ServiceResult<Option<Self::Entity>> {
        Ok(self
            .resolve_many(std::slice::from_ref(id))
            .await?
            .into_iter()
            .next())
    }
}

// ── Read API ────────────────────────────────────────────────────────────────

/// One row from the history store, keyed by column name.
pub type Row = Map<String, Value>;

/// Queries understood by a [`ReadApi`]. Times are platform nanoseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowQuery {
    /// Message rows for the given message guids.
    MessagesByGuid(Vec<String>),
    /// Newest `limit` message rows of a chat, oldest first.
    RecentMessages { chat_id: String, limit: usize },
    /// Message rows of a chat strictly after `after`, oldest first.
    MessagesAfter {
        chat_id: String,
        after: i64,
        limit: usize,
    },
    /// `{chat_id, date}` of the newest message of each chat.
    LatestMessageTimestamps(Vec<String>),
    /// `{chat_id}` of every chat with a message at or after `since`.
    ChatsActiveSince(i64),
    /// Attachment rows for the given attachment guids.
    AttachmentsByGuid(Vec<String>),
}

impl RowQuery {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MessagesByGuid(_) => "messages_by_guid",
            Self::RecentMessages { .. } => "recent_messages",
            Self::MessagesAfter { .. } => "messages_after",
            Self::LatestMessageTimestamps(_) => "latest_message_timestamps",
            Self::ChatsActiveSince(_) => "chats_active_since",
            Self::AttachmentsByGuid(_) => "attachments_by_guid",
        }
    }
}

#[async_trait]
pub trait ReadApi: Send + Sync {
    async fn read_rows(&self, query: &RowQuery) -> ServiceResult<Vec<Row>>;
}

pub struct NoopReadApi;

#[async_trait]
impl ReadApi for NoopReadApi {
    async fn read_rows(&self, query: &RowQuery) -> ServiceResult<Vec<Row>> {
        debug!(query = query.kind(), "read api not configured");
        Ok(Vec::new())
    }
}

// ── Conversations ───────────────────────────────────────────────────────────

/// A live conversation known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHandle {
    pub guid: Guid,
    /// Store-level chat identifier used in row queries.
    pub chat_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub avatar_guid: Option<String>,
}

impl ConversationHandle {
    pub fn service(&self) -> Option<&Service> {
        self.guid.service()
    }
}

#[async_trait]
pub trait ConversationRegistry: Send + Sync {
    /// Exact match on the formatted identifier.
    async fn lookup_existing(&self, formatted: &str) -> ServiceResult<Option<ConversationHandle>>;

    /// Open a direct conversation with `local` on `service`. Registries
    /// backed by the live platform may create it; snapshot-backed ones
    /// only return an existing conversation. Called on every read path.
    async fn open_or_create_direct(
        &self,
        local: &str,
        service: &Service,
    ) -> ServiceResult<Option<ConversationHandle>>;

    /// Explicitly start a direct conversation, creating it when missing.
    /// Only used when the peer asks for a new DM.
    async fn create_direct(
        &self,
        local: &str,
        service: &Service,
    ) -> ServiceResult<Option<ConversationHandle>> {
        self.open_or_create_direct(local, service).await
    }

    async fn all_conversations(&self) -> ServiceResult<Vec<ConversationHandle>>;
}

pub struct NoopConversationRegistry;

#[async_trait]
impl ConversationRegistry for NoopConversationRegistry {
    async fn lookup_existing(&self, _formatted: &str) -> ServiceResult<Option<ConversationHandle>> {
        Ok(None)
    }

    async fn open_or_create_direct(
        &self,
        _local: &str,
        _service: &Service,
    ) -> ServiceResult<Option<ConversationHandle>> {
        Ok(None)
    }

    async fn all_conversations(&self) -> ServiceResult<Vec<ConversationHandle>> {
        Ok(Vec::new())
    }
}

// ── Contacts ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Handle this card was found for (phone number, email, ...).
    pub handle_id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar_path: Option<String>,
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(default)]
    pub emails: Vec<String>,
}

#[async_trait]
pub trait ContactDirectory: Send + Sync {
    /// Cards for the given handle ids; unknown handles are omitted.
    async fn contacts_for(&self, handle_ids: &[String]) -> ServiceResult<Vec<Contact>>;
}

pub struct NoopContactDirectory;

#[async_trait]
impl ContactDirectory for NoopContactDirectory {
    async fn contacts_for(&self, _handle_ids: &[String]) -> ServiceResult<Vec<Contact>> {
        Ok(Vec::new())
    }
}
