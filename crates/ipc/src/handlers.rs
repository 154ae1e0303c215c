//! Built-in bridge commands.

use std::sync::Arc;

use {
    imbridge_chats::{ChatInfoResolver, ChatResolver, ContactResolver, HistoryQueries},
    imbridge_config::HistoryConfig,
    imbridge_guid::{Guid, HandleKind, Service},
    imbridge_protocol::{
        Ack, ErrorShape, Response, commands,
        payloads::{
            GetChatRequest, GetChatsRequest, GetContactRequest, GetMessagesAfterRequest,
            GetRecentMessagesRequest, LogRequest, PrepareDmRequest, ResolveIdentifierRequest,
            ResolveIdentifierResponse,
        },
    },
    imbridge_service_traits::{
        ContactDirectory, ConversationHandle, ConversationRegistry, ReadApi, Resolver,
    },
    serde::de::IgnoredAny,
    tracing::{Level, debug, event, info},
};

use crate::{PEER_LOG_TARGET, convert, dispatch::CommandRegistry};

type HandlerResult = Result<Response, ErrorShape>;

/// Everything the command handlers read from.
#[derive(Clone)]
pub struct BridgeServices {
    pub chats: ChatResolver,
    pub chat_info: ChatInfoResolver,
    pub contacts: ContactResolver,
    pub history: HistoryQueries,
}

impl BridgeServices {
    pub fn new(
        registry: Arc<dyn ConversationRegistry>,
        directory: Arc<dyn ContactDirectory>,
        reader: Arc<dyn ReadApi>,
        limits: HistoryConfig,
    ) -> Self {
        let chats = ChatResolver::new(registry);
        Self {
            chat_info: ChatInfoResolver::new(chats.clone()),
            chats,
            contacts: ContactResolver::new(directory),
            history: HistoryQueries::new(reader, limits),
        }
    }

    async fn require_chat(&self, chat_guid: &str) -> Result<ConversationHandle, ErrorShape> {
        self.chat_info
            .resolve_one(&Guid::parse(chat_guid))
            .await?
            .ok_or_else(|| ErrorShape::not_found(format!("chat not found: {chat_guid}")))
    }

    async fn get_chats(&self, req: GetChatsRequest) -> HandlerResult {
        let chats = self
            .history
            .chats_active_since(self.chats.registry().as_ref(), req.min_timestamp)
            .await?;
        debug!(count = chats.len(), min_timestamp = req.min_timestamp, "listed chats");
        Ok(Response::ChatsResolved(
            chats.iter().map(|chat| chat.guid.format()).collect(),
        ))
    }

    async fn get_chat(&self, req: GetChatRequest) -> HandlerResult {
        let chat = self.require_chat(&req.chat_guid).await?;
        Ok(Response::ChatResolved(convert::chat(&chat)))
    }

    async fn get_chat_avatar(&self, req: GetChatRequest) -> HandlerResult {
        let chat = self.require_chat(&req.chat_guid).await?;
        let Some(avatar_guid) = chat.avatar_guid else {
            return Ok(Response::ChatAvatar(None));
        };
        let found = self.history.attachments(&[avatar_guid]).await?;
        Ok(Response::ChatAvatar(found.first().map(convert::attachment)))
    }

    async fn get_contact(&self, req: GetContactRequest) -> HandlerResult {
        let Some(contact) = self.contacts.resolve_one(&req.user_guid).await? else {
            return Err(ErrorShape::not_found(format!(
                "contact not found: {}",
                req.user_guid
            )));
        };
        Ok(Response::Contact(convert::contact(contact, &req.user_guid)))
    }

    async fn get_recent_messages(&self, req: GetRecentMessagesRequest) -> HandlerResult {
        let chat = self.require_chat(&req.chat_guid).await?;
        let items = self.history.recent_messages(&chat, req.limit).await?;
        Ok(Response::Messages(items.iter().map(convert::message).collect()))
    }

    async fn get_messages_after(&self, req: GetMessagesAfterRequest) -> HandlerResult {
        let chat = self.require_chat(&req.chat_guid).await?;
        let items = self
            .history
            .messages_after(&chat, req.timestamp, req.limit)
            .await?;
        Ok(Response::Messages(items.iter().map(convert::message).collect()))
    }

    /// Direct chat guid for an identifier: an existing or openable chat,
    /// else the fallback service when the handle is addressable.
    async fn resolve_identifier(&self, req: ResolveIdentifierRequest) -> HandlerResult {
        let parsed = Guid::parse(&req.identifier);
        let target = if parsed.is_qualified() {
            parsed
        } else {
            Guid::direct(Service::Primary, parsed.local())
        };
        if let Some(chat) = self.chats.resolve_chat(&target).await? {
            return Ok(Response::Guid(ResolveIdentifierResponse {
                guid: chat.guid.format(),
            }));
        }
        if HandleKind::classify(target.local()).is_addressable() {
            let guid = Guid::direct(Service::Fallback, target.local()).format();
            info!(identifier = %req.identifier, %guid, "identifier unresolved, answering with fallback service");
            return Ok(Response::Guid(ResolveIdentifierResponse { guid }));
        }
        Err(ErrorShape::not_found(format!(
            "cannot resolve identifier: {}",
            req.identifier
        )))
    }

    async fn prepare_dm(&self, req: PrepareDmRequest) -> HandlerResult {
        let guid = Guid::parse(&req.guid);
        let service = match guid.service() {
            Some(Service::Primary) => Service::Primary,
            Some(Service::Fallback) => Service::Fallback,
            _ => {
                return Err(ErrorShape::invalid_payload(format!(
                    "unsupported service in {}",
                    req.guid
                )));
            },
        };
        let Some(chat) = self
            .chats
            .registry()
            .create_direct(guid.local(), &service)
            .await?
        else {
            return Err(ErrorShape::not_found(format!(
                "cannot open chat: {}",
                req.guid
            )));
        };
        info!(chat_guid = %chat.guid, %service, "prepared direct chat");
        Ok(Response::Ack(Ack {}))
    }
}

/// Register every built-in command on `registry`.
pub fn register_bridge_commands(registry: &mut CommandRegistry, services: Arc<BridgeServices>) {
    let s = Arc::clone(&services);
    registry.register(commands::GET_CHATS, move |req: Option<GetChatsRequest>, _ctx| {
        let s = Arc::clone(&s);
        async move { s.get_chats(req.unwrap_or_default()).await }
    });

    let s = Arc::clone(&services);
    registry.register(commands::GET_CHAT, move |req: GetChatRequest, _ctx| {
        let s = Arc::clone(&s);
        async move { s.get_chat(req).await }
    });

    let s = Arc::clone(&services);
    registry.register(commands::GET_CHAT_AVATAR, move |req: GetChatRequest, _ctx| {
        let s = Arc::clone(&s);
        async move { s.get_chat_avatar(req).await }
    });

    let s = Arc::clone(&services);
    registry.register(commands::GET_CONTACT, move |req: GetContactRequest, _ctx| {
        let s = Arc::clone(&s);
        async move { s.get_contact(req).await }
    });

    let s = Arc::clone(&services);
    registry.register(commands::GET_RECENT_MESSAGES, move |req: GetRecentMessagesRequest, _ctx| {
        let s = Arc::clone(&s);
        async move { s.get_recent_messages(req).await }
    });

    let s = Arc::clone(&services);
    registry.register(commands::GET_MESSAGES_AFTER, move |req: GetMessagesAfterRequest, _ctx| {
        let s = Arc::clone(&s);
        async move { s.get_messages_after(req).await }
    });

    let s = Arc::clone(&services);
    registry.register(commands::RESOLVE_IDENTIFIER, move |req: ResolveIdentifierRequest, _ctx| {
        let s = Arc::clone(&s);
        async move { s.resolve_identifier(req).await }
    });

    let s = Arc::clone(&services);
    registry.register(commands::PREPARE_DM, move |req: PrepareDmRequest, _ctx| {
        let s = Arc::clone(&s);
        async move { s.prepare_dm(req).await }
    });

    registry.register(commands::PING, |_: IgnoredAny, _ctx| async {
        Ok(Response::Ack(Ack {}))
    });

    registry.register_one_way(commands::LOG, |req: LogRequest, _ctx| async move {
        reemit(&req);
    });
}

/// Re-emit a peer log line locally under [`PEER_LOG_TARGET`].
fn reemit(req: &LogRequest) {
    let module = req.module.as_str();
    let metadata = serde_json::Value::Object(req.metadata.clone());
    let message = req.message.as_str();
    match req.level.to_ascii_lowercase().as_str() {
        "trace" => {
            event!(target: PEER_LOG_TARGET, Level::TRACE, module, %metadata, "{message}")
        },
        "debug" => {
            event!(target: PEER_LOG_TARGET, Level::DEBUG, module, %metadata, "{message}")
        },
        "warn" | "warning" => {
            event!(target: PEER_LOG_TARGET, Level::WARN, module, %metadata, "{message}")
        },
        "error" | "fatal" => {
            event!(target: PEER_LOG_TARGET, Level::ERROR, module, %metadata, "{message}")
        },
        _ => event!(target: PEER_LOG_TARGET, Level::INFO, module, %metadata, "{message}"),
    }
}
