#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use {
    async_trait::async_trait,
    imbridge_chats::{
        ChatInfoResolver, ChatResolver, ContactResolver, HistoryQueries, MemoryStore,
        MessageResolver, ReaderPool,
    },
    imbridge_config::HistoryConfig,
    imbridge_guid::Guid,
    imbridge_history::{NormalizedItem, PlatformTime, ReactionCode, Tapback},
    imbridge_service_traits::{
        Contact, ContactDirectory, ConversationRegistry, ReadApi, Resolver, Row, RowQuery,
        ServiceResult,
    },
    serde_json::json,
};

fn platform_ns(unix_seconds: i64) -> i64 {
    PlatformTime::from_unix_seconds(unix_seconds as f64).as_nanos()
}

fn store() -> Arc<MemoryStore> {
    let snapshot = json!({
        "chats": [
            { "guid": "iMessage;-;+15551234567", "chat_id": "+15551234567", "participants": ["+15551234567"] },
            { "guid": "SMS;+;chat42", "chat_id": "chat42", "display_name": "Climbing" },
            { "guid": "SMS;+;chat42", "chat_id": "chat42" },
        ],
        "messages": [
            { "guid": "m1", "chat_id": "+15551234567", "chat_guid": "iMessage;-;+15551234567",
              "date": platform_ns(1_700_000_000), "text": "first", "attachment_guids": ["att1"] },
            { "guid": "r1", "chat_id": "+15551234567", "chat_guid": "iMessage;-;+15551234567",
              "date": platform_ns(1_700_000_010), "associated_message_guid": "p:0/m1",
              "associated_message_type": 2000, "is_from_me": 1 },
            { "guid": "g1", "chat_id": "+15551234567", "date": platform_ns(1_700_000_020),
              "item_type": 2, "class": "GroupTitleChangeItem" },
            { "guid": "m2", "chat_id": "+15551234567", "date": platform_ns(1_700_000_030), "text": "second" },
            { "guid": "c1", "chat_id": "chat42", "chat_guid": "SMS;+;chat42",
              "date": platform_ns(1_600_000_000), "text": "old" },
        ],
        "attachments": [
            { "guid": "att1", "mime_type": "image/jpeg", "transfer_name": "IMG_0001.jpg" }
        ],
        "contacts": [
            { "handle_id": "+15551234567", "first_name": "Ada", "last_name": "Lovelace" }
        ]
    });
    Arc::new(MemoryStore::from_json(&snapshot.to_string()).unwrap())
}

/// Records the kind of every query before delegating.
struct Counting {
    inner: Arc<MemoryStore>,
    queries: Mutex<Vec<&'static str>>,
}

#[async_trait]
impl ReadApi for Counting {
    async fn read_rows(&self, query: &RowQuery) -> ServiceResult<Vec<Row>> {
        self.queries.lock().unwrap().push(query.kind());
        self.inner.read_rows(query).await
    }
}

fn queries(api: Arc<dyn ReadApi>) -> HistoryQueries {
    HistoryQueries::new(Arc::new(ReaderPool::new(api, 2)), HistoryConfig::default())
}

#[tokio::test]
async fn recent_messages_fold_reactions_and_keep_phantoms() {
    let store = store();
    let chat = ChatResolver::new(store.clone())
        .resolve_raw("iMessage;-;+15551234567")
        .await
        .unwrap()
        .unwrap();
    let items = queries(store).recent_messages(&chat, None).await.unwrap();

    let kinds: Vec<_> = items.iter().map(NormalizedItem::kind).collect();
    assert_eq!(kinds, vec!["message", "phantom", "message"]);

    let NormalizedItem::Message(first) = &items[0] else {
        panic!("expected message");
    };
    assert_eq!(first.header.chat_id, "iMessage;-;+15551234567");
    assert_eq!(first.attachments[0].mime_type.as_deref(), Some("image/jpeg"));
    assert_eq!(first.attachments[0].file_name.as_deref(), Some("IMG_0001.jpg"));
    assert_eq!(first.reactions.len(), 1);
    assert_eq!(first.reactions[0].code, ReactionCode::Add(Tapback::Love));
    assert!(first.reactions[0].header.from_me);

    let NormalizedItem::Phantom(phantom) = &items[1] else {
        panic!("expected phantom");
    };
    assert_eq!(phantom.type_name, "GroupTitleChangeItem");
}

#[tokio::test]
async fn recent_messages_respect_limit() {
    let store = store();
    let chat = store_chat(&store, "iMessage;-;+15551234567").await;
    let items = queries(store).recent_messages(&chat, Some(1)).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id(), "m2");
}

async fn store_chat(
    store: &Arc<MemoryStore>,
    raw: &str,
) -> imbridge_service_traits::ConversationHandle {
    ChatResolver::new(store.clone())
        .resolve_raw(raw)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn messages_after_short_circuits_on_stale_chat() {
    let store = store();
    let chat = store_chat(&store, "SMS;+;chat42").await;
    let counting = Arc::new(Counting {
        inner: store,
        queries: Mutex::new(Vec::new()),
    });
    let items = queries(counting.clone())
        .messages_after(&chat, 1_650_000_000.0, None)
        .await
        .unwrap();
    assert!(items.is_empty());
    assert_eq!(*counting.queries.lock().unwrap(), vec!["latest_message_timestamps"]);
}

#[tokio::test]
async fn messages_after_reads_newer_messages() {
    let store = store();
    let chat = store_chat(&store, "iMessage;-;+15551234567").await;
    let items = queries(store)
        .messages_after(&chat, 1_700_000_015.0, Some(10))
        .await
        .unwrap();
    let ids: Vec<_> = items.iter().map(NormalizedItem::id).collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[1], "m2");
}

#[tokio::test]
async fn chats_active_since() {
    let store = store();
    let queries = queries(store.clone());

    let all = queries.chats_active_since(store.as_ref(), 0.0).await.unwrap();
    let guids: Vec<_> = all.iter().map(|c| c.guid.format()).collect();
    assert_eq!(guids, vec!["iMessage;-;+15551234567", "SMS;+;chat42"]);

    let recent = queries
        .chats_active_since(store.as_ref(), 1_650_000_000.0)
        .await
        .unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].guid.format(), "iMessage;-;+15551234567");
}

#[tokio::test]
async fn fallback_equivalence() {
    let store = store();
    let resolver = ChatResolver::new(store.clone());
    let via_fallback = resolver.resolve_raw("iMessage;+;chat42").await.unwrap();
    let direct = resolver.resolve_raw("SMS;+;chat42").await.unwrap();
    assert!(via_fallback.is_some());
    assert_eq!(via_fallback, direct);
}

#[tokio::test]
async fn fallback_equivalence_for_direct_handles() {
    let snapshot = json!({
        "chats": [
            { "guid": "SMS;-;+15557654321", "chat_id": "+15557654321" },
            { "guid": "SMS;-;ada@example.com", "chat_id": "ada@example.com" },
        ]
    });
    let store = Arc::new(MemoryStore::from_json(&snapshot.to_string()).unwrap());
    let resolver = ChatResolver::new(store.clone());

    for handle in ["+15557654321", "ada@example.com"] {
        let via_fallback = resolver
            .resolve_raw(&format!("iMessage;-;{handle}"))
            .await
            .unwrap();
        let direct = store
            .lookup_existing(&format!("SMS;-;{handle}"))
            .await
            .unwrap();
        assert!(via_fallback.is_some());
        assert_eq!(via_fallback, direct);
    }
    assert_eq!(store.all_conversations().await.unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_direct_handle_is_absent() {
    let store = store();
    let before = store.all_conversations().await.unwrap().len();
    let resolver = ChatResolver::new(store.clone());
    assert!(
        resolver
            .resolve_raw("iMessage;-;+19998887777")
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(store.all_conversations().await.unwrap().len(), before);
}

#[tokio::test]
async fn chat_info_resolver_omits_misses() {
    let store = store();
    let resolver = ChatInfoResolver::new(ChatResolver::new(store));
    let found = resolver
        .resolve_many(&[Guid::parse("SMS;+;chat42"), Guid::parse("iMessage;+;nowhere")])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert!(resolver.resolve_many(&[]).await.unwrap().is_empty());
    assert!(
        resolver
            .resolve_one(&Guid::parse("chat-none"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn message_resolver() {
    let store = store();
    let counting = Arc::new(Counting {
        inner: store,
        queries: Mutex::new(Vec::new()),
    });
    let resolver = MessageResolver::new(queries(counting.clone()));

    assert!(resolver.resolve_many(&[]).await.unwrap().is_empty());
    assert!(counting.queries.lock().unwrap().is_empty());

    assert!(resolver.resolve_many(&["missing".into()]).await.unwrap().is_empty());
    assert!(resolver.resolve_one(&"missing".into()).await.unwrap().is_none());

    let item = resolver.resolve_one(&"r1".into()).await.unwrap().unwrap();
    assert_eq!(item.kind(), "reaction");
    assert_eq!(item.chat_id(), "iMessage;-;+15551234567");
}

#[derive(Default)]
struct CountingDirectory {
    calls: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl ContactDirectory for CountingDirectory {
    async fn contacts_for(&self, handle_ids: &[String]) -> ServiceResult<Vec<Contact>> {
        self.calls.lock().unwrap().push(handle_ids.to_vec());
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn contact_resolver_batches_and_normalizes() {
    let directory = Arc::new(CountingDirectory::default());
    let resolver = ContactResolver::new(directory.clone());

    assert!(resolver.resolve_many(&[]).await.unwrap().is_empty());
    assert!(directory.calls.lock().unwrap().is_empty());

    resolver
        .resolve_many(&[
            "iMessage;-;+15551234567".into(),
            "+15551234567".into(),
            "a@b.co".into(),
        ])
        .await
        .unwrap();
    assert_eq!(*directory.calls.lock().unwrap(), vec![vec![
        "+15551234567".to_string(),
        "a@b.co".to_string()
    ]]);
}

#[tokio::test]
async fn contact_resolver_finds_cards() {
    let resolver = ContactResolver::new(store());
    let contact = resolver
        .resolve_one(&"iMessage;-;+15551234567".into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(contact.first_name.as_deref(), Some("Ada"));
    assert!(resolver.resolve_one(&"nobody".into()).await.unwrap().is_none());
}
