//! Shape registry and the total `ingest` function.

use std::sync::LazyLock;

use {
    imbridge_guid::Service,
    tracing::{debug, trace},
};

use crate::{
    context::IngestionContext,
    item::{ItemHeader, MessageItem, NormalizedItem, PhantomItem, ReactionItem},
    reaction::ReactionCode,
    record::{AcknowledgmentRecord, MessageRecord, NativeRecord},
    time::PlatformTime,
};

pub type ShapePredicate = fn(&dyn NativeRecord) -> bool;
pub type ShapeConstructor = fn(&dyn NativeRecord, &IngestionContext) -> Option<NormalizedItem>;

/// A recognised native shape: a predicate and the constructor run when it
/// matches. A constructor returning `None` means the record matched but
/// lacked what the variant needs; it is then ingested as a phantom.
#[derive(Clone, Copy)]
pub struct Shape {
    pub name: &'static str,
    pub matches: ShapePredicate,
    pub build: ShapeConstructor,
}

/// Ordered list of shapes; first match wins.
#[derive(Clone, Default)]
pub struct ShapeRegistry {
    shapes: Vec<Shape>,
}

static BUILTIN: LazyLock<ShapeRegistry> = LazyLock::new(ShapeRegistry::builtin);

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acknowledgments, then messages.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Shape {
            name: "acknowledgment",
            matches: |raw| raw.as_any().is::<AcknowledgmentRecord>(),
            build: build_reaction,
        });
        registry.register(Shape {
            name: "message",
            matches: |raw| raw.as_any().is::<MessageRecord>(),
            build: build_message,
        });
        registry
    }

    /// Append a shape after the existing ones.
    pub fn register(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    pub fn shape_names(&self) -> Vec<&'static str> {
        self.shapes.iter().map(|s| s.name).collect()
    }

    /// Normalize one record. Never fails.
    pub fn ingest(&self, raw: &dyn NativeRecord, ctx: &IngestionContext) -> NormalizedItem {
        if let Some(shape) = self.shapes.iter().find(|shape| (shape.matches)(raw)) {
            trace!(shape = shape.name, type_name = raw.type_name(), "matched native shape");
            if let Some(item) = (shape.build)(raw, ctx) {
                return item;
            }
            debug!(
                shape = shape.name,
                type_name = raw.type_name(),
                "native record matched but could not be built"
            );
        }
        phantom(raw, ctx)
    }

    pub fn ingest_batch(
        &self,
        records: &[Box<dyn NativeRecord>],
        ctx: &IngestionContext,
    ) -> Vec<NormalizedItem> {
        records
            .iter()
            .map(|raw| self.ingest(raw.as_ref(), ctx))
            .collect()
    }
}

/// Normalize one record with the built-in shapes.
pub fn ingest(raw: &dyn NativeRecord, ctx: &IngestionContext) -> NormalizedItem {
    BUILTIN.ingest(raw, ctx)
}

/// Normalize every record with the built-in shapes, preserving order.
pub fn ingest_batch(records: &[Box<dyn NativeRecord>], ctx: &IngestionContext) -> Vec<NormalizedItem> {
    BUILTIN.ingest_batch(records, ctx)
}

fn header(
    raw: &dyn NativeRecord,
    id: &str,
    chat_guid: Option<&str>,
    from_me: bool,
    date: i64,
    ctx: &IngestionContext,
) -> ItemHeader {
    let thread = raw.thread_metadata();
    ItemHeader {
        id: id.to_string(),
        chat_id: chat_guid
            .or(ctx.chat_id.as_deref())
            .unwrap_or_default()
            .to_string(),
        from_me,
        time: PlatformTime(date),
        thread_identifier: thread.and_then(|t| t.thread_identifier()).map(str::to_string),
        thread_originator: thread.and_then(|t| t.thread_originator()).map(str::to_string),
    }
}

fn build_message(raw: &dyn NativeRecord, ctx: &IngestionContext) -> Option<NormalizedItem> {
    let record = raw.as_any().downcast_ref::<MessageRecord>()?;
    if record.guid.is_empty() {
        return None;
    }
    let service = record
        .service
        .as_deref()
        .map(Service::from_tag)
        .or_else(|| ctx.service.clone());
    Some(NormalizedItem::Message(MessageItem {
        header: header(
            raw,
            &record.guid,
            record.chat_guid.as_deref(),
            record.from_me,
            record.date,
            ctx,
        ),
        sender: record.sender.clone(),
        service,
        text: record.text.clone(),
        subject: record.subject.clone(),
        attachments: record
            .attachment_guids
            .iter()
            .map(|guid| ctx.attachment(guid))
            .collect(),
        reactions: Vec::new(),
    }))
}

fn build_reaction(raw: &dyn NativeRecord, ctx: &IngestionContext) -> Option<NormalizedItem> {
    let record = raw.as_any().downcast_ref::<AcknowledgmentRecord>()?;
    let target = record.target_guid();
    if record.guid.is_empty() || target.is_empty() {
        return None;
    }
    Some(NormalizedItem::Reaction(ReactionItem {
        header: header(
            raw,
            &record.guid,
            record.chat_guid.as_deref(),
            record.from_me,
            record.date,
            ctx,
        ),
        sender: record.sender.clone(),
        target_message_id: target.to_string(),
        code: ReactionCode::from_raw(record.associated_type),
    }))
}

fn phantom(raw: &dyn NativeRecord, ctx: &IngestionContext) -> NormalizedItem {
    let type_name = match raw.type_name() {
        "" => "<unnamed>",
        name => name,
    };
    let id = uuid::Uuid::new_v4().to_string();
    debug!(type_name, id = %id, "unrecognized native record, ingesting as phantom");
    NormalizedItem::Phantom(PhantomItem {
        header: ItemHeader {
            id,
            chat_id: ctx.chat_id.clone().unwrap_or_default(),
            from_me: false,
            time: PlatformTime::ZERO,
            thread_identifier: None,
            thread_originator: None,
        },
        type_name: type_name.to_string(),
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{reaction::Tapback, record::OpaqueRecord},
        std::any::Any,
        tracing_test::traced_test,
    };

    struct Mystery;

    impl NativeRecord for Mystery {
        fn type_name(&self) -> &str {
            "MysteryChatItem"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn message(guid: &str) -> MessageRecord {
        MessageRecord {
            guid: guid.into(),
            from_me: true,
            date: 42,
            text: Some("hi".into()),
            ..Default::default()
        }
    }

    #[test]
    fn message_populates_common_fields() {
        let ctx = IngestionContext::new("iMessage;-;+15551234567").with_service(Service::Primary);
        let mut record = message("m1");
        record.thread_originator_guid = Some("root".into());
        record.attachment_guids = vec!["att1".into()];

        let NormalizedItem::Message(item) = ingest(&record, &ctx) else {
            panic!("expected message");
        };
        assert_eq!(item.header.id, "m1");
        assert_eq!(item.header.chat_id, "iMessage;-;+15551234567");
        assert!(item.header.from_me);
        assert_eq!(item.header.time, PlatformTime(42));
        assert_eq!(item.header.thread_originator.as_deref(), Some("root"));
        assert_eq!(item.header.thread_identifier, None);
        assert_eq!(item.service, Some(Service::Primary));
        assert_eq!(item.attachments[0].guid, "att1");
        assert_eq!(item.text.as_deref(), Some("hi"));
    }

    #[test]
    fn record_chat_overrides_context() {
        let ctx = IngestionContext::new("ctx-chat");
        let mut record = message("m1");
        record.chat_guid = Some("SMS;+;chat9".into());
        record.service = Some("SMS".into());
        let item = ingest(&record, &ctx);
        assert_eq!(item.chat_id(), "SMS;+;chat9");
        let NormalizedItem::Message(item) = item else {
            panic!("expected message");
        };
        assert_eq!(item.service, Some(Service::Fallback));
    }

    #[test]
    fn acknowledgment_becomes_reaction() {
        let ack = AcknowledgmentRecord {
            guid: "r1".into(),
            associated_guid: "p:0/m1".into(),
            associated_type: 2001,
            ..Default::default()
        };
        let NormalizedItem::Reaction(item) = ingest(&ack, &IngestionContext::new("c")) else {
            panic!("expected reaction");
        };
        assert_eq!(item.target_message_id, "m1");
        assert_eq!(item.code, ReactionCode::Add(Tapback::Like));
        assert_eq!(item.header.thread_originator, None);
    }

    #[test]
    fn unknown_reaction_code_passes_through() {
        let ack = AcknowledgmentRecord {
            guid: "r1".into(),
            associated_guid: "m1".into(),
            associated_type: 2042,
            ..Default::default()
        };
        let NormalizedItem::Reaction(item) = ingest(&ack, &IngestionContext::default()) else {
            panic!("expected reaction");
        };
        assert_eq!(item.code, ReactionCode::Opaque(2042));
    }

    #[traced_test]
    #[test]
    fn unrecognized_record_becomes_phantom() {
        let ctx = IngestionContext::new("c");
        let first = ingest(&Mystery, &ctx);
        let second = ingest(&Mystery, &ctx);

        let NormalizedItem::Phantom(item) = &first else {
            panic!("expected phantom");
        };
        assert_eq!(item.type_name, "MysteryChatItem");
        assert!(!item.header.from_me);
        assert_eq!(item.header.time, PlatformTime::ZERO);
        assert_eq!(item.header.chat_id, "c");
        assert!(!item.header.id.is_empty());
        assert_ne!(first.id(), second.id());
        assert!(logs_contain("ingesting as phantom"));
        assert!(logs_contain("MysteryChatItem"));
    }

    #[test]
    fn opaque_record_and_unbuildable_shapes_are_phantoms() {
        let ctx = IngestionContext::default();
        let opaque = OpaqueRecord {
            type_name: "GroupTitleChangeItem".into(),
            ..Default::default()
        };
        let item = ingest(&opaque, &ctx);
        assert!(item.is_phantom());

        let no_target = AcknowledgmentRecord {
            guid: "r1".into(),
            ..Default::default()
        };
        let NormalizedItem::Phantom(item) = ingest(&no_target, &ctx) else {
            panic!("expected phantom");
        };
        assert_eq!(item.type_name, "AcknowledgmentRecord");

        let no_guid = message("");
        assert!(ingest(&no_guid, &ctx).is_phantom());
    }

    #[test]
    fn unnamed_record_still_has_diagnostic_name() {
        let opaque = OpaqueRecord::default();
        let NormalizedItem::Phantom(item) = ingest(&opaque, &IngestionContext::default()) else {
            panic!("expected phantom");
        };
        assert!(!item.type_name.is_empty());
    }

    #[test]
    fn empty_registry_yields_only_phantoms() {
        let registry = ShapeRegistry::new();
        let records: Vec<Box<dyn NativeRecord>> = vec![Box::new(message("m1")), Box::new(Mystery)];
        let items = registry.ingest_batch(&records, &IngestionContext::default());
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(NormalizedItem::is_phantom));
    }

    #[test]
    fn registered_shapes_extend_builtin() {
        let mut registry = ShapeRegistry::builtin();
        registry.register(Shape {
            name: "mystery",
            matches: |raw| raw.as_any().is::<Mystery>(),
            build: |_, ctx| {
                Some(NormalizedItem::Message(MessageItem {
                    header: ItemHeader {
                        id: "mystery".into(),
                        chat_id: ctx.chat_id.clone().unwrap_or_default(),
                        from_me: false,
                        time: PlatformTime::ZERO,
                        thread_identifier: None,
                        thread_originator: None,
                    },
                    sender: None,
                    service: None,
                    text: None,
                    subject: None,
                    attachments: Vec::new(),
                    reactions: Vec::new(),
                }))
            },
        });
        assert_eq!(registry.shape_names(), vec!["acknowledgment", "message", "mystery"]);
        assert_eq!(registry.ingest(&Mystery, &IngestionContext::default()).id(), "mystery");
    }

    #[test]
    fn batch_preserves_order_and_length() {
        let records: Vec<Box<dyn NativeRecord>> = vec![
            Box::new(message("m1")),
            Box::new(Mystery),
            Box::new(message("m2")),
        ];
        let items = ingest_batch(&records, &IngestionContext::new("c"));
        let kinds: Vec<_> = items.iter().map(NormalizedItem::kind).collect();
        assert_eq!(kinds, vec!["message", "phantom", "message"]);
        assert_eq!(items[2].id(), "m2");
    }
}
