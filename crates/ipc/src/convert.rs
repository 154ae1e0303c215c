//! Domain values to wire shapes.

use {
    imbridge_history::{AttachmentRef, NormalizedItem, ReactionItem},
    imbridge_protocol::{WireAttachment, WireChat, WireContact, WireMessage, WireTapback},
    imbridge_service_traits::{Contact, ConversationHandle},
};

pub fn chat(handle: &ConversationHandle) -> WireChat {
    WireChat {
        chat_guid: handle.guid.format(),
        title: handle.display_name.clone(),
        members: handle.participants.clone(),
        service: handle.service().map(ToString::to_string),
    }
}

pub fn contact(contact: Contact, user_guid: &str) -> WireContact {
    WireContact {
        user_guid: user_guid.to_string(),
        first_name: contact.first_name,
        last_name: contact.last_name,
        nickname: contact.nickname,
        avatar_path: contact.avatar_path,
        phones: contact.phones,
        emails: contact.emails,
        primary_identifier: Some(contact.handle_id),
    }
}

pub fn attachment(attachment: &AttachmentRef) -> WireAttachment {
    WireAttachment {
        guid: attachment.guid.clone(),
        mime_type: attachment.mime_type.clone(),
        file_name: attachment.file_name.clone(),
        path_on_disk: attachment.path.clone(),
    }
}

fn tapback(reaction: &ReactionItem) -> WireTapback {
    WireTapback {
        target_guid: reaction.target_message_id.clone(),
        kind: reaction.code.raw(),
        sender_guid: reaction.sender.clone(),
        is_from_me: reaction.header.from_me,
    }
}

pub fn message(item: &NormalizedItem) -> WireMessage {
    let header = item.header();
    let mut wire = WireMessage {
        guid: header.id.clone(),
        chat_guid: header.chat_id.clone(),
        time: header.time.to_unix_seconds(),
        is_from_me: header.from_me,
        sender_guid: None,
        service: None,
        subject: None,
        text: None,
        attachments: Vec::new(),
        thread_identifier: header.thread_identifier.clone(),
        thread_originator_guid: header.thread_originator.clone(),
        tapback: None,
        reactions: Vec::new(),
        phantom_type: None,
    };
    match item {
        NormalizedItem::Message(m) => {
            wire.sender_guid = m.sender.clone();
            wire.service = m.service.as_ref().map(ToString::to_string);
            wire.subject = m.subject.clone();
            wire.text = m.text.clone();
            wire.attachments = m.attachments.iter().map(attachment).collect();
            wire.reactions = m.reactions.iter().map(tapback).collect();
        },
        NormalizedItem::Reaction(r) => {
            wire.sender_guid = r.sender.clone();
            wire.tapback = Some(tapback(r));
        },
        NormalizedItem::Phantom(p) => {
            wire.phantom_type = Some(p.type_name.clone());
        },
    }
    wire
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        imbridge_history::{
            AcknowledgmentRecord, IngestionContext, MessageRecord, OpaqueRecord, ingest,
        },
    };

    #[test]
    fn message_fields() {
        let item = ingest(
            &MessageRecord {
                guid: "m1".into(),
                text: Some("hi".into()),
                service: Some("SMS".into()),
                attachment_guids: vec!["a1".into()],
                ..Default::default()
            },
            &IngestionContext::new("SMS;-;+15551234567"),
        );
        let wire = message(&item);
        assert_eq!(wire.guid, "m1");
        assert_eq!(wire.chat_guid, "SMS;-;+15551234567");
        assert_eq!(wire.time, 978_307_200.0);
        assert_eq!(wire.service.as_deref(), Some("SMS"));
        assert_eq!(wire.attachments[0].guid, "a1");
        assert!(wire.tapback.is_none());
    }

    #[test]
    fn reaction_and_phantom() {
        let ctx = IngestionContext::new("c");
        let reaction = message(&ingest(
            &AcknowledgmentRecord {
                guid: "r1".into(),
                associated_guid: "bp:m1".into(),
                associated_type: 3005,
                from_me: true,
                ..Default::default()
            },
            &ctx,
        ));
        let tapback = reaction.tapback.unwrap();
        assert_eq!(tapback.target_guid, "m1");
        assert_eq!(tapback.kind, 3005);
        assert!(tapback.is_from_me);

        let phantom = message(&ingest(
            &OpaqueRecord {
                type_name: "ParticipantChangeItem".into(),
                ..Default::default()
            },
            &ctx,
        ));
        assert_eq!(phantom.phantom_type.as_deref(), Some("ParticipantChangeItem"));
        assert!(!phantom.is_from_me);
    }
}
