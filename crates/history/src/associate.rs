use {crate::item::NormalizedItem, std::collections::HashMap};

/// Fold reactions onto their target message when it is in the same batch.
///
/// Reactions whose target is elsewhere stay at the top level. Relative
/// order of the remaining items is kept and no identity field changes.
pub fn associate_reactions(items: Vec<NormalizedItem>) -> Vec<NormalizedItem> {
    let message_index: HashMap<String, usize> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match item {
            NormalizedItem::Message(m) => Some((m.header.id.clone(), i)),
            _ => None,
        })
        .collect();

    let mut slots: Vec<Option<NormalizedItem>> = items.into_iter().map(Some).collect();
    for i in 0..slots.len() {
        let target = match &slots[i] {
            Some(NormalizedItem::Reaction(r)) => message_index.get(&r.target_message_id).copied(),
            _ => None,
        };
        let Some(target) = target else {
            continue;
        };
        if let Some(NormalizedItem::Reaction(reaction)) = slots[i].take()
            && let Some(NormalizedItem::Message(message)) = slots[target].as_mut()
        {
            message.reactions.push(reaction);
        }
    }
    slots.into_iter().flatten().collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            context::IngestionContext,
            ingest::ingest,
            reaction::{ReactionCode, Tapback},
            record::{AcknowledgmentRecord, MessageRecord},
        },
    };

    fn message(guid: &str) -> NormalizedItem {
        ingest(
            &MessageRecord {
                guid: guid.into(),
                ..Default::default()
            },
            &IngestionContext::new("c"),
        )
    }

    fn reaction(guid: &str, target: &str) -> NormalizedItem {
        ingest(
            &AcknowledgmentRecord {
                guid: guid.into(),
                associated_guid: target.into(),
                associated_type: 2003,
                ..Default::default()
            },
            &IngestionContext::new("c"),
        )
    }

    #[test]
    fn attaches_in_batch_reactions() {
        let items = associate_reactions(vec![
            message("m1"),
            reaction("r1", "m1"),
            reaction("r2", "elsewhere"),
            message("m2"),
            reaction("r3", "m1"),
        ]);
        let ids: Vec<_> = items.iter().map(NormalizedItem::id).collect();
        assert_eq!(ids, vec!["m1", "r2", "m2"]);

        let NormalizedItem::Message(m1) = &items[0] else {
            panic!("expected message");
        };
        let attached: Vec<_> = m1.reactions.iter().map(|r| r.header.id.as_str()).collect();
        assert_eq!(attached, vec!["r1", "r3"]);
        assert_eq!(m1.reactions[0].code, ReactionCode::Add(Tapback::Laugh));
    }

    #[test]
    fn reaction_before_target_still_attaches() {
        let items = associate_reactions(vec![reaction("r1", "m1"), message("m1")]);
        assert_eq!(items.len(), 1);
        let NormalizedItem::Message(m1) = &items[0] else {
            panic!("expected message");
        };
        assert_eq!(m1.reactions.len(), 1);
    }

    #[test]
    fn empty_batch() {
        assert!(associate_reactions(Vec::new()).is_empty());
    }
}
