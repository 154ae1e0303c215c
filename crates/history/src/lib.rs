//! Normalization of native conversation-history records.
//!
//! Every raw record goes through [`ingest`] and comes out as exactly one
//! [`NormalizedItem`]. Records no registered shape recognises become
//! [`NormalizedItem::Phantom`] instead of being dropped.

pub mod associate;
pub mod context;
pub mod ingest;
pub mod item;
pub mod reaction;
pub mod record;
pub mod rows;
pub mod time;

pub use {
    associate::associate_reactions,
    context::{AttachmentRef, IngestionContext},
    ingest::{Shape, ShapeRegistry, ingest, ingest_batch},
    item::{ItemHeader, MessageItem, NormalizedItem, PhantomItem, ReactionItem},
    reaction::{ReactionCode, Tapback},
    record::{AcknowledgmentRecord, MessageRecord, NativeRecord, OpaqueRecord, ThreadMetadata},
    rows::decode_row,
    time::PlatformTime,
};
