//! Conversation resolution and history reads on top of the service traits.

pub mod error;
pub mod memory;
pub mod pool;
pub mod queries;
pub mod resolvables;
pub mod resolver;

pub use {
    error::{Error, Result},
    memory::{MemoryStore, Snapshot},
    pool::ReaderPool,
    queries::HistoryQueries,
    resolvables::{ChatInfoResolver, ContactResolver, MessageResolver},
    resolver::ChatResolver,
};
