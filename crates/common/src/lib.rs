//! Error plumbing shared by every imbridge crate.

pub mod error;

pub use error::FromMessage;
