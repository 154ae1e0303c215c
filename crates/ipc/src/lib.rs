//! Command dispatch and request/reply correlation over a byte stream.
//!
//! - [`codec`]: newline-delimited JSON frames <-> [`Envelope`]s
//! - [`dispatch`]: command registry and per-request state machine
//! - [`channel`]: outgoing requests with correlation + timeout, and the
//!   serve loop that routes replies and dispatches inbound commands
//! - [`handlers`]: the built-in bridge commands
//! - [`log_forward`]: optional tracing layer that streams logs to the peer
//!
//! [`Envelope`]: imbridge_protocol::Envelope

pub mod channel;
pub mod codec;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod log_forward;

pub use {
    channel::{ChannelOptions, IpcChannel},
    dispatch::{CommandContext, CommandRegistry, DispatchOutcome, DispatchState},
    error::{DispatchError, TransportError},
    handlers::{BridgeServices, register_bridge_commands},
    log_forward::{LogForwardLayer, forward_logs, log_forwarder},
};

/// Target used when re-emitting log lines received from the peer.
pub const PEER_LOG_TARGET: &str = "imbridge::peer";
