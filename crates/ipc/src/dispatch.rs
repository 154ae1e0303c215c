//! Command registry and the per-request dispatch state machine.
//!
//! ```text
//! Idle -> AwaitingDecode -> Executing -> Replied | Completed
//!                      \             \-> Failed
//!                       \-> Failed
//! Idle -> Ignored   (unknown command)
//! ```

use std::{collections::HashMap, fmt, future::Future, pin::Pin};

use {
    imbridge_protocol::{CorrelationId, Envelope, ErrorShape, Response},
    serde::de::DeserializeOwned,
    tracing::{debug, trace, warn},
};

use crate::error::DispatchError;

/// Request metadata passed to every handler.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub correlation_id: Option<CorrelationId>,
    pub command: String,
}

type ExecFuture = Pin<Box<dyn Future<Output = Result<Option<Response>, ErrorShape>> + Send>>;

/// Decodes the payload, then returns the execution future.
type RawHandler = Box<dyn Fn(Envelope) -> Result<ExecFuture, DispatchError> + Send + Sync>;

struct Registered {
    handler: RawHandler,
    one_way: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    AwaitingDecode,
    Executing,
    /// A reply envelope was produced.
    Replied,
    /// A one-way command finished; nothing is sent back.
    Completed,
    Failed,
    /// Unknown command; logged and dropped without a reply.
    Ignored,
}

impl DispatchState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Replied | Self::Completed | Self::Failed | Self::Ignored
        )
    }

    fn advance(self, next: Self, command: &str) -> Self {
        trace!(command, from = %self, to = %next, "dispatch transition");
        next
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingDecode => "awaiting_decode",
            Self::Executing => "executing",
            Self::Replied => "replied",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Ignored => "ignored",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub state: DispatchState,
    /// Envelope to send back, if any.
    pub reply: Option<Envelope>,
}

/// Maps command names to typed handlers.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Registered>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request/response command. The payload is decoded as `P`
    /// before the handler runs.
    pub fn register<P, F, Fut>(&mut self, name: &str, handler: F)
    where
        P: DeserializeOwned + Send + 'static,
        F: Fn(P, CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, ErrorShape>> + Send + 'static,
    {
        let raw: RawHandler = Box::new(move |envelope: Envelope| {
            let (payload, ctx) = decode::<P>(envelope)?;
            let fut = handler(payload, ctx);
            Ok(Box::pin(async move { fut.await.map(Some) }) as ExecFuture)
        });
        self.insert(name, raw, false);
    }

    /// Register a one-way command: it never produces a reply.
    pub fn register_one_way<P, F, Fut>(&mut self, name: &str, handler: F)
    where
        P: DeserializeOwned + Send + 'static,
        F: Fn(P, CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let raw: RawHandler = Box::new(move |envelope: Envelope| {
            let (payload, ctx) = decode::<P>(envelope)?;
            let fut = handler(payload, ctx);
            Ok(Box::pin(async move {
                fut.await;
                Ok(None)
            }) as ExecFuture)
        });
        self.insert(name, raw, true);
    }

    fn insert(&mut self, name: &str, handler: RawHandler, one_way: bool) {
        if self
            .handlers
            .insert(name.to_string(), Registered { handler, one_way })
            .is_some()
        {
            debug!(command = name, "replaced command handler");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Run one inbound command to a terminal state.
    pub async fn dispatch(&self, envelope: Envelope) -> DispatchOutcome {
        let command = envelope.command_name.clone();
        let correlation_id = envelope.correlation_id;
        let state = DispatchState::Idle;

        let Some(entry) = self.handlers.get(&command) else {
            warn!(command = %command, correlation_id = ?correlation_id, "unknown command, ignoring");
            return DispatchOutcome {
                state: state.advance(DispatchState::Ignored, &command),
                reply: None,
            };
        };

        let state = state.advance(DispatchState::AwaitingDecode, &command);
        let exec = match (entry.handler)(envelope) {
            Ok(exec) => exec,
            Err(err) => return self.fail(state, &command, correlation_id, entry.one_way, &err),
        };

        let state = state.advance(DispatchState::Executing, &command);
        debug!(command = %command, correlation_id = ?correlation_id, "executing command");
        match exec.await {
            Ok(Some(response)) => match response.to_payload() {
                Ok(payload) => {
                    debug!(command = %command, correlation_id = ?correlation_id, "command ok");
                    DispatchOutcome {
                        state: state.advance(DispatchState::Replied, &command),
                        reply: Some(Envelope::response(correlation_id, payload)),
                    }
                },
                Err(e) => {
                    let err = DispatchError::Handler(ErrorShape::internal(format!(
                        "failed to encode response: {e}"
                    )));
                    self.fail(state, &command, correlation_id, entry.one_way, &err)
                },
            },
            Ok(None) => DispatchOutcome {
                state: state.advance(DispatchState::Completed, &command),
                reply: None,
            },
            Err(shape) => self.fail(
                state,
                &command,
                correlation_id,
                entry.one_way,
                &DispatchError::Handler(shape),
            ),
        }
    }

    fn fail(
        &self,
        state: DispatchState,
        command: &str,
        correlation_id: Option<CorrelationId>,
        one_way: bool,
        err: &DispatchError,
    ) -> DispatchOutcome {
        let shape = err.to_shape(command);
        warn!(
            command,
            correlation_id = ?correlation_id,
            code = %shape.code,
            msg = %shape.message,
            "command failed"
        );
        DispatchOutcome {
            state: state.advance(DispatchState::Failed, command),
            reply: (!one_way).then(|| Envelope::error(correlation_id, &shape)),
        }
    }
}

fn decode<P: DeserializeOwned>(envelope: Envelope) -> Result<(P, CommandContext), DispatchError> {
    let payload = envelope
        .decode_payload::<P>()
        .map_err(|source| DispatchError::Decode {
            command: envelope.command_name.clone(),
            source,
        })?;
    Ok((payload, CommandContext {
        correlation_id: envelope.correlation_id,
        command: envelope.command_name,
    }))
}
