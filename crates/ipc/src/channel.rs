//! Byte-stream channel to the peer process.
//!
//! Outgoing requests get a fresh correlation id and a pending waiter; the
//! serve loop routes `response`/`error` envelopes back to those waiters and
//! dispatches every other inbound envelope on its own task.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    futures::StreamExt,
    imbridge_config::IpcConfig,
    imbridge_protocol::{CorrelationId, Envelope, Reply},
    tokio::{
        io::{AsyncRead, AsyncWrite, AsyncWriteExt},
        sync::{Mutex as AsyncMutex, oneshot},
        task::JoinSet,
    },
    tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError},
    tracing::{debug, error, info, trace, warn},
};

use crate::{codec, dispatch::CommandRegistry, error::TransportError};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type PendingMap = HashMap<CorrelationId, oneshot::Sender<Reply>>;

#[derive(Debug, Clone, Copy)]
pub struct ChannelOptions {
    pub request_timeout: Duration,
    pub max_frame_bytes: usize,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(imbridge_protocol::DEFAULT_REQUEST_TIMEOUT_MS),
            max_frame_bytes: imbridge_protocol::MAX_FRAME_BYTES,
        }
    }
}

impl ChannelOptions {
    pub fn from_config(config: &IpcConfig) -> Self {
        Self {
            request_timeout: config.request_timeout(),
            max_frame_bytes: config.max_frame_bytes,
        }
    }
}

pub struct IpcChannel {
    writer: AsyncMutex<BoxedWriter>,
    pending: Mutex<PendingMap>,
    next_id: AtomicU64,
    options: ChannelOptions,
}

/// Removes a pending entry when the waiting `send` finishes, times out or
/// is dropped.
struct PendingGuard<'a> {
    channel: &'a IpcChannel,
    id: CorrelationId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.channel.pending().remove(&self.id);
    }
}

impl IpcChannel {
    pub fn new(
        writer: impl AsyncWrite + Send + Unpin + 'static,
        options: ChannelOptions,
    ) -> Arc<Self> {
        Arc::new(Self {
            writer: AsyncMutex::new(Box::new(writer)),
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            options,
        })
    }

    pub fn options(&self) -> ChannelOptions {
        self.options
    }

    fn pending(&self) -> MutexGuard<'_, PendingMap> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Requests still waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }

    /// Send a request and wait for its reply.
    ///
    /// The envelope's correlation id is replaced with a fresh one. A peer
    /// `error` reply is `Ok(Reply::Error(..))`; `Err` is reserved for
    /// transport failures.
    pub async fn send(&self, mut envelope: Envelope) -> Result<Reply, TransportError> {
        let id = CorrelationId(self.next_id.fetch_add(1, Ordering::SeqCst));
        envelope.correlation_id = Some(id);

        let (tx, rx) = oneshot::channel();
        self.pending().insert(id, tx);
        let _guard = PendingGuard { channel: self, id };

        self.write_envelope(&envelope).await?;
        debug!(command = %envelope.command_name, correlation_id = %id, "request sent");

        match tokio::time::timeout(self.options.request_timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(TransportError::Closed),
            Err(_) => {
                warn!(
                    command = %envelope.command_name,
                    correlation_id = %id,
                    timeout_ms = self.options.request_timeout.as_millis() as u64,
                    "request timed out"
                );
                Err(TransportError::Timeout {
                    command: envelope.command_name,
                    after: self.options.request_timeout,
                })
            },
        }
    }

    /// Send without registering a waiter. Any correlation id is cleared.
    pub async fn send_one_way(&self, mut envelope: Envelope) -> Result<(), TransportError> {
        envelope.correlation_id = None;
        self.write_envelope(&envelope).await
    }

    pub async fn write_envelope(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let frame = codec::encode_frame(envelope)?;
        let mut writer = self.writer.lock().await;
        writer.write_all(frame.as_bytes()).await?;
        writer.flush().await?;
        trace!(
            command = %envelope.command_name,
            correlation_id = ?envelope.correlation_id,
            bytes = frame.len(),
            "frame written"
        );
        Ok(())
    }

    /// Hand a reply envelope to its waiter. Replies nobody waits for are
    /// discarded.
    pub fn route_reply(&self, envelope: Envelope) {
        let Some(id) = envelope.correlation_id else {
            warn!(command = %envelope.command_name, "reply without correlation id, discarding");
            return;
        };
        let Some(reply) = envelope.into_reply() else {
            return;
        };
        let waiter = self.pending().remove(&id);
        match waiter {
            Some(tx) => {
                if tx.send(reply).is_err() {
                    debug!(correlation_id = %id, "waiter gone, discarding reply");
                }
            },
            None => warn!(correlation_id = %id, "reply for unknown or abandoned request, discarding"),
        }
    }

    /// Fail every pending request with [`TransportError::Closed`].
    pub fn close(&self) {
        let dropped = std::mem::take(&mut *self.pending());
        if !dropped.is_empty() {
            debug!(count = dropped.len(), "closing channel with pending requests");
        }
    }

    /// Read frames until EOF. Replies go to waiters; everything else is
    /// dispatched through `registry` on its own task.
    pub async fn serve<R>(
        self: &Arc<Self>,
        reader: R,
        registry: Arc<CommandRegistry>,
    ) -> Result<(), TransportError>
    where
        R: AsyncRead + Unpin,
    {
        let max = self.options.max_frame_bytes;
        let mut frames = FramedRead::new(reader, LinesCodec::new_with_max_length(max));
        let mut tasks = JoinSet::new();
        info!(commands = registry.command_names().len(), "ipc channel serving");

        // FramedRead yields `None` once after a decode error, then resumes.
        let mut resume = false;
        loop {
            let next = match frames.next().await {
                Some(next) => next,
                None if resume => {
                    resume = false;
                    continue;
                },
                None => break,
            };
            let line = match next {
                Ok(line) => line,
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    warn!(max_frame_bytes = max, "oversized frame, skipping");
                    resume = true;
                    continue;
                },
                Err(LinesCodecError::Io(e)) => {
                    error!(error = %e, "failed to read from peer");
                    self.close();
                    return Err(e.into());
                },
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let envelope = match codec::decode_frame(line) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(error = %e, "unparseable frame, skipping");
                    continue;
                },
            };
            trace!(command = %envelope.command_name, correlation_id = ?envelope.correlation_id, "frame read");

            if envelope.is_reply() {
                self.route_reply(envelope);
                continue;
            }

            let channel = Arc::clone(self);
            let registry = Arc::clone(&registry);
            tasks.spawn(async move {
                let outcome = registry.dispatch(envelope).await;
                if let Some(reply) = outcome.reply
                    && let Err(e) = channel.write_envelope(&reply).await
                {
                    error!(error = %e, command = %reply.command_name, "failed to write reply");
                }
            });
            while tasks.try_join_next().is_some() {}
        }

        debug!("peer closed input");
        self.close();
        while tasks.join_next().await.is_some() {}
        Ok(())
    }
}
