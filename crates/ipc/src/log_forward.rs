//! Streams local tracing events to the peer as one-way `log` commands.
//!
//! [`LogForwardLayer`] never blocks the logging call: entries go into a
//! bounded queue and are dropped when it is full. Events from the channel
//! writer itself and re-emitted peer logs are skipped so forwarding cannot
//! feed back into itself.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use {
    imbridge_protocol::{Envelope, commands, payloads::LogRequest},
    serde_json::{Map, Value},
    tokio::sync::mpsc,
    tracing::{
        Event, Level, Subscriber,
        field::{Field, Visit},
    },
    tracing_subscriber::{Layer, layer::Context},
};

use crate::{PEER_LOG_TARGET, channel::IpcChannel};

const SKIPPED_TARGET_PREFIXES: &[&str] = &[
    PEER_LOG_TARGET,
    "imbridge_ipc::channel",
    "imbridge_ipc::log_forward",
];

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

pub struct LogForwardLayer {
    tx: mpsc::Sender<LogRequest>,
    max_level: Level,
    dropped: Arc<AtomicU64>,
}

/// Build the layer and the receiving end that [`forward_logs`] drains.
pub fn log_forwarder(
    max_level: Level,
    capacity: usize,
) -> (LogForwardLayer, mpsc::Receiver<LogRequest>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let layer = LogForwardLayer {
        tx,
        max_level,
        dropped: Arc::new(AtomicU64::new(0)),
    };
    (layer, rx)
}

impl LogForwardLayer {
    /// Handle to the count of entries dropped because the queue was full.
    pub fn dropped(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Map<String, Value>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields
                .insert(field.name().into(), Value::String(format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.into();
        } else {
            self.fields
                .insert(field.name().into(), Value::String(value.into()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().into(), Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().into(), Value::Number(value.into()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().into(), Value::Bool(value));
    }
}

impl<S: Subscriber> Layer<S> for LogForwardLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        // Lower levels are more severe; TRACE is the greatest.
        if *meta.level() > self.max_level {
            return;
        }
        let target = meta.target();
        if SKIPPED_TARGET_PREFIXES
            .iter()
            .any(|prefix| target.starts_with(prefix))
        {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let entry = LogRequest {
            level: meta.level().to_string(),
            module: target.to_string(),
            message: visitor.message,
            metadata: visitor.fields,
        };
        if self.tx.try_send(entry).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Drain queued entries into one-way `log` envelopes until the layer is
/// gone or the channel fails.
pub async fn forward_logs(channel: Arc<IpcChannel>, mut rx: mpsc::Receiver<LogRequest>) {
    while let Some(entry) = rx.recv().await {
        let Ok(envelope) = Envelope::command(commands::LOG, &entry) else {
            continue;
        };
        if channel.send_one_way(envelope).await.is_err() {
            break;
        }
    }
}
