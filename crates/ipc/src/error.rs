use std::time::Duration;

use imbridge_protocol::ErrorShape;

/// Failure to get a reply across the channel. Distinct from a peer
/// [`ErrorShape`] reply, which arrives as `Reply::Error`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("'{command}' timed out after {}ms", after.as_millis())]
    Timeout { command: String, after: Duration },

    #[error("channel closed")]
    Closed,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("frame codec: {0}")]
    Codec(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid payload for '{command}': {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Handler(ErrorShape),
}

impl DispatchError {
    /// Error reply body, always naming the command.
    pub fn to_shape(&self, command: &str) -> ErrorShape {
        match self {
            Self::Decode { source, .. } => {
                ErrorShape::invalid_payload(source.to_string()).with_command(command)
            },
            Self::Handler(shape) => match shape.command {
                Some(_) => shape.clone(),
                None => shape.clone().with_command(command),
            },
        }
    }
}
