//! Config schema for the bridge runtime.

use std::path::PathBuf;

use {
    imbridge_protocol::{DEFAULT_REQUEST_TIMEOUT_MS, MAX_FRAME_BYTES},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub ipc: IpcConfig,
    pub reader: ReaderConfig,
    pub history: HistoryConfig,
    pub snapshot: SnapshotConfig,
}

/// Inter-process channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    /// How long an outgoing request waits for its reply.
    pub request_timeout_ms: u64,
    /// Forward local log events to the peer as one-way `log` commands.
    pub forward_logs: bool,
    /// Minimum level forwarded when `forward_logs` is on.
    pub forward_level: String,
    /// Frames larger than this are dropped by the reader.
    pub max_frame_bytes: usize,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            forward_logs: false,
            forward_level: "info".into(),
            max_frame_bytes: MAX_FRAME_BYTES,
        }
    }
}

impl IpcConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }
}

/// History store read settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Upper bound on concurrent reads against the history store.
    pub max_concurrent_reads: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent_reads: 4,
        }
    }
}

impl ReaderConfig {
    /// Configured bound, never below one.
    pub fn permits(&self) -> usize {
        self.max_concurrent_reads.max(1)
    }
}

/// Limits applied to history queries coming over IPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 1000,
        }
    }
}

impl HistoryConfig {
    /// Clamp a requested limit; `None` or zero falls back to the default.
    pub fn clamp(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(0) | None => self.default_limit.min(self.max_limit),
            Some(n) => n.min(self.max_limit),
        }
    }
}

/// Optional JSON snapshot backing the in-memory store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub path: Option<PathBuf>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.ipc.request_timeout_ms, 30_000);
        assert_eq!(cfg.ipc.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
        assert_eq!(cfg.ipc.max_frame_bytes, MAX_FRAME_BYTES);
        assert_eq!(cfg.reader.permits(), 4);
        assert!(cfg.snapshot.path.is_none());
    }

    #[test]
    fn zero_readers_still_gets_one_permit() {
        let reader = ReaderConfig {
            max_concurrent_reads: 0,
        };
        assert_eq!(reader.permits(), 1);
    }

    #[test]
    fn history_limit_clamping() {
        let history = HistoryConfig::default();
        assert_eq!(history.clamp(None), 50);
        assert_eq!(history.clamp(Some(0)), 50);
        assert_eq!(history.clamp(Some(20)), 20);
        assert_eq!(history.clamp(Some(5000)), 1000);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: BridgeConfig = toml::from_str(
            r#"
            [ipc]
            request_timeout_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(cfg.ipc.request_timeout_ms, 500);
        assert_eq!(cfg.ipc.max_frame_bytes, 4 * 1024 * 1024);
        assert_eq!(cfg.history.max_limit, 1000);
    }
}
