mod guid_commands;

use std::{path::PathBuf, sync::Arc};

use {
    clap::{Parser, Subcommand},
    imbridge_chats::{MemoryStore, ReaderPool},
    imbridge_config::BridgeConfig,
    imbridge_ipc::{
        BridgeServices, ChannelOptions, CommandRegistry, IpcChannel, LogForwardLayer,
        forward_logs, log_forwarder, register_bridge_commands,
    },
    imbridge_protocol::payloads::LogRequest,
    imbridge_service_traits::{
        ContactDirectory, ConversationRegistry, NoopContactDirectory, NoopConversationRegistry,
        NoopReadApi, ReadApi,
    },
    tokio::sync::mpsc,
    tracing::{Level, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

/// Queue depth between the forwarding layer and the channel writer.
const LOG_FORWARD_CAPACITY: usize = 1024;

#[derive(Parser)]
#[command(name = "imbridge", about = "imbridge: message history bridge over stdio")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and the user config dir).
    #[arg(long, global = true, env = "IMBRIDGE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve bridge commands over stdin/stdout.
    Serve {
        /// JSON snapshot backing the in-memory store (overrides config).
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Parse a chat identifier and print it as JSON.
    ParseGuid { guid: String },
}

/// Logs go to stderr; stdout carries the IPC stream.
fn init_telemetry(cli: &Cli, forward: Option<LogForwardLayer>) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .with(forward)
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .with(forward)
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<BridgeConfig> {
    match &cli.config {
        Some(path) => imbridge_config::load_config(path),
        None => Ok(imbridge_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Serve { snapshot } => {
            let forward_level = config.ipc.forward_level.parse::<Level>();
            let (layer, log_rx) = match (&forward_level, config.ipc.forward_logs) {
                (Ok(level), true) => {
                    let (layer, rx) = log_forwarder(*level, LOG_FORWARD_CAPACITY);
                    (Some(layer), Some(rx))
                },
                _ => (None, None),
            };
            init_telemetry(&cli, layer);
            if config.ipc.forward_logs && forward_level.is_err() {
                warn!(
                    level = %config.ipc.forward_level,
                    "invalid ipc.forward_level, log forwarding disabled"
                );
            }
            serve(config, snapshot.clone(), log_rx).await
        },
        Commands::ParseGuid { guid } => {
            init_telemetry(&cli, None);
            guid_commands::print_parsed(guid)
        },
    }
}

async fn serve(
    config: BridgeConfig,
    snapshot: Option<PathBuf>,
    log_rx: Option<mpsc::Receiver<LogRequest>>,
) -> anyhow::Result<()> {
    let (registry, directory, reader): (
        Arc<dyn ConversationRegistry>,
        Arc<dyn ContactDirectory>,
        Arc<dyn ReadApi>,
    ) = match snapshot.or(config.snapshot.path.clone()) {
        Some(path) => {
            let store = Arc::new(MemoryStore::load(&path)?);
            (store.clone(), store.clone(), store)
        },
        None => {
            warn!("no snapshot configured, serving an empty store");
            (
                Arc::new(NoopConversationRegistry),
                Arc::new(NoopContactDirectory),
                Arc::new(NoopReadApi),
            )
        },
    };
    let reader = Arc::new(ReaderPool::from_config(reader, &config.reader));
    info!(readers = reader.size(), "history reader pool ready");

    let services = BridgeServices::new(registry, directory, reader, config.history.clone());
    let mut commands = CommandRegistry::new();
    register_bridge_commands(&mut commands, Arc::new(services));

    let channel = IpcChannel::new(
        tokio::io::stdout(),
        ChannelOptions::from_config(&config.ipc),
    );
    if let Some(rx) = log_rx {
        tokio::spawn(forward_logs(Arc::clone(&channel), rx));
        info!(level = %config.ipc.forward_level, "forwarding logs to peer");
    }

    channel.serve(tokio::io::stdin(), Arc::new(commands)).await?;
    info!("peer disconnected, shutting down");
    Ok(())
}
