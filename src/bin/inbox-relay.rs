//! Inbox relay service
//!
//! Polls the configured IMAP inbox and relays new mail to the owner's
//! Telegram chat until interrupted.

use anyhow::{Context, anyhow};
use clap::Parser;
use inbox_relay::transport::TelegramTransport;
use inbox_relay::{
    Dispatcher, EventSource, ImapStore, Reconciler, RelayConfig, Router, Watcher,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Pause after a failed update poll.
const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "inbox-relay")]
#[command(about = "Relay unread IMAP mail to a Telegram chat")]
struct Args {
    /// Load environment variables from this file before reading the
    /// configuration
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.env_file {
        dotenvy::from_path(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
    }

    let _guard = init_logging(args.log_file.as_deref())?;

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    let config = RelayConfig::from_env()?;
    info!(
        "Watching {} on {}:{} for chat {}",
        config.imap.folder, config.imap.host, config.imap.port, config.owner_chat_id
    );

    let telegram = Arc::new(TelegramTransport::new(
        config.bot_token.clone(),
        config.updates_timeout,
    )?);
    let dispatcher = Dispatcher::new(telegram.clone(), config.owner_chat_id);
    let store = Arc::new(ImapStore::new(config.imap.clone()));
    let reconciler = Arc::new(Reconciler::new(store, dispatcher));

    let watcher = Watcher::new(Arc::clone(&reconciler), config.poll_interval);
    let router = Router::new(reconciler);

    tokio::select! {
        () = watcher.run() => {}
        () = listen(telegram.as_ref(), &router) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutting down");
        }
    }

    Ok(())
}

/// Pull chat events forever, handling each in its own task so a slow
/// mail operation does not hold up the next command.
async fn listen(source: &dyn EventSource, router: &Router) {
    loop {
        match source.next_events().await {
            Ok(events) => {
                for event in events {
                    let router = router.clone();
                    tokio::spawn(async move { router.handle(event).await });
                }
            }
            Err(e) => {
                warn!("Polling chat updates failed: {}", e);
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}

fn init_logging(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let Some(path) = log_file else {
        builder.init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .context("--log-file must name a file")?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    builder.with_writer(writer).with_ansi(false).init();
    Ok(Some(guard))
}
