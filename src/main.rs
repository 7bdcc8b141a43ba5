use anyhow::{Context, Result};
use clap::Parser;
use feedbell::config::{Config, Settings};
use feedbell::feed::HttpFetcher;
use feedbell::notify::{connect_irc, ConsoleTransport, Transport};
use feedbell::service::{self, ServiceOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Get the default config file path (~/.config/feedbell/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("feedbell")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(
    name = "feedbell",
    about = "Polls RSS/Atom feeds and announces new entries as chat notices"
)]
struct Args {
    /// Config file (default: ~/.config/feedbell/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print notices to stdout instead of connecting to IRC
    #[arg(long)]
    dry_run: bool,

    /// Override the poll interval, e.g. "5m" or "1h30m"
    #[arg(long, value_name = "DURATION")]
    interval: Option<String>,
}

/// Resolves when SIGINT or SIGTERM arrives.
async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
            _ = sigint.recv() => tracing::info!("Received SIGINT"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received Ctrl-C");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(interval) = args.interval {
        config.interval = interval;
    }
    let settings = Settings::from_config(config).context("Invalid configuration")?;

    if settings.feeds.is_empty() {
        tracing::warn!(path = %config_path.display(), "No feeds configured, nothing will be polled");
    }

    let fetcher = HttpFetcher::build(&settings.user_agent, settings.fetch_timeout)
        .context("Failed to build HTTP client")?;

    let shutdown = CancellationToken::new();

    let (transport, session) = match (args.dry_run, settings.irc) {
        (false, Some(irc)) => {
            let server = irc.server.clone();
            let (transport, session) = connect_irc(irc)
                .await
                .with_context(|| format!("Failed to connect to IRC server {server}"))?;
            (Arc::new(transport) as Arc<dyn Transport>, Some(session))
        }
        (_, irc) => {
            let channels = irc
                .map(|irc| irc.channels)
                .filter(|channels| !channels.is_empty())
                .unwrap_or_else(|| vec!["stdout".to_string()]);
            tracing::info!(channels = ?channels, "Printing notices to stdout");
            (
                Arc::new(ConsoleTransport::new(channels)) as Arc<dyn Transport>,
                None,
            )
        }
    };

    // The service stops when the chat connection is lost
    let session_task = session.map(|session| {
        let token = shutdown.clone();
        tokio::spawn(async move {
            let result = session.run(token.clone()).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "IRC session ended");
            }
            token.cancel();
            result
        })
    });

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            result = wait_for_signal() => match result {
                Ok(()) => signal_token.cancel(),
                Err(e) => tracing::error!(error = %e, "Failed to install signal handlers"),
            },
            _ = signal_token.cancelled() => {}
        }
    });

    let handle = service::spawn(
        ServiceOptions {
            feeds: settings.feeds,
            interval: settings.interval,
            queue_capacity: settings.queue_capacity,
        },
        Arc::new(fetcher),
        transport,
        shutdown.clone(),
    );

    let consumed = handle.join().await;
    tracing::info!(delivered = consumed, "Feed service stopped");

    if let Some(task) = session_task {
        task.await
            .context("IRC session task failed")?
            .context("IRC connection lost")?;
    }

    Ok(())
}
