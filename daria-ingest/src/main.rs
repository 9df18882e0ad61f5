//! daria-ingest - Semantic ingest and analysis driver
//!
//! Sweeps the session repository, submits every transcribable session to
//! the semantic analysis service and requests its analysis.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use daria_common::config::{
    load_toml_config, resolve_data_root, DataLayout, ServiceConfig, ENV_CONFIG,
};
use daria_common::{GuideStore, SessionStore};
use daria_ingest::{Pipeline, ServiceClient, SessionBatch, SourceKind};
use daria_sweep::IntegritySweeper;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Command-line arguments for daria-ingest
#[derive(Parser, Debug)]
#[command(name = "daria-ingest")]
#[command(about = "Ingest interview sessions into the semantic analysis service")]
#[command(version)]
struct Args {
    /// Base URL of the analysis service
    #[arg(long)]
    base_url: Option<String>,

    /// Where sessions are read from
    #[arg(long, value_enum, default_value = "fs")]
    source: SourceKind,

    /// Data root containing interviews/ and interviews/sessions/
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Sessions directory (default: <data_root>/interviews/sessions)
    #[arg(long)]
    sessions_dir: Option<PathBuf>,

    /// Guides directory (default: <data_root>/interviews)
    #[arg(long)]
    guides_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = ENV_CONFIG)]
    config: Option<PathBuf>,

    /// Skip the integrity sweep before reading the sessions directory
    #[arg(long)]
    no_sweep: bool,

    /// Only process these session ids (repeatable)
    #[arg(long = "session", value_name = "ID")]
    sessions: Vec<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print each event as a JSON line on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        load_toml_config(args.config.as_deref()).context("Failed to load configuration")?;

    daria_common::logging::init_tracing(&toml_config.logging.level)
        .context("Failed to initialize logging")?;

    info!(
        "Starting DARIA ingest (daria-ingest) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let service_config =
        ServiceConfig::resolve(args.base_url.as_deref(), args.timeout_secs, &toml_config)
            .context("Invalid service configuration")?;
    info!("Analysis service: {}", service_config.base_url);

    let client = ServiceClient::new(service_config).context("Failed to build HTTP client")?;
    let cancel = CancellationToken::new();
    let pipeline = Pipeline::new(client.clone())
        .context("Invalid analysis endpoints")?
        .with_cancellation(cancel.clone());

    let only: BTreeSet<String> = args.sessions.iter().cloned().collect();

    let batch = match args.source {
        SourceKind::Fs => {
            let data_root = resolve_data_root(args.data_root.as_deref(), &toml_config);
            let layout = DataLayout::with_overrides(
                &data_root,
                args.sessions_dir.as_deref(),
                args.guides_dir.as_deref(),
            );
            info!("Sessions: {}", layout.sessions_dir.display());

            let sweeper = IntegritySweeper::new(
                SessionStore::new(&layout.sessions_dir),
                GuideStore::new(&layout.guides_dir),
            );
            SessionBatch::from_filesystem(&sweeper, !args.no_sweep, &only)
                .context("Cannot read session repository")?
        }
        SourceKind::Service => SessionBatch::from_service(&client, &only)
            .await
            .context("Cannot list sessions from service")?,
    };
    info!("{} session(s) to process", batch.len());

    tokio::spawn(cancel_on_signal(cancel));

    let report = pipeline.run(&batch).await;

    if args.json {
        let sweep_events = batch.sweep.iter().flat_map(|s| s.events.iter());
        for event in sweep_events.chain(report.events.iter()) {
            println!("{}", event.to_json_line());
        }
        println!("{}", report.to_json_line());
    }

    if report.interrupted {
        warn!("Run interrupted; re-run to process the remaining sessions");
    }

    Ok(())
}

/// Cancel the run on Ctrl+C or SIGTERM; the current session finishes first
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping after the current session");
        },
        _ = terminate => {
            info!("Received terminate signal, stopping after the current session");
        },
    }

    cancel.cancel();
}
