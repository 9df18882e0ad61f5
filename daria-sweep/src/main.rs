//! daria-sweep - Session integrity sweeper
//!
//! Deletes zero-byte session files and removes references to missing
//! sessions from discussion guide files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use daria_common::config::{load_toml_config, resolve_data_root, DataLayout, ENV_CONFIG};
use daria_common::{GuideStore, SessionStore};
use daria_sweep::{IntegritySweeper, SweepOptions};
use tracing::info;

/// Command-line arguments for daria-sweep
#[derive(Parser, Debug)]
#[command(name = "daria-sweep")]
#[command(about = "Remove empty sessions and dangling guide references")]
#[command(version)]
struct Args {
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

    /// Report changes without deleting or rewriting anything
    #[arg(long)]
    dry_run: bool,

    /// Print each event as a JSON line on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        load_toml_config(args.config.as_deref()).context("Failed to load configuration")?;

    daria_common::logging::init_tracing(&toml_config.logging.level)
        .context("Failed to initialize logging")?;

    info!(
        "Starting DARIA sweep (daria-sweep) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let data_root = resolve_data_root(args.data_root.as_deref(), &toml_config);
    let layout = DataLayout::with_overrides(
        &data_root,
        args.sessions_dir.as_deref(),
        args.guides_dir.as_deref(),
    );
    info!("Sessions: {}", layout.sessions_dir.display());
    info!("Guides: {}", layout.guides_dir.display());

    let sweeper = IntegritySweeper::new(
        SessionStore::new(&layout.sessions_dir),
        GuideStore::new(&layout.guides_dir),
    )
    .with_options(SweepOptions {
        dry_run: args.dry_run,
    });

    let report = sweeper.sweep().context("Sweep could not start")?;

    if args.json {
        for event in &report.events {
            println!("{}", event.to_json_line());
        }
    }

    Ok(())
}
