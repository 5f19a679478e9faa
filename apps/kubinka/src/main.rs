//! # kubinka
//!
//! Discord bot process. Provisions the guild commands and the queue role,
//! re-grants the role to everyone still holding a record, revokes it as
//! records expire, and cleans everything up again on SIGINT/SIGTERM.
//!
//! ## Usage
//!
//! ```text
//! kubinka --config kubinka.toml
//! kubinka --config kubinka.toml --dry-run --log-stderr
//! ```
//!
//! All lifecycle records are appended to the configured log file as JSON
//! lines. A fatal startup error exits with status 1.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use kb_lifecycle::{os_interrupt, KubinkaConfig, LifecycleError, LoggingHandler, Orchestrator};
use kb_platform::{DiscordClient, MockPlatform, Platform};
use kb_record::{ErrorRecord, LifecycleEvent, LogOptions};
use kb_store::{JsonPlayerStore, PlayerStore};

/// Discord deployment-queue bot.
#[derive(Parser)]
#[command(name = "kubinka", version, about = "Discord deployment-queue bot")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "kubinka.toml")]
    config: PathBuf,

    /// Mirror log records to stderr.
    #[arg(long)]
    log_stderr: bool,

    /// Run against an in-memory platform instead of Discord.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = KubinkaConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.apply_env();
    config.validate(!cli.dry_run)?;

    kb_record::logging::init(&LogOptions {
        file: config.log.file.clone(),
        filter: config.log.filter.clone(),
        mirror_stderr: cli.log_stderr,
    })?;

    let store: Arc<dyn PlayerStore> =
        match JsonPlayerStore::connect(&config.store.path, &config.store.bucket) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                ErrorRecord::from_error(&e)
                    .event(LifecycleEvent::StartupStoreConnect)
                    .set("path", config.store.path.display())
                    .set("bucket", &config.store.bucket)
                    .log_error();
                std::process::exit(1);
            }
        };

    let platform: Arc<dyn Platform> = if cli.dry_run {
        tracing::info!("dry run: using in-memory platform");
        Arc::new(MockPlatform::new())
    } else {
        Arc::new(DiscordClient::new(
            config.discord.token.clone(),
            config.discord.api_base.clone(),
        )?)
    };

    let interrupt = os_interrupt().context("installing signal handlers")?;
    let orchestrator = Orchestrator::new(
        platform,
        store,
        Arc::new(LoggingHandler),
        config.lifecycle_settings(),
    );

    match orchestrator.run(interrupt).await {
        Ok(report) => {
            tracing::info!(
                session_id = %report.session_id,
                trigger = %report.trigger,
                cause = %report.cause,
                "kubinka stopped"
            );
            Ok(())
        }
        Err(LifecycleError::Fatal { .. }) => std::process::exit(1),
        Err(e) => Err(e.into()),
    }
}
