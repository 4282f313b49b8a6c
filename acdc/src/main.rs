//! acdc - batch add/remove of structured-data statements on wiki files
//!
//! `acdc run --plan FILE` executes one batch from a plan file;
//! `acdc serve` exposes the batch controller over HTTP + SSE.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use acdc::config::{resolve_settings, CliOverrides, Settings};
use acdc::input::load_plan;
use acdc::mediawiki::{MediaWikiClient, WikiApi};
use acdc::services::{BatchOutcome, PagePileClient};
use acdc::{AppState, BatchController};
use acdc_common::config::{default_config_path, load_toml_config_or_default};
use acdc_common::events::{BatchEvent, EventBus};

/// Command-line arguments for acdc
#[derive(Parser, Debug)]
#[command(name = "acdc")]
#[command(about = "Add or remove structured data statements on many files at once")]
#[command(version)]
struct Args {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// MediaWiki action API endpoint
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bot password user name (User@BotName)
    #[arg(long, global = true)]
    username: Option<String>,

    /// Bot password
    #[arg(long, global = true)]
    password: Option<String>,

    /// Comma separated change tags
    #[arg(long, global = true)]
    tags: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one batch described by a plan file
    Run {
        /// Plan file (.toml or .json)
        #[arg(long)]
        plan: PathBuf,

        /// Resolve, load and reconcile, but do not write
        #[arg(long)]
        dry_run: bool,

        /// Load PagePiles with 100 or more files without asking
        #[arg(long)]
        confirm_large: bool,
    },

    /// Serve the batch controller over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "5790", env = "ACDC_PORT")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: IpAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let toml_config = load_toml_config_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;

    let default_filter = toml_config
        .logging
        .level
        .clone()
        .unwrap_or_else(|| "acdc=info,tower_http=info".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting acdc {}", env!("CARGO_PKG_VERSION"));

    let cli = CliOverrides {
        api_url: args.api_url.clone(),
        username: args.username.clone(),
        password: args.password.clone(),
        tags: args.tags.clone(),
    };
    let settings = resolve_settings(&cli, &toml_config).context("Invalid configuration")?;
    let api = connect(&settings).await?;

    let event_bus = EventBus::new(256);
    let controller = BatchController::new(api, event_bus.clone(), settings.tags.clone());

    match args.command {
        Command::Run {
            plan,
            dry_run,
            confirm_large,
        } => run_plan(&controller, &event_bus, &settings, &plan, dry_run, confirm_large).await,
        Command::Serve { port, bind } => serve(controller, event_bus, &settings, bind, port).await,
    }
}

/// Build the API client, logging in when credentials are configured
async fn connect(settings: &Settings) -> Result<Arc<dyn WikiApi>> {
    let mut client = MediaWikiClient::new(settings).context("Failed to create API client")?;

    match (&settings.username, &settings.password) {
        (Some(username), Some(password)) => {
            client
                .login(username, password)
                .await
                .context("Login failed")?;
        }
        _ => warn!("No credentials configured; edits will be rejected unless this is a dry run"),
    }

    Ok(Arc::new(client))
}

async fn run_plan(
    controller: &BatchController,
    event_bus: &EventBus,
    settings: &Settings,
    plan_path: &Path,
    dry_run: bool,
    confirm_large: bool,
) -> Result<()> {
    let plan = load_plan(plan_path)
        .with_context(|| format!("Failed to read plan {}", plan_path.display()))?;

    for event in plan.events().context("Invalid plan")? {
        controller.dispatch(event).await.context("Invalid plan")?;
    }

    if let Some(category) = &plan.category {
        let added = controller
            .load_category(category)
            .await
            .with_context(|| format!("Failed to load {}", category))?;
        info!("{} files added from {}", added, category);
    }

    if let Some(id) = plan.pagepile {
        let client = PagePileClient::new(settings).context("Failed to create PagePile client")?;
        let pile = client.fetch(id).await?;
        let load = controller.load_pagepile(pile, confirm_large).await?;
        if load.needs_confirmation {
            bail!(
                "PagePile {} contains {} files; pass --confirm-large to load it",
                load.id,
                load.files
            );
        }
        info!("{} files added from PagePile {}", load.added, load.id);
    }

    let validity = controller.validity().await;
    for error in &validity.errors {
        warn!("{}", error);
    }

    let mut events = event_bus.subscribe();
    let mut progress_logger = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match &event {
                BatchEvent::EntityCompleted { title, writes, .. } => {
                    info!("{} done ({} writes)", title, writes);
                }
                BatchEvent::BatchProgress { percentage, .. } => {
                    debug!("Progress {:.1}%", percentage);
                }
                _ => {}
            }
            if event.is_terminal() {
                break;
            }
        }
    });

    let stop = controller.stop_signal();
    let stop_on_ctrl_c = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, stopping before the next write");
            stop.request();
        }
    });

    let result = controller.run(dry_run).await;
    stop_on_ctrl_c.abort();
    // Runs refused up front emit no terminal event
    if tokio::time::timeout(Duration::from_secs(1), &mut progress_logger)
        .await
        .is_err()
    {
        progress_logger.abort();
    }

    match result.context("Batch failed")? {
        BatchOutcome::Finished(summary) => {
            info!(
                "Finished: {} files, {} writes{}",
                summary.files_processed,
                summary.writes,
                if dry_run { " (dry run, nothing written)" } else { "" }
            );
        }
        BatchOutcome::Stopped(summary) => {
            let remaining = controller.specification().await.titles().len();
            info!(
                "Stopped: {} files done, {} writes, {} files remaining",
                summary.files_processed, summary.writes, remaining
            );
        }
    }

    Ok(())
}

async fn serve(
    controller: BatchController,
    event_bus: EventBus,
    settings: &Settings,
    bind: IpAddr,
    port: u16,
) -> Result<()> {
    let mut state = AppState::new(controller, event_bus);
    match PagePileClient::new(settings) {
        Ok(client) => state = state.with_pagepile(client),
        Err(e) => warn!("PagePile loading disabled: {}", e),
    }

    let app = acdc::build_router(state);
    let addr = SocketAddr::new(bind, port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
