//! Runs the admin bootstrap and an order/tracking flow against the in-memory
//! restoration service.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use in_memory_backend::{InMemoryConnector, Service};
use restoration_client::{AccessView, AdminConsole, StaticIdentityProvider};
use restoration_sdk::{Identity, Principal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::{AppConfig, LoggingConfig};

#[derive(Debug, Parser)]
#[command(name = "restoration-console", version, about)]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Principal to log in as. A random one is used when omitted.
    #[arg(long)]
    principal: Option<String>,

    /// Reveal gate passphrase, when the gate is configured.
    #[arg(long)]
    passphrase: Option<String>,

    /// Tracking number for the demo order.
    #[arg(long, default_value = "TRACK123")]
    tracking_number: String,

    /// Log as JSON regardless of configuration.
    #[arg(long)]
    json_logs: bool,
}

fn init_logging(cfg: &LoggingConfig, force_json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if cfg.json || force_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::load(cli.config.as_deref())?;
    init_logging(&cfg.logging, cli.json_logs);

    let principal = match cli.principal.as_deref() {
        Some(text) => Principal::from_text(text).context("invalid --principal")?,
        None => Principal::new(Uuid::new_v4()),
    };

    let service = Arc::new(Service::from_config(&cfg.backend));
    let connector = Arc::new(InMemoryConnector::new(service));
    let identity = Arc::new(StaticIdentityProvider::new(Identity::new(principal)));
    let console = AdminConsole::new(&cfg.client, identity, connector);

    info!(view = %console.refresh().await, "before login");
    let view = console.login().await?;
    info!(%principal, %view, "after login");

    match view {
        AccessView::Granted => {}
        AccessView::Failed(message) => {
            warn!(%message, "access resolution failed, retrying once");
            let retried = console.retry().await;
            anyhow::ensure!(retried == AccessView::Granted, "admin access not granted: {retried}");
        }
        other => anyhow::bail!("admin access not granted: {other}"),
    }

    if console.gate().is_enabled() {
        console.gate().open_prompt();
        console.gate().submit(cli.passphrase.as_deref().unwrap_or_default())?;
    }
    anyhow::ensure!(console.admin_content_visible(), "admin content hidden");

    let number = cli.tracking_number.as_str();
    let status = console.orders().create_order(number).await?;
    info!(tracking_number = number, status = status.label(), "order created");

    let tracking = console.tracking();
    tracking.create_tracking_state(number, "premium").await?;
    tracking.mark_package_arrived(number).await?;
    tracking.add_restoration_step(number, "Initial cleaning").await?;
    tracking.add_restoration_step(number, "Surface restoration").await?;
    tracking.complete_restoration_step(number, 0).await?;

    let view = tracking.track_package(number).await?;
    for (index, step) in view.steps.iter().enumerate() {
        info!(
            index,
            description = %step.description,
            completed = step.completed,
            timestamp = %step.timestamp,
            "restoration step"
        );
    }
    info!(
        tracking_code = %view.tracking_code,
        arrived = view.arrived,
        completed = view.completed_steps(),
        total = view.steps.len(),
        "tracking state"
    );

    console.logout().await;
    Ok(())
}
