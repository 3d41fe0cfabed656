//! devproxy CLI
//!
//! Brings up every tunnel configured for one environment and supervises
//! them until they exit or the operator interrupts:
//! - resolve the configuration profile for the requested environment
//! - validate the local port set and clear host-level conflicts
//! - discover the bastion zone and bootstrap cluster credentials
//! - run all tunnels concurrently with two-stage shutdown on interrupt

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use devproxy::output::{
    format_reports, print_error, print_info, print_success, print_warning, summarize_outcomes,
};
use dp_core::config::{self, ProxyProfile};
use dp_core::gcloud::Gcloud;
use dp_core::kubectl::Kubectl;
use dp_core::CloudError;
use dp_proxy::ports::LsofPortHost;
use dp_proxy::resolver::StdinPrompt;
use dp_proxy::{
    ConflictResolver, ShutdownController, TunnelOrchestrator, TunnelOutcome,
};

#[derive(Parser)]
#[command(name = "devproxy")]
#[command(author, version)]
#[command(about = "Supervised local-port tunnels into development infrastructure")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment to bring up (dev, staging, prod, ...)
    #[arg(short, long)]
    env: Option<String>,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Locate the config document; the default path is bootstrapped empty on
    // first run, an explicit --config must already exist
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::ensure_default_config().context("Failed to prepare default config")?,
    };
    print_info(&format!(
        "Using configuration file: {}",
        config_path.display()
    ));

    let config = config::load_config(&config_path)?;
    let mut profile = config.resolve_profile(cli.env.as_deref())?;
    print_info(&format!(
        "Setting up environment: {}",
        profile.environment
    ));

    // Validate the port set before anything touches the host
    let ports = dp_proxy::ports::local_ports(&profile)?;

    let gcloud = Gcloud::new(config.cloud.gcloud_config_dir());
    let kubectl = Kubectl::new(config.cloud.kubeconfig_path());

    preflight(&gcloud, &kubectl).await?;

    // Clear host-level port conflicts; the only interactive gate in the run
    let mut resolver = ConflictResolver::new(LsofPortHost, StdinPrompt);
    resolver.clear_conflicts(&ports).await?;

    bootstrap_cloud(&gcloud, &config.cloud.kubeconfig_path(), &mut profile).await?;
    print_success("Initialization complete");

    // Shared cancellation signal: first interrupt winds tunnels down,
    // second one force-exits
    let cancel = CancellationToken::new();
    ShutdownController::new(cancel.clone()).spawn();

    let orchestrator = TunnelOrchestrator::new(&profile, kubectl, gcloud, cancel);
    print_info(&format!(
        "Starting {} tunnel(s) for environment {}",
        orchestrator.tunnel_count(),
        profile.environment
    ));

    let reports = orchestrator.run().await;

    println!("{}", format_reports(&reports));
    let summary = format!("Run finished: {}", summarize_outcomes(&reports));
    if reports
        .iter()
        .any(|r| matches!(r.outcome, TunnelOutcome::Failed(_)))
    {
        print_warning(&summary);
    } else {
        print_info(&summary);
    }

    Ok(())
}

/// Verify both cloud tools are installed before doing any work
async fn preflight(gcloud: &Gcloud, kubectl: &Kubectl) -> Result<()> {
    if !gcloud.is_installed().await {
        return Err(CloudError::ToolMissing("gcloud").into());
    }
    if !kubectl.is_installed().await {
        return Err(CloudError::ToolMissing("kubectl").into());
    }

    let version = gcloud.version().await.context("Failed to read gcloud version")?;
    if let Some(banner) = version.lines().next() {
        tracing::info!("Using {}", banner);
    }
    Ok(())
}

/// Discover infrastructure metadata and fetch cluster credentials.
///
/// The bastion zone is mutated exactly once here, before any tunnel exists.
/// Every failure in this sequence is fatal to the run.
async fn bootstrap_cloud(
    gcloud: &Gcloud,
    kubeconfig: &std::path::Path,
    profile: &mut ProxyProfile,
) -> Result<()> {
    profile.bastion.zone = gcloud
        .instance_zone(&profile.bastion.name)
        .await
        .context("Failed to discover bastion zone")?;

    gcloud
        .set_project(&profile.cloud_project)
        .await
        .context("Failed to set gcloud project")?;

    let cluster = gcloud
        .default_cluster()
        .await
        .context("Failed to determine default cluster")?;
    print_info(&format!("Using cluster: {}", cluster));
    gcloud.set_default_cluster(&cluster).await?;

    let region = gcloud
        .cluster_region()
        .await
        .context("Failed to determine cluster region")?;
    gcloud.set_region(&region).await?;

    gcloud
        .fetch_cluster_credentials(&cluster, kubeconfig)
        .await
        .context("Failed to fetch cluster credentials")?;

    Ok(())
}
