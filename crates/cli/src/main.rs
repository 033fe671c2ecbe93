mod cli;
mod output;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seedbox_core::{
    default_config_path, load_config, load_payloads, validate_config, BulkExecutor,
    ClientRegistry, CommandReport, ExecutorConfig, Target,
};

use cli::{Cli, Command, OutputFormat};

/// Exit code for errors that stop a command before it acts.
const EXIT_ABORTED: i32 = 2;

/// Exit code after a second interrupt.
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            EXIT_ABORTED
        }
    };
    std::process::exit(code);
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load and validate configuration, then build the client registry.
fn load_settings(path: &Path) -> Result<(ClientRegistry, ExecutorConfig)> {
    info!("Loading configuration from {:?}", path);
    let config =
        load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?;
    validate_config(&config).context("Configuration validation failed")?;
    debug!(clients = config.clients.len(), "Configuration loaded");
    Ok((ClientRegistry::from_config(&config), config.executor))
}

/// Resolve a client list and connect to each client.
fn connect(registry: &ClientRegistry, names: &str) -> Result<Vec<Target>> {
    registry
        .resolve(names)
        .with_context(|| format!("Failed to resolve clients '{}'", names))?
        .into_iter()
        .map(|descriptor| {
            let name = descriptor.name.clone();
            Target::connect(descriptor).with_context(|| format!("Failed to create client {}", name))
        })
        .collect()
}

fn finish(report: &CommandReport, format: OutputFormat) -> Result<i32> {
    output::render_report(report, format)?;
    Ok(report.exit_code())
}

async fn run(cli: Cli) -> Result<i32> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let (registry, executor_config) = load_settings(&config_path)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    tokio::spawn(watch_shutdown(Arc::clone(&shutdown)));
    let executor = BulkExecutor::new(executor_config).with_shutdown_flag(shutdown);

    match cli.command {
        Command::Clients => {
            output::render_clients(registry.names(), cli.output)?;
            Ok(0)
        }
        Command::Ls(args) => {
            let query = args.filter.query()?;
            let targets = connect(&registry, &args.clients.joined())?;
            let listings = executor.ls(&targets, &query).await;
            executor.logout(&targets).await;
            output::render_listings(&listings, cli.output)?;
            Ok(if listings.iter().any(|l| l.error.is_some()) {
                1
            } else {
                0
            })
        }
        Command::Add(args) => {
            let targets = connect(&registry, &args.clients.joined())?;
            let payloads = load_payloads(&args.paths)
                .await
                .context("Failed to load torrent files")?;
            let executor = executor.with_dry_run(args.dry_run);
            let report = executor.add(&targets, &payloads, args.delete_after).await;
            executor.logout(&targets).await;
            finish(&report, cli.output)
        }
        Command::Cp(args) => {
            let query = args.filter.query()?;
            let source = registry
                .get(&args.from)
                .context("Failed to resolve source client")?;
            let source_name = source.name.clone();
            let source = Target::connect(source)
                .with_context(|| format!("Failed to create client {}", source_name))?;
            let destinations = connect(&registry, &args.to)?;
            let executor = executor.with_dry_run(args.dry_run);
            let report = executor.cp(&source, &destinations, &query).await;
            executor.logout(std::slice::from_ref(&source)).await;
            executor.logout(&destinations).await;
            finish(&report, cli.output)
        }
        Command::Start(args) => {
            let query = args.filter.query()?;
            let targets = connect(&registry, &args.clients.joined())?;
            let executor = executor.with_dry_run(args.dry_run);
            let report = executor.start(&targets, &query).await;
            executor.logout(&targets).await;
            finish(&report, cli.output)
        }
        Command::Recheck(args) => {
            let query = args.filter.query()?;
            let targets = connect(&registry, &args.clients.joined())?;
            let executor = executor.with_dry_run(args.dry_run);
            let report = executor.recheck(&targets, &query).await;
            executor.logout(&targets).await;
            finish(&report, cli.output)
        }
    }
}

/// Set `flag` on the first interrupt; exit on the second.
async fn watch_shutdown(flag: Arc<AtomicBool>) {
    shutdown_signal().await;
    warn!("Shutdown requested, finishing in-flight work (interrupt again to abort)");
    flag.store(true, Ordering::SeqCst);

    if signal::ctrl_c().await.is_ok() {
        std::process::exit(EXIT_INTERRUPTED);
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
