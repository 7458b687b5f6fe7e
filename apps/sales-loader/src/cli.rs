//! Command-line interface and command handlers.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use digisales_core::validation::validate_search_query;
use digisales_core::window::{format_remote_timestamp, to_remote};
use digisales_core::{Sale, SyncLog};
use digisales_db::{Database, DbConfig};
use digisales_sync::{Scheduler, SyncConfig, SyncPipeline, TokenCache, Trigger};

#[derive(Parser, Debug)]
#[command(name = "sales-loader")]
#[command(about = "Synchronizes Digiseller sales into a local store", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: sales-loader.toml in the platform config dir)
    #[arg(long, global = true, env = "SALES_LOADER_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database file, overrides the config
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the scheduler until Ctrl-C or SIGTERM
    Run,
    /// Run one manual pass and exit
    Once,
    /// Show recent sync log entries, newest first
    Logs {
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
    /// Search stored sales by invoice id, product, entry, email or ip
    Search {
        term: String,
        #[arg(short, long, default_value_t = 50)]
        limit: u32,
    },
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = SyncConfig::load(cli.config).context("Failed to load configuration")?;
    if let Some(path) = cli.database {
        config.database.path = Some(path);
    }

    let db = open_database(&config).await?;

    let outcome = match cli.command {
        Commands::Run => run_scheduler(&config, &db).await,
        Commands::Once => run_once(&config, &db).await,
        Commands::Logs { limit } => show_logs(&db, limit).await,
        Commands::Search { term, limit } => search_sales(&db, &term, limit).await,
    };

    db.close().await;
    outcome
}

async fn open_database(config: &SyncConfig) -> Result<Database> {
    let path = config.database.resolved_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let db_config = DbConfig::new(&path).max_connections(config.database.max_connections);
    Database::new(db_config)
        .await
        .with_context(|| format!("Failed to open database {}", path.display()))
}

// =============================================================================
// Commands
// =============================================================================

async fn run_scheduler(config: &SyncConfig, db: &Database) -> Result<ExitCode> {
    let pipeline = SyncPipeline::from_config(config, db, Arc::new(TokenCache::new()))?;
    let handle = Scheduler::new(Arc::new(pipeline), &config.schedule).spawn();

    shutdown_signal().await;

    let status = handle.shutdown().await?;
    info!(
        passes_run = status.passes_run,
        consecutive_failures = status.consecutive_failures,
        "Scheduler shutdown complete"
    );
    Ok(ExitCode::SUCCESS)
}

async fn run_once(config: &SyncConfig, db: &Database) -> Result<ExitCode> {
    let pipeline = SyncPipeline::from_config(config, db, Arc::new(TokenCache::new()))?;
    let report = pipeline.run_pass(Trigger::Manual).await;

    println!(
        "{}: fetched {}, inserted {}, skipped {}, rejected {}",
        report.note,
        report.fetched,
        report.inserted,
        report.skipped,
        report.failures.len()
    );
    for failure in &report.failures {
        println!("  {failure}");
    }
    for window in &report.truncated {
        println!(
            "  window {} .. {}: page limit reached, rows may be missing",
            window.date_start(),
            window.date_finish()
        );
    }
    if let Some(message) = &report.error {
        println!("  {message}");
    }

    if report.is_success() && report.log.is_some() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn show_logs(db: &Database, limit: u32) -> Result<ExitCode> {
    let logs = db.sync_logs().recent(limit).await?;
    if logs.is_empty() {
        println!("No sync attempts recorded yet");
    }
    for log in &logs {
        println!("{}", format_log_line(log));
    }
    Ok(ExitCode::SUCCESS)
}

async fn search_sales(db: &Database, term: &str, limit: u32) -> Result<ExitCode> {
    let query = validate_search_query(term)?;
    let sales = db.sales().search(&query, limit).await?;
    if sales.is_empty() {
        println!("No sales match {query:?}");
    }
    for sale in &sales {
        println!("{}", format_sale_line(sale));
    }
    Ok(ExitCode::SUCCESS)
}

// =============================================================================
// Output
// =============================================================================

fn format_log_line(log: &SyncLog) -> String {
    format!(
        "{}  {:>6}  {:<16}  {}",
        format_remote_timestamp(&to_remote(log.timestamp)),
        log.orders_loaded,
        log.note,
        log.errors
    )
}

fn format_sale_line(sale: &Sale) -> String {
    let when = sale.date_pay.unwrap_or(sale.date_put);
    format!(
        "{}  {}  {:.2} {}  {}  {}",
        sale.invoice_id,
        format_remote_timestamp(&to_remote(when)),
        sale.amount_in,
        sale.currency,
        sale.product_name,
        sale.email
    )
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, waiting for the current pass");
}
