//! # Sales Loader
//!
//! Keeps a local store of Digiseller sales up to date.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        sales-loader                                     │
//! │                                                                         │
//! │  .env + sales-loader.toml + env ───► SyncConfig                         │
//! │                                          │                              │
//! │                                          ▼                              │
//! │  Digiseller API ◄─── SyncPipeline ───► SQLite (sales, sales_log)       │
//! │                          ▲                                              │
//! │             Scheduler ───┘ (run)   or   one pass (once)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // A missing .env file is the normal case
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    cli::run(Cli::parse()).await
}
