mod cli;
mod commands;
mod config;
mod error;
mod mcp;
mod naming;
mod partition;
mod pdf;
mod print;
mod split;
mod storage;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for output and the MCP transport
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Mcp => {
            mcp::run_server().await?;
        }
        Commands::Info { path } => {
            commands::info::run(&path)?;
        }
        Commands::Extract {
            path,
            pages,
            output,
        } => {
            commands::extract::run(&path, &pages, &output)?;
        }
        Commands::Printers => {
            commands::printers::run()?;
        }
        Commands::PrinterStatus { name } => {
            commands::printers::status(&name)?;
        }
        Commands::Split(args) => {
            let cancel = cancel_on_ctrl_c();
            tokio::task::spawn_blocking(move || commands::split::run(&args, &cancel)).await??;
        }
        Commands::Print { files, printer } => {
            let cancel = cancel_on_ctrl_c();
            tokio::task::spawn_blocking(move || commands::print::run(&files, &printer, &cancel))
                .await??;
        }
    }

    Ok(())
}

/// The first Ctrl-C lets the current file finish and skips the rest.
/// A second one exits immediately.
fn cancel_on_ctrl_c() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!("\nInterrupted, finishing the current file...");
        tracing::warn!("cancellation requested");
        flag.store(true, Ordering::Relaxed);

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Aborted.");
            std::process::exit(1);
        }
    });
    cancel
}
