//! projsync CLI - Operator interface to a local sync database
//!
//! Runs upload, download, status and conflict resolution without the HTTP server.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use projsync_core::models::DownloadRequest;

use crate::cli::{Cli, Commands};
use crate::commands::audit::{run_audit, run_audit_summary};
use crate::commands::common::resolve_db_path;
use crate::commands::completions::run_completions;
use crate::commands::conflicts::run_conflicts;
use crate::commands::download::run_download;
use crate::commands::resolve::run_resolve;
use crate::commands::status::run_status;
use crate::commands::upload::run_upload;
use crate::error::CliError;

fn main() {
    if let Err(error) = run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "projsync=info"
                    .parse()
                    .map_err(|error| CliError::Io(std::io::Error::other(error)))?,
            ),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Status { device_id, json } => run_status(&device_id, json, &db_path)?,
        Commands::Upload { file } => {
            run_upload(&file, &db_path)?;
        }
        Commands::Download {
            table,
            device_id,
            since,
            limit,
        } => {
            let request = DownloadRequest {
                table_name: table,
                last_synced_at: since,
                device_id,
                limit,
            };
            run_download(&request, &db_path)?;
        }
        Commands::Resolve { file } => run_resolve(&file, &db_path)?,
        Commands::Conflicts { table, limit, json } => {
            run_conflicts(table.as_deref(), limit, json, &db_path)?;
        }
        Commands::Audit {
            limit,
            summary,
            since,
            json,
        } => {
            if summary {
                run_audit_summary(since, json, &db_path)?;
            } else {
                run_audit(limit, json, &db_path)?;
            }
        }
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
