// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `warden` — driver for the warden supervision daemon.
//!
//! One mutually-exclusive mode per invocation: `dev` and `serve` run
//! the daemon in the foreground, `deploy` prepares the data directory,
//! `check` queries a running daemon and prints host stats.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use warden_core::Clock;
use warden_daemon::{Config, Request, Response};

mod client;

#[derive(Parser)]
#[command(name = "warden", version, about = "Process supervisor and monitoring daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daemon in the foreground with development settings
    Dev,
    /// Run the daemon in the foreground with production settings
    Serve,
    /// Prepare the data directory: migrate the database and take a backup
    Deploy,
    /// Query a running daemon and print status and host stats
    Check,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Dev => daemon_mode("development"),
        Command::Serve => daemon_mode("production"),
        Command::Deploy => deploy(),
        Command::Check => check(),
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("warden: {e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

/// Foreground daemon, `dev` or `serve`.
fn daemon_mode(environment: &str) -> Result<()> {
    std::env::set_var("WARDEN_ENV", environment);
    let config = Config::load();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(if environment == "development" {
                    "debug"
                } else {
                    "info"
                })
            }),
        )
        .init();

    let runtime = tokio::runtime::Runtime::new().context("tokio runtime")?;
    runtime.block_on(warden_daemon::run(config)).context("daemon run")?;
    Ok(())
}

/// Prepare the data directory without serving: open (and thereby
/// migrate) the database, seed the admin row, write a backup.
fn deploy() -> Result<()> {
    let config = Config::load();
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("create {}", config.data_dir.display()))?;

    let store = warden_store::Store::open(&config.db_path, config.pool_size)
        .context("open database")?;
    let clock = warden_core::SystemClock;
    store.seed_default_admin("admin", "", clock.epoch_ms()).context("seed admin")?;

    let report = store
        .backup_to(&config.backups_path, &[config.threads_path.as_path()])
        .context("backup")?;

    println!("data dir: {}", config.data_dir.display());
    println!("database: {} (migrated)", config.db_path.display());
    println!("backup:   {}", report.db_backup.display());
    Ok(())
}

/// Query a running daemon over its socket.
fn check() -> Result<()> {
    let config = Config::load();
    let runtime = tokio::runtime::Runtime::new().context("tokio runtime")?;
    runtime.block_on(check_inner(&config))
}

async fn check_inner(config: &Config) -> Result<()> {
    let socket = &config.socket_path;

    let pong = client::request(socket, &Request::Ping).await.with_context(|| {
        format!("daemon not reachable at {}", socket.display())
    })?;
    match pong {
        Response::Pong { version, uptime_secs } => {
            println!("daemon:  running (v{version}, up {uptime_secs}s)");
        }
        other => bail!("unexpected ping response: {other:?}"),
    }

    match client::request(socket, &Request::MemoryPressure).await? {
        Response::Memory { report } => {
            println!(
                "memory:  {:.1}% of {:.0} MB ({:?})",
                report.used_pct, report.total_mb, report.level
            );
        }
        other => bail!("unexpected memory response: {other:?}"),
    }

    match client::request(socket, &Request::StatusPoll).await? {
        Response::Statuses { statuses, .. } => {
            println!("programs: {}", statuses.len());
            for status in statuses {
                let state = if let Some(remaining) = status.shutdown_remaining_secs {
                    format!("shutting down ({remaining}s left)")
                } else if status.running {
                    format!(
                        "running (pid {}, cpu {:.1}%, rss {:.0} MB)",
                        status.pid.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string()),
                        status.cpu_percent,
                        status.memory_mb
                    )
                } else {
                    "stopped".to_string()
                };
                println!("  [{}] {}: {}", status.program_id, status.name, state);
            }
        }
        other => bail!("unexpected status response: {other:?}"),
    }

    Ok(())
}
