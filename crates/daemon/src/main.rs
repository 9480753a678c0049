// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wardend` — the warden supervision daemon.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use warden_daemon::{env, run, Config, Environment};

fn main() -> std::process::ExitCode {
    let config = Config::load();

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        eprintln!("cannot create data dir {}: {e}", config.data_dir.display());
        return std::process::ExitCode::FAILURE;
    }

    // File logging always; console output in development.
    let file_appender = tracing_appender::rolling::daily(&config.data_dir, "warden.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match config.environment {
            Environment::Development => "debug",
            Environment::Production => "info",
        })
    });

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(file_writer).with_ansi(false));
    match config.environment {
        Environment::Development => {
            registry.with(fmt::layer().with_writer(std::io::stderr)).init()
        }
        Environment::Production => registry.init(),
    }

    tracing::info!(version = env::DAEMON_VERSION, "wardend starting");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("tokio runtime: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("daemon failed: {e}");
            eprintln!("wardend: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}
