use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use mapgate::args::Args;
use mapgate::config::EnvVarConfig;
use mapgate::server;
use mapgate_core::{IngressState, RateLimitingProvider, rate_limiter};

/// Initialise tracing with stderr output.
///
/// `--verbose` forces `debug`; otherwise `RUST_LOG` is respected, defaulting
/// to `info` (or `warn` with `--quiet`).
fn init_tracing(args: &Args) {
    let default_level = if args.quiet { "warn" } else { "info" };
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Loaded before parsing so SERVER_HOST / SERVER_PORT from .env reach clap
    let dotenv = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(&args);

    if let Ok(path) = &dotenv {
        debug!(path = %path.display(), "Loaded .env file");
    }

    let addr = match args.listen_addr() {
        Ok(addr) => addr,
        Err(err) => {
            error!(error = %err, "Configuration error");
            return ExitCode::FAILURE;
        }
    };

    let config = EnvVarConfig::from_env();
    let state = match IngressState::from_config(&config, config.data_dir()) {
        Ok(state) => Arc::new(state),
        Err(err) => {
            error!(error = %err, "Failed to initialise ingress state");
            return ExitCode::FAILURE;
        }
    };

    server::log_startup_info(&args, &config, &state.forwarder);

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(addr = %addr, error = %err, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    info!(addr = %addr, "MapGate is running");

    let sweeper = tokio::spawn(rate_limiter::run_cleanup(
        state.limiter.clone(),
        config.rate_limit_cleanup_config().interval,
    ));

    let result = server::serve(listener, state, server::shutdown_signal()).await;
    sweeper.abort();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Server error");
            ExitCode::FAILURE
        }
    }
}
