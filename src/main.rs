use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use register_bridge::cli::Args;
use register_bridge::{BridgeAgent, Result};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(&args).await {
        Ok(cycles) => {
            info!(cycles, "bridge is offline");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "bridge stopped");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(args: &Args) -> Result<u64> {
    let config = args.resolve_config()?;
    info!(
        url = %config.base_url,
        registers = config.register_count,
        interval_secs = config.tick_interval_secs,
        source = %config.source,
        "bridge starting"
    );
    let mut agent = BridgeAgent::builder(config).build()?;
    agent.run_until(shutdown_signal()).await
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
