//! The `jobforge-server` binary: parses CLI flags, wires a [`JobServer`],
//! and serves it over HTTP until a shutdown signal arrives.
//!
//! Grounded on the teacher's binary-entry-point conventions (`dotenvy`
//! loading a `.env` before config resolution, `tracing`/`tracing-subscriber`
//! for structured logs) and `autumn-order-bifrost`'s `main.rs` for the
//! `#[tokio::main]` + `axum::serve` shape. Task handlers registered here
//! are deliberately minimal: individual task handlers are out of scope for
//! this crate (see `core`'s module docs) — these exist only to exercise
//! both execution policies end to end.

use std::collections::HashMap;
use std::sync::Arc;

use clap::Parser;
use jobforge::builders::ServerBuilder;
use jobforge::config::ServerConfig;
use jobforge::core::{ExecutionPolicy, WaitBudget};
use jobforge::http::build_router;
use jobforge::util::init_tracing;
use tracing::info;

/// Command-line flags for the job server.
#[derive(Debug, Parser)]
#[command(name = "jobforge-server", version, about = "Bounded-queue compute job server")]
struct Cli {
    /// TCP port to listen on. Falls back to `JOBFORGE_PORT`/the config
    /// default when omitted.
    #[arg(value_parser = clap::value_parser!(u16).range(1..=65535))]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut config = ServerConfig::from_env();
    if let Some(port) = cli.port {
        config.port = port;
    }

    let server = ServerBuilder::new()
        .register("echo", vec!["text"], ExecutionPolicy::Inline, |params| {
            Ok(params.get("text").cloned().unwrap_or_default())
        })
        .register(
            "sleep",
            vec!["seconds"],
            ExecutionPolicy::Enqueued {
                wait_budget: WaitBudget::Try,
            },
            sleep_handler,
        )
        .build(config)
        .map_err(anyhow::Error::msg)?;

    let server = Arc::new(server);
    let port = server.config.port;

    info!(
        workers = server.config.worker_count,
        queue_capacity = server.config.queue_capacity,
        port,
        "jobforge starting"
    );

    let router = build_router(Arc::clone(&server));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down worker pool");
    if let Ok(mut server) = Arc::try_unwrap(server).map_err(|_| ()) {
        server.shutdown();
    }

    Ok(())
}

fn sleep_handler(params: &HashMap<String, String>) -> Result<String, String> {
    let seconds: u64 = params
        .get("seconds")
        .ok_or_else(|| "missing 'seconds' parameter".to_string())?
        .parse()
        .map_err(|_| "'seconds' must be a non-negative integer".to_string())?;
    std::thread::sleep(std::time::Duration::from_secs(seconds.min(60)));
    Ok(format!("{{\"slept_seconds\":{seconds}}}"))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
