#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use server::app::build_app;
use server::config::{CliArgs, ServerConfig};
use server::service::state::AppState;
use server::telemetry::{TelemetryProviders, init_telemetry};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;

// mimalloc holds up better than the musl allocator under many open streams.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    let listener = TcpListener::bind(config.server_addr).await?;
    log_startup_info(&listener.local_addr()?, &config);

    let state = AppState::new(config);
    let app = build_app(state.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state, providers))
        .await?;

    tracing::info!("tickstream server stopped");
    Ok(())
}

fn log_startup_info(addr: &SocketAddr, config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting tickstream on {} with full config: {:#?}", addr, config);
    } else {
        tracing::info!(
            "Starting tickstream on {} ticking every {:?}",
            addr,
            config.tick_interval
        );
    }
}

async fn shutdown_signal(state: AppState, providers: TelemetryProviders) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, draining streams");

    // 1. Refuse new streams, complete open ones and wait for them to drain
    state.service.shutdown(state.config.shutdown_timeout).await;

    // 2. Flush telemetry
    providers.shutdown();
}
