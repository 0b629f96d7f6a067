//! GridEYE Service - BLE thermal sensor scanner and HTTP API.
//!
//! Run with: `cargo run -p grideye-service`

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use grideye_service::{AppState, Collector, Config, api};

/// GridEYE Service - BLE thermal sensor scanner and HTTP API.
#[derive(Parser, Debug)]
#[command(name = "grideye-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Disable the background scanner (API only mode).
    #[arg(long)]
    no_scanner: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("grideye_service=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_else(|e| {
            warn!("Ignoring default config: {}", e);
            Config::default()
        }),
    };

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    config.validate()?;

    let bind = config.server.bind.clone();
    let state = AppState::new(config);
    let cancel = CancellationToken::new();

    let scanner = if args.no_scanner {
        info!("Background scanner disabled");
        None
    } else {
        Some(Collector::new(Arc::clone(&state)).start(cancel.clone()))
    };

    let app = Router::new()
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Starting server on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    if let Some(scanner) = scanner {
        let _ = scanner.await;
    }
    info!("Shutdown complete");

    Ok(())
}

/// Resolve on Ctrl-C, or when the token is cancelled elsewhere.
async fn shutdown_signal(cancel: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl-C: {}", e);
                cancel.cancelled().await;
                return;
            }
            info!("Shutdown requested");
            cancel.cancel();
        }
        _ = cancel.cancelled() => {}
    }
}
