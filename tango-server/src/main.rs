//! Server entry point
//!
//! Startup order: config → state (Postgres, Redis, breaker) → worker pools
//! and the retry scheduler → HTTP. Shutdown is the reverse: stop accepting
//! requests, cancel the workers, give each up to 15 s to finish its job.

use std::net::SocketAddr;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use tango_server::api;
use tango_server::config::Config;
use tango_server::state::AppState;
use tango_server::workers;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tango_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(environment = %config.environment, "starting tango-server");

    let port = config.port;
    let state = AppState::new(config).await?;

    let shutdown = CancellationToken::new();
    let worker_handles = workers::pool::start(state.clone(), shutdown.clone());

    // Periodic rate-limiter sweep (every 5 minutes)
    {
        let rate_limiter = state.rate_limiter.clone();
        let token = shutdown.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = interval.tick() => rate_limiter.cleanup(),
                }
            }
        });
    }

    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("tango-server listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // HTTP is down; drain the workers
    tracing::info!("shutting down, draining workers");
    shutdown.cancel();
    for handle in worker_handles {
        if tokio::time::timeout(WORKER_DRAIN_TIMEOUT, handle).await.is_err() {
            tracing::warn!("worker did not finish within the drain timeout");
        }
    }

    tracing::info!("bye");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
