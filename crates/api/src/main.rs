use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use comprar_construir_api::{
    app::{router, AppState},
    config::Config,
    jobs::build_scheduler,
    middleware::{init_metrics, logging::init_logging},
    services::FixedWindowLimiter,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    init_logging(&config.logging);
    init_metrics().context("installing Prometheus recorder")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Comprar & Construir API"
    );

    let pool = persistence::db::create_pool(&(&config.database).into()).await?;

    info!("Running database migrations");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;

    let limiter = match config.rate_limit.backend.as_str() {
        "redis" => Arc::new(
            FixedWindowLimiter::redis(&config.rate_limit.redis_url)
                .await
                .context("connecting rate limit backend")?,
        ),
        _ => Arc::new(FixedWindowLimiter::memory()),
    };
    info!(backend = limiter.backend_name(), "Rate limiter ready");

    let mut scheduler = config
        .jobs
        .enabled
        .then(|| build_scheduler(&config.jobs, pool.clone(), limiter.clone()));
    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.start();
    }

    let addr = config.socket_addr()?;
    let state = AppState::new(config, pool, limiter)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown();
        scheduler.wait_for_shutdown(Duration::from_secs(10)).await;
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
