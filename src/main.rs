use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use devconnect::app::jobs::JobService;
use devconnect::config::{AppConfig, StoreBackend};
use devconnect::domain::ports::Repositories;
use devconnect::infra::{db::Db, memory::MemoryStore};
use devconnect::{http, workers, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let repos = match config.store_backend {
        StoreBackend::Postgres => {
            let db = Db::connect(&config).await?;
            if config.run_migrations {
                db.migrate().await?;
                tracing::info!("database migrations applied");
            }
            Repositories::from_store(db)
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, data is lost on restart");
            Repositories::from_store(MemoryStore::new())
        }
    };

    let state = AppState::new(repos, &config);

    let sweeper = tokio::spawn(workers::job_expiry::run(
        JobService::new(&state.repos, state.job_expiration_days),
        Duration::from_secs(config.job_sweep_interval_seconds.max(1)),
    ));

    let app = http::app(state, config.max_body_bytes);
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!("listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
