//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use gateway::ProviderGateway;
use ledger::{InMemoryLedger, LedgerStore, PostgresLedger};
use registry::InMemoryProviderStore;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Loads the provider registry, from `PROVIDERS_FILE` when configured.
async fn build_registry(config: &Config) -> InMemoryProviderStore {
    match &config.providers_file {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .expect("failed to read PROVIDERS_FILE");
            let store = InMemoryProviderStore::from_json(&json)
                .await
                .expect("invalid provider configuration");
            let count = store.len().await;
            tracing::info!(path = %path, providers = count, "loaded provider registry");
            store
        }
        None => {
            tracing::warn!("PROVIDERS_FILE not set, starting with an empty provider registry");
            InMemoryProviderStore::new()
        }
    }
}

/// Builds the router over a concrete ledger backend and serves it.
async fn serve<L>(config: &Config, registry: Arc<InMemoryProviderStore>, ledger: Arc<L>)
where
    L: LedgerStore + 'static,
{
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let gateway = Arc::new(ProviderGateway::new());
    let state = api::create_state(registry, gateway, ledger);
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let registry = Arc::new(build_registry(&config).await);

    match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPool::connect(url)
                .await
                .expect("failed to connect to Postgres ledger");
            let ledger = PostgresLedger::new(pool);
            ledger
                .run_migrations()
                .await
                .expect("failed to run ledger migrations");
            tracing::info!("using Postgres purchase ledger");
            serve(&config, registry, Arc::new(ledger)).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory purchase ledger");
            serve(&config, registry, Arc::new(InMemoryLedger::new())).await;
        }
    }
}
