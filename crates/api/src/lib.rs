//! HTTP surface for the multi-provider booking service.
//!
//! REST endpoints for the merged cart, checkout, purchase history, and
//! provider administration, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use gateway::ProviderApi;
use ledger::LedgerStore;
use metrics_exporter_prometheus::PrometheusHandle;
use registry::ProviderStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<R, P, L>(state: Arc<AppState<R, P, L>>, metrics_handle: PrometheusHandle) -> Router
where
    R: ProviderStore + 'static,
    P: ProviderApi + 'static,
    L: LedgerStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cart", get(routes::cart::get_cart::<R, P, L>))
        .route("/cart/items", post(routes::cart::add_item::<R, P, L>))
        .route("/cart/items/{id}", put(routes::cart::update_item::<R, P, L>))
        .route(
            "/cart/items/{id}",
            delete(routes::cart::remove_item::<R, P, L>),
        )
        .route("/checkout", post(routes::cart::checkout::<R, P, L>))
        .route("/purchases", get(routes::purchases::list::<R, P, L>))
        .route("/purchases/{id}", get(routes::purchases::get::<R, P, L>))
        .route(
            "/purchases/{id}/cancel",
            post(routes::purchases::cancel::<R, P, L>),
        )
        .route("/providers", get(routes::providers::list::<R, P, L>))
        .route("/providers/{id}", put(routes::providers::upsert::<R, P, L>))
        .route(
            "/providers/{id}",
            delete(routes::providers::delete::<R, P, L>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over one registry, provider API, and ledger.
pub fn create_state<R, P, L>(
    registry: Arc<R>,
    providers: Arc<P>,
    ledger: Arc<L>,
) -> Arc<AppState<R, P, L>>
where
    R: ProviderStore,
    P: ProviderApi,
    L: LedgerStore,
{
    Arc::new(AppState::new(registry, providers, ledger))
}
