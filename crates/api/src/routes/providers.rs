//! Administrative provider registry endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProviderId;
use gateway::ProviderApi;
use ledger::LedgerStore;
use registry::{Provider, ProviderStore};
use serde::Serialize;

use crate::error::ApiError;
use crate::extract::Caller;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProviderListResponse {
    pub providers: Vec<Provider>,
}

/// GET /providers — every configured provider, enabled or not.
#[tracing::instrument(skip(state, caller))]
pub async fn list<R, P, L>(
    State(state): State<Arc<AppState<R, P, L>>>,
    caller: Caller,
) -> Result<Json<ProviderListResponse>, ApiError>
where
    R: ProviderStore,
    P: ProviderApi,
    L: LedgerStore,
{
    caller.require_admin()?;
    let providers = state.registry.list_all().await.map_err(ApiError::from)?;
    Ok(Json(ProviderListResponse { providers }))
}

/// PUT /providers/:id — insert or replace a provider configuration.
///
/// The path id wins over any id carried in the body.
#[tracing::instrument(skip(state, caller, provider))]
pub async fn upsert<R, P, L>(
    State(state): State<Arc<AppState<R, P, L>>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(mut provider): Json<Provider>,
) -> Result<Json<Provider>, ApiError>
where
    R: ProviderStore,
    P: ProviderApi,
    L: LedgerStore,
{
    caller.require_admin()?;
    provider.id = ProviderId::new(&id);
    state
        .registry
        .upsert(provider.clone())
        .await
        .map_err(ApiError::from)?;
    tracing::info!(provider_id = %id, "provider configuration updated");
    Ok(Json(provider))
}

/// DELETE /providers/:id — remove a provider configuration.
#[tracing::instrument(skip(state, caller))]
pub async fn delete<R, P, L>(
    State(state): State<Arc<AppState<R, P, L>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    R: ProviderStore,
    P: ProviderApi,
    L: LedgerStore,
{
    caller.require_admin()?;
    state
        .registry
        .delete(&ProviderId::new(&id))
        .await
        .map_err(ApiError::from)?;
    tracing::info!(provider_id = %id, "provider configuration removed");
    Ok(StatusCode::NO_CONTENT)
}
