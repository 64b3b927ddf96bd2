//! Purchase listing, detail, and cancellation endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::PurchaseId;
use gateway::ProviderApi;
use ledger::{LedgerStore, PurchaseRecord, SubReservation};
use registry::ProviderStore;
use serde::Serialize;

use crate::error::ApiError;
use crate::extract::Caller;
use crate::routes::cart::FailureResponse;
use crate::state::AppState;

// -- Response types --

#[derive(Serialize)]
pub struct PurchaseSummaryResponse {
    pub purchase_id: String,
    pub status: String,
    pub status_code: i32,
    pub total_cents: i64,
    pub created_at: String,
    pub sub_reservations: Vec<SubReservationResponse>,
}

#[derive(Serialize)]
pub struct PurchaseDetailResponse {
    #[serde(flatten)]
    pub summary: PurchaseSummaryResponse,
    /// Raw provider detail bodies, keyed by provider id.
    pub detail_snapshots: HashMap<String, serde_json::Value>,
}

#[derive(Serialize)]
pub struct SubReservationResponse {
    pub provider: String,
    pub reservation_id: String,
    pub confirmation_code: Option<String>,
    pub total_cents: i64,
    pub status_code: i32,
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub purchase_id: String,
    pub status: String,
    pub cancelled: Vec<String>,
    pub failed: Vec<FailureResponse>,
}

impl From<&SubReservation> for SubReservationResponse {
    fn from(sub: &SubReservation) -> Self {
        Self {
            provider: sub.provider_id.to_string(),
            reservation_id: sub.provider_reservation_id.clone(),
            confirmation_code: sub.confirmation_code.clone(),
            total_cents: sub.provider_total.cents(),
            status_code: sub.status_code,
        }
    }
}

fn summarize(record: &PurchaseRecord) -> PurchaseSummaryResponse {
    PurchaseSummaryResponse {
        purchase_id: record.purchase_id.to_string(),
        status: record.status.to_string(),
        status_code: record.status.code(),
        total_cents: record.total.cents(),
        created_at: record.created_at.to_rfc3339(),
        sub_reservations: record.sub_reservations.iter().map(Into::into).collect(),
    }
}

fn parse_purchase_id(raw: &str) -> Result<PurchaseId, ApiError> {
    let uuid = uuid::Uuid::parse_str(raw)
        .map_err(|e| ApiError::BadRequest(format!("Invalid purchase id: {e}")))?;
    Ok(PurchaseId::from_uuid(uuid))
}

// -- Handlers --

/// GET /purchases — the caller's purchase history, most recent first.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.identity.user_id))]
pub async fn list<R, P, L>(
    State(state): State<Arc<AppState<R, P, L>>>,
    caller: Caller,
) -> Result<Json<Vec<PurchaseSummaryResponse>>, ApiError>
where
    R: ProviderStore,
    P: ProviderApi,
    L: LedgerStore,
{
    let records = state.synchronizer.list(caller.identity.user_id).await?;
    Ok(Json(records.iter().map(summarize).collect()))
}

/// GET /purchases/:id — one purchase, reconciled against its providers.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.identity.user_id))]
pub async fn get<R, P, L>(
    State(state): State<Arc<AppState<R, P, L>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<PurchaseDetailResponse>, ApiError>
where
    R: ProviderStore,
    P: ProviderApi,
    L: LedgerStore,
{
    let purchase_id = parse_purchase_id(&id)?;
    let record = state
        .synchronizer
        .detail(&caller.identity, purchase_id, caller.is_admin)
        .await?;

    Ok(Json(PurchaseDetailResponse {
        summary: summarize(&record),
        detail_snapshots: record.detail_snapshots,
    }))
}

/// POST /purchases/:id/cancel — cancel across providers, best effort.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.identity.user_id))]
pub async fn cancel<R, P, L>(
    State(state): State<Arc<AppState<R, P, L>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError>
where
    R: ProviderStore,
    P: ProviderApi,
    L: LedgerStore,
{
    let purchase_id = parse_purchase_id(&id)?;
    let outcome = state
        .synchronizer
        .cancel(&caller.identity, purchase_id, caller.is_admin)
        .await?;

    Ok(Json(CancelResponse {
        purchase_id: outcome.purchase_id.to_string(),
        status: outcome.status.to_string(),
        cancelled: outcome.cancelled.iter().map(|p| p.to_string()).collect(),
        failed: outcome.failed.into_iter().map(Into::into).collect(),
    }))
}
