//! Cart and checkout endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use booking::{AggregatedCart, CartItem, ProviderFailure};
use common::ProviderId;
use gateway::{PaymentDetails, ProviderApi};
use ledger::LedgerStore;
use registry::ProviderStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::Caller;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub flight_id: i64,
    pub fare_class_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Target provider; defaults to the first enabled one.
    pub provider: Option<String>,
    /// Also add the provider-linked counterpart item (e.g. return leg).
    #[serde(default)]
    pub include_linked: bool,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
    pub provider: Option<String>,
    /// Mirror the change onto the linked counterpart item.
    #[serde(default)]
    pub sync_linked: bool,
}

#[derive(Debug, Deserialize)]
pub struct RemoveItemParams {
    pub provider: Option<String>,
    #[serde(default)]
    pub sync_linked: bool,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItemResponse>,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct CartItemResponse {
    pub item_id: String,
    pub provider: String,
    pub flight_id: i64,
    pub fare_class_id: i64,
    pub quantity: u32,
    pub unit_base_price_cents: i64,
    pub unit_final_price_cents: i64,
    pub subtotal_cents: i64,
    pub linked_item_id: Option<String>,
    pub flight_code: Option<String>,
    pub fare_class: Option<String>,
    pub departure: Option<String>,
    pub arrival: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
}

impl From<CartItem> for CartItemResponse {
    fn from(item: CartItem) -> Self {
        Self {
            item_id: item.item_id,
            provider: item.provider_id.to_string(),
            flight_id: item.flight_id,
            fare_class_id: item.fare_class_id,
            quantity: item.quantity,
            unit_base_price_cents: item.unit_base_price.cents(),
            unit_final_price_cents: item.unit_final_price.cents(),
            subtotal_cents: item.subtotal.cents(),
            linked_item_id: item.linked_item_id,
            flight_code: item.flight_code,
            fare_class: item.fare_class,
            departure: item.departure,
            arrival: item.arrival,
            origin: item.origin,
            destination: item.destination,
        }
    }
}

impl From<AggregatedCart> for CartResponse {
    fn from(cart: AggregatedCart) -> Self {
        Self {
            total_cents: cart.total.cents(),
            items: cart.items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub purchase_id: String,
    pub state: String,
    pub total_cents: i64,
    pub committed: Vec<String>,
    pub failed: Vec<FailureResponse>,
}

#[derive(Serialize)]
pub struct FailureResponse {
    pub provider: String,
    pub reason: String,
}

impl From<ProviderFailure> for FailureResponse {
    fn from(failure: ProviderFailure) -> Self {
        Self {
            provider: failure.provider_id.to_string(),
            reason: failure.reason,
        }
    }
}

fn provider_id(name: &Option<String>) -> Option<ProviderId> {
    name.as_deref().map(ProviderId::new)
}

// -- Handlers --

/// GET /cart — the merged cross-provider cart.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.identity.user_id))]
pub async fn get_cart<R, P, L>(
    State(state): State<Arc<AppState<R, P, L>>>,
    caller: Caller,
) -> Result<Json<CartResponse>, ApiError>
where
    R: ProviderStore,
    P: ProviderApi,
    L: LedgerStore,
{
    let cart = state.aggregator.cart(&caller.identity).await?;
    Ok(Json(cart.into()))
}

/// POST /cart/items — add a flight to one provider's cart.
#[tracing::instrument(skip(state, caller, req), fields(user_id = %caller.identity.user_id))]
pub async fn add_item<R, P, L>(
    State(state): State<Arc<AppState<R, P, L>>>,
    caller: Caller,
    Json(req): Json<AddItemRequest>,
) -> Result<(axum::http::StatusCode, Json<CartResponse>), ApiError>
where
    R: ProviderStore,
    P: ProviderApi,
    L: LedgerStore,
{
    if req.quantity == 0 {
        return Err(ApiError::BadRequest("Quantity must be positive".to_string()));
    }
    state
        .aggregator
        .add_item(
            &caller.identity,
            provider_id(&req.provider).as_ref(),
            req.flight_id,
            req.fare_class_id,
            req.quantity,
            req.include_linked,
        )
        .await?;

    let cart = state.aggregator.cart(&caller.identity).await?;
    Ok((axum::http::StatusCode::CREATED, Json(cart.into())))
}

/// PUT /cart/items/:id — change a line item's quantity.
#[tracing::instrument(skip(state, caller, req), fields(user_id = %caller.identity.user_id))]
pub async fn update_item<R, P, L>(
    State(state): State<Arc<AppState<R, P, L>>>,
    caller: Caller,
    Path(item_id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartResponse>, ApiError>
where
    R: ProviderStore,
    P: ProviderApi,
    L: LedgerStore,
{
    if req.quantity == 0 {
        return Err(ApiError::BadRequest("Quantity must be positive".to_string()));
    }
    state
        .aggregator
        .update_item(
            &caller.identity,
            provider_id(&req.provider).as_ref(),
            &item_id,
            req.quantity,
            req.sync_linked,
        )
        .await?;

    let cart = state.aggregator.cart(&caller.identity).await?;
    Ok(Json(cart.into()))
}

/// DELETE /cart/items/:id — drop a line item.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.identity.user_id))]
pub async fn remove_item<R, P, L>(
    State(state): State<Arc<AppState<R, P, L>>>,
    caller: Caller,
    Path(item_id): Path<String>,
    Query(params): Query<RemoveItemParams>,
) -> Result<Json<CartResponse>, ApiError>
where
    R: ProviderStore,
    P: ProviderApi,
    L: LedgerStore,
{
    state
        .aggregator
        .remove_item(
            &caller.identity,
            provider_id(&params.provider).as_ref(),
            &item_id,
            params.sync_linked,
        )
        .await?;

    let cart = state.aggregator.cart(&caller.identity).await?;
    Ok(Json(cart.into()))
}

/// POST /checkout — run the multi-provider checkout saga.
#[tracing::instrument(skip(state, caller, payment), fields(user_id = %caller.identity.user_id))]
pub async fn checkout<R, P, L>(
    State(state): State<Arc<AppState<R, P, L>>>,
    caller: Caller,
    Json(payment): Json<PaymentDetails>,
) -> Result<(axum::http::StatusCode, Json<CheckoutResponse>), ApiError>
where
    R: ProviderStore,
    P: ProviderApi,
    L: LedgerStore,
{
    let outcome = state
        .orchestrator
        .execute(&caller.identity, &payment)
        .await?;

    let response = CheckoutResponse {
        purchase_id: outcome.purchase_id.to_string(),
        state: outcome.state.to_string(),
        total_cents: outcome.total.cents(),
        committed: outcome.committed.iter().map(|p| p.to_string()).collect(),
        failed: outcome.failed.into_iter().map(Into::into).collect(),
    };
    Ok((axum::http::StatusCode::CREATED, Json(response)))
}
