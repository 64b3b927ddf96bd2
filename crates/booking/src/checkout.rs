//! Checkout orchestration across providers.
//!
//! The run is a forward-only saga: provider checkouts commit sequentially
//! in cart order, and a failed partition is skipped rather than
//! compensated. Airline holds expire on their own, so unwinding an
//! already-committed reservation costs the customer more than keeping it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use common::{Money, ProviderId, PurchaseId};
use gateway::{Identity, PaymentDetails, ProviderApi, ReservationDetail};
use ledger::{LedgerStore, PurchaseRecord, SubReservation};
use registry::{Provider, ProviderStore, RegistryError};

use crate::cart::CartAggregator;
use crate::error::{BookingError, ProviderFailure, Result};
use crate::run::{partition_by_provider, CheckoutRun, ProviderPartition, RunState};

/// What a checkout run produced.
#[derive(Debug)]
pub struct CheckoutOutcome {
    pub purchase_id: PurchaseId,
    pub state: RunState,
    /// Sum of the committed providers' totals.
    pub total: Money,
    pub committed: Vec<ProviderId>,
    pub failed: Vec<ProviderFailure>,
}

/// Runs the multi-provider checkout saga and persists the outcome.
pub struct CheckoutOrchestrator<R, P, L> {
    registry: Arc<R>,
    providers: Arc<P>,
    ledger: Arc<L>,
    aggregator: CartAggregator<R, P>,
}

impl<R, P, L> CheckoutOrchestrator<R, P, L>
where
    R: ProviderStore,
    P: ProviderApi,
    L: LedgerStore,
{
    pub fn new(registry: Arc<R>, providers: Arc<P>, ledger: Arc<L>) -> Self {
        let aggregator = CartAggregator::new(Arc::clone(&registry), Arc::clone(&providers));
        Self {
            registry,
            providers,
            ledger,
            aggregator,
        }
    }

    /// Executes a checkout for the given user.
    ///
    /// The cart is re-fetched at the start of the run — whatever the
    /// providers hold at that moment is what gets purchased. With zero
    /// commits nothing is persisted; with at least one commit a purchase
    /// record covering only the committed partitions is written.
    ///
    /// Concurrent checkouts for the same user are not serialized here;
    /// the provider backends arbitrate their own cart state.
    #[tracing::instrument(skip(self, identity, payment), fields(user_id = %identity.user_id))]
    pub async fn execute(
        &self,
        identity: &Identity,
        payment: &PaymentDetails,
    ) -> Result<CheckoutOutcome> {
        let start = Instant::now();
        metrics::counter!("checkouts_started_total").increment(1);

        let cart = self.aggregator.cart(identity).await?;
        if cart.is_empty() {
            return Err(BookingError::EmptyCart);
        }

        let mut run = CheckoutRun::new();
        let partitions = partition_by_provider(cart.items);
        // Resolve every partition's provider before the first commit so a
        // stale cart fails the whole run instead of half of it.
        let resolved = self.resolve_partitions(&partitions).await?;
        run.begin_commits(partitions);

        let mut subs: Vec<SubReservation> = Vec::new();
        let mut snapshots: HashMap<String, serde_json::Value> = HashMap::new();

        for provider in &resolved {
            match self.providers.checkout(provider, identity, payment).await {
                Ok(receipt) => {
                    let detail = self
                        .detail_or_placeholder(provider, identity, &receipt.reservation_id)
                        .await;
                    if !detail.raw.is_null() {
                        snapshots.insert(provider.id.to_string(), detail.raw.clone());
                    }
                    subs.push(SubReservation {
                        provider_id: provider.id.clone(),
                        provider_reservation_id: detail.reservation_id,
                        confirmation_code: detail.confirmation_code,
                        provider_total: detail.total,
                        status_code: detail.status_code,
                    });
                    run.record_commit(provider.id.clone());
                }
                Err(e) => {
                    metrics::counter!("checkout_partition_failures_total", "provider" => provider.id.to_string()).increment(1);
                    run.record_failure(provider.id.clone(), e.to_string());
                }
            }
        }

        let state = run.finish();
        if state == RunState::Failed {
            metrics::counter!("checkouts_failed_total").increment(1);
            return Err(BookingError::TotalFailure {
                failures: run.into_failures(),
            });
        }

        let record = PurchaseRecord::new(identity.user_id, subs, snapshots);
        self.ledger.upsert(&record).await?;

        metrics::counter!("checkouts_completed_total", "state" => state.as_str()).increment(1);
        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());
        tracing::info!(
            purchase_id = %record.purchase_id,
            state = %state,
            total = %record.total,
            committed = run.committed().len(),
            failed = run.failures().len(),
            "Checkout completed"
        );

        Ok(CheckoutOutcome {
            purchase_id: record.purchase_id,
            state,
            total: record.total,
            committed: run.committed().to_vec(),
            failed: run.into_failures(),
        })
    }

    async fn resolve_partitions(&self, partitions: &[ProviderPartition]) -> Result<Vec<Provider>> {
        let mut resolved = Vec::with_capacity(partitions.len());
        for partition in partitions {
            match self.registry.get(&partition.provider_id).await {
                Ok(provider) => resolved.push(provider),
                Err(RegistryError::NotFound(id)) => {
                    return Err(BookingError::InvalidCartState(format!(
                        "Cart items belong to unknown provider {id}"
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(resolved)
    }

    /// Fetches the post-commit reservation detail. The provider-side
    /// commit already happened, so a failed fetch degrades to a
    /// placeholder instead of losing the sub-reservation.
    async fn detail_or_placeholder(
        &self,
        provider: &Provider,
        identity: &Identity,
        reservation_id: &str,
    ) -> ReservationDetail {
        match self
            .providers
            .reservation_detail(provider, identity, reservation_id)
            .await
        {
            Ok(detail) => detail,
            Err(e) => {
                tracing::warn!(
                    provider_id = %provider.id,
                    reservation_id,
                    error = %e,
                    "Detail fetch failed after commit, recording placeholder"
                );
                ReservationDetail::placeholder(reservation_id)
            }
        }
    }
}
