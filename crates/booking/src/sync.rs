//! Ledger/provider state reconciliation.
//!
//! Providers can change a reservation behind the agency's back (airside
//! cancellations, schedule kills). Reads of a purchase re-check each
//! provider and fold drift back into the ledger; an unreachable provider
//! is skipped and its cached status stands.

use std::sync::Arc;

use common::{ProviderId, PurchaseId, UserId};
use gateway::{Identity, ProviderApi};
use ledger::{LedgerStore, PurchaseRecord, PurchaseStatus};
use registry::ProviderStore;

use crate::error::{BookingError, ProviderFailure, Result};

/// What a cancellation attempt produced.
#[derive(Debug)]
pub struct CancelOutcome {
    pub purchase_id: PurchaseId,
    /// The ledger status after the attempt.
    pub status: PurchaseStatus,
    pub cancelled: Vec<ProviderId>,
    /// Providers whose cancel call failed; their reservations stay live
    /// and need manual follow-up.
    pub failed: Vec<ProviderFailure>,
}

/// Read-side reconciliation and cancellation over the purchase ledger.
pub struct StateSynchronizer<R, P, L> {
    registry: Arc<R>,
    providers: Arc<P>,
    ledger: Arc<L>,
}

impl<R, P, L> StateSynchronizer<R, P, L>
where
    R: ProviderStore,
    P: ProviderApi,
    L: LedgerStore,
{
    pub fn new(registry: Arc<R>, providers: Arc<P>, ledger: Arc<L>) -> Self {
        Self {
            registry,
            providers,
            ledger,
        }
    }

    /// Lists the caller's purchases, most recent first. No provider
    /// round-trips; the cached ledger state is what the listing shows.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<PurchaseRecord>> {
        Ok(self.ledger.list_for_user(user_id).await?)
    }

    /// Fetches one purchase, reconciling each sub-reservation's status
    /// against its provider first. Drift is persisted before returning.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id, purchase_id = %purchase_id))]
    pub async fn detail(
        &self,
        identity: &Identity,
        purchase_id: PurchaseId,
        is_admin: bool,
    ) -> Result<PurchaseRecord> {
        let mut record = self.load(identity, purchase_id, is_admin).await?;

        let mut drifted = false;
        for sub in &mut record.sub_reservations {
            let provider = match self.registry.get(&sub.provider_id).await {
                Ok(provider) => provider,
                Err(e) => {
                    tracing::debug!(
                        provider_id = %sub.provider_id,
                        error = %e,
                        "Skipping sub-reservation with unresolvable provider"
                    );
                    continue;
                }
            };
            match self
                .providers
                .reservation_detail(&provider, identity, &sub.provider_reservation_id)
                .await
            {
                Ok(remote) => {
                    if remote.status_code != sub.status_code {
                        tracing::info!(
                            provider_id = %provider.id,
                            reservation_id = %sub.provider_reservation_id,
                            from = sub.status_code,
                            to = remote.status_code,
                            "Reservation status drifted on provider side"
                        );
                        sub.status_code = remote.status_code;
                        drifted = true;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        provider_id = %provider.id,
                        error = %e,
                        "Provider unreachable during reconciliation, keeping cached status"
                    );
                }
            }
        }

        let status_changed = record.reconcile_status();
        if drifted || status_changed {
            metrics::counter!("purchase_reconciliations_total").increment(1);
            self.ledger.upsert(&record).await?;
        }
        Ok(record)
    }

    /// Cancels a purchase across its providers, best effort.
    ///
    /// Any single provider-side cancel is enough to mark the purchase
    /// cancelled; with zero successes the purchase stays active.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id, purchase_id = %purchase_id))]
    pub async fn cancel(
        &self,
        identity: &Identity,
        purchase_id: PurchaseId,
        is_admin: bool,
    ) -> Result<CancelOutcome> {
        let mut record = self.load(identity, purchase_id, is_admin).await?;
        if !record.is_active() {
            return Err(BookingError::NotCancelable(purchase_id));
        }

        let mut cancelled = Vec::new();
        let mut failed = Vec::new();
        for sub in &mut record.sub_reservations {
            let provider = match self.registry.get(&sub.provider_id).await {
                Ok(provider) => provider,
                Err(e) => {
                    failed.push(ProviderFailure {
                        provider_id: sub.provider_id.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            match self
                .providers
                .cancel_reservation(&provider, identity, &sub.provider_reservation_id)
                .await
            {
                Ok(()) => {
                    sub.status_code = PurchaseStatus::Cancelled.code();
                    cancelled.push(provider.id);
                }
                Err(e) => {
                    tracing::warn!(
                        provider_id = %provider.id,
                        reservation_id = %sub.provider_reservation_id,
                        error = %e,
                        "Provider-side cancel failed"
                    );
                    failed.push(ProviderFailure {
                        provider_id: sub.provider_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if cancelled.is_empty() {
            metrics::counter!("purchase_cancellations_failed_total").increment(1);
            return Err(BookingError::CancellationFailed { failures: failed });
        }

        record.status = PurchaseStatus::Cancelled;
        self.ledger.upsert(&record).await?;
        metrics::counter!("purchase_cancellations_total").increment(1);
        if !failed.is_empty() {
            tracing::warn!(
                purchase_id = %purchase_id,
                failed = failed.len(),
                "Purchase cancelled with provider-side stragglers"
            );
        }

        Ok(CancelOutcome {
            purchase_id,
            status: record.status,
            cancelled,
            failed,
        })
    }

    /// Loads a purchase, scoped to the caller unless they are an admin.
    async fn load(
        &self,
        identity: &Identity,
        purchase_id: PurchaseId,
        is_admin: bool,
    ) -> Result<PurchaseRecord> {
        let record = if is_admin {
            self.ledger.get(purchase_id).await?
        } else {
            self.ledger.find_for_user(identity.user_id, purchase_id).await?
        };
        record.ok_or(BookingError::PurchaseNotFound(purchase_id))
    }
}
