//! Purchase record model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{Money, ProviderId, PurchaseId, UserId};
use serde::{Deserialize, Serialize};

/// Aggregate purchase lifecycle. One-way: Active → Cancelled.
///
/// The numeric codes follow the provider wire convention (`idEstado`):
/// 1 = active/confirmed, 2 = cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PurchaseStatus {
    #[default]
    Active,
    Cancelled,
}

impl PurchaseStatus {
    /// Returns the wire status code.
    pub fn code(&self) -> i32 {
        match self {
            PurchaseStatus::Active => 1,
            PurchaseStatus::Cancelled => 2,
        }
    }

    /// Maps a wire status code to a lifecycle state. Codes at or past the
    /// cancelled code are terminal; everything else counts as active.
    pub fn from_code(code: i32) -> Self {
        if code >= 2 {
            PurchaseStatus::Cancelled
        } else {
            PurchaseStatus::Active
        }
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PurchaseStatus::Active => write!(f, "Active"),
            PurchaseStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// The provider-side booking produced by one successful per-provider
/// checkout. Created exactly once; only the status drifts afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubReservation {
    pub provider_id: ProviderId,
    pub provider_reservation_id: String,
    pub confirmation_code: Option<String>,
    /// Total the provider assigned to this reservation.
    pub provider_total: Money,
    /// Provider status code, updated during reconciliation.
    pub status_code: i32,
}

/// A completed (possibly partial) cross-provider purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub purchase_id: PurchaseId,
    pub user_id: UserId,
    pub status: PurchaseStatus,
    /// Sum of sub-reservation provider totals.
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub sub_reservations: Vec<SubReservation>,
    /// Raw provider detail bodies, keyed by provider id.
    pub detail_snapshots: HashMap<String, serde_json::Value>,
}

impl PurchaseRecord {
    /// Creates a record for a freshly committed set of sub-reservations.
    ///
    /// The aggregate status is the maximum (most terminal) status among
    /// the committed sub-reservations, defaulting to active.
    pub fn new(
        user_id: UserId,
        sub_reservations: Vec<SubReservation>,
        detail_snapshots: HashMap<String, serde_json::Value>,
    ) -> Self {
        let total = sub_reservations.iter().map(|s| s.provider_total).sum();
        let status = PurchaseStatus::from_code(Self::max_code(&sub_reservations));
        Self {
            purchase_id: PurchaseId::new(),
            user_id,
            status,
            total,
            created_at: Utc::now(),
            sub_reservations,
            detail_snapshots,
        }
    }

    /// Returns true if the purchase can still be cancelled.
    pub fn is_active(&self) -> bool {
        self.status == PurchaseStatus::Active
    }

    /// The maximum status code across sub-reservations (1 when empty).
    pub fn max_status_code(&self) -> i32 {
        Self::max_code(&self.sub_reservations)
    }

    fn max_code(subs: &[SubReservation]) -> i32 {
        subs.iter().map(|s| s.status_code).max().unwrap_or(1)
    }

    /// Re-derives the aggregate status from the sub-reservation statuses.
    /// Returns true when the status actually changed.
    pub fn reconcile_status(&mut self) -> bool {
        let derived = PurchaseStatus::from_code(self.max_status_code());
        if derived != self.status {
            self.status = derived;
            true
        } else {
            false
        }
    }
}
