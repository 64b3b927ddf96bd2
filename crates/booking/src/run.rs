//! Checkout run state machine.

use common::ProviderId;
use serde::{Deserialize, Serialize};

use crate::cart::CartItem;
use crate::error::ProviderFailure;

/// The state of a checkout run over its lifecycle.
///
/// State transitions:
/// ```text
/// Collecting ──► Committing ──┬──► Succeeded
///                             ├──► PartiallyCommitted
///                             └──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RunState {
    /// The cart is being re-fetched and partitioned by provider.
    #[default]
    Collecting,

    /// Per-provider checkouts are being committed in order.
    Committing,

    /// Every partition committed (terminal state).
    Succeeded,

    /// At least one partition committed and at least one failed
    /// (terminal state — the purchase persists the committed part).
    PartiallyCommitted,

    /// No partition committed; nothing is persisted (terminal state).
    Failed,
}

impl RunState {
    /// Returns true if commits may begin.
    pub fn can_commit(&self) -> bool {
        matches!(self, RunState::Collecting)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Succeeded | RunState::PartiallyCommitted | RunState::Failed
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Collecting => "Collecting",
            RunState::Committing => "Committing",
            RunState::Succeeded => "Succeeded",
            RunState::PartiallyCommitted => "PartiallyCommitted",
            RunState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One provider's slice of the cart within a checkout run.
#[derive(Debug, Clone)]
pub struct ProviderPartition {
    pub provider_id: ProviderId,
    pub items: Vec<CartItem>,
}

/// Tracks one checkout run: the partitions, which ones committed, and
/// which ones failed with what reason.
#[derive(Debug, Default)]
pub struct CheckoutRun {
    state: RunState,
    partitions: Vec<ProviderPartition>,
    committed: Vec<ProviderId>,
    failures: Vec<ProviderFailure>,
}

impl CheckoutRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn partitions(&self) -> &[ProviderPartition] {
        &self.partitions
    }

    /// Records the partitioned cart and moves the run to committing.
    pub fn begin_commits(&mut self, partitions: Vec<ProviderPartition>) {
        debug_assert!(self.state.can_commit());
        self.partitions = partitions;
        self.state = RunState::Committing;
    }

    pub fn record_commit(&mut self, provider_id: ProviderId) {
        self.committed.push(provider_id);
    }

    pub fn record_failure(&mut self, provider_id: ProviderId, reason: String) {
        tracing::warn!(provider_id = %provider_id, %reason, "Provider checkout failed");
        self.failures.push(ProviderFailure {
            provider_id,
            reason,
        });
    }

    /// Derives the terminal state from the recorded outcomes.
    pub fn finish(&mut self) -> RunState {
        self.state = if self.committed.is_empty() {
            RunState::Failed
        } else if self.failures.is_empty() {
            RunState::Succeeded
        } else {
            RunState::PartiallyCommitted
        };
        self.state
    }

    pub fn committed(&self) -> &[ProviderId] {
        &self.committed
    }

    pub fn failures(&self) -> &[ProviderFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<ProviderFailure> {
        self.failures
    }
}

/// Splits cart items by owning provider, preserving the order in which
/// each provider first appears in the cart.
pub fn partition_by_provider(items: Vec<CartItem>) -> Vec<ProviderPartition> {
    let mut partitions: Vec<ProviderPartition> = Vec::new();
    for item in items {
        match partitions
            .iter_mut()
            .find(|p| p.provider_id == item.provider_id)
        {
            Some(partition) => partition.items.push(item),
            None => partitions.push(ProviderPartition {
                provider_id: item.provider_id.clone(),
                items: vec![item],
            }),
        }
    }
    partitions
}
