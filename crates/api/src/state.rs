//! Shared application state.

use std::sync::Arc;

use booking::{CartAggregator, CheckoutOrchestrator, StateSynchronizer};
use gateway::ProviderApi;
use ledger::LedgerStore;
use registry::ProviderStore;

/// Shared application state accessible from all handlers.
pub struct AppState<R, P, L> {
    pub registry: Arc<R>,
    pub aggregator: CartAggregator<R, P>,
    pub orchestrator: CheckoutOrchestrator<R, P, L>,
    pub synchronizer: StateSynchronizer<R, P, L>,
}

impl<R, P, L> AppState<R, P, L>
where
    R: ProviderStore,
    P: ProviderApi,
    L: LedgerStore,
{
    /// Wires the booking services over one registry, provider API, and ledger.
    pub fn new(registry: Arc<R>, providers: Arc<P>, ledger: Arc<L>) -> Self {
        Self {
            aggregator: CartAggregator::new(Arc::clone(&registry), Arc::clone(&providers)),
            orchestrator: CheckoutOrchestrator::new(
                Arc::clone(&registry),
                Arc::clone(&providers),
                Arc::clone(&ledger),
            ),
            synchronizer: StateSynchronizer::new(
                Arc::clone(&registry),
                Arc::clone(&providers),
                ledger,
            ),
            registry,
        }
    }
}
