//! In-memory ledger implementation for testing and single-node runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{PurchaseId, UserId};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::model::PurchaseRecord;
use crate::store::LedgerStore;

/// In-memory ledger store.
///
/// Provides the same interface as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    records: Arc<RwLock<HashMap<PurchaseId, PurchaseRecord>>>,
}

impl InMemoryLedger {
    /// Creates an empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of stored records.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn upsert(&self, record: &PurchaseRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.purchase_id, record.clone());
        Ok(())
    }

    async fn get(&self, purchase_id: PurchaseId) -> Result<Option<PurchaseRecord>> {
        Ok(self.records.read().await.get(&purchase_id).cloned())
    }

    async fn find_for_user(
        &self,
        user_id: UserId,
        purchase_id: PurchaseId,
    ) -> Result<Option<PurchaseRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(&purchase_id)
            .filter(|r| r.user_id == user_id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<PurchaseRecord>> {
        let records = self.records.read().await;
        let mut out: Vec<_> = records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}
