//! Ledger store trait.

use async_trait::async_trait;
use common::{PurchaseId, UserId};

use crate::error::Result;
use crate::model::PurchaseRecord;

/// Storage for purchase records.
///
/// Writes are whole-record upserts keyed by purchase id with no
/// optimistic-concurrency token — ledger mutation is narrowly scoped
/// (status updates during reconciliation) and last writer wins.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Inserts or replaces a purchase record.
    async fn upsert(&self, record: &PurchaseRecord) -> Result<()>;

    /// Loads a record regardless of owner (administrative access).
    async fn get(&self, purchase_id: PurchaseId) -> Result<Option<PurchaseRecord>>;

    /// Loads a record only if it belongs to the given user.
    async fn find_for_user(
        &self,
        user_id: UserId,
        purchase_id: PurchaseId,
    ) -> Result<Option<PurchaseRecord>>;

    /// Lists a user's purchases, most recent first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<PurchaseRecord>>;
}
