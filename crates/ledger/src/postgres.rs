//! PostgreSQL-backed ledger implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, PurchaseId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::Result;
use crate::model::{PurchaseRecord, PurchaseStatus, SubReservation};
use crate::store::LedgerStore;

/// PostgreSQL purchase ledger.
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Creates a new PostgreSQL ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_record(row: PgRow) -> Result<PurchaseRecord> {
        let subs_json: serde_json::Value = row.try_get("sub_reservations")?;
        let sub_reservations: Vec<SubReservation> = serde_json::from_value(subs_json)?;

        let snapshots_json: serde_json::Value = row.try_get("detail_snapshots")?;
        let detail_snapshots: HashMap<String, serde_json::Value> =
            serde_json::from_value(snapshots_json)?;

        Ok(PurchaseRecord {
            purchase_id: PurchaseId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::new(row.try_get::<i64, _>("user_id")? as u64),
            status: PurchaseStatus::from_code(row.try_get::<i32, _>("status")?),
            total: Money::from_cents(row.try_get::<i64, _>("total_cents")?),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            sub_reservations,
            detail_snapshots,
        })
    }
}

#[async_trait]
impl LedgerStore for PostgresLedger {
    async fn upsert(&self, record: &PurchaseRecord) -> Result<()> {
        let subs_json = serde_json::to_value(&record.sub_reservations)?;
        let snapshots_json = serde_json::to_value(&record.detail_snapshots)?;

        sqlx::query(
            r#"
            INSERT INTO purchases (id, user_id, status, total_cents, created_at, sub_reservations, detail_snapshots)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                total_cents = EXCLUDED.total_cents,
                sub_reservations = EXCLUDED.sub_reservations,
                detail_snapshots = EXCLUDED.detail_snapshots
            "#,
        )
        .bind(record.purchase_id.as_uuid())
        .bind(record.user_id.as_u64() as i64)
        .bind(record.status.code())
        .bind(record.total.cents())
        .bind(record.created_at)
        .bind(subs_json)
        .bind(snapshots_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, purchase_id: PurchaseId) -> Result<Option<PurchaseRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, status, total_cents, created_at, sub_reservations, detail_snapshots
            FROM purchases
            WHERE id = $1
            "#,
        )
        .bind(purchase_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn find_for_user(
        &self,
        user_id: UserId,
        purchase_id: PurchaseId,
    ) -> Result<Option<PurchaseRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, status, total_cents, created_at, sub_reservations, detail_snapshots
            FROM purchases
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(purchase_id.as_uuid())
        .bind(user_id.as_u64() as i64)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<PurchaseRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, status, total_cents, created_at, sub_reservations, detail_snapshots
            FROM purchases
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_u64() as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }
}
