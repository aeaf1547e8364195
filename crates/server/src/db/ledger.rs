//! `PostgreSQL` ledger repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use loyalty_core::{
    CurrentDiscount, CustomerId, LedgerEntryId, LedgerPatch, MerchantId, NewLedgerEntry,
    RewardLedgerEntry,
};

use super::{LedgerStore, RepositoryError, map_constraint_error};

const ENTRY_COLUMNS: &str = "id, customer_id, merchant_id, total_spent, purchase_count, \
     last_visit, discount_amount, version, created_at, updated_at";

/// Raw `reward_ledger` row.
#[derive(sqlx::FromRow)]
struct LedgerRow {
    id: Uuid,
    customer_id: String,
    merchant_id: String,
    total_spent: Decimal,
    purchase_count: i64,
    last_visit: DateTime<Utc>,
    discount_amount: Decimal,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for RewardLedgerEntry {
    type Error = RepositoryError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        let customer_id = CustomerId::parse(&row.customer_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid customer id in database: {e}"))
        })?;
        let merchant_id = MerchantId::parse(&row.merchant_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid merchant id in database: {e}"))
        })?;

        Ok(Self {
            id: LedgerEntryId::new(row.id),
            customer_id,
            merchant_id,
            total_spent: row.total_spent,
            purchase_count: row.purchase_count,
            last_visit: row.last_visit,
            current_discount: CurrentDiscount {
                amount: row.discount_amount,
            },
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Ledger repository backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Create a new ledger repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn version_of(&self, id: LedgerEntryId) -> Result<Option<i64>, RepositoryError> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM loyalty.reward_ledger WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(version)
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn find_entry(
        &self,
        customer_id: &CustomerId,
        merchant_id: &MerchantId,
    ) -> Result<Option<RewardLedgerEntry>, RepositoryError> {
        let row: Option<LedgerRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM loyalty.reward_ledger \
             WHERE customer_id = $1 AND merchant_id = $2"
        ))
        .bind(customer_id)
        .bind(merchant_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(RewardLedgerEntry::try_from).transpose()
    }

    async fn create_entry(
        &self,
        entry: NewLedgerEntry,
    ) -> Result<RewardLedgerEntry, RepositoryError> {
        let row: LedgerRow = sqlx::query_as(&format!(
            "INSERT INTO loyalty.reward_ledger \
                 (id, customer_id, merchant_id, total_spent, purchase_count, last_visit) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(LedgerEntryId::generate().as_uuid())
        .bind(&entry.customer_id)
        .bind(&entry.merchant_id)
        .bind(entry.total_spent)
        .bind(entry.purchase_count)
        .bind(entry.last_visit)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint_error(e, "ledger entry already exists"))?;

        row.try_into()
    }

    async fn update_entry(
        &self,
        id: LedgerEntryId,
        expected_version: i64,
        patch: &LedgerPatch,
    ) -> Result<RewardLedgerEntry, RepositoryError> {
        let row: Option<LedgerRow> = sqlx::query_as(&format!(
            "UPDATE loyalty.reward_ledger SET \
                 total_spent = COALESCE($3, total_spent), \
                 purchase_count = COALESCE($4, purchase_count), \
                 discount_amount = COALESCE($5, discount_amount), \
                 last_visit = COALESCE($6, last_visit), \
                 version = version + 1, \
                 updated_at = NOW() \
             WHERE id = $1 AND version = $2 \
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(expected_version)
        .bind(patch.total_spent)
        .bind(patch.purchase_count)
        .bind(patch.discount_amount)
        .bind(patch.last_visit)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            // Zero rows: either the entry is gone or someone else bumped the version
            None => match self.version_of(id).await? {
                Some(_) => Err(RepositoryError::StaleVersion {
                    expected: expected_version,
                }),
                None => Err(RepositoryError::NotFound),
            },
        }
    }

    async fn list_for_merchant(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Vec<RewardLedgerEntry>, RepositoryError> {
        let rows: Vec<LedgerRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM loyalty.reward_ledger \
             WHERE merchant_id = $1 \
             ORDER BY last_visit DESC, id"
        ))
        .bind(merchant_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RewardLedgerEntry::try_from).collect()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
