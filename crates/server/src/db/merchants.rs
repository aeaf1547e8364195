//! `PostgreSQL` merchant repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use loyalty_core::{Merchant, MerchantId, RewardsConfig};

use super::{MerchantStore, RepositoryError};

/// Raw `merchant` row.
#[derive(sqlx::FromRow)]
struct MerchantRow {
    id: String,
    name: String,
    rewards: Json<RewardsConfig>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MerchantRow> for Merchant {
    type Error = RepositoryError;

    fn try_from(row: MerchantRow) -> Result<Self, Self::Error> {
        let id = MerchantId::parse(&row.id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid merchant id in database: {e}"))
        })?;

        Ok(Self {
            id,
            name: row.name,
            rewards: row.rewards.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Merchant repository backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgMerchantStore {
    pool: PgPool,
}

impl PgMerchantStore {
    /// Create a new merchant repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MerchantStore for PgMerchantStore {
    async fn find_merchant(&self, id: &MerchantId) -> Result<Option<Merchant>, RepositoryError> {
        let row: Option<MerchantRow> = sqlx::query_as(
            r"
            SELECT id, name, rewards, created_at, updated_at
            FROM loyalty.merchant
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Merchant::try_from).transpose()
    }

    async fn upsert_merchant(
        &self,
        id: &MerchantId,
        name: &str,
        rewards: &RewardsConfig,
    ) -> Result<Merchant, RepositoryError> {
        let row: MerchantRow = sqlx::query_as(
            r"
            INSERT INTO loyalty.merchant (id, name, rewards)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name,
                    rewards = EXCLUDED.rewards,
                    updated_at = NOW()
            RETURNING id, name, rewards, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(name)
        .bind(Json(rewards))
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn update_rewards(
        &self,
        id: &MerchantId,
        rewards: &RewardsConfig,
    ) -> Result<Merchant, RepositoryError> {
        let row: Option<MerchantRow> = sqlx::query_as(
            r"
            UPDATE loyalty.merchant
            SET rewards = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, rewards, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(Json(rewards))
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }
}
