use async_trait::async_trait;
use brewline_cart::DeliverySettings;
use brewline_core::repository::{DeliverySettingsRepository, RepositoryError};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::StoreError;

pub struct PgDeliverySettingsRepository {
    pool: PgPool,
}

impl PgDeliverySettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn latest(&self) -> Result<Option<DeliverySettings>, StoreError> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r#"
            SELECT base_delivery_fee, free_delivery_threshold, express_delivery_fee, is_active
            FROM delivery_settings
            WHERE is_active = TRUE
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn replace(&self, settings: &DeliverySettings) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE delivery_settings SET is_active = FALSE WHERE is_active = TRUE")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO delivery_settings (base_delivery_fee, free_delivery_threshold, express_delivery_fee, is_active)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(settings.base_delivery_fee)
        .bind(settings.free_delivery_threshold)
        .bind(settings.express_delivery_fee)
        .bind(settings.active)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct SettingsRow {
    base_delivery_fee: Decimal,
    free_delivery_threshold: Decimal,
    express_delivery_fee: Decimal,
    is_active: bool,
}

impl From<SettingsRow> for DeliverySettings {
    fn from(row: SettingsRow) -> Self {
        Self {
            base_delivery_fee: row.base_delivery_fee,
            free_delivery_threshold: row.free_delivery_threshold,
            express_delivery_fee: row.express_delivery_fee,
            active: row.is_active,
        }
    }
}

#[async_trait]
impl DeliverySettingsRepository for PgDeliverySettingsRepository {
    async fn fetch_active(&self) -> Result<Option<DeliverySettings>, RepositoryError> {
        Ok(self.latest().await?)
    }

    async fn save(&self, settings: &DeliverySettings) -> Result<(), RepositoryError> {
        self.replace(settings).await?;
        tracing::info!(
            "Delivery settings updated: base {} free from {}",
            settings.base_delivery_fee,
            settings.free_delivery_threshold
        );
        Ok(())
    }
}
