use brewline_cart::DeliverySettings;
use serde::Serialize;

use crate::repository::DeliverySettingsRepository;
use crate::CheckoutError;

/// Where the effective settings came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsSource {
    Stored,
    Default,
}

/// Load the active delivery settings, falling back to the documented default.
///
/// A missing or inactive row is normal and quietly uses the default. A read
/// failure is reported as `SettingsUnavailable` at warn level and also uses
/// the default, so pricing never blocks on storage.
pub async fn load_delivery_settings(
    repo: &dyn DeliverySettingsRepository,
) -> (DeliverySettings, SettingsSource) {
    match repo.fetch_active().await {
        Ok(Some(settings)) if settings.active => (settings, SettingsSource::Stored),
        Ok(Some(_)) => {
            tracing::debug!("Stored delivery settings are inactive, using default");
            (DeliverySettings::default(), SettingsSource::Default)
        }
        Ok(None) => {
            tracing::debug!("No delivery settings row, using default");
            (DeliverySettings::default(), SettingsSource::Default)
        }
        Err(e) => {
            let err = CheckoutError::SettingsUnavailable(e.to_string());
            tracing::warn!("{}; falling back to default delivery settings", err);
            (DeliverySettings::default(), SettingsSource::Default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryError;
    use async_trait::async_trait;
    use rust_decimal::Decimal;

    struct FixedSettings(Result<Option<DeliverySettings>, RepositoryError>);

    #[async_trait]
    impl DeliverySettingsRepository for FixedSettings {
        async fn fetch_active(&self) -> Result<Option<DeliverySettings>, RepositoryError> {
            self.0.clone()
        }

        async fn save(&self, _settings: &DeliverySettings) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    fn stored() -> DeliverySettings {
        DeliverySettings {
            base_delivery_fee: Decimal::from(40),
            free_delivery_threshold: Decimal::from(1500),
            express_delivery_fee: Decimal::from(120),
            active: true,
        }
    }

    #[tokio::test]
    async fn test_active_row_is_used() {
        let repo = FixedSettings(Ok(Some(stored())));
        assert_eq!(load_delivery_settings(&repo).await, (stored(), SettingsSource::Stored));
    }

    #[tokio::test]
    async fn test_missing_row_falls_back() {
        let repo = FixedSettings(Ok(None));
        let (settings, source) = load_delivery_settings(&repo).await;
        assert_eq!(settings, DeliverySettings::default());
        assert_eq!(source, SettingsSource::Default);
    }

    #[tokio::test]
    async fn test_inactive_row_falls_back() {
        let mut row = stored();
        row.active = false;
        let repo = FixedSettings(Ok(Some(row)));
        assert_eq!(load_delivery_settings(&repo).await.1, SettingsSource::Default);
    }

    #[tokio::test]
    async fn test_read_failure_falls_back() {
        let repo = FixedSettings(Err(RepositoryError::Database("timeout".to_string())));
        let (settings, source) = load_delivery_settings(&repo).await;
        assert_eq!(settings.base_delivery_fee, Decimal::from(50));
        assert_eq!(settings.free_delivery_threshold, Decimal::from(2000));
        assert_eq!(source, SettingsSource::Default);
    }
}
