use brewline_cart::DeliverySettings;
use brewline_shared::pii::Masked;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Without a URL the service runs on in-memory repositories.
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub key_id: Option<String>,
    pub key_secret: Option<Masked<String>>,
    pub base_url: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            key_id: None,
            key_secret: None,
            base_url: None,
            currency: default_currency(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_currency() -> String {
    "INR".into()
}

fn default_timeout_seconds() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DeliveryConfig {
    /// Row to start the in-memory settings store with.
    pub seed: Option<DeliverySettings>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Masked<String>,
    pub issuer: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // optional per-environment file
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `BREWLINE__SERVER__PORT=8080`
            .add_source(config::Environment::with_prefix("BREWLINE").separator("__"))
            // the gateway's conventional variable names win over everything
            .set_override_option("gateway.key_id", env::var("RAZORPAY_KEY_ID").ok())?
            .set_override_option("gateway.key_secret", env::var("RAZORPAY_KEY_SECRET").ok())?
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn parse(toml: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse(
            r#"
            [server]
            port = 3000

            [auth]
            jwt_secret = "dev-secret"
            "#,
        );

        assert_eq!(config.server.port, 3000);
        assert!(config.database.url.is_none());
        assert_eq!(config.gateway.currency, "INR");
        assert_eq!(config.gateway.timeout_seconds, 15);
        assert!(config.gateway.key_secret.is_none());
        assert!(config.delivery.seed.is_none());
    }

    #[test]
    fn test_secret_is_masked_in_debug() {
        let config = parse(
            r#"
            [server]
            port = 3000

            [gateway]
            key_id = "rzp_test_abc"
            key_secret = "super-secret"

            [auth]
            jwt_secret = "dev-secret"
            "#,
        );

        let debug = format!("{:?}", config.gateway);
        assert!(debug.contains("rzp_test_abc"));
        assert!(!debug.contains("super-secret"));
        assert_eq!(config.gateway.key_secret.unwrap().expose(), "super-secret");
    }

    #[test]
    fn test_delivery_seed() {
        let config = parse(
            r#"
            [server]
            port = 3000

            [delivery.seed]
            base_delivery_fee = 40
            free_delivery_threshold = 1500
            express_delivery_fee = 120

            [auth]
            jwt_secret = "dev-secret"
            "#,
        );

        let seed = config.delivery.seed.unwrap();
        assert_eq!(seed.base_delivery_fee, Decimal::from(40));
        assert_eq!(seed.free_delivery_threshold, Decimal::from(1500));
        assert!(seed.active);
    }
}
