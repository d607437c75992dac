//! Application configuration.
//!
//! Aggregates configuration for the server, storage, auth, pricing, and
//! uploads into a single Config struct that can be loaded from YAML files
//! or environment variables.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "STOREFRONT_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "STOREFRONT";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "STOREFRONT_LOG";

/// Legacy environment variable for the HTTP port.
pub const PORT_ENV_VAR: &str = "PORT";
/// Legacy environment variable for the MongoDB connection string.
pub const MONGO_URI_ENV_VAR: &str = "MONGO_URI";
/// Legacy environment variable for the token signing secret.
pub const JWT_SECRET_ENV_VAR: &str = "JWT_SECRET";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Identity token and credential configuration.
    pub auth: AuthConfig,
    /// Cart pricing rules.
    pub pricing: PricingConfig,
    /// Order workflow configuration.
    pub orders: OrdersConfig,
    /// Image upload configuration.
    pub uploads: UploadsConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port for the REST API.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend: "mongodb" or "memory".
    #[serde(rename = "type")]
    pub storage_type: String,
    /// Connection string for the document store.
    pub uri: String,
    /// Database name.
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: "mongodb".to_string(),
            uri: "mongodb://localhost:27017".to_string(),
            database: "storefront".to_string(),
        }
    }
}

/// Identity token and credential configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret for signing identity tokens. Must be configured.
    pub secret: String,
    /// Token lifetime in days.
    pub token_ttl_days: i64,
    /// Optional operator account created at startup if absent.
    pub bootstrap_operator: Option<BootstrapOperator>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_ttl_days: 7,
            bootstrap_operator: None,
        }
    }
}

/// Operator account seeded at startup.
///
/// Registration never grants the operator role, so the first operator has to
/// enter the system out of band.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapOperator {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Cart pricing rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Orders with a subtotal strictly above this ship free.
    pub free_shipping_threshold: Decimal,
    /// Flat shipping fee below the free-shipping threshold.
    pub flat_shipping_fee: Decimal,
    /// Tax rate applied to the subtotal.
    pub tax_rate: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: dec!(50.00),
            flat_shipping_fee: dec!(5.99),
            tax_rate: dec!(0.07),
        }
    }
}

/// Order workflow configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrdersConfig {
    /// When true, an operator may set any status on any order regardless of
    /// the transition table. Kept for compatibility with clients that relied
    /// on the unrestricted behavior.
    pub permissive_transitions: bool,
}

/// Image upload configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadsConfig {
    /// Directory where uploaded product images are stored.
    pub dir: String,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: "uploads".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in the current directory (if present)
    /// 2. File specified by the `path` argument (if provided)
    /// 3. File specified by `STOREFRONT_CONFIG` (if set)
    /// 4. Environment variables with the `STOREFRONT` prefix
    /// 5. Legacy environment variables (`PORT`, `MONGO_URI`, `JWT_SECRET`)
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Config = config.try_deserialize()?;
        config.apply_legacy_env();
        Ok(config)
    }

    /// Apply the environment variables the original deployments used.
    fn apply_legacy_env(&mut self) {
        if let Ok(port) = std::env::var(PORT_ENV_VAR) {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(uri) = std::env::var(MONGO_URI_ENV_VAR) {
            self.storage.uri = uri;
        }
        if let Ok(secret) = std::env::var(JWT_SECRET_ENV_VAR) {
            self.auth.secret = secret;
        }
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        let mut config = Self::default();
        config.storage.storage_type = "memory".to_string();
        config.auth.secret = "test-secret".to_string();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let server = ServerConfig::default();
        assert_eq!(server.port, 3000);
        assert_eq!(server.host, "0.0.0.0");
    }

    #[test]
    fn test_pricing_defaults() {
        let pricing = PricingConfig::default();
        assert_eq!(pricing.free_shipping_threshold, dec!(50.00));
        assert_eq!(pricing.flat_shipping_fee, dec!(5.99));
        assert_eq!(pricing.tax_rate, dec!(0.07));
    }

    #[test]
    fn test_config_for_test() {
        let config = Config::for_test();
        assert_eq!(config.storage.storage_type, "memory");
        assert!(!config.orders.permissive_transitions);
        assert_eq!(config.auth.token_ttl_days, 7);
    }
}
