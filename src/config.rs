use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{KioskError, KioskResult};
use crate::flow::Product;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Settlement backend (cash acceptor + payout service)
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Membership identity service
#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Machine status polling
#[derive(Debug, Deserialize, Clone)]
pub struct PollerConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    2500
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// Membership extension settings
#[derive(Debug, Deserialize, Clone)]
pub struct MembershipConfig {
    /// Days added to a membership when a payment is made
    #[serde(default = "default_extension_days")]
    pub extension_days: i64,
}

fn default_extension_days() -> i64 {
    30
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            extension_days: default_extension_days(),
        }
    }
}

impl MembershipConfig {
    /// Extension period; must be a non-negative number of days chrono can hold.
    pub fn extension(&self) -> KioskResult<chrono::TimeDelta> {
        chrono::TimeDelta::try_days(self.extension_days)
            .filter(|_| self.extension_days >= 0)
            .ok_or_else(|| {
                KioskError::Config(ConfigError::Message(format!(
                    "membership.extension_days out of range: {}",
                    self.extension_days
                )))
            })
    }
}

/// Which product buttons the kiosk offers
#[derive(Debug, Deserialize, Clone)]
pub struct ProductsConfig {
    #[serde(default = "default_products")]
    pub enabled: Vec<String>,
}

fn default_products() -> Vec<String> {
    ["matic", "eth", "lightning", "membership"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ProductsConfig {
    fn default() -> Self {
        Self {
            enabled: default_products(),
        }
    }
}

impl ProductsConfig {
    /// Resolve the configured keys into products, in button order.
    pub fn products(&self) -> KioskResult<Vec<Product>> {
        self.enabled.iter().map(|key| key.parse()).collect()
    }
}

/// Root application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub identity: IdentityConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub membership: MembershipConfig,
    #[serde(default)]
    pub products: ProductsConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., KIOSKFLOW_BACKEND__URL, KIOSKFLOW_POLLER__INTERVAL_MS
            .add_source(
                Environment::with_prefix("KIOSKFLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        if let Err(KioskError::Config(e)) = config.membership.extension() {
            return Err(e);
        }
        Ok(config)
    }

    /// Initialize the global config singleton
    pub fn init() -> Result<&'static Self, ConfigError> {
        let config = Self::load()?;
        Ok(CONFIG.get_or_init(|| config))
    }
}

impl BackendConfig {
    /// Full URL of a backend path
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_endpoint() {
        let config = BackendConfig {
            url: "http://localhost:3000/".to_string(),
            timeout_secs: 30,
        };
        assert_eq!(config.endpoint("/stats"), "http://localhost:3000/stats");
        assert_eq!(config.endpoint("deposit/start"), "http://localhost:3000/deposit/start");
    }

    #[test]
    fn test_default_products_resolve() {
        let products = ProductsConfig::default().products().unwrap();
        assert_eq!(products.len(), 4);
        assert_eq!(products[3], Product::ExtendMembership);
    }

    #[test]
    fn test_unknown_product_is_rejected() {
        let config = ProductsConfig {
            enabled: vec!["matic".to_string(), "doge".to_string()],
        };
        assert!(config.products().is_err());
    }

    #[test]
    fn test_membership_extension() {
        let config = MembershipConfig { extension_days: 7 };
        assert_eq!(config.extension().unwrap(), chrono::TimeDelta::days(7));
        let none = MembershipConfig { extension_days: 0 };
        assert_eq!(none.extension().unwrap(), chrono::TimeDelta::zero());
    }

    #[test]
    fn test_membership_extension_out_of_range() {
        for days in [-1, i64::MAX, i64::MAX / 86_400] {
            let config = MembershipConfig {
                extension_days: days,
            };
            assert!(
                matches!(config.extension(), Err(KioskError::Config(_))),
                "{} days accepted",
                days
            );
        }
    }
}
