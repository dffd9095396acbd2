use engine::{Money, PayoutPolicy};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "settings.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Database {
    pub url: String,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: "sqlite:./panditji.db?mode=rwc".to_string(),
        }
    }
}

/// Fee and tolerance, in percent and whole rupees.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Payouts {
    pub platform_fee_percent: u8,
    pub discrepancy_tolerance: i64,
}

impl Default for Payouts {
    fn default() -> Self {
        let policy = PayoutPolicy::default();
        Self {
            platform_fee_percent: policy.platform_fee_percent,
            discrepancy_tolerance: policy.discrepancy_tolerance.rupees(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub payouts: Payouts,
}

impl Settings {
    /// Reads `path` (optional) and then `PANDITJI__SECTION__KEY` variables.
    pub fn new(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("PANDITJI")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn policy(&self) -> PayoutPolicy {
        PayoutPolicy {
            platform_fee_percent: self.payouts.platform_fee_percent,
            discrepancy_tolerance: Money::new(self.payouts.discrepancy_tolerance),
        }
    }
}
