use crate::domain::transaction::TransactionType;
use crate::error::{GatewayError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Latency and success probability of the simulated rail for one transaction type.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SettlementProfile {
    pub delay_ms: u64,
    pub success_rate: f64,
}

impl SettlementProfile {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SettlementConfig {
    pub payin: SettlementProfile,
    pub payout: SettlementProfile,
    pub tax: SettlementProfile,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            payin: SettlementProfile {
                delay_ms: 2000,
                success_rate: 0.95,
            },
            payout: SettlementProfile {
                delay_ms: 2000,
                success_rate: 0.95,
            },
            tax: SettlementProfile {
                delay_ms: 1500,
                success_rate: 0.98,
            },
        }
    }
}

impl SettlementConfig {
    /// The settlement profile for one transaction type.
    pub fn profile(&self, kind: TransactionType) -> SettlementProfile {
        match kind {
            TransactionType::Payin => self.payin,
            TransactionType::Payout => self.payout,
            TransactionType::Tax => self.tax,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Largest amount a single request may move.
    pub max_amount: Decimal,
    /// Candidates tried before identifier generation gives up.
    pub id_max_attempts: u32,
    /// Page size for transaction history when the caller gives none.
    pub history_limit: usize,
    /// How long an operation waits on the audit sink before moving on.
    pub audit_timeout_ms: u64,
    pub settlement: SettlementConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_amount: dec!(100000),
            id_max_attempts: 20,
            history_limit: 50,
            audit_timeout_ms: 500,
            settlement: SettlementConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn audit_timeout(&self) -> Duration {
        Duration::from_millis(self.audit_timeout_ms)
    }

    /// Rejects settings the gateway cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_amount <= Decimal::ZERO {
            return Err(GatewayError::Config(
                "max_amount must be positive".to_string(),
            ));
        }
        if self.id_max_attempts == 0 {
            return Err(GatewayError::Config(
                "id_max_attempts must be at least 1".to_string(),
            ));
        }
        for kind in [
            TransactionType::Payin,
            TransactionType::Payout,
            TransactionType::Tax,
        ] {
            let rate = self.settlement.profile(kind).success_rate;
            if !(0.0..=1.0).contains(&rate) {
                return Err(GatewayError::Config(format!(
                    "{} success_rate must be within [0, 1], got {}",
                    kind, rate
                )));
            }
        }
        Ok(())
    }
}

/// Reads and validates a TOML configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GatewayConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading gateway configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| {
        GatewayError::Config(format!("Failed to read config file {:?}: {}", path_ref, e))
    })?;
    parse_config(&contents)
}

/// Parses and validates TOML text. Missing keys take their defaults.
pub fn parse_config(contents: &str) -> Result<GatewayConfig> {
    let config: GatewayConfig = toml::from_str(contents)
        .map_err(|e| GatewayError::Config(format!("Failed to parse TOML: {}", e)))?;
    config.validate()?;
    Ok(config)
}
