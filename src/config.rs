//! Configuration management for the KiloEx trader
//!
//! Loads per-market configuration from TOML files with environment variable
//! substitution, so private keys never have to live in the file itself.

use anyhow::{Context, Result};
use ethers::types::Address;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{TradeError, TradeResult};

/// Largest fixed-point exponent accepted for scaling
pub const MAX_DECIMALS: u32 = 18;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Optional PositionRouter ABI file; the embedded definition is used otherwise
    #[serde(default)]
    pub abi_path: Option<PathBuf>,
    pub markets: HashMap<String, MarketConfig>,
}

/// Trading configuration for one market deployment
#[derive(Clone, Deserialize)]
pub struct MarketConfig {
    pub rpc_url: String,
    pub wallet: String,
    pub market_contract: String,
    pub private_key: String,
    pub gas_limit: u64,
    pub chain_id: u64,
    /// Native-currency fee attached to every position request, in wei
    pub execution_fee: u64,
    /// ERC-20 collateral (USDT) approved before opening positions
    pub collateral_token: String,
    #[serde(default = "default_decimals")]
    pub collateral_decimals: u32,
    /// Exponent of the fixed-point base used for margin, leverage and price
    #[serde(default = "default_decimals")]
    pub base_decimals: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
}

fn default_decimals() -> u32 {
    18
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl fmt::Debug for MarketConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketConfig")
            .field("rpc_url", &self.rpc_url)
            .field("wallet", &self.wallet)
            .field("market_contract", &self.market_contract)
            .field("private_key", &"<redacted>")
            .field("gas_limit", &self.gas_limit)
            .field("chain_id", &self.chain_id)
            .field("execution_fee", &self.execution_fee)
            .field("collateral_token", &self.collateral_token)
            .field("collateral_decimals", &self.collateral_decimals)
            .field("base_decimals", &self.base_decimals)
            .field("receipt_poll_interval_ms", &self.receipt_poll_interval_ms)
            .finish()
    }
}

impl MarketConfig {
    /// Trading wallet address
    pub fn wallet_address(&self) -> TradeResult<Address> {
        parse_address("wallet", &self.wallet)
    }

    /// PositionRouter contract address
    pub fn market_address(&self) -> TradeResult<Address> {
        parse_address("market_contract", &self.market_contract)
    }

    /// Collateral token address
    pub fn collateral_token_address(&self) -> TradeResult<Address> {
        parse_address("collateral_token", &self.collateral_token)
    }

    fn validate(&self, name: &str) -> Result<()> {
        self.wallet_address()
            .and(self.market_address())
            .and(self.collateral_token_address())
            .with_context(|| format!("Market {} has an invalid address", name))?;

        if self.rpc_url.is_empty() {
            anyhow::bail!("Market {} has no RPC URL configured", name);
        }
        if self.private_key.is_empty() {
            anyhow::bail!("Market {} has no private key configured", name);
        }
        if self.gas_limit == 0 {
            anyhow::bail!("Market {} has a zero gas limit", name);
        }
        if self.base_decimals > MAX_DECIMALS || self.collateral_decimals > MAX_DECIMALS {
            anyhow::bail!(
                "Market {} decimals must not exceed {}",
                name,
                MAX_DECIMALS
            );
        }
        if self.execution_fee == 0 {
            tracing::warn!("Market {} has a zero execution fee", name);
        }

        Ok(())
    }
}

fn parse_address(field: &str, value: &str) -> TradeResult<Address> {
    value
        .parse::<Address>()
        .map_err(|e| TradeError::Config(format!("Invalid {} address {:?}: {}", field, value, e)))
}

impl Settings {
    /// Load settings from the file named by `KILOEX_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var("KILOEX_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml_str(&config_str)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml_str(input: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(input);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration; markets are checked when selected
    fn validate(&self) -> Result<()> {
        if self.markets.is_empty() {
            anyhow::bail!("At least one market must be configured");
        }

        Ok(())
    }

    /// Get a validated market config by name.
    ///
    /// Other markets in the file may be incomplete, e.g. when only one
    /// market's environment variables are set.
    pub fn market(&self, name: &str) -> Result<&MarketConfig> {
        let market = self.markets.get(name).with_context(|| {
            let mut known: Vec<_> = self.markets.keys().cloned().collect();
            known.sort();
            format!("Market {} not configured (known: {})", name, known.join(", "))
        })?;

        market.validate(name)?;
        Ok(market)
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
pub fn substitute_env_vars(input: &str) -> String {
    lazy_static::lazy_static! {
        static ref ENV_VAR: regex::Regex =
            regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var pattern");
    }

    ENV_VAR
        .replace_all(input, |cap: &regex::Captures| {
            env::var(&cap[1]).unwrap_or_default()
        })
        .into_owned()
}
