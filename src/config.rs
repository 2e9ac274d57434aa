//! Configuration management for the price discovery engine.
//!
//! Per-chain settings (native coin aliasing, anchor tokens) come from built-in
//! defaults in `utils` and may be overridden through environment variables.

use crate::errors::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Maximum number of edges a price resolution may traverse.
pub const DEFAULT_MAX_HOPS: u32 = 10;

/// Number of blocks processed per batch.
pub const DEFAULT_BATCH_WINDOW: u64 = 100;

/// Which stablecoin slot an anchor fills on its chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorRole {
    Primary,
    Secondary,
}

/// A token whose USD price is pinned to its equivalent on a reference chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredAnchor {
    /// Primary or secondary anchor slot
    pub role: AnchorRole,
    /// Token address on the configured chain
    pub address: String,
    /// Chain the reference price is read from
    pub reference_chain: String,
    /// Equivalent token address on the reference chain
    pub reference_address: String,
}

/// Chain-specific settings used for address normalization and anchor seeding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain name (e.g. "ethereum")
    pub name: String,
    /// Address harvesters use for the native coin
    pub native_sentinel: String,
    /// ERC20 address standing in for the native coin, if any
    pub native_alias: Option<String>,
    /// Anchors seeded at the start of every batch
    pub anchors: Vec<ConfiguredAnchor>,
}

impl ChainConfig {
    /// Build the default configuration for a supported chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain is not supported
    pub fn for_chain(chain: &str) -> Result<Self> {
        crate::utils::chain_id(chain)?;

        let anchors = [AnchorRole::Primary, AnchorRole::Secondary]
            .into_iter()
            .map(|role| -> Result<ConfiguredAnchor> {
                Ok(ConfiguredAnchor {
                    role,
                    address: crate::utils::anchor_address(chain, role)?.to_string(),
                    reference_chain: crate::utils::REFERENCE_CHAIN.to_string(),
                    reference_address: crate::utils::anchor_address(crate::utils::REFERENCE_CHAIN, role)?
                        .to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: chain.to_string(),
            native_sentinel: crate::utils::NATIVE_SENTINEL.to_string(),
            native_alias: Some(crate::utils::wrapped_native_address(chain)?.to_string()),
            anchors,
        })
    }

    /// Get the configured anchor for a role, if any
    pub fn anchor(&self, role: AnchorRole) -> Option<&ConfiguredAnchor> {
        self.anchors.iter().find(|anchor| anchor.role == role)
    }
}

/// Main configuration structure for price discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Chain settings
    pub chain: ChainConfig,
    /// Maximum BFS depth during price resolution
    pub max_hops: u32,
    /// Number of blocks per batch
    pub batch_window: u64,
    /// First block to process when no checkpoint exists
    pub start_block: u64,
}

impl DiscoveryConfig {
    /// Create a configuration with built-in defaults for the chain
    pub fn for_chain(chain: &str) -> Result<Self> {
        Ok(Self {
            chain: ChainConfig::for_chain(chain)?,
            max_hops: DEFAULT_MAX_HOPS,
            batch_window: DEFAULT_BATCH_WINDOW,
            start_block: 0,
        })
    }

    /// Create a new configuration from environment variables
    ///
    /// # Environment Variables
    ///
    /// All optional:
    /// - `PRICE_DISCOVERY_MAX_HOPS`: BFS depth limit (default: 10)
    /// - `PRICE_DISCOVERY_BATCH_WINDOW`: blocks per batch (default: 100)
    /// - `PRICE_DISCOVERY_START_BLOCK`: first block without a checkpoint (default: 0)
    /// - `PRICE_DISCOVERY_NATIVE_ALIAS`: ERC20 alias for the native coin
    /// - `PRICE_DISCOVERY_PRIMARY_ANCHOR`: primary anchor token address
    /// - `PRICE_DISCOVERY_SECONDARY_ANCHOR`: secondary anchor token address
    ///
    /// # Errors
    ///
    /// Returns an error if the chain is unsupported or a variable does not
    /// parse or is out of range
    pub fn from_env(chain: &str) -> Result<Self> {
        tracing::info!(chain = chain, "Loading price discovery configuration from environment");

        let mut config = Self::for_chain(chain)?;

        if let Some(max_hops) = Self::parse_var::<u32>("PRICE_DISCOVERY_MAX_HOPS")? {
            config.max_hops = max_hops;
        }
        if let Some(batch_window) = Self::parse_var::<u64>("PRICE_DISCOVERY_BATCH_WINDOW")? {
            config.batch_window = batch_window;
        }
        if let Some(start_block) = Self::parse_var::<u64>("PRICE_DISCOVERY_START_BLOCK")? {
            config.start_block = start_block;
        }

        if let Ok(alias) = env::var("PRICE_DISCOVERY_NATIVE_ALIAS") {
            tracing::debug!(native_alias = %alias, "Using custom native alias from environment");
            config.chain.native_alias = Some(alias);
        }

        for (variable, role) in [
            ("PRICE_DISCOVERY_PRIMARY_ANCHOR", AnchorRole::Primary),
            ("PRICE_DISCOVERY_SECONDARY_ANCHOR", AnchorRole::Secondary),
        ] {
            if let Ok(address) = env::var(variable) {
                tracing::debug!(variable = variable, address = %address, "Using custom anchor from environment");
                if let Some(anchor) = config.chain.anchors.iter_mut().find(|a| a.role == role) {
                    anchor.address = address;
                }
            }
        }

        config.validate()?;

        tracing::info!(
            chain = chain,
            max_hops = config.max_hops,
            batch_window = config.batch_window,
            start_block = config.start_block,
            anchor_count = config.chain.anchors.len(),
            "Price discovery configuration loaded successfully"
        );

        Ok(config)
    }

    /// Check value ranges and required fields
    pub fn validate(&self) -> Result<()> {
        if self.max_hops == 0 {
            return Err(ConfigError::InvalidConfiguration {
                message: "max_hops must be at least 1".to_string(),
            }
            .into());
        }
        if self.batch_window == 0 {
            return Err(ConfigError::InvalidConfiguration {
                message: "batch_window must be at least 1".to_string(),
            }
            .into());
        }
        for anchor in &self.chain.anchors {
            if anchor.address.trim().is_empty() || anchor.reference_address.trim().is_empty() {
                return Err(ConfigError::InvalidConfiguration {
                    message: format!("{:?} anchor address cannot be empty", anchor.role),
                }
                .into());
            }
        }
        Ok(())
    }

    fn parse_var<T: std::str::FromStr>(variable: &'static str) -> Result<Option<T>> {
        match env::var(variable) {
            Ok(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidVariable { variable, value }.into()),
            Err(_) => Ok(None),
        }
    }
}
