//! Anchor prices a batch starts from.
//!
//! Two kinds of anchor are seeded before any trade is replayed:
//!
//! - historical: every token with a known USD price as of the batch's first
//!   trade, including prices earlier batches derived
//! - configured: the chain's stablecoin anchors, priced from their equivalent
//!   on the reference chain as of the batch's last trade, skipping prices the
//!   engine derived itself
//!
//! Configured anchors are seeded second and win over a historical price for
//! the same token.

use crate::config::{ChainConfig, ConfiguredAnchor};
use crate::graph::{PriceGraph, TokenAddress};
use crate::providers::{AnchorPriceProvider, HistoricalPrice, ProviderResult, ReferencePrice};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use num_traits::Signed;

/// Anchor prices fetched for one batch
#[derive(Debug, Clone, Default)]
pub struct AnchorSnapshot {
    historical: Vec<HistoricalPrice>,
    configured: Vec<(ConfiguredAnchor, Option<ReferencePrice>)>,
}

impl AnchorSnapshot {
    pub fn new(
        historical: Vec<HistoricalPrice>,
        configured: Vec<(ConfiguredAnchor, Option<ReferencePrice>)>,
    ) -> Self {
        Self { historical, configured }
    }

    /// Fetch historical and configured anchor prices concurrently.
    ///
    /// One reference lookup is issued per configured anchor whether or not the
    /// anchor appears in the batch's trades.
    ///
    /// # Errors
    ///
    /// Returns the first provider error; a missing reference price is not an
    /// error
    pub async fn fetch(
        provider: &dyn AnchorPriceProvider,
        chain: &ChainConfig,
        first_trade: DateTime<Utc>,
        last_trade: DateTime<Utc>,
    ) -> ProviderResult<Self> {
        let configured = try_join_all(chain.anchors.iter().map(|anchor| async move {
            let price = provider
                .latest_price_before(&anchor.reference_chain, &anchor.reference_address, last_trade, true)
                .await?;
            Ok::<_, crate::errors::ProviderError>((anchor.clone(), price))
        }));
        let historical = provider.latest_prices_before(&chain.name, first_trade);

        let (historical, configured) = futures::try_join!(historical, configured)?;

        tracing::debug!(
            chain = %chain.name,
            historical = historical.len(),
            configured = configured.len(),
            "Fetched anchor snapshot"
        );

        Ok(Self { historical, configured })
    }

    pub fn historical(&self) -> &[HistoricalPrice] {
        &self.historical
    }

    pub fn configured(&self) -> &[(ConfiguredAnchor, Option<ReferencePrice>)] {
        &self.configured
    }

    /// Set every usable anchor price on the graph, returning how many were set.
    ///
    /// Non-positive prices are skipped. A configured anchor without a reference
    /// price is logged and left unpriced.
    pub fn seed(&self, graph: &mut PriceGraph, chain: &ChainConfig) -> usize {
        let mut seeded = 0;

        for price in &self.historical {
            if !price.usd.is_positive() {
                tracing::warn!(token = %price.token_address, usd = %price.usd, "Skipping non-positive historical price");
                continue;
            }
            let token = TokenAddress::normalize(&price.token_address, chain);
            graph.set_anchor(&token, price.usd.clone(), price.timestamp, price.provider.as_str());
            seeded += 1;
        }

        for (anchor, reference) in &self.configured {
            let token = TokenAddress::normalize(&anchor.address, chain);
            match reference {
                Some(reference) if reference.usd.is_positive() => {
                    graph.set_anchor(&token, reference.usd.clone(), reference.timestamp, reference.provider.as_str());
                    seeded += 1;
                }
                Some(reference) => {
                    tracing::warn!(
                        token = %token,
                        role = ?anchor.role,
                        usd = %reference.usd,
                        "Skipping non-positive reference price"
                    );
                }
                None => {
                    tracing::warn!(
                        token = %token,
                        role = ?anchor.role,
                        reference_chain = %anchor.reference_chain,
                        reference_address = %anchor.reference_address,
                        "No reference price for configured anchor"
                    );
                }
            }
        }

        seeded
    }
}
