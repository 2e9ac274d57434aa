//! Builder pattern for PriceGraph

use crate::config::ChainConfig;
use crate::errors::{GraphError, Result};
use crate::graph::{PriceGraph, TokenAddress};
use crate::trade::{sort_causally, TradeEvent};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use num_traits::Signed;
use std::str::FromStr;

/// Provider tag attached to anchors seeded through the builder.
pub const BUILDER_PROVIDER: &str = "builder";

/// Builder for creating PriceGraph instances with a fluent API
pub struct PriceGraphBuilder {
    chain: ChainConfig,
    tokens: Vec<String>,
    anchors: Vec<(String, String, DateTime<Utc>)>,
    trades: Vec<TradeEvent>,
}

impl PriceGraphBuilder {
    /// Create a builder normalizing addresses for the given chain
    pub fn new(chain: ChainConfig) -> Self {
        Self {
            chain,
            tokens: Vec::new(),
            anchors: Vec::new(),
            trades: Vec::new(),
        }
    }

    /// Add an unpriced token to the graph
    pub fn token(mut self, address: &str) -> Self {
        self.tokens.push(address.to_string());
        self
    }

    /// Pin a token to a USD price as of `timestamp`
    ///
    /// # Arguments
    ///
    /// * `address` - Raw token address, normalized at build time
    /// * `usd` - Decimal string, e.g. `"1"` or `"2000.5"`
    /// * `timestamp` - Time the price was observed
    pub fn anchor(mut self, address: &str, usd: &str, timestamp: DateTime<Utc>) -> Self {
        self.anchors.push((address.to_string(), usd.to_string(), timestamp));
        self
    }

    /// Add a trade whose edge will be inserted into the graph
    pub fn trade(mut self, trade: TradeEvent) -> Self {
        self.trades.push(trade);
        self
    }

    /// Add multiple trades
    pub fn trades<I>(mut self, trades: I) -> Self
    where
        I: IntoIterator<Item = TradeEvent>,
    {
        self.trades.extend(trades);
        self
    }

    /// Build the PriceGraph
    ///
    /// Trades are applied in causal order regardless of the order they were
    /// added in. No prices are derived; only anchors carry a price.
    ///
    /// # Errors
    ///
    /// Returns an error if an anchor price does not parse or is not positive
    pub fn build(self) -> Result<PriceGraph> {
        let mut graph = PriceGraph::new();

        for address in &self.tokens {
            graph.add_token(&TokenAddress::normalize(address, &self.chain));
        }

        for (address, usd, timestamp) in &self.anchors {
            let token = TokenAddress::normalize(address, &self.chain);
            let price = BigDecimal::from_str(usd).map_err(|_| GraphError::InvalidPrice {
                token: token.clone(),
                value: usd.clone(),
            })?;
            if !price.is_positive() {
                return Err(GraphError::NonPositivePrice {
                    token,
                    price: usd.clone(),
                }
                .into());
            }
            graph.set_anchor(&token, price, *timestamp, BUILDER_PROVIDER);
        }

        let mut trades = self.trades;
        sort_causally(&mut trades);
        for trade in &trades {
            graph.upsert_edge(trade, &self.chain);
        }

        Ok(graph)
    }
}
