//! External collaborators of the price discovery engine.
//!
//! The graph core never performs I/O. Everything it reads or writes crosses
//! one of these traits at a batch boundary:
//!
//! - `TradeEventSource`: trades for a block range, and the chain head
//! - `AnchorPriceProvider`: previously known USD prices
//! - `QuotePersister`: durable storage for discovered prices
//! - `CheckpointStore`: the last block a batch completed
//!
//! `memory` holds in-process implementations of all four.

pub mod memory;

pub use memory::{MemoryCheckpointStore, MemoryQuoteStore, MemoryTradeSource};

use crate::errors::ProviderError;
use crate::trade::TradeEvent;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result type for collaborator calls
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// A known USD price for a token, as returned by a bulk history lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPrice {
    pub token_address: String,
    pub usd: BigDecimal,
    pub timestamp: DateTime<Utc>,
    pub provider: String,
}

/// A single token's latest USD price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePrice {
    pub usd: BigDecimal,
    pub timestamp: DateTime<Utc>,
    pub provider: String,
}

/// Row appended to the quote time series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    pub chain: String,
    pub token_address: String,
    pub usd: BigDecimal,
    pub timestamp: DateTime<Utc>,
    pub provider: String,
}

/// Row upserted into the current price store, keyed by `(token, chain)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentQuote {
    pub token: String,
    pub chain: String,
    pub usd: BigDecimal,
    pub timestamp: DateTime<Utc>,
    pub provider: String,
}

impl From<&QuoteRecord> for CurrentQuote {
    fn from(quote: &QuoteRecord) -> Self {
        Self {
            token: quote.token_address.clone(),
            chain: quote.chain.clone(),
            usd: quote.usd.clone(),
            timestamp: quote.timestamp,
            provider: quote.provider.clone(),
        }
    }
}

/// Source of on-chain trade events
#[async_trait]
pub trait TradeEventSource: Send + Sync {
    /// Trades in `from_block..=to_block`, in chronological order
    async fn fetch_trades(&self, chain: &str, from_block: u64, to_block: u64) -> ProviderResult<Vec<TradeEvent>>;

    /// Highest block the source has trades for
    async fn latest_block(&self, chain: &str) -> ProviderResult<u64>;
}

/// Source of previously known USD prices
#[async_trait]
pub trait AnchorPriceProvider: Send + Sync {
    /// Latest known price of every token on `chain` at or before `timestamp`
    async fn latest_prices_before(&self, chain: &str, timestamp: DateTime<Utc>)
        -> ProviderResult<Vec<HistoricalPrice>>;

    /// Latest known price of one token at or before `timestamp`.
    ///
    /// With `exclude_self_provider` set, prices the engine derived itself are
    /// skipped so a derived price can't feed back in as an anchor.
    async fn latest_price_before(
        &self,
        chain: &str,
        address: &str,
        timestamp: DateTime<Utc>,
        exclude_self_provider: bool,
    ) -> ProviderResult<Option<ReferencePrice>>;
}

/// Durable storage for discovered prices
#[async_trait]
pub trait QuotePersister: Send + Sync {
    /// Append to the quote time series
    async fn append_quote(&self, quote: &QuoteRecord) -> ProviderResult<()>;

    /// Insert or replace the current price of a token
    async fn upsert_current_quote(&self, quote: &CurrentQuote) -> ProviderResult<()>;
}

/// Per-chain record of the last fully processed block
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn last_processed_block(&self, chain: &str) -> ProviderResult<Option<u64>>;

    async fn save_checkpoint(&self, chain: &str, block: u64) -> ProviderResult<()>;
}
