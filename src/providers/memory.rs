//! In-memory collaborators.
//!
//! Used by the replay demo and tests. `MemoryQuoteStore` is both the quote sink
//! and the anchor provider, so prices discovered in one batch are visible as
//! historical prices to the next, the same loop a database-backed deployment
//! runs through its quote tables.

use super::{
    AnchorPriceProvider, CheckpointStore, CurrentQuote, HistoricalPrice, ProviderResult, QuotePersister, QuoteRecord,
    ReferencePrice, TradeEventSource,
};
use crate::errors::ProviderError;
use crate::graph::GRAPH_PROVIDER;
use crate::trade::{sort_causally, TradeEvent};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Trade source backed by a per-chain list of trades
#[derive(Debug, Default)]
pub struct MemoryTradeSource {
    trades: Mutex<HashMap<String, Vec<TradeEvent>>>,
}

impl MemoryTradeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, chain: &str, trade: TradeEvent) {
        locked(&self.trades).entry(chain.to_string()).or_default().push(trade);
    }

    pub fn extend<I>(&self, chain: &str, trades: I)
    where
        I: IntoIterator<Item = TradeEvent>,
    {
        locked(&self.trades).entry(chain.to_string()).or_default().extend(trades);
    }
}

#[async_trait]
impl TradeEventSource for MemoryTradeSource {
    async fn fetch_trades(&self, chain: &str, from_block: u64, to_block: u64) -> ProviderResult<Vec<TradeEvent>> {
        let mut trades: Vec<TradeEvent> = locked(&self.trades)
            .get(chain)
            .map(|trades| {
                trades
                    .iter()
                    .filter(|trade| (from_block..=to_block).contains(&trade.block_number()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        sort_causally(&mut trades);
        Ok(trades)
    }

    async fn latest_block(&self, chain: &str) -> ProviderResult<u64> {
        Ok(locked(&self.trades)
            .get(chain)
            .and_then(|trades| trades.iter().map(TradeEvent::block_number).max())
            .unwrap_or(0))
    }
}

#[derive(Debug, Default)]
struct QuoteState {
    series: Vec<QuoteRecord>,
    current: IndexMap<(String, String), CurrentQuote>,
    known_tokens: Option<HashSet<(String, String)>>,
}

/// Quote time series and current-price table held in memory.
///
/// Addresses are stored lower-cased. When token metadata is registered with
/// `with_token_metadata`, persisting a quote for any other token fails the
/// way a foreign-key violation would.
#[derive(Debug, Default)]
pub struct MemoryQuoteStore {
    state: Mutex<QuoteState>,
}

impl MemoryQuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept quotes for the listed tokens on `chain`
    pub fn with_token_metadata<'a, I>(self, chain: &str, tokens: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        {
            let mut state = locked(&self.state);
            let known = state.known_tokens.get_or_insert_with(HashSet::new);
            known.extend(tokens.into_iter().map(|token| (chain.to_string(), token.to_lowercase())));
        }
        self
    }

    /// Record a price as if it had been persisted earlier
    pub fn insert_price(
        &self,
        chain: &str,
        token: &str,
        usd: BigDecimal,
        timestamp: DateTime<Utc>,
        provider: &str,
    ) {
        let quote = QuoteRecord {
            chain: chain.to_string(),
            token_address: token.to_lowercase(),
            usd,
            timestamp,
            provider: provider.to_string(),
        };
        let mut state = locked(&self.state);
        state
            .current
            .insert((quote.chain.clone(), quote.token_address.clone()), CurrentQuote::from(&quote));
        state.series.push(quote);
    }

    /// Every quote in the time series, in append order
    pub fn quotes(&self) -> Vec<QuoteRecord> {
        locked(&self.state).series.clone()
    }

    /// Current price of a token, if one has been stored
    pub fn current(&self, chain: &str, token: &str) -> Option<CurrentQuote> {
        locked(&self.state)
            .current
            .get(&(chain.to_string(), token.to_lowercase()))
            .cloned()
    }

    fn check_metadata(state: &QuoteState, chain: &str, token: &str) -> ProviderResult<()> {
        match &state.known_tokens {
            Some(known) if !known.contains(&(chain.to_string(), token.to_lowercase())) => {
                Err(ProviderError::MissingTokenMetadata {
                    token: token.to_string(),
                    chain: chain.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl QuotePersister for MemoryQuoteStore {
    async fn append_quote(&self, quote: &QuoteRecord) -> ProviderResult<()> {
        let mut state = locked(&self.state);
        Self::check_metadata(&state, &quote.chain, &quote.token_address)?;
        state.series.push(QuoteRecord {
            token_address: quote.token_address.to_lowercase(),
            ..quote.clone()
        });
        Ok(())
    }

    async fn upsert_current_quote(&self, quote: &CurrentQuote) -> ProviderResult<()> {
        let mut state = locked(&self.state);
        Self::check_metadata(&state, &quote.chain, &quote.token)?;
        let key = (quote.chain.clone(), quote.token.to_lowercase());
        state.current.insert(
            key,
            CurrentQuote {
                token: quote.token.to_lowercase(),
                ..quote.clone()
            },
        );
        Ok(())
    }
}

#[async_trait]
impl AnchorPriceProvider for MemoryQuoteStore {
    async fn latest_prices_before(
        &self,
        chain: &str,
        timestamp: DateTime<Utc>,
    ) -> ProviderResult<Vec<HistoricalPrice>> {
        let state = locked(&self.state);
        let mut latest: IndexMap<&str, &QuoteRecord> = IndexMap::new();
        for quote in state
            .series
            .iter()
            .filter(|quote| quote.chain == chain && quote.timestamp <= timestamp)
        {
            let newer = latest
                .get(quote.token_address.as_str())
                .map_or(true, |current| current.timestamp <= quote.timestamp);
            if newer {
                latest.insert(quote.token_address.as_str(), quote);
            }
        }

        Ok(latest
            .into_values()
            .map(|quote| HistoricalPrice {
                token_address: quote.token_address.clone(),
                usd: quote.usd.clone(),
                timestamp: quote.timestamp,
                provider: quote.provider.clone(),
            })
            .collect())
    }

    async fn latest_price_before(
        &self,
        chain: &str,
        address: &str,
        timestamp: DateTime<Utc>,
        exclude_self_provider: bool,
    ) -> ProviderResult<Option<ReferencePrice>> {
        let address = address.to_lowercase();
        let state = locked(&self.state);
        let best = state
            .series
            .iter()
            .filter(|quote| quote.chain == chain && quote.token_address == address && quote.timestamp <= timestamp)
            .filter(|quote| !(exclude_self_provider && quote.provider == GRAPH_PROVIDER))
            .fold(None::<&QuoteRecord>, |best, quote| match best {
                Some(best) if best.timestamp > quote.timestamp => Some(best),
                _ => Some(quote),
            });

        Ok(best.map(|quote| ReferencePrice {
            usd: quote.usd.clone(),
            timestamp: quote.timestamp,
            provider: quote.provider.clone(),
        }))
    }
}

/// Checkpoints held in memory
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    blocks: Mutex<HashMap<String, u64>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn last_processed_block(&self, chain: &str) -> ProviderResult<Option<u64>> {
        Ok(locked(&self.blocks).get(chain).copied())
    }

    /// Checkpoints only move forward; saving an earlier block fails
    async fn save_checkpoint(&self, chain: &str, block: u64) -> ProviderResult<()> {
        let mut blocks = locked(&self.blocks);
        if let Some(&current) = blocks.get(chain) {
            if block < current {
                return Err(ProviderError::CheckpointFailed {
                    chain: chain.to_string(),
                    block,
                    reason: format!("already at block {current}"),
                });
            }
        }
        blocks.insert(chain.to_string(), block);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::*;

    #[tokio::test]
    async fn test_trade_source_filters_block_range() {
        let source = MemoryTradeSource::new();
        source.extend(
            "testnet",
            [
                trade(WBTC, USDC, "1", "1", 30),
                trade(WBTC, USDC, "1", "1", 10),
                trade(WETH, USDC, "1", "1", 20),
            ],
        );

        let trades = source.fetch_trades("testnet", 10, 20).await.unwrap();
        let blocks: Vec<u64> = trades.iter().map(TradeEvent::block_number).collect();
        assert_eq!(blocks, vec![10, 20]);
        assert_eq!(source.latest_block("testnet").await.unwrap(), 30);
        assert_eq!(source.latest_block("other").await.unwrap(), 0);
        assert!(source.fetch_trades("other", 0, 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_latest_prices_before_picks_latest_per_token() {
        let store = MemoryQuoteStore::new();
        store.insert_price("testnet", USDC, BigDecimal::from(1), at(0), "reference");
        store.insert_price("testnet", WBTC, BigDecimal::from(90000), at(5), GRAPH_PROVIDER);
        store.insert_price("testnet", WBTC, BigDecimal::from(95000), at(8), GRAPH_PROVIDER);
        store.insert_price("testnet", WBTC, BigDecimal::from(99000), at(50), GRAPH_PROVIDER);
        store.insert_price("othernet", DAI, BigDecimal::from(1), at(0), "reference");

        let prices = store.latest_prices_before("testnet", at(10)).await.unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].token_address, USDC);
        assert_eq!(prices[1].usd, BigDecimal::from(95000));
        assert_eq!(prices[1].provider, GRAPH_PROVIDER);
    }

    #[tokio::test]
    async fn test_latest_price_before_excludes_own_quotes() {
        let store = MemoryQuoteStore::new();
        store.insert_price("ethereum", USDC, BigDecimal::from(1), at(0), "coingecko");
        store.insert_price("ethereum", USDC, BigDecimal::from(2), at(5), GRAPH_PROVIDER);

        let with_self = store.latest_price_before("ethereum", USDC, at(10), false).await.unwrap().unwrap();
        assert_eq!(with_self.usd, BigDecimal::from(2));

        let external = store.latest_price_before("ethereum", USDC, at(10), true).await.unwrap().unwrap();
        assert_eq!(external.usd, BigDecimal::from(1));
        assert_eq!(external.provider, "coingecko");

        assert!(store.latest_price_before("ethereum", WBTC, at(10), true).await.unwrap().is_none());
        assert!(store.latest_price_before("ethereum", USDC, at(-1), true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persist_requires_token_metadata_when_registered() {
        let store = MemoryQuoteStore::new().with_token_metadata("testnet", [USDC]);
        let quote = QuoteRecord {
            chain: "testnet".to_string(),
            token_address: WBTC.to_string(),
            usd: BigDecimal::from(100000),
            timestamp: at(1),
            provider: GRAPH_PROVIDER.to_string(),
        };

        let result = store.append_quote(&quote).await;
        assert!(matches!(result, Err(ProviderError::MissingTokenMetadata { .. })));
        assert!(store.quotes().is_empty());

        let known = QuoteRecord {
            token_address: USDC.to_string(),
            ..quote
        };
        store.append_quote(&known).await.unwrap();
        store.upsert_current_quote(&CurrentQuote::from(&known)).await.unwrap();
        assert_eq!(store.quotes().len(), 1);
        assert_eq!(store.current("testnet", USDC).unwrap().usd, BigDecimal::from(100000));
    }

    #[tokio::test]
    async fn test_checkpoints_are_per_chain() {
        let store = MemoryCheckpointStore::new();
        assert_eq!(store.last_processed_block("testnet").await.unwrap(), None);

        store.save_checkpoint("testnet", 99).await.unwrap();
        assert_eq!(store.last_processed_block("testnet").await.unwrap(), Some(99));
        assert_eq!(store.last_processed_block("othernet").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_checkpoint_never_moves_backwards() {
        let store = MemoryCheckpointStore::new();
        store.save_checkpoint("testnet", 199).await.unwrap();
        store.save_checkpoint("testnet", 199).await.unwrap();

        let result = store.save_checkpoint("testnet", 99).await;
        assert!(matches!(
            result,
            Err(ProviderError::CheckpointFailed { block: 99, .. })
        ));
        assert_eq!(store.last_processed_block("testnet").await.unwrap(), Some(199));
    }
}
