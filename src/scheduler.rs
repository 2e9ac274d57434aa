//! Batch scheduling.
//!
//! The scheduler walks fixed-size block windows from the chain's checkpoint up
//! to the trade source's head. For each window it fetches trades and anchors,
//! runs a fresh `IncrementalEvaluator`, persists every committed price to both
//! quote stores, and only then advances the checkpoint. A fetch failure
//! leaves the checkpoint where it was so the whole window is retried.

use crate::config::DiscoveryConfig;
use crate::errors::Result;
use crate::graph::GRAPH_PROVIDER;
use crate::pricing::{AnchorSnapshot, IncrementalEvaluator, PricedToken};
use crate::providers::{
    AnchorPriceProvider, CheckpointStore, CurrentQuote, ProviderResult, QuotePersister, QuoteRecord, TradeEventSource,
};
use crate::trade::TradeEvent;
use itertools::Itertools;
use serde::Serialize;
use std::sync::Arc;

/// Outcome of one processed block window
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub from_block: u64,
    pub to_block: u64,
    pub trade_count: usize,
    /// Prices committed by the evaluator, in discovery order
    pub priced: Vec<PricedToken>,
    /// Prices written to both stores
    pub persisted: usize,
    /// Prices that failed to persist and were skipped
    pub failed: usize,
}

/// Drives the evaluator over consecutive block windows
pub struct BatchScheduler {
    config: DiscoveryConfig,
    trades: Arc<dyn TradeEventSource>,
    anchors: Arc<dyn AnchorPriceProvider>,
    quotes: Arc<dyn QuotePersister>,
    checkpoints: Arc<dyn CheckpointStore>,
}

impl BatchScheduler {
    pub fn new(
        config: DiscoveryConfig,
        trades: Arc<dyn TradeEventSource>,
        anchors: Arc<dyn AnchorPriceProvider>,
        quotes: Arc<dyn QuotePersister>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            config,
            trades,
            anchors,
            quotes,
            checkpoints,
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Next block window to process, or `None` once the checkpoint reaches `head`
    pub async fn next_window(&self, head: u64) -> Result<Option<(u64, u64)>> {
        let chain = &self.config.chain.name;
        let from = match self.checkpoints.last_processed_block(chain).await? {
            Some(block) => block.saturating_add(1),
            None => self.config.start_block,
        };
        if from > head {
            return Ok(None);
        }
        let to = from
            .saturating_add(self.config.batch_window.saturating_sub(1))
            .min(head);
        Ok(Some((from, to)))
    }

    /// Process the next block window up to `head`.
    ///
    /// Returns `None` when there is nothing left to process.
    ///
    /// # Errors
    ///
    /// Returns an error if trades, anchors or the checkpoint cannot be read or
    /// the checkpoint cannot be saved. The checkpoint is not advanced.
    pub async fn run_batch(&self, head: u64) -> Result<Option<BatchReport>> {
        let Some((from_block, to_block)) = self.next_window(head).await? else {
            return Ok(None);
        };
        let chain = &self.config.chain;

        tracing::debug!(chain = %chain.name, from_block, to_block, "Processing batch");

        let trades = self.trades.fetch_trades(&chain.name, from_block, to_block).await?;

        let priced = match trades.iter().map(TradeEvent::timestamp).minmax().into_option() {
            Some((first_trade, last_trade)) => {
                let snapshot = AnchorSnapshot::fetch(self.anchors.as_ref(), chain, first_trade, last_trade).await?;
                IncrementalEvaluator::new(&self.config).process_batch(&trades, &snapshot)
            }
            None => Vec::new(),
        };

        let mut persisted = 0;
        let mut failed = 0;
        for token in &priced {
            match self.persist(token).await {
                Ok(()) => persisted += 1,
                Err(error) => {
                    tracing::warn!(
                        chain = %chain.name,
                        token = %token.address,
                        usd = %token.price,
                        error = %error,
                        "Failed to persist price, skipping"
                    );
                    failed += 1;
                }
            }
        }

        self.checkpoints.save_checkpoint(&chain.name, to_block).await?;

        tracing::info!(
            chain = %chain.name,
            from_block,
            to_block,
            trades = trades.len(),
            priced = priced.len(),
            persisted,
            failed,
            "Batch completed"
        );

        Ok(Some(BatchReport {
            from_block,
            to_block,
            trade_count: trades.len(),
            priced,
            persisted,
            failed,
        }))
    }

    /// Process every window up to the trade source's current head block
    pub async fn run_to_head(&self) -> Result<Vec<BatchReport>> {
        let head = self.trades.latest_block(&self.config.chain.name).await?;
        tracing::info!(chain = %self.config.chain.name, head, "Catching up to head block");

        let mut reports = Vec::new();
        while let Some(report) = self.run_batch(head).await? {
            reports.push(report);
        }
        Ok(reports)
    }

    async fn persist(&self, token: &PricedToken) -> ProviderResult<()> {
        let quote = QuoteRecord {
            chain: self.config.chain.name.clone(),
            token_address: token.address.to_string(),
            usd: token.price.clone(),
            timestamp: token.timestamp,
            provider: GRAPH_PROVIDER.to_string(),
        };
        self.quotes.append_quote(&quote).await?;
        self.quotes.upsert_current_quote(&CurrentQuote::from(&quote)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{PriceDiscoveryError, ProviderError};
    use crate::graph::test_support::*;
    use crate::providers::{MemoryCheckpointStore, MemoryQuoteStore, MemoryTradeSource};
    use async_trait::async_trait;
    use bigdecimal::BigDecimal;

    fn config() -> DiscoveryConfig {
        DiscoveryConfig {
            chain: chain(),
            max_hops: 10,
            batch_window: 100,
            start_block: 0,
        }
    }

    struct Harness {
        source: Arc<MemoryTradeSource>,
        store: Arc<MemoryQuoteStore>,
        checkpoints: Arc<MemoryCheckpointStore>,
    }

    impl Harness {
        fn new() -> Self {
            let store = MemoryQuoteStore::new();
            store.insert_price("testnet", USDC, BigDecimal::from(1), at(0), "reference");
            Self {
                source: Arc::new(MemoryTradeSource::new()),
                store: Arc::new(store),
                checkpoints: Arc::new(MemoryCheckpointStore::new()),
            }
        }

        fn scheduler(&self) -> BatchScheduler {
            BatchScheduler::new(
                config(),
                self.source.clone(),
                self.store.clone(),
                self.store.clone(),
                self.checkpoints.clone(),
            )
        }
    }

    #[tokio::test]
    async fn test_walks_windows_to_head() {
        let harness = Harness::new();
        harness.source.extend(
            "testnet",
            [
                trade(WETH, USDC, "1000000000000000000", "2000000000", 10),
                trade(WBTC, USDC, "100000000", "100000000000", 120),
                trade(DAI, USDC, "1000000000000000000", "1000000", 250),
            ],
        );

        let reports = harness.scheduler().run_to_head().await.unwrap();
        let windows: Vec<_> = reports.iter().map(|r| (r.from_block, r.to_block)).collect();
        assert_eq!(windows, vec![(0, 99), (100, 199), (200, 250)]);
        assert!(reports.iter().all(|r| r.trade_count == 1 && r.persisted == 1 && r.failed == 0));
        assert_eq!(harness.checkpoints.last_processed_block("testnet").await.unwrap(), Some(250));

        let wbtc = harness.store.current("testnet", WBTC).unwrap();
        assert_eq!(wbtc.usd, BigDecimal::from(100000));
        assert_eq!(wbtc.provider, GRAPH_PROVIDER);
        assert_eq!(harness.store.quotes().len(), 4);

        assert!(harness.scheduler().run_batch(250).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prices_carry_over_to_later_batches() {
        let harness = Harness::new();
        harness.source.push("testnet", trade(WETH, USDC, "1000000000000000000", "2000000000", 10));
        harness.source.push("testnet", trade(WBTC, WETH, "100000000", "20000000000000000000", 150));

        let reports = harness.scheduler().run_to_head().await.unwrap();
        assert_eq!(reports.len(), 2);

        let second = &reports[1].priced;
        assert_eq!(second[0].address.as_str(), WBTC);
        assert_eq!(second[0].via.as_str(), WETH);
        assert_eq!(second[0].price, BigDecimal::from(40000));
    }

    #[tokio::test]
    async fn test_empty_window_still_advances_checkpoint() {
        let harness = Harness::new();
        let report = harness.scheduler().run_batch(40).await.unwrap().unwrap();
        assert_eq!((report.from_block, report.to_block), (0, 40));
        assert_eq!(report.trade_count, 0);
        assert!(report.priced.is_empty());
        assert_eq!(harness.checkpoints.last_processed_block("testnet").await.unwrap(), Some(40));
    }

    struct RejectingQuotes {
        rejected: &'static str,
        inner: MemoryQuoteStore,
    }

    #[async_trait]
    impl QuotePersister for RejectingQuotes {
        async fn append_quote(&self, quote: &QuoteRecord) -> ProviderResult<()> {
            if quote.token_address == self.rejected {
                return Err(ProviderError::PersistFailed {
                    token: quote.token_address.clone(),
                    chain: quote.chain.clone(),
                    reason: "connection reset".to_string(),
                });
            }
            self.inner.append_quote(quote).await
        }

        async fn upsert_current_quote(&self, quote: &CurrentQuote) -> ProviderResult<()> {
            self.inner.upsert_current_quote(quote).await
        }
    }

    #[tokio::test]
    async fn test_persist_failure_skips_token() {
        let harness = Harness::new();
        harness.source.push("testnet", trade(WETH, USDC, "1000000000000000000", "2000000000", 10));
        harness.source.push("testnet", trade(WBTC, USDC, "100000000", "100000000000", 11));
        let quotes = Arc::new(RejectingQuotes {
            rejected: WETH,
            inner: MemoryQuoteStore::new(),
        });

        let scheduler = BatchScheduler::new(
            config(),
            harness.source.clone(),
            harness.store.clone(),
            quotes.clone(),
            harness.checkpoints.clone(),
        );
        let report = scheduler.run_batch(99).await.unwrap().unwrap();

        assert_eq!(report.priced.len(), 2);
        assert_eq!(report.persisted, 1);
        assert_eq!(report.failed, 1);
        assert!(quotes.inner.current("testnet", WBTC).is_some());
        assert!(quotes.inner.current("testnet", WETH).is_none());
        assert_eq!(harness.checkpoints.last_processed_block("testnet").await.unwrap(), Some(99));
    }

    struct UnreachableSource;

    #[async_trait]
    impl TradeEventSource for UnreachableSource {
        async fn fetch_trades(&self, chain: &str, _: u64, _: u64) -> ProviderResult<Vec<TradeEvent>> {
            Err(ProviderError::FetchFailed {
                what: "trades",
                chain: chain.to_string(),
                reason: "timeout".to_string(),
            })
        }

        async fn latest_block(&self, _: &str) -> ProviderResult<u64> {
            Ok(500)
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_checkpoint() {
        let harness = Harness::new();
        harness.checkpoints.save_checkpoint("testnet", 199).await.unwrap();

        let scheduler = BatchScheduler::new(
            config(),
            Arc::new(UnreachableSource),
            harness.store.clone(),
            harness.store.clone(),
            harness.checkpoints.clone(),
        );
        let result = scheduler.run_to_head().await;

        assert!(matches!(
            result,
            Err(PriceDiscoveryError::Provider(ProviderError::FetchFailed { .. }))
        ));
        assert_eq!(harness.checkpoints.last_processed_block("testnet").await.unwrap(), Some(199));
        assert_eq!(scheduler.next_window(500).await.unwrap(), Some((200, 299)));
    }
}
