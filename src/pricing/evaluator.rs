//! Per-batch incremental price evaluation.
//!
//! The evaluator rebuilds the graph for every batch: it seeds the anchor
//! snapshot, then replays the batch's trades in causal order. After each trade
//! updates its edge, both of the trade's tokens are re-resolved as of the
//! trade's timestamp, and any new or changed price is committed straight
//! away so later trades in the same batch can build on it.

use super::{AnchorSnapshot, PriceResolver, PricedToken};
use crate::config::{ChainConfig, DiscoveryConfig};
use crate::graph::{PriceGraph, TokenAddress, TokenNode};
use crate::trade::{sort_causally, TradeEvent};
use itertools::Itertools;

/// Replays a batch of trades over a fresh `PriceGraph`
#[derive(Debug)]
pub struct IncrementalEvaluator {
    chain: ChainConfig,
    resolver: PriceResolver,
    graph: PriceGraph,
}

impl IncrementalEvaluator {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            chain: config.chain.clone(),
            resolver: PriceResolver::new(config.max_hops),
            graph: PriceGraph::new(),
        }
    }

    /// Graph left behind by the last processed batch
    pub fn graph(&self) -> &PriceGraph {
        &self.graph
    }

    /// Process one batch of trades.
    ///
    /// Any previous graph is discarded first. Returns every committed price in
    /// the order it was committed; a token re-priced later in the batch appears
    /// once per commit. An empty batch returns nothing and seeds nothing.
    pub fn process_batch(&mut self, trades: &[TradeEvent], anchors: &AnchorSnapshot) -> Vec<PricedToken> {
        self.graph = PriceGraph::new();

        if trades.is_empty() {
            tracing::debug!(chain = %self.chain.name, "Empty batch, nothing to evaluate");
            return Vec::new();
        }

        let mut ordered = trades.to_vec();
        sort_causally(&mut ordered);

        let seeded = anchors.seed(&mut self.graph, &self.chain);

        let mut priced = Vec::new();
        for trade in &ordered {
            let (source, target, update) = self.graph.upsert_edge(trade, &self.chain);
            tracing::trace!(event_id = trade.event_id(), update = ?update, "Applied trade");

            for token in [source, target].into_iter().dedup() {
                if let Some(committed) = self.evaluate(&token, trade) {
                    priced.push(committed);
                }
            }
        }

        tracing::info!(
            chain = %self.chain.name,
            trades = ordered.len(),
            anchors = seeded,
            tokens = self.graph.token_count(),
            edges = self.graph.edge_count(),
            priced = priced.len(),
            "Evaluated batch"
        );

        priced
    }

    /// Re-resolve one token as of a trade and commit the result if it changed
    fn evaluate(&mut self, token: &TokenAddress, trade: &TradeEvent) -> Option<PricedToken> {
        if self.graph.token(token).is_some_and(TokenNode::is_anchor) {
            return None;
        }

        let result = self.resolver.resolve(&self.graph, token, trade.timestamp())?;

        match self
            .graph
            .commit_derived(token, result.price.clone(), result.hops, &result.via, trade.timestamp())
        {
            Ok(outcome) if outcome.is_committed() => {
                tracing::debug!(
                    token = %token,
                    usd = %result.price,
                    hops = result.hops,
                    via = %result.via,
                    event_id = trade.event_id(),
                    outcome = ?outcome,
                    "Committed derived price"
                );
                Some(PricedToken {
                    address: token.clone(),
                    price: result.price,
                    hops: result.hops,
                    timestamp: trade.timestamp(),
                    via: result.via,
                    event_id: trade.event_id().to_string(),
                })
            }
            Ok(_) => None,
            Err(error) => {
                tracing::warn!(token = %token, error = %error, "Rejected derived price");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::*;
    use crate::config::{AnchorRole, ConfiguredAnchor};
    use crate::graph::{PriceSource, GRAPH_PROVIDER};
    use crate::providers::{HistoricalPrice, ReferencePrice};
    use crate::trade::TradeToken;
    use bigdecimal::BigDecimal;

    fn config() -> DiscoveryConfig {
        DiscoveryConfig {
            chain: chain(),
            max_hops: 10,
            batch_window: 100,
            start_block: 0,
        }
    }

    fn addr(raw: &str) -> TokenAddress {
        TokenAddress::normalize(raw, &chain())
    }

    fn anchors(prices: &[(&str, i64, i64)]) -> AnchorSnapshot {
        AnchorSnapshot::new(
            prices
                .iter()
                .map(|(token, usd, secs)| HistoricalPrice {
                    token_address: token.to_string(),
                    usd: BigDecimal::from(*usd),
                    timestamp: at(*secs),
                    provider: "reference".to_string(),
                })
                .collect(),
            Vec::new(),
        )
    }

    #[test]
    fn test_one_hop_discovery() {
        let mut evaluator = IncrementalEvaluator::new(&config());
        let priced = evaluator.process_batch(
            &[trade(WBTC, USDC, "100000000", "100000000000", 10)],
            &anchors(&[(USDC, 1, 0)]),
        );

        assert_eq!(priced.len(), 1);
        assert_eq!(priced[0].address, addr(WBTC));
        assert_eq!(priced[0].price, BigDecimal::from(100000));
        assert_eq!(priced[0].hops, 1);
        assert_eq!(priced[0].timestamp, at(10));
        assert_eq!(priced[0].event_id, trade(WBTC, USDC, "1", "1", 10).event_id());
    }

    #[test]
    fn test_opposite_direction_trades_stay_consistent() {
        let mut evaluator = IncrementalEvaluator::new(&config());
        let priced = evaluator.process_batch(
            &[
                trade(WETH, USDC, "1000000000000000000", "2000000000", 1),
                trade(USDC, WETH, "2010000000", "1000000000000000000", 2),
            ],
            &anchors(&[(USDC, 1, 0)]),
        );

        assert_eq!(priced.len(), 2);
        assert!(priced.iter().all(|p| p.address == addr(WETH)));
        let (low, high) = (&priced[0].price, &priced[1].price);
        assert_eq!(low, &BigDecimal::from(2000));
        assert_eq!(high, &BigDecimal::from(2010));
        assert!(high < &(low * BigDecimal::from(2)));

        let node = evaluator.graph().token(&addr(WETH)).unwrap();
        match &node.price().unwrap().source {
            PriceSource::Derived { trail } => assert_eq!(trail.hop_summary(), "1>1"),
            other => panic!("expected derived price, got {other:?}"),
        }
    }

    #[test]
    fn test_prices_propagate_in_discovery_order() {
        let mut evaluator = IncrementalEvaluator::new(&config());
        let priced = evaluator.process_batch(
            &[
                trade(WBTC, WETH, "100000000", "20000000000000000000", 6),
                trade(WETH, USDC, "1000000000000000000", "5000000000", 5),
            ],
            &anchors(&[(USDC, 1, 0)]),
        );

        // WETH is re-committed at the second trade's timestamp
        let order: Vec<_> = priced.iter().map(|p| p.address.clone()).collect();
        assert_eq!(order, vec![addr(WETH), addr(WBTC), addr(WETH)]);
        assert_eq!(priced[2].timestamp, at(6));
        assert_eq!(priced[2].price, BigDecimal::from(5000));
        assert_eq!(priced[1].via, addr(WETH));
        assert_eq!(priced[1].hops, 1);
        assert_eq!(priced[1].price, BigDecimal::from(100000));
    }

    #[test]
    fn test_anchor_prices_are_not_from_the_future() {
        let mut evaluator = IncrementalEvaluator::new(&config());
        let priced = evaluator.process_batch(
            &[
                trade(WBTC, USDC, "100000000", "100000000000", 5),
                trade(WBTC, USDC, "100000000", "101000000000", 15),
            ],
            &anchors(&[(USDC, 1, 10)]),
        );

        assert_eq!(priced.len(), 1);
        assert_eq!(priced[0].timestamp, at(15));
        assert_eq!(priced[0].price, BigDecimal::from(101000));
    }

    #[test]
    fn test_anchors_are_never_repriced() {
        let mut evaluator = IncrementalEvaluator::new(&config());
        let priced = evaluator.process_batch(
            &[trade(USDC, DAI, "1000000", "970000000000000000", 1)],
            &anchors(&[(USDC, 1, 0), (DAI, 1, 0)]),
        );

        assert!(priced.is_empty());
        for token in [USDC, DAI] {
            let price = evaluator.graph().token(&addr(token)).unwrap().price().unwrap();
            assert_eq!(price.usd, BigDecimal::from(1));
            assert!(price.source.is_anchor());
        }
    }

    #[test]
    fn test_unpriceable_batch_commits_nothing() {
        let mut evaluator = IncrementalEvaluator::new(&config());
        let priced = evaluator.process_batch(
            &[trade(WBTC, WETH, "100000000", "20000000000000000000", 1)],
            &AnchorSnapshot::default(),
        );
        assert!(priced.is_empty());
        assert_eq!(evaluator.graph().token_count(), 2);
    }

    #[test]
    fn test_same_timestamp_rederivation_is_committed() {
        // Second trade shares the first one's timestamp and block, ordered by log index
        let first = trade(WETH, USDC, "1000000000000000000", "2000000000", 5);
        let second = TradeEvent::new(
            TradeToken::new(WBTC, decimals_of(WBTC), "source").unwrap(),
            TradeToken::new(WETH, decimals_of(WETH), "target").unwrap(),
            "100000000",
            "20000000000000000000",
            at(5),
            5,
            0,
            1,
            "same-time",
        )
        .unwrap();

        let mut evaluator = IncrementalEvaluator::new(&config());
        let priced = evaluator.process_batch(&[first, second], &anchors(&[(USDC, 1, 0)]));

        let order: Vec<_> = priced.iter().map(|p| (p.address.clone(), p.event_id.clone())).collect();
        assert_eq!(
            order,
            vec![
                (addr(WETH), trade(WETH, USDC, "1", "1", 5).event_id().to_string()),
                (addr(WBTC), "same-time".to_string()),
                (addr(WETH), "same-time".to_string()),
            ]
        );
        assert_eq!(priced[0].price, priced[2].price);
        assert_eq!(priced[0].timestamp, priced[2].timestamp);

        match &evaluator.graph().token(&addr(WETH)).unwrap().price().unwrap().source {
            PriceSource::Derived { trail } => assert_eq!(trail.steps().len(), 2),
            other => panic!("expected derived price, got {other:?}"),
        }
    }

    #[test]
    fn test_configured_anchors_outside_batch_are_seeded() {
        let mut config = config();
        config.chain.anchors = [(AnchorRole::Primary, USDC), (AnchorRole::Secondary, DAI)]
            .into_iter()
            .map(|(role, address)| ConfiguredAnchor {
                role,
                address: address.to_string(),
                reference_chain: "ethereum".to_string(),
                reference_address: address.to_string(),
            })
            .collect();

        let snapshot = AnchorSnapshot::new(
            Vec::new(),
            config
                .chain
                .anchors
                .iter()
                .map(|anchor| {
                    let price = ReferencePrice {
                        usd: BigDecimal::from(1),
                        timestamp: at(0),
                        provider: "coingecko".to_string(),
                    };
                    (anchor.clone(), Some(price))
                })
                .collect(),
        );

        let mut evaluator = IncrementalEvaluator::new(&config);
        let priced = evaluator.process_batch(
            &[trade(WBTC, WETH, "100000000", "20000000000000000000", 1)],
            &snapshot,
        );

        assert!(priced.is_empty());
        for token in [USDC, DAI] {
            let node = evaluator.graph().token(&addr(token)).unwrap();
            assert!(node.is_anchor());
            assert_eq!(node.price().unwrap().usd, BigDecimal::from(1));
            assert!(node.neighbors().is_empty());
        }
        assert!(evaluator.graph().token(&addr(WBTC)).unwrap().price().is_none());
    }

    #[test]
    fn test_empty_batch_seeds_nothing() {
        let mut evaluator = IncrementalEvaluator::new(&config());
        let priced = evaluator.process_batch(&[], &anchors(&[(USDC, 1, 0)]));
        assert!(priced.is_empty());
        assert_eq!(evaluator.graph().token_count(), 0);
    }

    #[test]
    fn test_rerun_is_deterministic() {
        let trades = vec![
            trade(WETH, USDC, "1000000000000000000", "2000000000", 1),
            trade(WBTC, WETH, "100000000", "20000000000000000000", 2),
            trade(DAI, WBTC, "100000000000000000000000", "100000000", 3),
            trade(USDC, WETH, "2010000000", "1000000000000000000", 4),
        ];
        let snapshot = anchors(&[(USDC, 1, 0)]);

        let mut evaluator = IncrementalEvaluator::new(&config());
        let first = evaluator.process_batch(&trades, &snapshot);
        let second = evaluator.process_batch(&trades, &snapshot);
        let fresh = IncrementalEvaluator::new(&config()).process_batch(&trades, &snapshot);

        assert_eq!(first.len(), 6);
        assert_eq!(first, second);
        assert_eq!(first, fresh);
        assert!(first.iter().all(|p| p.via != p.address));
        assert_eq!(
            evaluator.graph().token(&addr(DAI)).unwrap().price().unwrap().source.provider(),
            GRAPH_PROVIDER
        );
    }
}
