//! Edge updates from trade events.
//!
//! Each trade yields one exchange rate in each direction. Rates are stored
//! against the canonical pair orientation, and an edge always holds the rate
//! from the newest trade seen for its pair.

use super::core::PriceGraph;
use super::types::{PairEdge, PairKey, TokenAddress};
use crate::config::ChainConfig;
use crate::trade::TradeEvent;
use crate::utils::exchange_rate;

/// What `upsert_edge` did with a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeUpdate {
    /// No edge existed for the pair
    Inserted,
    /// The trade was newer and replaced the stored rates
    Replaced,
    /// The trade was not newer than the stored edge and was ignored
    Stale,
}

impl PriceGraph {
    /// Insert or refresh the edge for a trade's token pair.
    ///
    /// Both token addresses are normalized and both nodes created if missing.
    /// An existing edge is overwritten only when the trade's timestamp is
    /// strictly later than the edge's; equal timestamps keep the stored edge so
    /// replaying the same trades gives the same graph.
    ///
    /// Returns the normalized `(source, target)` addresses and what happened.
    pub fn upsert_edge(&mut self, trade: &TradeEvent, chain: &ChainConfig) -> (TokenAddress, TokenAddress, EdgeUpdate) {
        let source = TokenAddress::normalize(trade.source_token().address(), chain);
        let target = TokenAddress::normalize(trade.target_token().address(), chain);

        self.add_token(&source);
        self.add_token(&target);

        let normalized_source = trade.normalized_source_amount();
        let normalized_target = trade.normalized_target_amount();
        let source_to_target = exchange_rate(&normalized_target, &normalized_source);
        let target_to_source = exchange_rate(&normalized_source, &normalized_target);

        let key = PairKey::new(&source, &target);
        let (rate_a_to_b, rate_b_to_a) = if key.token_a() == &source {
            (source_to_target, target_to_source)
        } else {
            (target_to_source, source_to_target)
        };

        let update = match self.edge(&source, &target) {
            None => EdgeUpdate::Inserted,
            Some(existing) if trade.timestamp() > existing.last_trade_time() => EdgeUpdate::Replaced,
            Some(existing) => {
                tracing::debug!(
                    token_a = %key.token_a(),
                    token_b = %key.token_b(),
                    event_id = trade.event_id(),
                    stored_event_id = existing.last_event_id(),
                    "Ignoring trade not newer than stored edge"
                );
                EdgeUpdate::Stale
            }
        };

        if update != EdgeUpdate::Stale {
            tracing::debug!(
                token_a = %key.token_a(),
                token_b = %key.token_b(),
                rate_a_to_b = %rate_a_to_b,
                rate_b_to_a = %rate_b_to_a,
                event_id = trade.event_id(),
                update = ?update,
                "Updating pair edge"
            );
            self.put_edge(PairEdge::new(
                key,
                rate_a_to_b,
                rate_b_to_a,
                trade.timestamp(),
                trade.event_id().to_string(),
            ));
        }

        (source, target, update)
    }
}
