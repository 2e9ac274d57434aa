//! Breadth-first price resolution.
//!
//! Starting from an unpriced token, the resolver walks the graph outward one
//! hop at a time until it meets a token whose price was known at the time
//! being priced. The first such token found wins: BFS guarantees it is at the
//! minimal hop count, but another token at the same depth might have given a
//! price with less rate drift. Hop count is the only quality measure.

use super::PriceResult;
use crate::config::DEFAULT_MAX_HOPS;
use crate::graph::{PriceGraph, TokenAddress};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use num_traits::{One, Signed};
use std::collections::{HashSet, VecDeque};

/// Significant digits kept on accumulated path rates.
const RATE_PRECISION: u64 = 60;

/// Significant digits kept on resolved USD prices.
pub const PRICE_PRECISION: u64 = 40;

/// Hop-bounded, time-causal BFS over a `PriceGraph`
#[derive(Debug, Clone, Copy)]
pub struct PriceResolver {
    max_hops: u32,
}

impl Default for PriceResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HOPS)
    }
}

impl PriceResolver {
    pub fn new(max_hops: u32) -> Self {
        Self { max_hops }
    }

    pub fn max_hops(&self) -> u32 {
        self.max_hops
    }

    /// Resolve the USD price of `start` as of `as_of`.
    ///
    /// Only tokens whose price timestamp is at or before `as_of` are used. The
    /// returned price is the priced token's USD value times every exchange rate
    /// along the BFS path from `start` to it. Returns `None` when no priced token
    /// is reachable within `max_hops`, or when every candidate yields a
    /// non-positive price.
    pub fn resolve(&self, graph: &PriceGraph, start: &TokenAddress, as_of: DateTime<Utc>) -> Option<PriceResult> {
        graph.token(start)?;

        let mut visited: HashSet<TokenAddress> = HashSet::from([start.clone()]);
        let mut queue: VecDeque<(TokenAddress, u32, BigDecimal)> =
            VecDeque::from([(start.clone(), 0, BigDecimal::one())]);

        while let Some((frontier, hops, rate_to_frontier)) = queue.pop_front() {
            if hops >= self.max_hops {
                continue;
            }

            let neighbors = match graph.token_neighbors(&frontier) {
                Ok(neighbors) => neighbors,
                Err(error) => {
                    tracing::error!(token = %frontier, error = %error, "Queued token missing from graph");
                    continue;
                }
            };

            for neighbor in neighbors {
                if visited.contains(neighbor) {
                    continue;
                }

                let rate = match graph
                    .edge_between(&frontier, neighbor)
                    .and_then(|edge| edge.rate_from(&frontier).map_err(Into::into))
                {
                    Ok(rate) => rate,
                    Err(error) => {
                        tracing::error!(
                            from = %frontier,
                            to = %neighbor,
                            error = %error,
                            "Graph consistency violation, skipping neighbor"
                        );
                        continue;
                    }
                };
                let rate_to_neighbor = (&rate_to_frontier * rate).with_prec(RATE_PRECISION);

                if let Some(known) = graph.token(neighbor).and_then(|node| node.price_as_of(as_of)) {
                    let usd = (&known.usd * &rate_to_neighbor).with_prec(PRICE_PRECISION);
                    if usd.is_positive() {
                        tracing::debug!(
                            token = %start,
                            via = %neighbor,
                            hops = hops + 1,
                            usd = %usd,
                            "Resolved price"
                        );
                        return Some(PriceResult {
                            price: usd,
                            hops: hops + 1,
                            via: neighbor.clone(),
                        });
                    }
                    tracing::debug!(
                        token = %start,
                        via = %neighbor,
                        usd = %usd,
                        "Rejected non-positive price candidate"
                    );
                }

                visited.insert(neighbor.clone());
                queue.push_back((neighbor.clone(), hops + 1, rate_to_neighbor));
            }
        }

        None
    }
}
