//! Core types for the price graph.
//!
//! - `TokenAddress`: normalized token identity
//! - `PairKey`: canonical unordered token pair
//! - `TokenNode` and `NodePrice`: graph nodes and their optional USD price
//! - `PairEdge`: the latest observed exchange rate between two tokens
//! - `PriceSource`: whether a price is authoritative or derived

use crate::config::ChainConfig;
use crate::errors::GraphError;
use crate::GraphResult;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider tag the engine attaches to every price it derives.
///
/// Anchor lookups pass `exclude_self_provider` to skip quotes carrying this tag.
pub const GRAPH_PROVIDER: &str = "graph-prices";

/// Normalized token address.
///
/// Lower-cased, with the chain's native-coin sentinel replaced by its ERC20
/// alias so the native asset and its wrapped form share one graph identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenAddress(String);

impl TokenAddress {
    /// Normalize a raw address for the given chain
    pub fn normalize(raw: &str, chain: &ChainConfig) -> Self {
        let lowered = raw.trim().to_lowercase();
        if lowered == chain.native_sentinel.to_lowercase() {
            if let Some(alias) = &chain.native_alias {
                return Self(alias.trim().to_lowercase());
            }
        }
        Self(lowered)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical key for an unordered token pair: `token_a < token_b`.
///
/// Every edge is stored under this key, whichever token was the trade's
/// source. Computing a rate against the wrong orientation is how prices end up
/// off by orders of magnitude, so all rate lookups go through this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    token_a: TokenAddress,
    token_b: TokenAddress,
}

impl PairKey {
    /// Build the canonical key for two tokens, in any order
    pub fn new(first: &TokenAddress, second: &TokenAddress) -> Self {
        let (token_a, token_b) = canonical_pair(first, second);
        Self {
            token_a: token_a.clone(),
            token_b: token_b.clone(),
        }
    }

    pub fn token_a(&self) -> &TokenAddress {
        &self.token_a
    }

    pub fn token_b(&self) -> &TokenAddress {
        &self.token_b
    }
}

/// Order two tokens lexicographically, smallest first.
pub fn canonical_pair<'a>(
    first: &'a TokenAddress,
    second: &'a TokenAddress,
) -> (&'a TokenAddress, &'a TokenAddress) {
    if first <= second {
        (first, second)
    } else {
        (second, first)
    }
}

/// One re-derivation of a token's price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Derivation {
    /// Hops between the token and the priced token the search reached
    pub hops: u32,
    /// The priced token the search reached
    pub via: TokenAddress,
    /// Trade time the price was derived at
    pub timestamp: DateTime<Utc>,
}

/// History of how a derived price has been re-derived within a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvenanceTrail {
    steps: Vec<Derivation>,
}

impl ProvenanceTrail {
    pub fn steps(&self) -> &[Derivation] {
        &self.steps
    }

    pub fn latest(&self) -> Option<&Derivation> {
        self.steps.last()
    }

    pub(crate) fn push(&mut self, step: Derivation) {
        self.steps.push(step);
    }

    /// Hop counts of every derivation, oldest first, e.g. `"2>1>1"`
    pub fn hop_summary(&self) -> String {
        self.steps
            .iter()
            .map(|step| step.hops.to_string())
            .collect::<Vec<_>>()
            .join(">")
    }
}

/// Where a node's price came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PriceSource {
    /// Ground truth from price history or a cross-chain reference. Never
    /// overwritten by a derived price.
    Anchor { provider: String },
    /// Computed by traversing the graph from a priced token.
    Derived { trail: ProvenanceTrail },
}

impl PriceSource {
    pub fn is_anchor(&self) -> bool {
        matches!(self, PriceSource::Anchor { .. })
    }

    /// Provider tag used when the price is persisted
    pub fn provider(&self) -> &str {
        match self {
            PriceSource::Anchor { provider } => provider,
            PriceSource::Derived { .. } => GRAPH_PROVIDER,
        }
    }
}

/// A node's USD price. Present or absent as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodePrice {
    pub usd: BigDecimal,
    pub timestamp: DateTime<Utc>,
    pub hops: u32,
    pub source: PriceSource,
}

/// Represents a token node in the price graph.
///
/// Neighbors keep insertion order so traversal order is a pure function of
/// the trade sequence.
#[derive(Debug, Clone)]
pub struct TokenNode {
    address: TokenAddress,
    neighbors: IndexSet<TokenAddress>,
    price: Option<NodePrice>,
}

impl TokenNode {
    /// Create an unpriced token node
    pub fn new(address: TokenAddress) -> Self {
        Self {
            address,
            neighbors: IndexSet::new(),
            price: None,
        }
    }

    pub fn address(&self) -> &TokenAddress {
        &self.address
    }

    /// Tokens this token has traded against
    pub fn neighbors(&self) -> &IndexSet<TokenAddress> {
        &self.neighbors
    }

    pub fn price(&self) -> Option<&NodePrice> {
        self.price.as_ref()
    }

    /// Price usable for a resolution at `as_of`: set, and not from the future
    pub fn price_as_of(&self, as_of: DateTime<Utc>) -> Option<&NodePrice> {
        self.price.as_ref().filter(|price| price.timestamp <= as_of)
    }

    pub fn is_anchor(&self) -> bool {
        self.price.as_ref().is_some_and(|price| price.source.is_anchor())
    }

    pub(crate) fn add_neighbor(&mut self, address: TokenAddress) {
        self.neighbors.insert(address);
    }

    pub(crate) fn price_mut(&mut self) -> &mut Option<NodePrice> {
        &mut self.price
    }
}

/// The most recently observed exchange rate between two tokens.
///
/// `rate_a_to_b` is how many `token_b` one `token_a` buys; `rate_b_to_a` the
/// reverse. Both come from the same trade, so they are algebraic inverses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairEdge {
    key: PairKey,
    rate_a_to_b: BigDecimal,
    rate_b_to_a: BigDecimal,
    last_trade_time: DateTime<Utc>,
    last_event_id: String,
}

impl PairEdge {
    pub(crate) fn new(
        key: PairKey,
        rate_a_to_b: BigDecimal,
        rate_b_to_a: BigDecimal,
        last_trade_time: DateTime<Utc>,
        last_event_id: String,
    ) -> Self {
        Self {
            key,
            rate_a_to_b,
            rate_b_to_a,
            last_trade_time,
            last_event_id,
        }
    }

    pub fn key(&self) -> &PairKey {
        &self.key
    }

    pub fn rate_a_to_b(&self) -> &BigDecimal {
        &self.rate_a_to_b
    }

    pub fn rate_b_to_a(&self) -> &BigDecimal {
        &self.rate_b_to_a
    }

    pub fn last_trade_time(&self) -> DateTime<Utc> {
        self.last_trade_time
    }

    pub fn last_event_id(&self) -> &str {
        &self.last_event_id
    }

    /// Units of the other token that one unit of `from` buys.
    ///
    /// # Errors
    ///
    /// Returns an error if `from` is not one of the pair's tokens
    pub fn rate_from(&self, from: &TokenAddress) -> GraphResult<&BigDecimal> {
        if from == &self.key.token_a {
            Ok(&self.rate_a_to_b)
        } else if from == &self.key.token_b {
            Ok(&self.rate_b_to_a)
        } else {
            Err(GraphError::TokenNotInPair {
                token: from.clone(),
                token_a: self.key.token_a.clone(),
                token_b: self.key.token_b.clone(),
            })
        }
    }
}
