//! Core price graph implementation.
//!
//! `PriceGraph` owns two maps: tokens by normalized address (each carrying its
//! neighbor set) and edges by canonical pair. Nodes and edges are created
//! lazily the first time a trade or anchor references them.

use super::types::{
    Derivation, NodePrice, PairEdge, PairKey, PriceSource, ProvenanceTrail, TokenAddress, TokenNode,
};
use crate::errors::{GraphError, Result};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use num_traits::Signed;
use std::collections::HashMap;

/// Outcome of trying to commit a derived price onto a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// First price the node has received
    Priced,
    /// A derived price was re-derived and replaced
    Updated,
    /// Node is an anchor; left untouched
    AnchorKept,
}

impl CommitOutcome {
    pub fn is_committed(self) -> bool {
        matches!(self, CommitOutcome::Priced | CommitOutcome::Updated)
    }
}

/// Graph of tokens connected by their latest observed exchange rates.
///
/// Exclusively owned by one batch and discarded when the batch ends.
#[derive(Debug, Default)]
pub struct PriceGraph {
    /// Token nodes in first-seen order
    tokens: IndexMap<TokenAddress, TokenNode>,
    /// One edge per canonical token pair
    edges: HashMap<PairKey, PairEdge>,
}

impl PriceGraph {
    /// Create a new empty price graph
    pub fn new() -> Self {
        Self::default()
    }

    // ================================
    // Construction Methods
    // ================================

    /// Add a token to the graph, returning the existing node if already present.
    pub fn add_token(&mut self, address: &TokenAddress) -> &mut TokenNode {
        self.tokens
            .entry(address.clone())
            .or_insert_with(|| TokenNode::new(address.clone()))
    }

    /// Seed an authoritative USD price onto a token.
    ///
    /// Anchors replace whatever the node held before, including earlier anchors.
    pub fn set_anchor(
        &mut self,
        address: &TokenAddress,
        usd: BigDecimal,
        timestamp: DateTime<Utc>,
        provider: impl Into<String>,
    ) {
        let provider = provider.into();
        tracing::debug!(
            token = %address,
            usd = %usd,
            timestamp = %timestamp,
            provider = %provider,
            "Seeding anchor price"
        );

        *self.add_token(address).price_mut() = Some(NodePrice {
            usd,
            timestamp,
            hops: 0,
            source: PriceSource::Anchor { provider },
        });
    }

    /// Commit a derived price onto a token unless it is anchored.
    ///
    /// An unpriced node takes the price with a fresh provenance trail. A
    /// derived node always takes it, extending its trail, even when price and
    /// timestamp repeat. Anchors are never overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not in the graph or the price is not
    /// strictly positive
    pub fn commit_derived(
        &mut self,
        address: &TokenAddress,
        usd: BigDecimal,
        hops: u32,
        via: &TokenAddress,
        timestamp: DateTime<Utc>,
    ) -> Result<CommitOutcome> {
        if !usd.is_positive() {
            return Err(GraphError::NonPositivePrice {
                token: address.clone(),
                price: usd.to_string(),
            }
            .into());
        }

        let node = self
            .tokens
            .get_mut(address)
            .ok_or_else(|| GraphError::TokenNotFound { address: address.clone() })?;

        let step = Derivation {
            hops,
            via: via.clone(),
            timestamp,
        };

        let slot = node.price_mut();
        if let Some(current) = slot.as_mut() {
            let outcome = match &mut current.source {
                PriceSource::Anchor { .. } => CommitOutcome::AnchorKept,
                PriceSource::Derived { trail } => {
                    trail.push(step);
                    current.usd = usd;
                    current.timestamp = timestamp;
                    current.hops = hops;
                    CommitOutcome::Updated
                }
            };
            return Ok(outcome);
        }

        let mut trail = ProvenanceTrail::default();
        trail.push(step);
        *slot = Some(NodePrice {
            usd,
            timestamp,
            hops,
            source: PriceSource::Derived { trail },
        });
        Ok(CommitOutcome::Priced)
    }

    /// Insert or replace the edge for a pair and link both tokens as neighbors.
    pub(crate) fn put_edge(&mut self, edge: PairEdge) {
        let token_a = edge.key().token_a().clone();
        let token_b = edge.key().token_b().clone();

        self.add_token(&token_a).add_neighbor(token_b.clone());
        self.add_token(&token_b).add_neighbor(token_a);
        self.edges.insert(edge.key().clone(), edge);
    }

    // ================================
    // Query Methods
    // ================================

    /// Get the total number of tokens in the graph
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Get the total number of edges (unique token pairs) in the graph
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Get a token node by address
    pub fn token(&self, address: &TokenAddress) -> Option<&TokenNode> {
        self.tokens.get(address)
    }

    /// Iterate over all tokens in first-seen order
    pub fn tokens(&self) -> impl Iterator<Item = &TokenNode> {
        self.tokens.values()
    }

    /// Get the edge between two tokens, in either order
    pub fn edge(&self, first: &TokenAddress, second: &TokenAddress) -> Option<&PairEdge> {
        self.edges.get(&PairKey::new(first, second))
    }

    /// Get the edge between two tokens that are recorded as neighbors.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::MissingEdge` if no edge exists for the pair, which
    /// means the neighbor index and the edge map disagree
    pub fn edge_between(&self, first: &TokenAddress, second: &TokenAddress) -> Result<&PairEdge> {
        self.edge(first, second).ok_or_else(|| {
            let key = PairKey::new(first, second);
            GraphError::MissingEdge {
                token_a: key.token_a().clone(),
                token_b: key.token_b().clone(),
            }
            .into()
        })
    }

    /// Get the neighbors of a token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not in the graph
    pub fn token_neighbors(&self, address: &TokenAddress) -> Result<impl Iterator<Item = &TokenAddress>> {
        self.tokens
            .get(address)
            .map(|node| node.neighbors().iter())
            .ok_or_else(|| GraphError::TokenNotFound { address: address.clone() }.into())
    }

    #[cfg(test)]
    pub(crate) fn remove_edge_only(&mut self, first: &TokenAddress, second: &TokenAddress) {
        self.edges.remove(&PairKey::new(first, second));
    }
}
