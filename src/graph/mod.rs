//! Price graph built from observed trades.
//!
//! Nodes are tokens keyed by normalized address; each undirected edge holds the
//! latest exchange rate seen between a canonical token pair. The graph lives
//! for one batch: it is rebuilt from fresh anchors and trades every time.

pub mod core;
pub mod edges;
pub mod types;

// Re-export all public types for convenience
pub use core::{CommitOutcome, PriceGraph};
pub use edges::EdgeUpdate;
pub use types::{
    canonical_pair, Derivation, NodePrice, PairEdge, PairKey, PriceSource, ProvenanceTrail, TokenAddress,
    TokenNode, GRAPH_PROVIDER,
};
