//! Price derivation over the per-batch graph.
//!
//! - `anchors`: fetching and seeding the authoritative prices a batch starts from
//! - `resolver`: hop-bounded BFS from an unpriced token to the nearest priced one
//! - `evaluator`: replays a batch's trades and commits newly derived prices

pub mod anchors;
pub mod evaluator;
pub mod resolver;

pub use anchors::AnchorSnapshot;
pub use evaluator::IncrementalEvaluator;
pub use resolver::{PriceResolver, PRICE_PRECISION};

use crate::graph::TokenAddress;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A successful price resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceResult {
    /// USD price of the resolved token
    pub price: BigDecimal,
    /// Edges between the resolved token and `via`
    pub hops: u32,
    /// The priced token the search reached
    pub via: TokenAddress,
}

/// A price committed during a batch, ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedToken {
    pub address: TokenAddress,
    pub price: BigDecimal,
    pub hops: u32,
    /// Timestamp of the trade that triggered the commit
    pub timestamp: DateTime<Utc>,
    pub via: TokenAddress,
    /// Trade that triggered the commit
    pub event_id: String,
}
