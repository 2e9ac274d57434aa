//! Multi-hop Price Discovery Library
//!
//! Derives USD prices for tokens that have no direct price feed by walking the
//! trade graph from tokens whose price is known. Every observed swap becomes an
//! exchange-rate edge between two tokens; a token is priced by the nearest
//! priced token reachable through those edges, using only prices that were
//! already known when the trade happened.
//!
//! # Architecture Overview
//!
//! The library is organized into several key modules:
//!
//! - **`trade`**: Validated trade events and their causal ordering
//! - **`graph`**: Per-batch price graph of tokens and canonical pair edges
//! - **`pricing`**: Anchor seeding, BFS price resolution and batch evaluation
//! - **`providers`**: Traits for trade sources, anchor prices, quote storage
//!   and checkpoints, plus in-memory implementations
//! - **`scheduler`**: Drives batches over block windows and persists results
//! - **`config`**: Chain and discovery configuration from the environment
//! - **`builders`**: Builder patterns for complex object construction
//! - **`errors`**: Error handling and reporting
//! - **`utils`**: Address tables and decimal helpers
//!
//! # Core Concepts
//!
//! - **Anchor**: A token whose USD price is taken as ground truth for a batch,
//!   either from price history or from a reference chain. Anchors are never
//!   overwritten by derived prices.
//! - **Canonical Pair**: Two tokens ordered lexicographically. Each pair has
//!   exactly one edge, with a rate in each direction.
//! - **Hops**: Number of edges between a priced token and the anchor or
//!   derived price it was resolved from. The only quality measure the engine
//!   keeps.
//! - **Batch**: A contiguous block window. The graph is rebuilt for every
//!   batch and only committed prices outlive it.
//!
//! # Thread Safety
//!
//! The graph and evaluator are single-threaded and owned by one batch. The
//! collaborator traits are `Send + Sync` so implementations can be shared
//! behind `Arc`.

pub mod builders;
pub mod config;
pub mod errors;
pub mod graph;
pub mod pricing;
pub mod providers;
pub mod scheduler;
pub mod trade;
pub mod utils;

// Re-export the main Result type and error enum for convenience
pub use errors::{PriceDiscoveryError, Result};

// Re-export builder patterns for convenience
pub use builders::PriceGraphBuilder;

pub use config::{ChainConfig, DiscoveryConfig};
pub use graph::{PriceGraph, TokenAddress};
pub use providers::ProviderResult;
pub use pricing::{AnchorSnapshot, IncrementalEvaluator, PriceResolver, PricedToken};
pub use scheduler::{BatchReport, BatchScheduler};
pub use trade::TradeEvent;

// Module-specific result types for better ergonomics
pub type GraphResult<T> = std::result::Result<T, errors::GraphError>;
pub type TradeResult<T> = std::result::Result<T, errors::TradeError>;
pub type ConfigResult<T> = std::result::Result<T, errors::ConfigError>;
