//! Builder patterns for complex object construction.
//!
//! # Available Builders
//!
//! - **`PriceGraphBuilder`**: Builds a price graph from anchors and trades in
//!   one pass, for tests and offline tools that don't go through a batch

pub mod graph;

// Re-export builders for convenience
pub use graph::PriceGraphBuilder;
