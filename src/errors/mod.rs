//! Error handling and reporting for the price discovery engine.
//!
//! Errors are split by the component that raises them:
//!
//! - **`GraphError`**: inconsistencies in the in-memory price graph
//! - **`TradeError`**: trade events rejected at construction
//! - **`ProviderError`**: failures in external collaborators (trade source,
//!   anchor provider, quote persistence, checkpoints)
//! - **`ConfigError`**: invalid or unsupported configuration
//!
//! `PriceDiscoveryError` wraps all of them and is what the scheduler and the
//! public entry points return. Failures inside a batch that only affect a single
//! token (a rejected price, a failed quote write) are logged and skipped rather
//! than surfaced here; see the `pricing` and `scheduler` modules.

pub mod config;
pub mod graph;
pub mod provider;
pub mod trade;

pub use config::ConfigError;
pub use graph::GraphError;
pub use provider::ProviderError;
pub use trade::TradeError;

/// Main result type for the library
pub type Result<T> = std::result::Result<T, PriceDiscoveryError>;

/// Top-level error enum for the price discovery engine.
///
/// Every domain error converts into this type with `?`. Errors from a batch's
/// I/O boundary propagate up to the scheduler, which leaves the checkpoint
/// untouched so the whole batch is retried on the next run.
#[derive(Debug, thiserror::Error)]
pub enum PriceDiscoveryError {
    /// Inconsistent price graph state.
    #[error("Graph operation failed: {0}")]
    Graph(#[from] GraphError),

    /// A trade event failed validation.
    #[error("Invalid trade event: {0}")]
    Trade(#[from] TradeError),

    /// An external collaborator failed to fetch or persist data.
    ///
    /// Fetch failures abort the batch; persistence failures for a single
    /// quote are handled by the scheduler without reaching this variant.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Configuration could not be loaded or is out of range.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error for cases not covered by specific error types.
    #[error("Generic error: {0}")]
    Other(#[from] anyhow::Error),
}
