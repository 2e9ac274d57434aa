//! Errors from external collaborators.

use thiserror::Error;

/// Errors that can occur while talking to the trade source, the anchor price
/// provider, the quote stores or the checkpoint store
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Failed to fetch {what} for chain {chain}: {reason}")]
    FetchFailed {
        what: &'static str,
        chain: String,
        reason: String,
    },

    #[error("Failed to persist quote for {token} on {chain}: {reason}")]
    PersistFailed {
        token: String,
        chain: String,
        reason: String,
    },

    #[error("No token metadata for {token} on {chain}")]
    MissingTokenMetadata { token: String, chain: String },

    #[error("Failed to save checkpoint {block} for chain {chain}: {reason}")]
    CheckpointFailed {
        chain: String,
        block: u64,
        reason: String,
    },
}
