//! Trade event validation errors.

use thiserror::Error;

/// Errors raised while constructing a `TradeEvent` from raw harvester data
#[derive(Debug, Error)]
pub enum TradeError {
    #[error("Token address for {side} token is empty")]
    EmptyAddress { side: &'static str },

    #[error("Negative decimals for token {token}: {decimals}")]
    NegativeDecimals { token: String, decimals: i64 },

    #[error("Decimals for token {token} out of range: {decimals}")]
    DecimalsOutOfRange { token: String, decimals: i64 },

    #[error("Failed to parse {field} '{value}' as a non-negative integer")]
    InvalidAmount { field: &'static str, value: String },
}
