//! Price graph errors.

use crate::graph::TokenAddress;

/// Errors that can occur during graph operations
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Token not found in graph: {address}")]
    TokenNotFound { address: TokenAddress },

    #[error("Missing edge between adjacent tokens {token_a} and {token_b}")]
    MissingEdge { token_a: TokenAddress, token_b: TokenAddress },

    #[error("Token {token} is not part of pair {token_a}/{token_b}")]
    TokenNotInPair {
        token: TokenAddress,
        token_a: TokenAddress,
        token_b: TokenAddress,
    },

    #[error("Rejected non-positive price for {token}: {price}")]
    NonPositivePrice { token: TokenAddress, price: String },

    #[error("Invalid USD price for {token}: {value}")]
    InvalidPrice { token: TokenAddress, value: String },
}
