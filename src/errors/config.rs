//! Configuration errors

use thiserror::Error;

/// Errors that can occur while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Invalid value for {variable}: '{value}'")]
    InvalidVariable { variable: &'static str, value: String },

    #[error("Unsupported chain: {chain}")]
    UnsupportedChain { chain: String },
}
