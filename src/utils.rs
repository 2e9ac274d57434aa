//! Utility functions for chain defaults and decimal arithmetic.
//!
//! # Core Functionality
//!
//! - **Chain Defaults**: per-chain native alias and anchor token addresses
//! - **Amount Scaling**: raw integer token amounts to decimal-normalized values
//! - **Rates**: exchange rate division that never panics on a zero denominator
//!
//! All arithmetic goes through `BigDecimal`. Token decimals commonly reach 18,
//! and rates are quotients of such values, so floating point would silently drop
//! the digits downstream prices depend on.

use crate::config::AnchorRole;
use crate::errors::ConfigError;
use crate::ConfigResult;
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, BigUint};
use num_traits::Zero;

/// Sentinel address that trade harvesters use for a chain's native coin.
pub const NATIVE_SENTINEL: &str = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";

/// Chain whose prices configured anchors are pinned to.
pub const REFERENCE_CHAIN: &str = "ethereum";

const WRAPPED_NATIVE_ADDRESSES: &[(&str, &str)] = &[
    ("ethereum", "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
    ("base", "0x4200000000000000000000000000000000000006"),
    ("unichain", "0x4200000000000000000000000000000000000006"),
];

const USDC_ADDRESSES: &[(&str, &str)] = &[
    ("ethereum", "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
    ("base", "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
    ("unichain", "0x078d782b760474a361dda0af3839290b0ef57ad6"),
];

const USDT_ADDRESSES: &[(&str, &str)] = &[
    ("ethereum", "0xdac17f958d2ee523a2206206994597c13d831ec7"),
    ("base", "0xfde4c96c8593536e31f229ea8f37b2ada2699bb2"),
    ("unichain", "0x9151434b16b9763660705744891fa906f660ecc5"),
];

fn lookup(table: &[(&str, &'static str)], chain: &str) -> ConfigResult<&'static str> {
    table
        .iter()
        .find(|(name, _)| *name == chain)
        .map(|(_, address)| *address)
        .ok_or_else(|| ConfigError::UnsupportedChain {
            chain: chain.to_string(),
        })
}

/// Get the wrapped native token address used as the native coin's graph identity.
///
/// # Errors
///
/// Returns an error if the chain is not supported
pub fn wrapped_native_address(chain: &str) -> ConfigResult<&'static str> {
    lookup(WRAPPED_NATIVE_ADDRESSES, chain)
}

/// Get the default anchor token address for a chain and role.
///
/// The primary anchor is USDC and the secondary is USDT on every supported chain.
///
/// # Errors
///
/// Returns an error if the chain is not supported
pub fn anchor_address(chain: &str, role: AnchorRole) -> ConfigResult<&'static str> {
    match role {
        AnchorRole::Primary => lookup(USDC_ADDRESSES, chain),
        AnchorRole::Secondary => lookup(USDT_ADDRESSES, chain),
    }
}

/// Get the chain ID for a given blockchain name.
///
/// # Errors
///
/// Returns an error if the chain name is not recognized
pub fn chain_id(chain: &str) -> ConfigResult<u64> {
    match chain {
        "ethereum" => Ok(1),
        "base" => Ok(8453),
        "unichain" => Ok(130),
        _ => Err(ConfigError::UnsupportedChain {
            chain: chain.to_string(),
        }),
    }
}

/// Scale a raw integer token amount down by the token's decimals.
///
/// `scale_amount(100000000, 8)` is exactly `1`. The conversion is lossless: the
/// raw integer becomes the mantissa and `decimals` the scale.
pub fn scale_amount(raw: &BigUint, decimals: u32) -> BigDecimal {
    BigDecimal::new(BigInt::from(raw.clone()), i64::from(decimals))
}

/// Divide two normalized amounts into an exchange rate.
///
/// A zero denominator yields a zero rate instead of panicking. Zero rates can
/// never produce a positive price, so the resolver rejects anything derived
/// from them.
pub fn exchange_rate(numerator: &BigDecimal, denominator: &BigDecimal) -> BigDecimal {
    if denominator.is_zero() {
        return BigDecimal::zero();
    }
    numerator / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_scale_amount_is_exact() {
        let raw = BigUint::from_str("100000000").unwrap();
        assert_eq!(scale_amount(&raw, 8), BigDecimal::from(1));

        let raw = BigUint::from_str("1500000000000000001").unwrap();
        assert_eq!(
            scale_amount(&raw, 18),
            BigDecimal::from_str("1.500000000000000001").unwrap()
        );
    }

    #[test]
    fn test_exchange_rate_zero_denominator() {
        let rate = exchange_rate(&BigDecimal::from(5), &BigDecimal::zero());
        assert!(rate.is_zero());
    }

    #[test]
    fn test_exchange_rate_keeps_precision() {
        let tiny = BigDecimal::from_str("0.000000000000000001").unwrap();
        let rate = exchange_rate(&BigDecimal::from(1), &tiny);
        assert_eq!(rate, BigDecimal::from_str("1000000000000000000").unwrap());
    }

    #[test]
    fn test_chain_defaults() {
        assert_eq!(chain_id("base").unwrap(), 8453);
        assert!(chain_id("solana").is_err());
        assert_eq!(
            wrapped_native_address("ethereum").unwrap(),
            "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"
        );
        assert!(anchor_address("polygon", AnchorRole::Primary).is_err());
        assert_ne!(
            anchor_address("base", AnchorRole::Primary).unwrap(),
            anchor_address("base", AnchorRole::Secondary).unwrap()
        );
    }
}
