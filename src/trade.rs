//! Trade events observed on-chain.
//!
//! `TradeEventRecord` is the loosely typed shape harvesters hand over (amounts
//! as decimal strings, decimals as plain integers). `TradeEvent` is the
//! validated, immutable form the graph consumes.

use crate::errors::TradeError;
use crate::utils::scale_amount;
use crate::TradeResult;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Token decimals above this are treated as corrupt input.
const MAX_DECIMALS: i64 = 255;

/// Raw token reference as supplied by the harvester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub address: String,
    pub decimals: i64,
}

/// Raw trade event as supplied by the harvester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeEventRecord {
    pub source_token: TokenRecord,
    pub target_token: TokenRecord,
    pub source_amount: String,
    pub target_amount: String,
    pub timestamp: DateTime<Utc>,
    pub block_number: u64,
    pub tx_index: u64,
    pub log_index: u64,
    pub event_id: String,
}

/// A validated token reference within a trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeToken {
    address: String,
    decimals: u32,
}

impl TradeToken {
    /// Create a token reference, rejecting empty addresses and negative decimals
    pub fn new(address: impl Into<String>, decimals: i64, side: &'static str) -> TradeResult<Self> {
        let address = address.into();
        if address.trim().is_empty() {
            return Err(TradeError::EmptyAddress { side });
        }
        if decimals < 0 {
            return Err(TradeError::NegativeDecimals {
                token: address,
                decimals,
            });
        }
        if decimals > MAX_DECIMALS {
            return Err(TradeError::DecimalsOutOfRange {
                token: address,
                decimals,
            });
        }
        Ok(Self {
            address,
            decimals: decimals as u32,
        })
    }

    /// Raw address exactly as observed on-chain
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }
}

/// A single swap observed on-chain: `source_amount` of the source token
/// exchanged for `target_amount` of the target token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeEvent {
    source_token: TradeToken,
    target_token: TradeToken,
    source_amount: BigUint,
    target_amount: BigUint,
    timestamp: DateTime<Utc>,
    block_number: u64,
    tx_index: u64,
    log_index: u64,
    event_id: String,
}

impl TradeEvent {
    /// Create a trade event from raw integer amount strings.
    ///
    /// # Errors
    ///
    /// Returns an error if either amount is not a non-negative base-10 integer
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_token: TradeToken,
        target_token: TradeToken,
        source_amount: &str,
        target_amount: &str,
        timestamp: DateTime<Utc>,
        block_number: u64,
        tx_index: u64,
        log_index: u64,
        event_id: impl Into<String>,
    ) -> TradeResult<Self> {
        Ok(Self {
            source_token,
            target_token,
            source_amount: parse_amount(source_amount, "source amount")?,
            target_amount: parse_amount(target_amount, "target amount")?,
            timestamp,
            block_number,
            tx_index,
            log_index,
            event_id: event_id.into(),
        })
    }

    pub fn source_token(&self) -> &TradeToken {
        &self.source_token
    }

    pub fn target_token(&self) -> &TradeToken {
        &self.target_token
    }

    pub fn source_amount(&self) -> &BigUint {
        &self.source_amount
    }

    pub fn target_amount(&self) -> &BigUint {
        &self.target_amount
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// Source amount divided by `10^source_decimals`
    pub fn normalized_source_amount(&self) -> BigDecimal {
        scale_amount(&self.source_amount, self.source_token.decimals)
    }

    /// Target amount divided by `10^target_decimals`
    pub fn normalized_target_amount(&self) -> BigDecimal {
        scale_amount(&self.target_amount, self.target_token.decimals)
    }

    /// Causal order: timestamp, then block number, transaction index and log index.
    pub fn causal_cmp(&self, other: &Self) -> Ordering {
        (self.timestamp, self.block_number, self.tx_index, self.log_index).cmp(&(
            other.timestamp,
            other.block_number,
            other.tx_index,
            other.log_index,
        ))
    }
}

impl TryFrom<TradeEventRecord> for TradeEvent {
    type Error = TradeError;

    fn try_from(record: TradeEventRecord) -> Result<Self, Self::Error> {
        let source_token = TradeToken::new(record.source_token.address, record.source_token.decimals, "source")?;
        let target_token = TradeToken::new(record.target_token.address, record.target_token.decimals, "target")?;
        TradeEvent::new(
            source_token,
            target_token,
            &record.source_amount,
            &record.target_amount,
            record.timestamp,
            record.block_number,
            record.tx_index,
            record.log_index,
            record.event_id,
        )
    }
}

fn parse_amount(value: &str, field: &'static str) -> TradeResult<BigUint> {
    BigUint::from_str(value.trim()).map_err(|_| TradeError::InvalidAmount {
        field,
        value: value.to_string(),
    })
}

/// Sort trades into causal order in place.
pub fn sort_causally(trades: &mut [TradeEvent]) {
    trades.sort_by(TradeEvent::causal_cmp);
}
