use multihop_price_discovery::errors::Result;
use multihop_price_discovery::providers::QuoteRecord;
use multihop_price_discovery::trade::TradeEventRecord;
use serde::Deserialize;
use std::path::Path;

/// Recorded trades plus the prices known before the first of them
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub trades: Vec<TradeEventRecord>,
    #[serde(default)]
    pub prices: Vec<QuoteRecord>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read fixture {}: {}", path.display(), e))?;
        let fixture: Fixture = serde_json::from_str(&raw)?;

        tracing::info!(
            fixture = %path.display(),
            trades = fixture.trades.len(),
            prices = fixture.prices.len(),
            "Fixture loaded"
        );

        Ok(fixture)
    }

    pub fn first_block(&self) -> Option<u64> {
        self.trades.iter().map(|trade| trade.block_number).min()
    }
}
