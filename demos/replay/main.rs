pub mod cli;
pub mod fixture;

use multihop_price_discovery::errors::Result;
use multihop_price_discovery::providers::{MemoryCheckpointStore, MemoryQuoteStore, MemoryTradeSource};
use multihop_price_discovery::{BatchScheduler, TradeEvent};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("replay=info".parse().map_err(|e| anyhow::anyhow!("Invalid log directive: {}", e))?)
        .add_directive(
            "multihop_price_discovery=info"
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid log directive: {}", e))?,
        );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_file(false)
        .with_line_number(false)
        .with_target(false)
        .init();

    let args = cli::parse_cli_args()?;
    let fixture = fixture::Fixture::load(&args.fixture)?;

    let mut config = args.config()?;
    if args.start_block.is_none() {
        if let Some(first_block) = fixture.first_block() {
            config.start_block = first_block;
        }
    }
    let chain = config.chain.name.clone();

    let source = Arc::new(MemoryTradeSource::new());
    for record in fixture.trades {
        source.push(&chain, TradeEvent::try_from(record)?);
    }

    let store = Arc::new(MemoryQuoteStore::new());
    for price in fixture.prices {
        store.insert_price(&price.chain, &price.token_address, price.usd, price.timestamp, &price.provider);
    }

    let scheduler = BatchScheduler::new(
        config,
        source,
        store.clone(),
        store.clone(),
        Arc::new(MemoryCheckpointStore::new()),
    );

    tracing::info!(chain = %chain, "Starting replay");

    let reports = scheduler.run_to_head().await?;
    for report in &reports {
        for token in &report.priced {
            tracing::info!(
                from_block = report.from_block,
                to_block = report.to_block,
                token = %token.address,
                usd = %token.price,
                hops = token.hops,
                via = %token.via,
                event_id = %token.event_id,
                "Discovered price"
            );
        }
    }

    tracing::debug!(reports = %serde_json::to_string_pretty(&reports)?, "Batch reports");
    tracing::info!(
        batches = reports.len(),
        priced = reports.iter().map(|r| r.priced.len()).sum::<usize>(),
        failed = reports.iter().map(|r| r.failed).sum::<usize>(),
        quotes = store.quotes().len(),
        "Replay finished"
    );

    Ok(())
}
