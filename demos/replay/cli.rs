use clap::Parser;
use multihop_price_discovery::config::DiscoveryConfig;
use multihop_price_discovery::errors::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Replay recorded trades through the price discovery engine", long_about = None)]
pub struct Args {
    #[clap(long, env = "PRICE_DISCOVERY_CHAIN", default_value = "ethereum", help = "Chain the fixture's trades belong to (ethereum, base, unichain)")]
    pub chain: String,

    #[clap(long, env = "PRICE_DISCOVERY_FIXTURE", default_value = "demos/replay/sample.json", help = "JSON fixture with trades and known prices")]
    pub fixture: PathBuf,

    #[clap(long, help = "Blocks per batch; overrides PRICE_DISCOVERY_BATCH_WINDOW")]
    pub batch_window: Option<u64>,

    #[clap(long, help = "BFS depth limit; overrides PRICE_DISCOVERY_MAX_HOPS")]
    pub max_hops: Option<u32>,

    #[clap(long, help = "First block to process. Defaults to the fixture's earliest trade")]
    pub start_block: Option<u64>,
}

impl Args {
    /// Environment configuration with command-line overrides applied
    pub fn config(&self) -> Result<DiscoveryConfig> {
        let mut config = DiscoveryConfig::from_env(&self.chain)?;
        if let Some(batch_window) = self.batch_window {
            config.batch_window = batch_window;
        }
        if let Some(max_hops) = self.max_hops {
            config.max_hops = max_hops;
        }
        if let Some(start_block) = self.start_block {
            config.start_block = start_block;
        }
        config.validate()?;

        tracing::debug!(
            chain = %self.chain,
            fixture = %self.fixture.display(),
            batch_window = config.batch_window,
            max_hops = config.max_hops,
            "Replay configuration resolved"
        );

        Ok(config)
    }
}

pub fn parse_cli_args() -> Result<Args> {
    Ok(Args::parse())
}
