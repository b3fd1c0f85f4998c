//! Cheongyak CLI: apartment-subscription announcement reports.
//!
//! Fetches recent announcements for a region, parses their detail pages and
//! compares listed prices with nearby transaction prices.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
