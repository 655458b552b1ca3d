mod agent;
mod cli;
mod config;
mod logging;
mod output;
mod sources;
mod tools;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    // a missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    cli.run().await
}
