mod app;
mod assistant;
mod cli;
mod config;
mod db;
mod error;
mod llm;
mod logging;
mod schema;
mod semantic;

use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init_tracing(if cli.verbose { "debug" } else { "warn" });

    cli.execute().await
}
