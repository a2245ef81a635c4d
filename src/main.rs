//! EVision - Main Entry Point
//!
//! Electric vehicle sales analytics over a tabular dataset: sales
//! forecasting, price prediction, exploratory summaries, and a
//! keyword-driven Q&A interface.

use clap::Parser;
use evision::cli::{cmd_ask, cmd_eda, cmd_forecast, cmd_info, cmd_price, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "evision=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info => cmd_info(&cli.data)?,
        Commands::Forecast => cmd_forecast(&cli.data)?,
        Commands::Price {
            battery,
            range,
            year,
            acceleration,
            brand,
        } => cmd_price(&cli.data, battery, range, year, acceleration, brand)?,
        Commands::Eda => cmd_eda(&cli.data)?,
        Commands::Ask { query } => cmd_ask(&cli.data, &query)?,
    }

    Ok(())
}
