//! Command dispatcher that routes parsed CLI commands to their handlers.

mod imports;
mod possessions;
mod valuation;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::cli::Commands;
use patrimoine::config::Config;
use patrimoine::db;
use patrimoine::utils::parse_flexible_date;
use patrimoine::valuation::{ValuationEngine, YearBasis};

/// Route a parsed command to its handler
pub async fn dispatch_command(command: Commands, config: &Config, json_output: bool) -> Result<()> {
    match command {
        Commands::Possessions { action } => {
            possessions::dispatch_possessions(action, config, json_output).await
        }
        Commands::Value { action } => valuation::dispatch_value(action, config, json_output).await,
        Commands::Import { file, dry_run } => {
            imports::dispatch_import(&file, dry_run, config, json_output).await
        }
        Commands::Export { output } => imports::dispatch_export(output.as_deref(), config).await,
        Commands::Sync { url, dry_run } => {
            imports::dispatch_sync(url.as_deref(), dry_run, config, json_output).await
        }
    }
}

/// Open the configured register, creating it on first use
fn open_register(config: &Config) -> Result<Connection> {
    db::init_database(config.database_path.clone())?;
    db::open_db(config.database_path.clone())
}

fn parse_date_arg(raw: &str) -> Result<chrono::NaiveDate> {
    Ok(parse_flexible_date(raw)?)
}

fn build_engine(config: &Config, basis: Option<&str>) -> Result<ValuationEngine> {
    let basis = match basis {
        Some(raw) => raw
            .parse::<YearBasis>()
            .map_err(|e| anyhow::anyhow!(e))
            .context("Invalid --basis")?,
        None => config.year_basis,
    };
    Ok(ValuationEngine::as_of_today().with_basis(basis))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize JSON output")?
    );
    Ok(())
}
