use anyhow::{Context, Result};
use colored::Colorize;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

use super::{open_register, print_json};
use crate::cli::formatters;
use patrimoine::config::Config;
use patrimoine::db;
use patrimoine::importers::{self, ImportSummary, WireBatch};
use patrimoine::remote::RemoteClient;

#[derive(Serialize)]
struct JsonImport<'a> {
    source: &'a str,
    dry_run: bool,
    found: usize,
    #[serde(flatten)]
    summary: &'a ImportSummary,
}

pub async fn dispatch_import(
    file: &str,
    dry_run: bool,
    config: &Config,
    json_output: bool,
) -> Result<()> {
    tracing::info!("Importing possessions from: {}", file);
    let batch = importers::read_possessions_file(Path::new(file))
        .context(format!("Error reading import file {}", file))?;
    load_records(file, &batch, dry_run, config, json_output)
}

pub async fn dispatch_export(output: Option<&str>, config: &Config) -> Result<()> {
    let conn = open_register(config)?;
    let possessions = db::list_possessions(&conn)?;
    let json = importers::export_possessions_json(&possessions)?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", json))
                .context(format!("Failed to write {}", path))?;
            eprintln!(
                "{} Exported {} possessions to {}",
                "✓".green().bold(),
                possessions.len(),
                path
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub async fn dispatch_sync(
    url: Option<&str>,
    dry_run: bool,
    config: &Config,
    json_output: bool,
) -> Result<()> {
    let base_url = url.unwrap_or(config.api_url.as_str());
    let client = RemoteClient::new(base_url)?;
    let batch = client
        .fetch_possessions()
        .await
        .context("Failed to sync possessions")?;
    load_records(&client.possessions_url(), &batch, dry_run, config, json_output)
}

fn load_records(
    source: &str,
    batch: &WireBatch,
    dry_run: bool,
    config: &Config,
    json_output: bool,
) -> Result<()> {
    let mut conn = if dry_run {
        preview_connection(config)?
    } else {
        open_register(config)?
    };
    let summary = importers::import_possessions(&mut conn, batch, dry_run)?;

    if json_output {
        return print_json(&JsonImport {
            source,
            dry_run,
            found: batch.len(),
            summary: &summary,
        });
    }

    println!("{}", formatters::format_import_summary(&summary, dry_run));
    Ok(())
}

/// A dry run reads the register when it exists and never creates it
fn preview_connection(config: &Config) -> Result<Connection> {
    let path = db::resolve_db_path(config.database_path.clone())?;
    if path.exists() {
        db::open_db(Some(path))
    } else {
        db::open_in_memory()
    }
}
