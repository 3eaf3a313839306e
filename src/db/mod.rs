// Database module - SQLite connection and possession register

pub mod models;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::PatrimoineError;
pub use models::{NewPossession, Possession, PossessionChanges, PossessionDraft};

const POSSESSION_COLUMNS: &str =
    "id, label, value, start_date, end_date, depreciation_rate, created_at, updated_at";

/// Get the default database path (~/.patrimoine/data.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let app_dir = PathBuf::from(home).join(".patrimoine");

    std::fs::create_dir_all(&app_dir).context("Failed to create .patrimoine directory")?;

    Ok(app_dir.join("data.db"))
}

/// Explicit path, or the default location
pub fn resolve_db_path(db_path: Option<PathBuf>) -> Result<PathBuf> {
    match db_path {
        Some(path) => Ok(path),
        None => get_default_db_path(),
    }
}

/// Open database connection
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = resolve_db_path(db_path)?;
    let conn = Connection::open(&path).context(format!("Failed to open database at {:?}", path))?;
    Ok(conn)
}

/// Initialize the database with schema
///
/// Creates the database file if needed and runs the (idempotent) schema SQL.
pub fn init_database(db_path: Option<PathBuf>) -> Result<()> {
    let path = resolve_db_path(db_path)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .context(format!("Failed to create database directory {:?}", parent))?;
    }

    info!("Initializing database at: {:?}", path);

    let conn = open_db(Some(path))?;
    conn.execute_batch(include_str!("schema.sql"))
        .context("Failed to execute schema")?;

    debug!("Database schema ready");
    Ok(())
}

/// Open a throwaway in-memory register with the schema applied
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
    conn.execute_batch(include_str!("schema.sql"))
        .context("Failed to execute schema")?;
    Ok(conn)
}

/// Insert a new possession, returns the stored record with its id
pub fn insert_possession(conn: &Connection, new: &NewPossession) -> Result<Possession> {
    new.validate()?;

    let label = new.label.trim();
    if find_possession_by_label(conn, label)?.is_some() {
        return Err(PatrimoineError::DuplicateLabel(label.to_string()).into());
    }

    let now = Utc::now();
    conn.execute(
        "INSERT INTO possessions (
            label, value, start_date, end_date, depreciation_rate, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            label,
            new.value.to_string(),
            new.start_date,
            new.end_date,
            new.depreciation_rate.to_string(),
            now,
            now,
        ],
    )?;

    let id = conn.last_insert_rowid();
    info!("Created possession #{} '{}'", id, label);

    get_possession(conn, id)?.ok_or_else(|| PatrimoineError::NotFound(id).into())
}

/// Get a possession by its id
pub fn get_possession(conn: &Connection, id: i64) -> Result<Option<Possession>> {
    let sql = format!("SELECT {} FROM possessions WHERE id = ?1", POSSESSION_COLUMNS);
    let possession = conn
        .query_row(&sql, [id], possession_from_row)
        .optional()?;
    Ok(possession)
}

/// Get a possession by its (unique) label
pub fn find_possession_by_label(conn: &Connection, label: &str) -> Result<Option<Possession>> {
    let sql = format!(
        "SELECT {} FROM possessions WHERE label = ?1",
        POSSESSION_COLUMNS
    );
    let possession = conn
        .query_row(&sql, [label], possession_from_row)
        .optional()?;
    Ok(possession)
}

/// List every possession, oldest first
pub fn list_possessions(conn: &Connection) -> Result<Vec<Possession>> {
    let sql = format!(
        "SELECT {} FROM possessions ORDER BY start_date ASC, id ASC",
        POSSESSION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let possessions = stmt
        .query_map([], possession_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(possessions)
}

fn require_possession(conn: &Connection, id: i64) -> Result<Possession> {
    get_possession(conn, id)?.ok_or_else(|| PatrimoineError::NotFound(id).into())
}

/// Apply a partial update to a stored possession
pub fn update_possession(
    conn: &Connection,
    id: i64,
    changes: &PossessionChanges,
) -> Result<Possession> {
    let current = require_possession(conn, id)?;
    let updated = changes.apply_to(&current)?;

    if updated.label != current.label {
        if let Some(other) = find_possession_by_label(conn, &updated.label)? {
            if other.id != Some(id) {
                return Err(PatrimoineError::DuplicateLabel(updated.label).into());
            }
        }
    }

    conn.execute(
        "UPDATE possessions
         SET label = ?1, value = ?2, start_date = ?3, end_date = ?4,
             depreciation_rate = ?5, updated_at = ?6
         WHERE id = ?7",
        params![
            updated.label,
            updated.value.to_string(),
            updated.start_date,
            updated.end_date,
            updated.depreciation_rate.to_string(),
            updated.updated_at,
            id,
        ],
    )?;

    info!("Updated possession #{} '{}'", id, updated.label);
    require_possession(conn, id)
}

/// Close a possession: set its end date, keeping the record
pub fn close_possession(conn: &Connection, id: i64, end_date: NaiveDate) -> Result<Possession> {
    let current = require_possession(conn, id)?;

    if let Some(existing) = current.end_date {
        return Err(PatrimoineError::Validation(format!(
            "possession #{} '{}' is already closed since {}",
            id, current.label, existing
        ))
        .into());
    }
    models::validate_end_date(current.start_date, end_date)?;

    conn.execute(
        "UPDATE possessions SET end_date = ?1, updated_at = ?2 WHERE id = ?3",
        params![end_date, Utc::now(), id],
    )?;

    info!("Closed possession #{} '{}' on {}", id, current.label, end_date);
    require_possession(conn, id)
}

/// Delete a possession, returns the removed record
pub fn delete_possession(conn: &Connection, id: i64) -> Result<Possession> {
    let current = require_possession(conn, id)?;
    conn.execute("DELETE FROM possessions WHERE id = ?1", [id])?;
    info!("Deleted possession #{} '{}'", id, current.label);
    Ok(current)
}

/// Persist a draft (create or edit) and return the saved record
pub fn save_draft(conn: &Connection, draft: &PossessionDraft) -> Result<Possession> {
    draft.validate()?;
    match draft {
        PossessionDraft::Create(new) => insert_possession(conn, new),
        PossessionDraft::Edit { id, changes } => update_possession(conn, *id, changes),
    }
}

fn possession_from_row(row: &Row) -> Result<Possession, rusqlite::Error> {
    Ok(Possession {
        id: Some(row.get(0)?),
        label: row.get(1)?,
        value: get_decimal_value(row, 2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        depreciation_rate: get_decimal_value(row, 5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Helper to read Decimal from SQLite (handles both INTEGER, REAL and TEXT)
pub fn get_decimal_value(row: &Row, idx: usize) -> Result<Decimal, rusqlite::Error> {
    use rusqlite::types::{Type, ValueRef};

    match row.get_ref(idx)? {
        ValueRef::Text(bytes) => {
            let s = std::str::from_utf8(bytes).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
            })?;
            Decimal::from_str(s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
            })
        }
        ValueRef::Integer(i) => Ok(Decimal::from(i)),
        ValueRef::Real(f) => Decimal::try_from(f).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Real, Box::new(e))
        }),
        _ => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "decimal".to_string(),
            Type::Null,
        )),
    }
}
