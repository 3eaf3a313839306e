// Importers module - JSON possession collections (files and REST payloads)

pub mod wire;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::db::{self, Possession};
pub use wire::{parse_wire_date, WireBatch, WirePossession};

/// Outcome of loading a collection into the register
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    /// Labels already present in the register (or earlier in the batch)
    pub skipped: Vec<String>,
    pub errors: Vec<String>,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.imported + self.skipped.len() + self.errors.len()
    }
}

/// Parse a JSON array of wire possessions; only a non-array document fails
pub fn parse_possessions_json(raw: &str) -> Result<WireBatch> {
    let values: Vec<Value> =
        serde_json::from_str(raw).context("Expected a JSON array of possessions")?;
    Ok(WireBatch::from_values(values))
}

/// Read a JSON possession file from disk
pub fn read_possessions_file(path: &Path) -> Result<WireBatch> {
    let raw = std::fs::read_to_string(path)
        .context(format!("Failed to read possessions file {:?}", path))?;
    let batch = parse_possessions_json(&raw)
        .context(format!("Failed to parse possessions file {:?}", path))?;
    info!(
        "Read {} possessions from {:?} ({} unreadable)",
        batch.len(),
        path,
        batch.rejected.len()
    );
    Ok(batch)
}

/// Insert the records whose label is not known yet.
///
/// Undecodable and invalid records are reported in the summary and do not
/// abort the batch. Inserts share one transaction: a storage failure leaves
/// the register untouched. With `dry_run` nothing is written but the summary
/// is computed the same way.
pub fn import_possessions(
    conn: &mut Connection,
    batch: &WireBatch,
    dry_run: bool,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary {
        errors: batch.rejected.clone(),
        ..Default::default()
    };
    let mut seen = HashSet::new();

    let tx = conn.transaction()?;

    for record in &batch.records {
        let new = match record.to_new_possession() {
            Ok(new) => new,
            Err(e) => {
                warn!("Skipping invalid possession '{}': {}", record.label, e);
                summary.errors.push(format!("{}: {}", record.label, e));
                continue;
            }
        };

        if !seen.insert(new.label.clone())
            || db::find_possession_by_label(&tx, &new.label)?.is_some()
        {
            summary.skipped.push(new.label);
            continue;
        }

        if !dry_run {
            db::insert_possession(&tx, &new)?;
        }
        summary.imported += 1;
    }

    tx.commit()?;

    info!(
        "Import finished: {} imported, {} skipped, {} errors{}",
        summary.imported,
        summary.skipped.len(),
        summary.errors.len(),
        if dry_run { " (dry run)" } else { "" }
    );
    Ok(summary)
}

/// Serialize possessions back to the wire format (pretty JSON array)
pub fn export_possessions_json(possessions: &[Possession]) -> Result<String> {
    let records: Vec<WirePossession> = possessions.iter().map(WirePossession::from).collect();
    serde_json::to_string_pretty(&records).context("Failed to serialize possessions")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        db::init_database(Some(path.clone())).unwrap();
        let conn = db::open_db(Some(path)).unwrap();
        (dir, conn)
    }

    const COLLECTION: &str = r#"[
        {"libelle":"Voiture","valeur":12000,"dateDebut":"2020-05-01","dateFin":null,"tauxAmortissement":15},
        {"libelle":"Ordinateur","valeur":"1500","dateDebut":"2023-01-01","dateFin":"","tauxAmortissement":"20"},
        {"libelle":"Voiture","valeur":9000,"dateDebut":"2021-01-01","dateFin":null,"tauxAmortissement":10},
        {"libelle":"Cassé","valeur":-5,"dateDebut":"2023-01-01","dateFin":null,"tauxAmortissement":0}
    ]"#;

    #[test]
    fn test_import_counts_and_skips() {
        let (_dir, mut conn) = test_db();
        let records = parse_possessions_json(COLLECTION).unwrap();

        let summary = import_possessions(&mut conn, &records, false).unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, vec!["Voiture".to_string()]);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.total(), 4);

        let voiture = db::find_possession_by_label(&conn, "Voiture").unwrap().unwrap();
        assert_eq!(voiture.value, dec!(12000));

        // Second run only skips
        let again = import_possessions(&mut conn, &records, false).unwrap();
        assert_eq!(again.imported, 0);
        assert_eq!(again.skipped.len(), 3);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let (_dir, mut conn) = test_db();
        let records = parse_possessions_json(COLLECTION).unwrap();

        let summary = import_possessions(&mut conn, &records, true).unwrap();
        assert_eq!(summary.imported, 2);
        assert!(db::list_possessions(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_export_then_parse() {
        let (_dir, mut conn) = test_db();
        let records = parse_possessions_json(COLLECTION).unwrap();
        import_possessions(&mut conn, &records, false).unwrap();

        let exported = export_possessions_json(&db::list_possessions(&conn).unwrap()).unwrap();
        let parsed = parse_possessions_json(&exported).unwrap();
        let labels: Vec<&str> = parsed.records.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Voiture", "Ordinateur"]);
    }

    #[test]
    fn test_rejects_non_array() {
        assert!(parse_possessions_json(r#"{"libelle":"x"}"#).is_err());
    }

    #[test]
    fn test_unreadable_records_are_reported_not_fatal() {
        let (_dir, mut conn) = test_db();
        let batch = parse_possessions_json(
            r#"[
                {"libelle":"Voiture","valeur":12000,"dateDebut":"2020-05-01"},
                {"libelle":"Typo","valeur":"12 000 €","dateDebut":"2021-01-01"},
                {"libelle":"NoStart","valeur":10}
            ]"#,
        )
        .unwrap();

        let summary = import_possessions(&mut conn, &batch, false).unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.errors.len(), 2);
        assert!(summary.errors[0].starts_with("Typo"));
        assert!(summary.errors[1].starts_with("NoStart"));
        assert_eq!(summary.total(), 3);
        assert_eq!(db::list_possessions(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_storage_failure_rolls_back_the_whole_import() {
        let (_dir, mut conn) = test_db();
        conn.execute_batch(
            "CREATE TRIGGER refuse_boom BEFORE INSERT ON possessions
             WHEN NEW.label = 'Boom'
             BEGIN SELECT RAISE(ABORT, 'refused'); END;",
        )
        .unwrap();
        let batch = parse_possessions_json(
            r#"[
                {"libelle":"Voiture","valeur":12000,"dateDebut":"2020-05-01"},
                {"libelle":"Boom","valeur":10,"dateDebut":"2021-01-01"}
            ]"#,
        )
        .unwrap();

        assert!(import_possessions(&mut conn, &batch, false).is_err());
        assert!(db::list_possessions(&conn).unwrap().is_empty());
    }
}
