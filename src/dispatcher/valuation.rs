use anyhow::{Context, Result};
use chrono::NaiveDate;
use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;

use super::{build_engine, open_register, parse_date_arg, print_json};
use crate::cli::{formatters, ValueCommands};
use patrimoine::config::Config;
use patrimoine::db;
use patrimoine::error::PatrimoineError;
use patrimoine::utils::parse_flexible_date;
use patrimoine::valuation::{PossessionValuation, ValuationPoint};

#[derive(Serialize)]
struct JsonValueAt {
    date: NaiveDate,
    value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    possessions: Option<Vec<PossessionValuation>>,
}

#[derive(Serialize)]
struct JsonSeries {
    from: NaiveDate,
    to: NaiveDate,
    intervals: u32,
    basis: String,
    points: Vec<ValuationPoint>,
}

pub async fn dispatch_value(
    action: ValueCommands,
    config: &Config,
    json_output: bool,
) -> Result<()> {
    let conn = open_register(config)?;
    let possessions = db::list_possessions(&conn)?;

    match action {
        ValueCommands::At {
            date,
            detail,
            basis,
        } => {
            let engine = build_engine(config, basis.as_deref())?;
            let date = parse_date_arg(&date)?;
            let total = engine.value_at(&possessions, date);
            let breakdown = detail.then(|| engine.breakdown_at(&possessions, date));

            if json_output {
                return print_json(&JsonValueAt {
                    date,
                    value: total,
                    possessions: breakdown,
                });
            }

            println!(
                "{}",
                formatters::format_value_at(date, total, breakdown.as_deref())
            );
            Ok(())
        }

        ValueCommands::Range {
            from,
            to,
            intervals,
            export,
            basis,
        } => {
            let engine = build_engine(config, basis.as_deref())?;
            let from = parse_range_bound(&from)?;
            let to = parse_range_bound(&to)?;
            let intervals = intervals.unwrap_or(config.intervals);

            let points = engine.value_over_range(&possessions, from, to, intervals)?;

            if let Some(path) = export.as_deref() {
                write_series_csv(Path::new(path), &points)?;
                if !json_output {
                    println!(
                        "{} Exported {} points to {}",
                        "✓".green().bold(),
                        points.len(),
                        path
                    );
                }
            }

            if json_output {
                return print_json(&JsonSeries {
                    from,
                    to,
                    intervals,
                    basis: engine.basis().to_string(),
                    points,
                });
            }

            println!("{}", formatters::format_series_table(&points));
            Ok(())
        }
    }
}

fn parse_range_bound(raw: &str) -> Result<NaiveDate> {
    parse_flexible_date(raw).map_err(|e| PatrimoineError::InvalidRange(e.to_string()).into())
}

/// Write a `date,value` CSV, one row per sample point
fn write_series_csv(path: &Path, points: &[ValuationPoint]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .context(format!("Failed to create CSV file {:?}", path))?;
    writer.write_record(["date", "value"])?;
    for point in points {
        writer.write_record([point.date.to_string(), point.value.to_string()])?;
    }
    writer.flush()?;
    tracing::info!("Wrote {} points to {:?}", points.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_unparsable_range_bound_is_an_invalid_range() {
        let err = parse_range_bound("last tuesday").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PatrimoineError>(),
            Some(PatrimoineError::InvalidRange(_))
        ));
        assert_eq!(
            parse_range_bound("2024-02").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }

    #[test]
    fn test_series_csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.csv");
        let points = vec![
            ValuationPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                value: dec!(1000.00),
            },
            ValuationPoint {
                date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
                value: dec!(949.12),
            },
        ];

        write_series_csv(&path, &points).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["date,value", "2024-01-01,1000.00", "2024-07-01,949.12"]);
    }
}
