use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;

use super::{open_register, parse_date_arg, print_json};
use crate::cli::{formatters, PossessionCommands};
use patrimoine::config::Config;
use patrimoine::db::{self, NewPossession, Possession, PossessionChanges, PossessionDraft};
use patrimoine::error::PatrimoineError;
use patrimoine::utils;
use patrimoine::valuation::{self, ValuationEngine};

#[derive(Serialize)]
struct JsonPossession<'a> {
    id: Option<i64>,
    label: &'a str,
    value: Decimal,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    depreciation_rate: Decimal,
    current_value: Decimal,
}

impl<'a> JsonPossession<'a> {
    fn new(p: &'a Possession, current_value: Decimal) -> Self {
        Self {
            id: p.id,
            label: &p.label,
            value: p.value,
            start_date: p.start_date,
            end_date: p.end_date,
            depreciation_rate: p.depreciation_rate,
            current_value,
        }
    }
}

pub async fn dispatch_possessions(
    action: PossessionCommands,
    config: &Config,
    json_output: bool,
) -> Result<()> {
    let conn = open_register(config)?;
    let engine = ValuationEngine::as_of_today().with_basis(config.year_basis);

    match action {
        PossessionCommands::List { active_at } => {
            let mut possessions = db::list_possessions(&conn)?;
            if let Some(raw) = active_at.as_deref() {
                let date = parse_date_arg(raw)?;
                possessions.retain(|p| valuation::is_held_on(p, date));
            }
            let current: Vec<Decimal> = possessions
                .iter()
                .map(|p| current_value(&engine, p))
                .collect();

            if json_output {
                let items: Vec<JsonPossession> = possessions
                    .iter()
                    .zip(&current)
                    .map(|(p, v)| JsonPossession::new(p, *v))
                    .collect();
                return print_json(&items);
            }

            if possessions.is_empty() {
                println!("{}", formatters::format_empty_register());
            } else {
                println!("{}", formatters::format_possessions_table(&possessions, &current));
            }
            Ok(())
        }

        PossessionCommands::Show { id } => {
            let possession =
                db::get_possession(&conn, id)?.ok_or(PatrimoineError::NotFound(id))?;
            let current = current_value(&engine, &possession);
            if json_output {
                return print_json(&JsonPossession::new(&possession, current));
            }
            println!(
                "{}",
                formatters::format_possession_detail(&possession, engine.today(), current)
            );
            Ok(())
        }

        PossessionCommands::Add {
            label,
            value,
            start,
            end,
            rate,
        } => {
            let new = NewPossession {
                label: label.trim().to_string(),
                value: parse_amount(&value, "value")?,
                start_date: parse_date_arg(&start)?,
                end_date: end.as_deref().map(parse_date_arg).transpose()?,
                depreciation_rate: parse_amount(&rate, "rate")?,
            };
            let saved = db::save_draft(&conn, &PossessionDraft::Create(new))?;
            report_saved(&engine, &saved, "Added", json_output)
        }

        PossessionCommands::Edit {
            id,
            label,
            value,
            start,
            end,
            reopen,
            rate,
        } => {
            let end_date = if reopen {
                Some(None)
            } else {
                end.as_deref()
                    .map(parse_date_arg)
                    .transpose()?
                    .map(Some)
            };
            let changes = PossessionChanges {
                label,
                value: value.as_deref().map(|v| parse_amount(v, "value")).transpose()?,
                start_date: start.as_deref().map(parse_date_arg).transpose()?,
                end_date,
                depreciation_rate: rate.as_deref().map(|r| parse_amount(r, "rate")).transpose()?,
            };
            let saved = db::save_draft(&conn, &PossessionDraft::Edit { id, changes })?;
            report_saved(&engine, &saved, "Updated", json_output)
        }

        PossessionCommands::Close { id, date } => {
            let end_date = match date.as_deref() {
                Some(raw) => parse_date_arg(raw)?,
                None => Local::now().date_naive(),
            };
            let closed = db::close_possession(&conn, id, end_date)?;
            report_saved(&engine, &closed, "Closed", json_output)
        }

        PossessionCommands::Delete { id } => {
            let removed = db::delete_possession(&conn, id)?;
            if json_output {
                return print_json(&serde_json::json!({ "deleted": id, "label": removed.label }));
            }
            println!(
                "{} Deleted possession #{} '{}'",
                "✓".green().bold(),
                id,
                removed.label
            );
            Ok(())
        }
    }
}

fn current_value(engine: &ValuationEngine, possession: &Possession) -> Decimal {
    engine.value_at(std::slice::from_ref(possession), engine.today())
}

fn parse_amount(raw: &str, field: &str) -> Result<Decimal> {
    utils::parse_amount(raw).context(format!("Could not read {}", field))
}

fn report_saved(
    engine: &ValuationEngine,
    possession: &Possession,
    verb: &str,
    json_output: bool,
) -> Result<()> {
    let current = current_value(engine, possession);
    if json_output {
        return print_json(&JsonPossession::new(possession, current));
    }
    println!(
        "{} {} possession #{} '{}'",
        "✓".green().bold(),
        verb,
        possession.id.unwrap_or_default(),
        possession.label
    );
    println!(
        "{}",
        formatters::format_possession_detail(possession, engine.today(), current)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_accepts_decimal_comma() {
        assert_eq!(parse_amount("12,5", "rate").unwrap(), dec!(12.5));
        assert_eq!(parse_amount("1000", "value").unwrap(), dec!(1000));
    }

    #[test]
    fn test_amount_rejects_thousands_comma() {
        let err = parse_amount("1,000", "value").unwrap_err();
        assert!(err.to_string().contains("Could not read value"));
        assert!(matches!(
            err.downcast_ref::<PatrimoineError>(),
            Some(PatrimoineError::Validation(_))
        ));
    }
}
