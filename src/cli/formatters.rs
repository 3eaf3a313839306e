//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of valuation from presentation.

use chrono::NaiveDate;
use colored::Colorize;
use patrimoine::db::Possession;
use patrimoine::importers::ImportSummary;
use patrimoine::utils::{format_currency, format_rate};
use patrimoine::valuation::{PossessionValuation, ValuationPoint};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

const OPEN_END: &str = "En cours";
const BAR_WIDTH: usize = 30;

fn format_end(end: Option<NaiveDate>) -> String {
    end.map(|d| d.to_string())
        .unwrap_or_else(|| OPEN_END.to_string())
}

/// Register table; `current_values` is aligned with `possessions`
pub fn format_possessions_table(
    possessions: &[Possession],
    current_values: &[Decimal],
) -> String {
    #[derive(Tabled)]
    struct PossessionRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Label")]
        label: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Start")]
        start: String,
        #[tabled(rename = "End")]
        end: String,
        #[tabled(rename = "Rate")]
        rate: String,
        #[tabled(rename = "Current value")]
        current: String,
    }

    let rows: Vec<PossessionRow> = possessions
        .iter()
        .zip(current_values)
        .map(|(p, current)| PossessionRow {
            id: p.id.map(|id| id.to_string()).unwrap_or_default(),
            label: p.label.clone(),
            value: format_currency(p.value),
            start: p.start_date.to_string(),
            end: if p.is_closed() {
                format_end(p.end_date).bright_black().to_string()
            } else {
                format_end(p.end_date).green().to_string()
            },
            rate: format_rate(p.depreciation_rate),
            current: format_currency(*current),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(2..3), Alignment::right());
    table.modify(Columns::new(5..), Alignment::right());

    format!("\n{} Possessions\n\n{}\n", "📋".cyan().bold(), table)
}

/// Detail view of one possession
pub fn format_possession_detail(p: &Possession, today: NaiveDate, current: Decimal) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "\n{} #{} {}\n\n",
        "📦".cyan().bold(),
        p.id.unwrap_or_default(),
        p.label.bold()
    ));
    output.push_str(&format!(
        "{:<20} {}\n",
        "Nominal value:".bold(),
        format_currency(p.value)
    ));
    output.push_str(&format!("{:<20} {}\n", "Start date:".bold(), p.start_date));
    output.push_str(&format!(
        "{:<20} {}\n",
        "End date:".bold(),
        format_end(p.end_date)
    ));
    output.push_str(&format!(
        "{:<20} {}\n",
        "Depreciation:".bold(),
        format_rate(p.depreciation_rate)
    ));
    output.push_str(&format!(
        "{:<20} {}\n",
        format!("Value on {}:", today).bold(),
        format_currency(current).green()
    ));
    output
}

/// Total at a date, with an optional per-possession breakdown
pub fn format_value_at(
    date: NaiveDate,
    total: Decimal,
    breakdown: Option<&[PossessionValuation]>,
) -> String {
    let mut output = String::new();

    if let Some(items) = breakdown.filter(|items| !items.is_empty()) {
        #[derive(Tabled)]
        struct BreakdownRow {
            #[tabled(rename = "ID")]
            id: String,
            #[tabled(rename = "Label")]
            label: String,
            #[tabled(rename = "Nominal")]
            nominal: String,
            #[tabled(rename = "Value")]
            value: String,
        }

        let rows: Vec<BreakdownRow> = items
            .iter()
            .map(|v| BreakdownRow {
                id: v.id.map(|id| id.to_string()).unwrap_or_default(),
                label: v.label.clone(),
                nominal: format_currency(v.nominal),
                value: format_currency(v.value),
            })
            .collect();

        let mut table = Table::new(&rows);
        table.with(Style::modern());
        table.modify(Columns::new(2..), Alignment::right());
        output.push_str(&format!("\n{}\n", table));
    }

    output.push_str(&format!(
        "\n{} Patrimoine on {}: {}\n",
        "💰".cyan().bold(),
        date,
        format_currency(total).green().bold()
    ));
    output
}

/// Series table with a proportional bar per point
pub fn format_series_table(points: &[ValuationPoint]) -> String {
    #[derive(Tabled)]
    struct PointRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "")]
        bar: String,
    }

    let max = points
        .iter()
        .map(|p| p.value)
        .max()
        .unwrap_or(Decimal::ZERO);

    let rows: Vec<PointRow> = points
        .iter()
        .map(|p| PointRow {
            date: p.date.to_string(),
            value: format_currency(p.value),
            bar: bar(p.value, max).cyan().to_string(),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..2), Alignment::right());

    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return format!("{}\n", table),
    };

    let change = last.value - first.value;
    let change_str = if change >= Decimal::ZERO {
        format_currency(change).green()
    } else {
        format_currency(change).red()
    };

    format!(
        "\n{} Patrimoine from {} to {}\n\n{}\n\n{:<20} {}\n",
        "📈".cyan().bold(),
        first.date,
        last.date,
        table,
        "Change:".bold(),
        change_str
    )
}

fn bar(value: Decimal, max: Decimal) -> String {
    if max <= Decimal::ZERO || value <= Decimal::ZERO {
        return String::new();
    }
    let ratio = value / max;
    let filled = (ratio * Decimal::from(BAR_WIDTH))
        .round()
        .to_usize()
        .unwrap_or(0);
    "█".repeat(filled.min(BAR_WIDTH))
}

/// Result of an import or sync
pub fn format_import_summary(summary: &ImportSummary, dry_run: bool) -> String {
    let mut output = format!(
        "\n{} Found {} possessions\n",
        "✓".green().bold(),
        summary.total()
    );
    output.push_str(&format!(
        "  Imported: {}\n",
        summary.imported.to_string().green()
    ));
    if !summary.skipped.is_empty() {
        output.push_str(&format!(
            "  Skipped (already registered): {} ({})\n",
            summary.skipped.len().to_string().yellow(),
            summary.skipped.join(", ")
        ));
    }
    if !summary.errors.is_empty() {
        output.push_str(&format!(
            "  Errors: {}\n",
            summary.errors.len().to_string().red()
        ));
        for error in &summary.errors {
            output.push_str(&format!("    - {}\n", error));
        }
    }
    if dry_run {
        output.push_str(&format!("\n{} Dry run - no changes saved\n", "ℹ".blue().bold()));
    }
    output
}

/// Format empty register message
pub fn format_empty_register() -> String {
    format!(
        "{} No possessions found\nAdd one using: {} possessions add <label> <value> <start>\n",
        "ℹ".blue().bold(),
        "patrimoine".bold()
    )
}
