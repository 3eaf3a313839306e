use clap::{Parser, Subcommand};

pub mod formatters;

#[derive(Parser)]
#[command(name = "patrimoine")]
#[command(version, about = "Possession register with depreciation-based valuation")]
#[command(
    long_about = "Keep a register of your possessions (value, holding period, annual depreciation rate) and follow the value of your patrimoine at a date or over a period."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the possession register
    Possessions {
        #[command(subcommand)]
        action: PossessionCommands,
    },

    /// Value the patrimoine at a date or over a period
    Value {
        #[command(subcommand)]
        action: ValueCommands,
    },

    /// Import possessions from a JSON file (backend format)
    Import {
        /// Path to the JSON file
        file: String,

        /// Preview only, don't save to database
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Export the register as JSON (backend format)
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Pull possessions from the REST backend into the register
    Sync {
        /// Backend base URL (defaults to the configured api_url)
        #[arg(long)]
        url: Option<String>,

        /// Preview only, don't save to database
        #[arg(short, long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum PossessionCommands {
    /// List possessions
    List {
        /// Only possessions held on this date (YYYY-MM-DD, YYYY-MM, or YYYY)
        #[arg(long)]
        active_at: Option<String>,
    },

    /// Show a single possession with its current value
    Show {
        /// Possession ID
        id: i64,
    },

    /// Add a new possession
    Add {
        /// Label (unique)
        label: String,

        /// Nominal value at the start date ('.' or ',' as decimal separator, no thousands separator)
        value: String,

        /// Start date (YYYY-MM-DD)
        start: String,

        /// End date, for a possession that is no longer held
        #[arg(long)]
        end: Option<String>,

        /// Annual depreciation rate in percent
        #[arg(short, long, default_value = "0")]
        rate: String,
    },

    /// Edit an existing possession
    Edit {
        /// Possession ID
        id: i64,

        /// New label
        #[arg(long)]
        label: Option<String>,

        /// New nominal value
        #[arg(long)]
        value: Option<String>,

        /// New start date
        #[arg(long)]
        start: Option<String>,

        /// New end date
        #[arg(long, conflicts_with = "reopen")]
        end: Option<String>,

        /// Clear the end date (the possession is held again)
        #[arg(long)]
        reopen: bool,

        /// New annual depreciation rate in percent
        #[arg(short, long)]
        rate: Option<String>,
    },

    /// Close a possession (set its end date)
    Close {
        /// Possession ID
        id: i64,

        /// Closing date (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a possession
    Delete {
        /// Possession ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ValueCommands {
    /// Total value on a specific date
    At {
        /// Date (YYYY-MM-DD, YYYY-MM, or YYYY)
        date: String,

        /// Also list the value of each possession
        #[arg(long)]
        detail: bool,

        /// Year basis: fixed365 or actual (defaults to the configured basis)
        #[arg(long)]
        basis: Option<String>,
    },

    /// Value evolution over a period
    Range {
        /// Start date (YYYY-MM-DD, YYYY-MM, or YYYY)
        #[arg(short, long)]
        from: String,

        /// End date (YYYY-MM-DD, YYYY-MM, or YYYY)
        #[arg(short, long)]
        to: String,

        /// Number of sub-intervals (defaults to the configured value, 8)
        #[arg(short, long)]
        intervals: Option<u32>,

        /// Export the series to a CSV file
        #[arg(long)]
        export: Option<String>,

        /// Year basis: fixed365 or actual (defaults to the configured basis)
        #[arg(long)]
        basis: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["patrimoine", "value", "at", "2024-01-01", "--json"])
            .expect("parse failed");
        assert!(cli.json);
        match cli.command {
            Commands::Value {
                action: ValueCommands::At { date, detail, .. },
            } => {
                assert_eq!(date, "2024-01-01");
                assert!(!detail);
            }
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn value_at_requires_a_date() {
        assert!(Cli::try_parse_from(["patrimoine", "value", "at"]).is_err());
    }

    #[test]
    fn edit_end_conflicts_with_reopen() {
        let parsed = Cli::try_parse_from([
            "patrimoine",
            "possessions",
            "edit",
            "1",
            "--end",
            "2024-01-01",
            "--reopen",
        ]);
        assert!(parsed.is_err());
    }
}
