mod cli;
mod dispatcher;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

use patrimoine::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so --json output stays parseable
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.no_color || cli.json {
        colored::control::set_override(false);
    }

    let config = Config::load()?;
    tracing::debug!("Loaded configuration: {:?}", config);

    dispatcher::dispatch_command(cli.command, &config, cli.json).await
}
