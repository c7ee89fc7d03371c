//! oadom entry point

use clap::Parser;
use openapi_dom_cli::{
    cli::{Cli, Commands},
    commands::{TransformCommand, ValidateCommand},
    config::CliConfig,
    error::CliResult,
    utils::{init_tracing, ColoredOutput},
};
use std::path::Path;
use tracing::info;

const DEFAULT_CONFIG: &str = "oadom.toml";

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {}", ColoredOutput::error("Error:"), e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose)?;

    if cli.no_color {
        colored::control::set_override(false);
    }

    info!("oadom v{}", env!("CARGO_PKG_VERSION"));

    let config = CliConfig::load(cli.config.as_deref().unwrap_or(Path::new(DEFAULT_CONFIG)))?;

    match &cli.command {
        Commands::Transform(args) => TransformCommand::run(args, &config).await,
        Commands::Validate(args) => ValidateCommand::run(args, &config).await,
    }
}
