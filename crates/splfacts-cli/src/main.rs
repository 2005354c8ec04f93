//! splfacts - extract indications and adverse events from drug labels.

use anyhow::Context;
use clap::Parser;
use splfacts_cli::commands;
use splfacts_cli::repl;
use splfacts_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_cli(&cli);

    let formatter = Formatter::new(config.settings.format, config.settings.color);

    match cli.command {
        Command::Dictionary(args) => {
            commands::execute_dictionary(args, &config, &formatter).context("Dictionary command failed")?;
        }
        Command::Match(args) => {
            commands::execute_match(args, &config, &formatter).context("Match command failed")?;
        }
        Command::Run(args) => {
            commands::execute_run(args, &config, &formatter)
                .await
                .context("Extraction run failed")?;
        }
        Command::Config => {
            commands::execute_show_config(&config)?;
        }
        Command::Repl => {
            repl::run_repl(&config, &formatter)?;
        }
    }

    Ok(())
}
