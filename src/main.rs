use std::path::PathBuf;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use labscan::cli;
use labscan::config::{self, LabscanConfig};
use labscan::errors::LabscanError;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Initialize logging
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    // stdout carries the JSON reports
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    if cli.no_color {
        console::set_colors_enabled_stderr(false);
    }

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: cli::Cli) -> Result<(), LabscanError> {
    let file_config = match &cli.config {
        Some(path) => config::parse_config(&PathBuf::from(path)).await?,
        None => LabscanConfig::default(),
    };

    match cli.command {
        cli::Commands::Analyze(args) => {
            cli::analyze::handle_analyze(args, &file_config, cli.verbose > 0, cli.quiet).await
        }
        cli::Commands::Info(args) => cli::info::handle_info(args, &file_config).await,
        cli::Commands::Cache(args) => cli::cache::handle_cache(args, &file_config).await,
    }
}
