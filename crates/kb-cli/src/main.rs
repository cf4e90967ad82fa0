mod cli;
mod config;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::KbConfig;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        // Config commands inspect the file itself and report parse errors
        Commands::Config(cmd) => {
            init_tracing(cli.log_level.as_deref().unwrap_or("warn"));
            return cli::config_cmd::run(cmd, &cli.config);
        }
        command => command,
    };

    let mut config = KbConfig::load_optional(&cli.config)?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level;
    }

    init_tracing(&config.log_level);
    debug!("kb v{} using {:?}", env!("CARGO_PKG_VERSION"), config.data_dir);

    let kg = cli::open_graph(&config)?;

    match command {
        Commands::Entry(cmd) => cli::entry::run(cmd, &kg),
        Commands::Link(cmd) => cli::link::run(cmd, &kg),
        Commands::Config(cmd) => cli::config_cmd::run(cmd, &cli.config),
    }
}

/// Logs go to stderr so `--format json` output stays parseable.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
