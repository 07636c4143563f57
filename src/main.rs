//! ecc-guard - hook entry point
//!
//! Hosts invoke `ecc-guard run` once per hook with the event JSON on stdin.
//! The exit status carries the decision: 2 blocks the tool call, 0 lets it
//! through. Logs always go to stderr.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ecc_guard::cli::commands::{
    run::RunCommand, state::StateCommand, tooling::ToolingCommand, CommandHandler,
};
use ecc_guard::cli::{Cli, Commands, LogLevel};

/// Environment variable consulted when `--log-level` is not given
const LOG_ENV_VAR: &str = "ECC_GUARD_LOG";

fn initialize_tracing(log_level: Option<LogLevel>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level.to_filter_directive()),
        None => EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    // stdout is reserved for JSON hook responses
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(cli.log_level);

    let handler: Box<dyn CommandHandler> = match cli.command {
        Commands::Run { phase, format } => Box::new(RunCommand::new(phase.map(Into::into), format)),
        Commands::Stop { format } => Box::new(RunCommand::stop(format)),
        Commands::Tooling { write } => Box::new(ToolingCommand::new(write)),
        Commands::State { action } => Box::new(StateCommand::new(action)),
    };

    tracing::debug!("Running command: {}", handler.name());
    let code = handler.execute()?;
    std::process::exit(code);
}
