use clap::{Parser, Subcommand, ValueEnum};

use crate::engine::HookPhase;

/// ecc-guard: allow, warn about or block AI agent tool calls from hooks
#[derive(Parser)]
#[command(name = "ecc-guard")]
#[command(version)]
#[command(about = "Guard rules for AI coding agent tool calls")]
#[command(
    long_about = "ecc-guard reads one hook event from stdin, runs the built-in guard rules against it and reports Allow, Warn or Block through its exit status."
)]
pub struct Cli {
    /// Log verbosity (logs always go to stderr); ECC_GUARD_LOG is used when unset
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_filter_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Hook phase forced from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PhaseArg {
    Pre,
    Post,
    Stop,
}

impl From<PhaseArg> for HookPhase {
    fn from(phase: PhaseArg) -> Self {
        match phase {
            PhaseArg::Pre => HookPhase::PreAction,
            PhaseArg::Post => HookPhase::PostAction,
            PhaseArg::Stop => HookPhase::Stop,
        }
    }
}

/// How `run` reports its decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Messages on stderr
    #[default]
    Text,
    /// Hook JSON response on stdout
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate one hook event read from stdin (called by hooks)
    Run {
        /// Hook phase; inferred from the event name when omitted
        #[arg(long, value_enum)]
        phase: Option<PhaseArg>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// End-of-turn checks on files edited this session (stdin optional)
    Stop {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the detected Python and Node tooling for the project
    Tooling {
        /// Also save the snapshot to the state directory
        #[arg(long)]
        write: bool,
    },

    /// Inspect or reset persisted guard state
    State {
        #[command(subcommand)]
        action: StateAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum StateAction {
    /// Remove all persisted state for the project
    Clear,
    /// List sessions that have persisted state
    Sessions,
    /// Remove session state not touched for the given number of days
    Prune {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_run_command_defaults() {
        let cli = Cli::parse_from(["ecc-guard", "run"]);

        match cli.command {
            Commands::Run { phase, format } => {
                assert_eq!(phase, None);
                assert_eq!(format, OutputFormat::Text);
            }
            _ => panic!("Wrong command parsed"),
        }
        assert_eq!(cli.log_level, None);
    }

    #[test]
    fn test_run_command_with_phase_and_format() {
        let cli = Cli::parse_from([
            "ecc-guard",
            "--log-level",
            "debug",
            "run",
            "--phase",
            "post",
            "--format",
            "json",
        ]);

        match cli.command {
            Commands::Run { phase, format } => {
                assert_eq!(phase.map(HookPhase::from), Some(HookPhase::PostAction));
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("Wrong command parsed"),
        }
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
    }

    #[test]
    fn test_state_subcommands() {
        let cli = Cli::parse_from(["ecc-guard", "state", "prune", "--days", "3"]);
        match cli.command {
            Commands::State { action } => assert_eq!(action, StateAction::Prune { days: 3 }),
            _ => panic!("Wrong command parsed"),
        }

        let cli = Cli::parse_from(["ecc-guard", "state", "clear"]);
        assert!(matches!(
            cli.command,
            Commands::State {
                action: StateAction::Clear
            }
        ));
    }

    #[test]
    fn test_tooling_command() {
        let cli = Cli::parse_from(["ecc-guard", "tooling", "--write"]);
        match cli.command {
            Commands::Tooling { write } => assert!(write),
            _ => panic!("Wrong command parsed"),
        }
    }
}
