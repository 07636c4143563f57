pub mod run;
pub mod state;
pub mod tooling;

use crate::Result;

/// Common trait for all command handlers
pub trait CommandHandler {
    /// Execute the command, returning the process exit status
    fn execute(&self) -> Result<i32>;

    /// Get command name for logging
    fn name(&self) -> &'static str;
}
