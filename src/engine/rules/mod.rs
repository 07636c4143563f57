//! Guard rules
//!
//! Each rule is a small, independently evaluable policy. Rules never touch
//! the process environment or write state themselves: configuration comes
//! in through [`RuleContext`], and any state update is returned as a
//! pending [`StateChange`] that the evaluator applies after every rule ran.

mod compact;
mod debug_statements;
mod destructive;
mod dev_server;
mod doc_file;
mod edited_files;
mod git_push;
mod long_running;
mod pull_request;
mod python_checks;

pub use compact::CompactSuggester;
pub use debug_statements::ConsoleDebugStatementWarning;
pub use destructive::DestructiveCommandGuard;
pub use dev_server::BackgroundDevServerGuard;
pub use doc_file::UnsolicitedDocFileGuard;
pub use edited_files::{changed_files_key, EditedFileTracker, CHANGED_FILES_CONCERN};
pub use git_push::ForcePushGuard;
pub use long_running::LongRunningCommandReminder;
pub use pull_request::PullRequestLinkSurfacer;
pub use python_checks::PythonChecksReminder;

use crate::config::Config;
use crate::engine::decision::Outcome;
use crate::engine::events::CanonicalEvent;
use crate::state::{StateChange, StateStore};
use crate::tooling::BinaryProbe;
use crate::Result;

/// Everything a rule may consult besides the event itself
pub struct RuleContext<'a> {
    pub config: &'a Config,
    /// Pre-evaluation state; rules only read from it
    pub store: &'a StateStore,
    pub probe: &'a dyn BinaryProbe,
    /// Evaluation time, fixed for the whole rule set
    pub now_ms: u64,
}

impl RuleContext<'_> {
    /// Session id from the event, else the configured fallback
    pub fn session_id<'e>(&'e self, event: &'e CanonicalEvent) -> Option<&'e str> {
        event
            .session_id
            .as_deref()
            .or(self.config.session_id.as_deref())
    }
}

/// A rule's outcome plus the state updates it wants persisted
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub outcome: Outcome,
    pub changes: Vec<StateChange>,
}

impl Verdict {
    pub fn allow() -> Self {
        Outcome::Allow.into()
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Outcome::warn(message).into()
    }

    pub fn block(message: impl Into<String>) -> Self {
        Outcome::block(message).into()
    }

    pub fn with_change(mut self, change: StateChange) -> Self {
        self.changes.push(change);
        self
    }
}

impl From<Outcome> for Verdict {
    fn from(outcome: Outcome) -> Self {
        Self {
            outcome,
            changes: Vec::new(),
        }
    }
}

/// A compiled policy evaluated against one canonical event
pub trait GuardRule: Send + Sync {
    /// Stable identifier used in logs and responses
    fn name(&self) -> &'static str;

    /// Cheap filter on phase, tool kind and configuration
    fn applies_to(&self, event: &CanonicalEvent, ctx: &RuleContext) -> bool;

    fn evaluate(&self, event: &CanonicalEvent, ctx: &RuleContext) -> Result<Verdict>;
}

/// The full rule set in evaluation order
pub fn default_rules() -> Result<Vec<Box<dyn GuardRule>>> {
    Ok(vec![
        Box::new(DestructiveCommandGuard::new()?),
        Box::new(ForcePushGuard::new()?),
        Box::new(BackgroundDevServerGuard::new()?),
        Box::new(UnsolicitedDocFileGuard::new()),
        Box::new(LongRunningCommandReminder::new()?),
        Box::new(CompactSuggester),
        Box::new(EditedFileTracker),
        Box::new(ConsoleDebugStatementWarning::new()?),
        Box::new(PullRequestLinkSurfacer::new()?),
        Box::new(PythonChecksReminder),
    ])
}

/// Build an anchored regex matching any of `commands` at the start of a
/// command segment (after `;`, `&&`, `|` or a subshell paren), allowing
/// leading `VAR=value` assignments.
pub(crate) fn segment_start_pattern(commands: &[&str]) -> String {
    format!(
        r"(?i)(?:^|[;&|(]\s*)(?:[A-Za-z_][A-Za-z0-9_]*=\S*\s+)*(?:{})",
        commands.join("|")
    )
}
