use super::{segment_start_pattern, GuardRule, RuleContext, Verdict};
use crate::engine::events::{CanonicalEvent, HookPhase, ToolKind};
use crate::state::{StateChange, StateKey, ThrottleRecord};
use crate::Result;
use regex::Regex;

/// Project-scoped throttle for the reminder
pub const TMUX_REMINDER_CONCERN: &str = "tmux-reminder";

/// Install, build and test commands that tend to run for a while
const LONG_RUNNING_COMMANDS: &[&str] = &[
    r"(?:npm|pnpm|yarn|bun)\s+(?:install|i|ci|add|test)\b",
    r"(?:npm|pnpm|yarn|bun)\s+run\s+(?:build|test|lint|e2e)\b",
    r"yarn$",
    r"(?:python3?\s+-m\s+)?pip3?\s+install\b",
    r"(?:poetry|pdm|pipenv)\s+(?:install|update|sync|lock)\b",
    r"uv\s+(?:sync|lock|pip\s+install)\b",
    r"(?:(?:uv|poetry|pdm|pipenv)\s+run\s+)?(?:python3?\s+-m\s+)?(?:pytest|mypy|tox|nox)\b",
    r"cargo\s+(?:build|test|install|check|clippy)\b",
    r"go\s+(?:build|test|install)\b",
    r"make\b",
    r"docker\s+(?:build|compose\s+(?:up|build))\b",
    r"docker-compose\s+(?:up|build)\b",
    r"(?:npx\s+)?(?:vitest|jest|playwright)\b",
    r"(?:\./)?gradlew?\b",
    r"mvn\b",
];

/// Non-blocking nudge to run long commands inside tmux, throttled per project
pub struct LongRunningCommandReminder {
    long_running: Regex,
}

impl LongRunningCommandReminder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            long_running: Regex::new(&segment_start_pattern(LONG_RUNNING_COMMANDS))?,
        })
    }
}

impl GuardRule for LongRunningCommandReminder {
    fn name(&self) -> &'static str {
        "long-running-command-reminder"
    }

    fn applies_to(&self, event: &CanonicalEvent, ctx: &RuleContext) -> bool {
        event.phase == HookPhase::PreAction
            && event.tool_kind == ToolKind::ShellCommand
            && !ctx.config.disabled.tmux_reminder
            && !ctx.config.in_multiplexer
    }

    fn evaluate(&self, event: &CanonicalEvent, ctx: &RuleContext) -> Result<Verdict> {
        let Some(command) = event.normalized_command() else {
            return Ok(Verdict::allow());
        };
        if !self.long_running.is_match(&command) {
            return Ok(Verdict::allow());
        }

        let key = StateKey::project(TMUX_REMINDER_CONCERN);
        let record: ThrottleRecord = ctx.store.load(&key);
        if record.is_cooling_down(ctx.now_ms, ctx.config.tmux_reminder_cooldown_ms) {
            return Ok(Verdict::allow());
        }

        let next = record.triggered(ctx.now_ms, command.as_str());
        Ok(Verdict::warn(format!(
            "[tmux] Consider running this in tmux for session persistence.\n\
             Example: tmux new -s dev  |  tmux attach -t dev\n\
             Command: {command}"
        ))
        .with_change(StateChange::put(key, &next)?))
    }
}
