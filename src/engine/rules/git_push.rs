use super::{segment_start_pattern, GuardRule, RuleContext, Verdict};
use crate::engine::events::{CanonicalEvent, HookPhase, ToolKind};
use crate::Result;
use regex::Regex;

/// Pre-push reminder, escalating on force pushes
pub struct ForcePushGuard {
    push: Regex,
    force: Regex,
    command_separator: Regex,
}

impl ForcePushGuard {
    pub fn new() -> Result<Self> {
        Ok(Self {
            push: Regex::new(&segment_start_pattern(&[r"git\s+push\b"]))?,
            force: Regex::new(r"(?i)\s(?:--force|-f|--force-with-lease(?:=\S*)?|\+\S+)(?:\s|$)")?,
            command_separator: Regex::new(r"\s*(?:;|&&|\|\||\|)\s*")?,
        })
    }
}

impl GuardRule for ForcePushGuard {
    fn name(&self) -> &'static str {
        "force-push-guard"
    }

    fn applies_to(&self, event: &CanonicalEvent, ctx: &RuleContext) -> bool {
        event.phase == HookPhase::PreAction
            && event.tool_kind == ToolKind::ShellCommand
            && !ctx.config.disabled.git_push_reminder
    }

    fn evaluate(&self, event: &CanonicalEvent, ctx: &RuleContext) -> Result<Verdict> {
        let Some(command) = event.normalized_command() else {
            return Ok(Verdict::allow());
        };
        let pushes: Vec<&str> = self
            .command_separator
            .split(&command)
            .filter(|segment| self.push.is_match(segment))
            .collect();
        if pushes.is_empty() {
            return Ok(Verdict::allow());
        }

        // Only flags on the push segment itself count
        if !pushes.iter().any(|segment| self.force.is_match(segment)) {
            return Ok(Verdict::warn(format!(
                "[git push] Reminder: run tests/lint, confirm the target branch, and review \
                 staged changes before pushing.\nCommand: {command}"
            )));
        }

        let message = format!(
            "[git push] FORCE push detected. Double-check remote/branch and prefer \
             --force-with-lease.\nCommand: {command}"
        );
        if ctx.config.block_force_push {
            Ok(Verdict::block(format!(
                "{message}\nBlocking because ECC_BLOCK_FORCE_PUSH=1."
            )))
        } else {
            Ok(Verdict::warn(message))
        }
    }
}
