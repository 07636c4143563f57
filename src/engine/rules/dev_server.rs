use super::{segment_start_pattern, GuardRule, RuleContext, Verdict};
use crate::engine::events::{CanonicalEvent, HookPhase, ToolKind};
use crate::Result;
use regex::Regex;

/// Commands that start a server and never return
const DEV_SERVER_COMMANDS: &[&str] = &[
    r"npm\s+run\s+dev\b",
    r"pnpm\s+(?:run\s+)?dev\b",
    r"yarn\s+(?:run\s+)?dev\b",
    r"bun\s+(?:run\s+)?dev\b",
    r"(?:npx\s+)?next\s+dev\b",
    r"(?:(?:uv|poetry|pdm|pipenv)\s+run\s+)?(?:uvicorn|gunicorn)\b",
    r"(?:(?:uv|poetry|pdm|pipenv)\s+run\s+)?flask\s+run\b",
    r"(?:(?:uv|poetry|pdm|pipenv)\s+run\s+)?python3?\s+manage\.py\s+runserver\b",
    r"python3?\s+-m\s+http\.server\b",
    r"(?:(?:uv|poetry|pdm|pipenv)\s+run\s+)?streamlit\s+run\b",
    r"(?:npx\s+)?vite(?:\s+(?:dev|serve)\b|\s+-|$)",
];

/// Leading commands that already detach or persist the process
const WRAPPERS: &[&str] = &["tmux", "screen", "nohup", "setsid"];

/// Blocks dev servers started in the foreground of the agent's shell
pub struct BackgroundDevServerGuard {
    dev_server: Regex,
}

impl BackgroundDevServerGuard {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dev_server: Regex::new(&segment_start_pattern(DEV_SERVER_COMMANDS))?,
        })
    }
}

fn is_wrapped(command: &str) -> bool {
    command
        .split_whitespace()
        .next()
        .is_some_and(|first| WRAPPERS.iter().any(|w| first.eq_ignore_ascii_case(w)))
}

impl GuardRule for BackgroundDevServerGuard {
    fn name(&self) -> &'static str {
        "background-dev-server-guard"
    }

    fn applies_to(&self, event: &CanonicalEvent, ctx: &RuleContext) -> bool {
        event.phase == HookPhase::PreAction
            && event.tool_kind == ToolKind::ShellCommand
            && !ctx.config.disabled.dev_server_guard
    }

    fn evaluate(&self, event: &CanonicalEvent, ctx: &RuleContext) -> Result<Verdict> {
        let Some(command) = event.normalized_command() else {
            return Ok(Verdict::allow());
        };
        if !self.dev_server.is_match(&command) || is_wrapped(&command) {
            return Ok(Verdict::allow());
        }

        let strict = ctx.config.require_multiplexer_for_dev_server;
        if ctx.config.in_multiplexer && !strict {
            return Ok(Verdict::allow());
        }

        let escaped = command.replace('"', "\\\"");
        let mut message = format!(
            "[dev-server] BLOCKED: dev servers must run in tmux so their logs stay accessible.\n\
             Command: {command}\n\
             Example: tmux new-session -d -s dev \"{escaped}\"\n\
             Then: tmux attach -t dev\n\
             (screen, nohup or setsid wrappers are accepted too.)"
        );
        if ctx.config.in_multiplexer {
            message.push_str(
                "\nECC_REQUIRE_TMUX_FOR_DEV_SERVER=1 requires an explicit wrapper even inside tmux.",
            );
        }

        Ok(Verdict::block(message))
    }
}
