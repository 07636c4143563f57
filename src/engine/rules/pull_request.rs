use super::{GuardRule, RuleContext, Verdict};
use crate::engine::events::{CanonicalEvent, HookPhase, ToolKind};
use crate::Result;
use regex::Regex;
use std::time::Duration;
use tracing::debug;

/// Bound on the optional `gh pr view` status query
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Surfaces the URL and follow-up commands after `gh pr create`
pub struct PullRequestLinkSurfacer {
    create: Regex,
    url: Regex,
}

impl PullRequestLinkSurfacer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            create: Regex::new(r"\bgh\s+pr\s+create\b")?,
            url: Regex::new(r"https://github\.com/([^\s/]+/[^\s/]+)/pull/(\d+)")?,
        })
    }

    fn status(&self, repo: &str, number: &str, ctx: &RuleContext) -> String {
        let args = [
            "pr",
            "view",
            number,
            "--repo",
            repo,
            "--json",
            "number,title,state,url",
        ];
        match ctx
            .probe
            .run("gh", &args, Some(&ctx.config.project_dir), STATUS_TIMEOUT)
        {
            Some(output) if output.success => format!("Status: {}", output.stdout.trim()),
            Some(output) => {
                debug!("gh pr view failed: {}", output.stderr.trim());
                "Status: unavailable (gh pr view failed)".to_string()
            }
            None => "Status: unavailable (gh not found or timed out)".to_string(),
        }
    }
}

impl GuardRule for PullRequestLinkSurfacer {
    fn name(&self) -> &'static str {
        "pull-request-link-surfacer"
    }

    fn applies_to(&self, event: &CanonicalEvent, ctx: &RuleContext) -> bool {
        event.phase == HookPhase::PostAction
            && event.tool_kind == ToolKind::ShellCommand
            && !ctx.config.disabled.gh_pr_status
            && event.output_text.is_some()
            && event
                .command_text
                .as_deref()
                .is_some_and(|c| self.create.is_match(c))
    }

    fn evaluate(&self, event: &CanonicalEvent, ctx: &RuleContext) -> Result<Verdict> {
        let Some(captures) = event
            .output_text
            .as_deref()
            .and_then(|output| self.url.captures(output))
        else {
            return Ok(Verdict::allow());
        };

        let url = &captures[0];
        let repo = &captures[1];
        let number = &captures[2];

        let mut message = format!(
            "[gh] PR created: {url}\n\
             To review: gh pr review {number} --repo {repo}\n\
             Open in browser: gh pr view {number} --web --repo {repo}"
        );
        if ctx.config.gh_pr_status {
            message.push('\n');
            message.push_str(&self.status(repo, number, ctx));
        }

        Ok(Verdict::warn(message))
    }
}
