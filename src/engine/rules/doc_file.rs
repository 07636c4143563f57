use super::{GuardRule, RuleContext, Verdict};
use crate::config::DocGuardMode;
use crate::engine::events::{CanonicalEvent, HookPhase, ToolKind};
use crate::io::PathUtils;
use crate::Result;
use tracing::debug;

/// Doc file names accepted anywhere in the repository
const ALLOWED_NAMES: &[&str] = &[
    "readme.md",
    "claude.md",
    "agents.md",
    "contributing.md",
    "changelog.md",
];

/// Stops the agent from creating new `.md`/`.txt` files nobody asked for
pub struct UnsolicitedDocFileGuard;

impl UnsolicitedDocFileGuard {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UnsolicitedDocFileGuard {
    fn default() -> Self {
        Self::new()
    }
}

fn is_doc_file(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".md") || lower.ends_with(".txt")
}

fn is_allowed_name(relative: &str) -> bool {
    let base = relative.rsplit('/').next().unwrap_or(relative);
    ALLOWED_NAMES.iter().any(|name| base.eq_ignore_ascii_case(name))
}

fn in_allowed_dir(relative: &str, allowed_dirs: &[String]) -> bool {
    let lower = relative.to_ascii_lowercase();
    allowed_dirs
        .iter()
        .any(|dir| lower.starts_with(&dir.to_ascii_lowercase()))
}

impl GuardRule for UnsolicitedDocFileGuard {
    fn name(&self) -> &'static str {
        "unsolicited-doc-file-guard"
    }

    fn applies_to(&self, event: &CanonicalEvent, ctx: &RuleContext) -> bool {
        let settings = &ctx.config.doc_guard;
        event.phase == HookPhase::PreAction
            && event.tool_kind == ToolKind::FileWrite
            && !settings.allow_doc_writes
            && settings.mode != DocGuardMode::Off
            && event.file_path.as_deref().is_some_and(is_doc_file)
    }

    fn evaluate(&self, event: &CanonicalEvent, ctx: &RuleContext) -> Result<Verdict> {
        let Some(file_path) = event.file_path.as_deref() else {
            return Ok(Verdict::allow());
        };

        let project_dir = &ctx.config.project_dir;
        let absolute =
            PathUtils::absolutize(project_dir, &PathUtils::normalize_separators(file_path));
        let resolved = PathUtils::normalize_lexically(&absolute).unwrap_or(absolute);

        let allowed = match PathUtils::relative_to_project(project_dir, file_path) {
            Some(relative) => {
                is_allowed_name(&relative)
                    || in_allowed_dir(&relative, &ctx.config.doc_guard.effective_allowed_dirs())
            }
            None => {
                debug!("Doc write outside the project: {}", resolved.display());
                resolved
                    .file_name()
                    .is_some_and(|name| is_allowed_name(&name.to_string_lossy()))
            }
        };
        if allowed {
            return Ok(Verdict::allow());
        }

        // Overwriting an existing file is an update, not a new doc
        if resolved.exists() {
            return Ok(Verdict::allow());
        }

        let message = format!(
            "[doc-guard] Unnecessary documentation file creation: {file_path}\n\
             Use README.md (or an existing docs file) for documentation instead.\n\
             Set ECC_DOC_GUARD=warn or ECC_ALLOW_DOC_WRITES=1 if this file was requested."
        );

        Ok(match ctx.config.doc_guard.mode {
            DocGuardMode::Warn => Verdict::warn(message),
            _ => Verdict::block(message),
        })
    }
}
