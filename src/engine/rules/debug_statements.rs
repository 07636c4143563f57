use super::edited_files::{changed_files_key, has_extension};
use super::{GuardRule, RuleContext, Verdict};
use crate::engine::events::{CanonicalEvent, HookPhase};
use crate::io::PathUtils;
use crate::state::AccumulatedFileSet;
use crate::Result;
use regex::Regex;
use std::fs;
use tracing::debug;

const SCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs"];
const PYTHON_EXTENSIONS: &[&str] = &["py", "pyi"];

/// Matching lines reported per file
const MAX_REPORTED_LINES: usize = 5;

/// Reported line text is cut to this many characters
const MAX_LINE_CHARS: usize = 120;

struct Marker {
    label: &'static str,
    pattern: Regex,
}

/// Warns about leftover debug prints and breakpoints in edited files
pub struct ConsoleDebugStatementWarning {
    script_markers: Vec<Marker>,
    python_markers: Vec<Marker>,
}

impl ConsoleDebugStatementWarning {
    pub fn new() -> Result<Self> {
        Ok(Self {
            script_markers: vec![
                Marker {
                    label: "console.log",
                    pattern: Regex::new(r"\bconsole\.log\s*\(")?,
                },
                Marker {
                    label: "debugger",
                    pattern: Regex::new(r"\bdebugger\s*;")?,
                },
            ],
            python_markers: vec![
                Marker {
                    label: "breakpoint()",
                    pattern: Regex::new(r"\bbreakpoint\s*\(\s*\)")?,
                },
                Marker {
                    label: "pdb.set_trace()",
                    pattern: Regex::new(r"\bpdb\.set_trace\s*\(")?,
                },
            ],
        })
    }

    fn markers_for(&self, path: &str) -> Option<&[Marker]> {
        if has_extension(path, SCRIPT_EXTENSIONS) {
            Some(self.script_markers.as_slice())
        } else if has_extension(path, PYTHON_EXTENSIONS) {
            Some(self.python_markers.as_slice())
        } else {
            None
        }
    }

    /// Report for one file, or `None` when it is clean or unreadable
    fn scan_file(&self, display_path: &str, ctx: &RuleContext) -> Option<String> {
        let markers = self.markers_for(display_path)?;
        let absolute = PathUtils::absolutize(&ctx.config.project_dir, display_path);
        let content = match fs::read_to_string(&absolute) {
            Ok(content) => content,
            Err(e) => {
                debug!("Skipping debug scan of {}: {}", absolute.display(), e);
                return None;
            }
        };

        let mut labels: Vec<&str> = Vec::new();
        let mut lines = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let hits: Vec<&str> = markers
                .iter()
                .filter(|m| m.pattern.is_match(line))
                .map(|m| m.label)
                .collect();
            if hits.is_empty() {
                continue;
            }
            for label in hits {
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
            if lines.len() < MAX_REPORTED_LINES {
                let text: String = line.trim().chars().take(MAX_LINE_CHARS).collect();
                lines.push(format!("  {}: {}", index + 1, text));
            }
        }

        if labels.is_empty() {
            return None;
        }
        Some(format!(
            "{} found in {}:\n{}",
            labels.join(" & "),
            display_path,
            lines.join("\n")
        ))
    }
}

impl GuardRule for ConsoleDebugStatementWarning {
    fn name(&self) -> &'static str {
        "console-debug-statement-warning"
    }

    fn applies_to(&self, event: &CanonicalEvent, ctx: &RuleContext) -> bool {
        if ctx.config.disabled.console_log_check {
            return false;
        }
        match event.phase {
            HookPhase::PostAction => {
                event.tool_kind.is_file_mutation()
                    && event
                        .file_path
                        .as_deref()
                        .is_some_and(|p| self.markers_for(p).is_some())
            }
            HookPhase::Stop => true,
            HookPhase::PreAction => false,
        }
    }

    fn evaluate(&self, event: &CanonicalEvent, ctx: &RuleContext) -> Result<Verdict> {
        let reports: Vec<String> = match event.phase {
            HookPhase::Stop => {
                let key = changed_files_key(ctx.session_id(event));
                let files: AccumulatedFileSet = ctx.store.load(&key);
                files
                    .iter()
                    .filter(|p| self.markers_for(p).is_some())
                    .take(ctx.config.console_log_check_limit)
                    .filter_map(|p| self.scan_file(p, ctx))
                    .collect()
            }
            _ => event
                .file_path
                .as_deref()
                .and_then(|p| self.scan_file(p, ctx))
                .into_iter()
                .collect(),
        };

        if reports.is_empty() {
            return Ok(Verdict::allow());
        }

        Ok(Verdict::warn(format!(
            "[debug] WARNING: {}\nRemove debug statements before committing.",
            reports.join("\n")
        )))
    }
}
