use super::edited_files::{changed_files_key, has_extension};
use super::{GuardRule, RuleContext, Verdict};
use crate::engine::events::{CanonicalEvent, HookPhase};
use crate::state::AccumulatedFileSet;
use crate::tooling::{has_mypy_config, has_pytest_config, resolve_python};
use crate::Result;
use tracing::debug;

const PYTHON_EXTENSIONS: &[&str] = &["py", "pyi"];

/// Files listed in the reminder before summarizing the rest
const MAX_LISTED_FILES: usize = 10;

/// Above this many changed files mypy is pointed at the whole project
const MAX_MYPY_FILE_ARGS: usize = 25;

/// End-of-turn nudge to lint, type-check and test the Python files edited
/// during the session, using the project's own runner.
///
/// mypy and pytest are only suggested when the project configures them.
pub struct PythonChecksReminder;

impl GuardRule for PythonChecksReminder {
    fn name(&self) -> &'static str {
        "python-checks-reminder"
    }

    fn applies_to(&self, event: &CanonicalEvent, _ctx: &RuleContext) -> bool {
        event.phase == HookPhase::Stop
    }

    fn evaluate(&self, event: &CanonicalEvent, ctx: &RuleContext) -> Result<Verdict> {
        let key = changed_files_key(ctx.session_id(event));
        let files: AccumulatedFileSet = ctx.store.load(&key);
        let python_files: Vec<&str> = files
            .iter()
            .filter(|p| has_extension(p, PYTHON_EXTENSIONS))
            .collect();
        if python_files.is_empty() {
            return Ok(Verdict::allow());
        }

        let project_dir = &ctx.config.project_dir;
        let settings = &ctx.config.python_checks;
        let profile = resolve_python(
            project_dir,
            ctx.config.py_runner_override.as_deref(),
            ctx.probe,
        );

        let mut checks = Vec::new();
        if !settings.skip_ruff {
            let mut lint = vec!["ruff", "check"];
            lint.extend(python_files.iter());
            checks.push(profile.with_runner(&lint));
        }
        if !settings.skip_mypy && has_mypy_config(project_dir) {
            let mut types = vec!["mypy"];
            if python_files.len() <= MAX_MYPY_FILE_ARGS {
                types.extend(python_files.iter());
            } else {
                types.push(".");
            }
            checks.push(profile.with_runner(&types));
        }
        if !settings.skip_pytest && has_pytest_config(project_dir) {
            let mut tests = vec!["pytest"];
            tests.extend(settings.pytest_args.iter().map(String::as_str));
            checks.push(profile.with_runner(&tests));
        }
        if checks.is_empty() {
            debug!("All Python checks skipped or unconfigured");
            return Ok(Verdict::allow());
        }

        let mut listed: Vec<String> = python_files
            .iter()
            .take(MAX_LISTED_FILES)
            .map(|p| format!("  - {p}"))
            .collect();
        if python_files.len() > MAX_LISTED_FILES {
            listed.push(format!("  ... and {} more", python_files.len() - MAX_LISTED_FILES));
        }

        let mut message = format!(
            "[python] {} Python file(s) changed this session:\n{}\n\
             Suggested checks ({} via {}):\n  {}",
            python_files.len(),
            listed.join("\n"),
            profile.manager.as_str(),
            profile.source,
            checks.join("\n  "),
        );
        if !profile.installed {
            message.push_str(&format!(
                "\nNote: `{}` was not found on PATH; install it or set ECC_PY_RUNNER.",
                profile
                    .runner_prefix
                    .first()
                    .map(String::as_str)
                    .unwrap_or("python")
            ));
        }

        Ok(Verdict::warn(message))
    }
}
