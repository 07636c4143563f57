use super::{GuardRule, RuleContext, Verdict};
use crate::engine::events::{CanonicalEvent, HookPhase};
use crate::io::PathUtils;
use crate::state::{AccumulatedFileSet, StateChange, StateKey};
use crate::Result;

/// Files edited since the last Stop
pub const CHANGED_FILES_CONCERN: &str = "changed-files";

/// Extensions worth re-checking at the end of a turn
const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs", "py", "pyi"];

/// Key of the accumulated set for this session, or the project when there is none
pub fn changed_files_key(session_id: Option<&str>) -> StateKey {
    StateKey::session_or_project(session_id, CHANGED_FILES_CONCERN)
}

pub(crate) fn has_extension(path: &str, extensions: &[&str]) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Remembers source files touched by edits so Stop-phase rules can batch-check them
pub struct EditedFileTracker;

impl GuardRule for EditedFileTracker {
    fn name(&self) -> &'static str {
        "edited-file-tracker"
    }

    fn applies_to(&self, event: &CanonicalEvent, _ctx: &RuleContext) -> bool {
        event.phase == HookPhase::PostAction
            && event.tool_kind.is_file_mutation()
            && event
                .file_path
                .as_deref()
                .is_some_and(|p| has_extension(p, SOURCE_EXTENSIONS))
    }

    fn evaluate(&self, event: &CanonicalEvent, ctx: &RuleContext) -> Result<Verdict> {
        let Some(relative) = event
            .file_path
            .as_deref()
            .and_then(|p| PathUtils::relative_to_project(&ctx.config.project_dir, p))
        else {
            return Ok(Verdict::allow());
        };

        let key = changed_files_key(ctx.session_id(event));
        let mut files: AccumulatedFileSet = ctx.store.load(&key);
        if !files.insert(relative) {
            return Ok(Verdict::allow());
        }

        Ok(Verdict::allow().with_change(StateChange::put(key, &files)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rules::test_support::{run, Fixture};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn edited(path: &str) -> CanonicalEvent {
        CanonicalEvent::normalize(&json!({
            "hook_event_name": "PostToolUse",
            "tool_name": "Edit",
            "session_id": "s1",
            "tool_input": {"file_path": path}
        }))
    }

    fn track(fixture: &Fixture, path: &str) {
        let verdict = run(&EditedFileTracker, &edited(path), &fixture.ctx(0));
        assert!(verdict.outcome.message().is_none());
        assert_eq!(fixture.store.apply_all(&verdict.changes), 0);
    }

    #[test]
    fn test_accumulates_distinct_source_files() {
        let fixture = Fixture::new();
        let absolute = fixture.dir.path().join("src/app.ts");

        track(&fixture, "src/app.ts");
        track(&fixture, &absolute.to_string_lossy());
        track(&fixture, "pkg/mod.py");
        track(&fixture, "README.md");

        let files: AccumulatedFileSet = fixture.store.load(&changed_files_key(Some("s1")));
        assert_eq!(files.iter().collect::<Vec<_>>(), vec!["pkg/mod.py", "src/app.ts"]);
    }

    #[test]
    fn test_repeat_edit_writes_nothing() {
        let fixture = Fixture::new();
        track(&fixture, "a.py");
        let verdict = run(&EditedFileTracker, &edited("a.py"), &fixture.ctx(0));
        assert!(verdict.changes.is_empty());
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension("a/b.TSX", SOURCE_EXTENSIONS));
        assert!(!has_extension("Makefile", SOURCE_EXTENSIONS));
        assert!(!has_extension("a.rs", SOURCE_EXTENSIONS));
    }
}
