use crate::io::PathUtils;
use crate::state::types::{Record, StateKey, StateScope};
use crate::{GuardError, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Subdirectory holding per-session state
const SESSIONS_DIR: &str = "sessions";

/// A state write produced by a rule, applied after the whole rule set ran
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    Put { key: StateKey, value: Value },
    Remove { key: StateKey },
}

impl StateChange {
    pub fn put<R: Record>(key: StateKey, record: &R) -> Result<Self> {
        Ok(StateChange::Put {
            key,
            value: serde_json::to_value(record)?,
        })
    }

    pub fn remove(key: StateKey) -> Self {
        StateChange::Remove { key }
    }

    pub fn key(&self) -> &StateKey {
        match self {
            StateChange::Put { key, .. } | StateChange::Remove { key } => key,
        }
    }
}

/// Persists small JSON state documents under the project's state directory.
///
/// Reads are lenient: missing, unreadable or malformed documents load as the
/// record's default. Writes go to a temporary file in the target directory
/// and are renamed into place, so a concurrent reader sees either the old or
/// the new document, never a partial one.
#[derive(Debug, Clone)]
pub struct StateStore {
    state_dir: PathBuf,
}

impl StateStore {
    /// Directories are created lazily on first write
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// File backing `key`; session ids are sanitized into one path component
    pub fn path_for(&self, key: &StateKey) -> PathBuf {
        let file_name = format!("{}.json", PathUtils::sanitize_component(key.concern));
        match &key.scope {
            StateScope::Project => self.state_dir.join(file_name),
            StateScope::Session(id) => self
                .state_dir
                .join(SESSIONS_DIR)
                .join(PathUtils::sanitize_component(id))
                .join(file_name),
        }
    }

    /// Load a record, falling back to its default on any problem
    pub fn load<R: Record>(&self, key: &StateKey) -> R {
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return R::default(),
            Err(e) => {
                debug!("Unreadable state file {}: {}", path.display(), e);
                return R::default();
            }
        };

        R::decode(&raw).unwrap_or_else(|| {
            debug!("Ignoring malformed state file {}", path.display());
            R::default()
        })
    }

    /// Persist a record atomically
    pub fn save<R: Record>(&self, key: &StateKey, record: &R) -> Result<()> {
        self.write_value(key, &serde_json::to_value(record)?)
    }

    /// Delete a document; returns whether it existed
    pub fn remove(&self, key: &StateKey) -> Result<bool> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply one pending change
    pub fn apply(&self, change: &StateChange) -> Result<()> {
        match change {
            StateChange::Put { key, value } => self.write_value(key, value),
            StateChange::Remove { key } => self.remove(key).map(|_| ()),
        }
    }

    /// Apply changes in order. A failing change is logged and skipped; the
    /// number of changes that could not be applied is returned.
    pub fn apply_all(&self, changes: &[StateChange]) -> usize {
        let mut failed = 0;
        for change in changes {
            if let Err(e) = self.apply(change) {
                warn!(
                    "Failed to persist state '{}': {}",
                    change.key().concern,
                    e
                );
                failed += 1;
            }
        }
        failed
    }

    /// Session ids with a state directory
    pub fn list_sessions(&self) -> Result<Vec<String>> {
        let sessions_dir = self.state_dir.join(SESSIONS_DIR);
        if !sessions_dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for entry in fs::read_dir(&sessions_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    sessions.push(name.to_string());
                }
            }
        }
        sessions.sort();
        Ok(sessions)
    }

    /// Remove session directories untouched for longer than `days_old` days
    pub fn prune_sessions(&self, days_old: u32) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::days(days_old as i64);
        let mut removed = 0;

        for session in self.list_sessions()? {
            let dir = self.state_dir.join(SESSIONS_DIR).join(&session);
            let modified: DateTime<Utc> = fs::metadata(&dir)?.modified()?.into();
            if modified < cutoff {
                fs::remove_dir_all(&dir)?;
                debug!("Pruned state for session {}", session);
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// Remove every state document, returning how many files were deleted.
    /// Non-JSON files are left alone.
    pub fn clear_all(&self) -> Result<usize> {
        if !self.state_dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in fs::read_dir(&self.state_dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }

        let sessions_dir = self.state_dir.join(SESSIONS_DIR);
        for session in self.list_sessions()? {
            let dir = sessions_dir.join(session);
            removed += fs::read_dir(&dir)?.count();
            fs::remove_dir_all(&dir)?;
        }

        Ok(removed)
    }

    fn write_value(&self, key: &StateKey, value: &Value) -> Result<()> {
        let path = self.path_for(key);
        let parent = path
            .parent()
            .ok_or_else(|| GuardError::State(format!("No parent for {}", path.display())))?;
        fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        let content = serde_json::to_string(value)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| GuardError::Io(e.error))?;

        debug!("Wrote state {}", path.display());
        Ok(())
    }
}
