use crate::{GuardError, Result};
use directories::ProjectDirs;
use std::path::{Component, Path, PathBuf};

/// Directory (relative to the project root) holding hook configuration.
pub const PROJECT_CONFIG_DIR: &str = ".cursor";

/// Hidden state directory name under [`PROJECT_CONFIG_DIR`].
pub const STATE_DIR_NAME: &str = ".hook_state";

/// Project-level config file name under [`PROJECT_CONFIG_DIR`].
pub const PROJECT_CONFIG_FILE: &str = "ecc-guard.yaml";

/// Path management for guard configuration and state files
#[derive(Debug, Clone)]
pub struct GuardPaths {
    /// Project root the agent is operating in
    pub project_dir: PathBuf,
    /// State directory (.cursor/.hook_state/)
    pub state_dir: PathBuf,
}

impl GuardPaths {
    /// Create paths for a specific project directory
    pub fn for_project(project_root: &Path) -> Self {
        let state_dir = project_root.join(PROJECT_CONFIG_DIR).join(STATE_DIR_NAME);
        Self {
            project_dir: project_root.to_path_buf(),
            state_dir,
        }
    }

    /// Resolve the project root from the hook environment, falling back to
    /// the current directory.
    pub fn resolve_project_dir<'a, I>(vars: I) -> PathBuf
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut claude = None;
        let mut cursor = None;
        for (key, value) in vars {
            if value.trim().is_empty() {
                continue;
            }
            match key {
                "CLAUDE_PROJECT_DIR" => claude = Some(value),
                "CURSOR_PROJECT_DIR" | "cursor_PROJECT_DIR" => cursor = Some(value),
                _ => {}
            }
        }

        claude
            .or(cursor)
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Project-level YAML configuration file
    pub fn project_config_file(&self) -> PathBuf {
        self.project_dir
            .join(PROJECT_CONFIG_DIR)
            .join(PROJECT_CONFIG_FILE)
    }

    /// User-level YAML configuration file
    pub fn user_config_file() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "ecc-guard").ok_or_else(|| {
            GuardError::Path("Failed to determine user configuration directory".to_string())
        })?;

        Ok(dirs.config_dir().join("config.yaml"))
    }

    /// Tooling snapshot written at session start
    pub fn tooling_snapshot_file(&self) -> PathBuf {
        self.state_dir.join("tooling.json")
    }

    /// Ensure the state directory exists
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.state_dir)?;
        Ok(())
    }
}

/// Utilities for working with paths
pub struct PathUtils;

impl PathUtils {
    /// Normalize path separators to forward slashes
    pub fn normalize_separators(path: &str) -> String {
        path.replace('\\', "/")
    }

    /// Reduce an identifier to something usable as a single path component.
    pub fn sanitize_component(raw: &str) -> String {
        let cleaned: String = raw
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        let cleaned = cleaned.trim_matches('.');
        if cleaned.is_empty() {
            "default".to_string()
        } else {
            cleaned.to_string()
        }
    }

    /// Resolve a (possibly relative) tool path against the project root.
    pub fn absolutize(project_dir: &Path, file_path: &str) -> PathBuf {
        let path = Path::new(file_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            project_dir.join(path)
        }
    }

    /// Resolve `.` and `..` without touching the filesystem. Returns `None`
    /// when the path climbs above its root (or above its first component
    /// for relative paths).
    pub fn normalize_lexically(path: &Path) -> Option<PathBuf> {
        let mut normalized = PathBuf::new();
        let mut depth = 0usize;
        for component in path.components() {
            match component {
                Component::Prefix(_) | Component::RootDir => normalized.push(component),
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return None;
                    }
                    normalized.pop();
                    depth -= 1;
                }
                Component::Normal(part) => {
                    normalized.push(part);
                    depth += 1;
                }
            }
        }
        Some(normalized)
    }

    /// Express a tool path relative to the project root, using forward
    /// slashes. Returns `None` for paths that resolve outside the project.
    pub fn relative_to_project(project_dir: &Path, file_path: &str) -> Option<String> {
        let normalized = Self::normalize_separators(file_path);
        let absolute = Self::normalize_lexically(&Self::absolutize(project_dir, &normalized))?;
        let root = Self::normalize_lexically(project_dir)?;
        let relative = absolute.strip_prefix(&root).ok()?;

        let text = Self::normalize_separators(&relative.to_string_lossy());
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
