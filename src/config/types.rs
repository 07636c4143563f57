use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default cooldown between long-running command reminders (15 minutes)
pub const DEFAULT_TMUX_REMINDER_COOLDOWN_MS: u64 = 15 * 60 * 1000;

/// Default number of tool calls before the first compact suggestion
pub const DEFAULT_COMPACT_THRESHOLD: u64 = 50;

/// Default cooldown between compact suggestions (10 minutes)
pub const DEFAULT_COMPACT_COOLDOWN_MS: u64 = 10 * 60 * 1000;

/// Default cap on files scanned for debug statements at Stop
pub const DEFAULT_CONSOLE_LOG_CHECK_LIMIT: usize = 25;

/// pytest arguments suggested when `ECC_PYTEST_ARGS` is unset
pub const DEFAULT_PYTEST_ARGS: &[&str] = &["-q", "--maxfail=1"];

/// Directories where new documentation files are accepted
pub const DEFAULT_DOC_ALLOWED_DIRS: &[&str] = &[
    "docs/",
    "doc/",
    "changelog/",
    ".github/",
    ".cursor/",
    ".claude/",
];

/// Allowed directories when strict doc blocking is on
pub const STRICT_DOC_ALLOWED_DIRS: &[&str] = &["docs/"];

/// How the documentation-file guard reacts to a new doc file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocGuardMode {
    Off,
    Warn,
    #[default]
    Block,
}

impl DocGuardMode {
    /// Parse a mode string; unknown values yield `None`
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "off" | "" | "0" => Some(DocGuardMode::Off),
            "warn" => Some(DocGuardMode::Warn),
            "block" | "1" => Some(DocGuardMode::Block),
            _ => None,
        }
    }
}

/// Per-category escape hatches for the destructive command guard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BashGuardOverrides {
    /// Disable the whole guard
    pub disabled: bool,
    pub allow_curl_pipe_shell: bool,
    pub allow_sudo: bool,
    pub allow_no_preserve_root: bool,
    pub allow_rm_rf_root: bool,
    pub allow_disk_tools: bool,
    pub allow_power_commands: bool,
}

/// Documentation file guard settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocGuardSettings {
    pub mode: DocGuardMode,
    /// Disable the guard entirely
    pub allow_doc_writes: bool,
    /// Shrink the allowed directory list
    pub strict: bool,
    /// Explicit allowed directory prefixes (replaces the defaults)
    pub allowed_dirs: Option<Vec<String>>,
}

impl DocGuardSettings {
    /// Directory prefixes accepted for new doc files, normalized to end in `/`
    pub fn effective_allowed_dirs(&self) -> Vec<String> {
        let dirs: Vec<String> = match (&self.allowed_dirs, self.strict) {
            (_, true) => STRICT_DOC_ALLOWED_DIRS.iter().map(|s| s.to_string()).collect(),
            (Some(dirs), false) => dirs.clone(),
            (None, false) => DEFAULT_DOC_ALLOWED_DIRS.iter().map(|s| s.to_string()).collect(),
        };

        dirs.into_iter()
            .map(|d| d.trim().trim_start_matches("./").replace('\\', "/"))
            .filter(|d| !d.is_empty())
            .map(|d| if d.ends_with('/') { d } else { format!("{d}/") })
            .collect()
    }
}

impl Default for DocGuardSettings {
    fn default() -> Self {
        Self {
            mode: DocGuardMode::Block,
            allow_doc_writes: false,
            strict: false,
            allowed_dirs: None,
        }
    }
}

/// Per-rule master switches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisabledRules {
    pub tmux_reminder: bool,
    pub console_log_check: bool,
    pub dev_server_guard: bool,
    pub git_push_reminder: bool,
    pub gh_pr_status: bool,
    pub suggest_compact: bool,
}

/// End-of-turn Python check selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonCheckSettings {
    pub skip_ruff: bool,
    pub skip_mypy: bool,
    pub skip_pytest: bool,
    pub pytest_args: Vec<String>,
}

impl Default for PythonCheckSettings {
    fn default() -> Self {
        Self {
            skip_ruff: false,
            skip_mypy: false,
            skip_pytest: false,
            pytest_args: DEFAULT_PYTEST_ARGS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Fully resolved configuration for one evaluation.
///
/// Built once per invocation and handed to every rule; rules never look at
/// the process environment themselves.
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root the agent operates in
    pub project_dir: PathBuf,
    /// Where persisted state lives
    pub state_dir: PathBuf,
    /// Fallback session id when the event carries none
    pub session_id: Option<String>,
    /// Ambient terminal multiplexer indicator (TMUX / STY)
    pub in_multiplexer: bool,
    pub bash_guard: BashGuardOverrides,
    pub block_force_push: bool,
    pub require_multiplexer_for_dev_server: bool,
    pub doc_guard: DocGuardSettings,
    pub disabled: DisabledRules,
    pub tmux_reminder_cooldown_ms: u64,
    pub compact_threshold: u64,
    pub compact_cooldown_ms: u64,
    pub console_log_check_limit: usize,
    /// Query `gh pr view` after a PR is created
    pub gh_pr_status: bool,
    /// Forced Python runner prefix, e.g. `["uv", "run"]`
    pub py_runner_override: Option<Vec<String>>,
    pub python_checks: PythonCheckSettings,
}

impl Config {
    /// Defaults for a project rooted at `project_dir`
    pub fn for_project(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        let paths = crate::io::GuardPaths::for_project(&project_dir);
        Self {
            project_dir,
            state_dir: paths.state_dir,
            session_id: None,
            in_multiplexer: false,
            bash_guard: BashGuardOverrides::default(),
            block_force_push: false,
            require_multiplexer_for_dev_server: false,
            doc_guard: DocGuardSettings::default(),
            disabled: DisabledRules::default(),
            tmux_reminder_cooldown_ms: DEFAULT_TMUX_REMINDER_COOLDOWN_MS,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            compact_cooldown_ms: DEFAULT_COMPACT_COOLDOWN_MS,
            console_log_check_limit: DEFAULT_CONSOLE_LOG_CHECK_LIMIT,
            gh_pr_status: false,
            py_runner_override: None,
            python_checks: PythonCheckSettings::default(),
        }
    }
}

/// Settings accepted from YAML config files. Every field is optional so
/// that layers only override what they mention; unknown keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileSettings {
    pub disable_bash_guard: Option<bool>,
    pub allow_curl_pipe_shell: Option<bool>,
    pub allow_sudo: Option<bool>,
    pub allow_no_preserve_root: Option<bool>,
    pub allow_rm_rf_root: Option<bool>,
    pub allow_disk_tools: Option<bool>,
    pub allow_power_commands: Option<bool>,
    pub block_force_push: Option<bool>,
    pub require_multiplexer_for_dev_server: Option<bool>,
    pub doc_guard_mode: Option<DocGuardMode>,
    pub allow_doc_writes: Option<bool>,
    pub strict_doc_block: Option<bool>,
    pub doc_allowed_dirs: Option<Vec<String>>,
    pub disable_tmux_reminder: Option<bool>,
    pub disable_console_log_check: Option<bool>,
    pub disable_dev_server_guard: Option<bool>,
    pub disable_git_push_reminder: Option<bool>,
    pub disable_gh_pr_status: Option<bool>,
    pub disable_suggest_compact: Option<bool>,
    pub tmux_reminder_cooldown_ms: Option<u64>,
    pub compact_threshold: Option<u64>,
    pub compact_cooldown_ms: Option<u64>,
    pub console_log_check_limit: Option<usize>,
    pub gh_pr_status: Option<bool>,
    pub py_runner: Option<String>,
    pub skip_ruff: Option<bool>,
    pub skip_mypy: Option<bool>,
    pub skip_pytest: Option<bool>,
    pub pytest_args: Option<String>,
    /// Relative paths resolve against the project root
    pub state_dir: Option<PathBuf>,
}

impl FileSettings {
    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(self, other: FileSettings) -> FileSettings {
        FileSettings {
            disable_bash_guard: other.disable_bash_guard.or(self.disable_bash_guard),
            allow_curl_pipe_shell: other.allow_curl_pipe_shell.or(self.allow_curl_pipe_shell),
            allow_sudo: other.allow_sudo.or(self.allow_sudo),
            allow_no_preserve_root: other.allow_no_preserve_root.or(self.allow_no_preserve_root),
            allow_rm_rf_root: other.allow_rm_rf_root.or(self.allow_rm_rf_root),
            allow_disk_tools: other.allow_disk_tools.or(self.allow_disk_tools),
            allow_power_commands: other.allow_power_commands.or(self.allow_power_commands),
            block_force_push: other.block_force_push.or(self.block_force_push),
            require_multiplexer_for_dev_server: other
                .require_multiplexer_for_dev_server
                .or(self.require_multiplexer_for_dev_server),
            doc_guard_mode: other.doc_guard_mode.or(self.doc_guard_mode),
            allow_doc_writes: other.allow_doc_writes.or(self.allow_doc_writes),
            strict_doc_block: other.strict_doc_block.or(self.strict_doc_block),
            doc_allowed_dirs: other.doc_allowed_dirs.or(self.doc_allowed_dirs),
            disable_tmux_reminder: other.disable_tmux_reminder.or(self.disable_tmux_reminder),
            disable_console_log_check: other
                .disable_console_log_check
                .or(self.disable_console_log_check),
            disable_dev_server_guard: other
                .disable_dev_server_guard
                .or(self.disable_dev_server_guard),
            disable_git_push_reminder: other
                .disable_git_push_reminder
                .or(self.disable_git_push_reminder),
            disable_gh_pr_status: other.disable_gh_pr_status.or(self.disable_gh_pr_status),
            disable_suggest_compact: other
                .disable_suggest_compact
                .or(self.disable_suggest_compact),
            tmux_reminder_cooldown_ms: other
                .tmux_reminder_cooldown_ms
                .or(self.tmux_reminder_cooldown_ms),
            compact_threshold: other.compact_threshold.or(self.compact_threshold),
            compact_cooldown_ms: other.compact_cooldown_ms.or(self.compact_cooldown_ms),
            console_log_check_limit: other
                .console_log_check_limit
                .or(self.console_log_check_limit),
            gh_pr_status: other.gh_pr_status.or(self.gh_pr_status),
            py_runner: other.py_runner.or(self.py_runner),
            skip_ruff: other.skip_ruff.or(self.skip_ruff),
            skip_mypy: other.skip_mypy.or(self.skip_mypy),
            skip_pytest: other.skip_pytest.or(self.skip_pytest),
            pytest_args: other.pytest_args.or(self.pytest_args),
            state_dir: other.state_dir.or(self.state_dir),
        }
    }
}
