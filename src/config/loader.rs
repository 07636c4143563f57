use super::types::{Config, DocGuardMode, FileSettings};
use crate::io::GuardPaths;
use crate::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Explicit config file path, overriding project discovery
pub const CONFIG_PATH_VAR: &str = "ECC_GUARD_CONFIG";

/// Builds a [`Config`] from defaults, YAML files and environment variables
pub struct ConfigLoader {
    /// Consult the per-user config file
    include_user_config: bool,
}

impl ConfigLoader {
    /// Create new config loader
    pub fn new() -> Self {
        Self {
            include_user_config: true,
        }
    }

    /// Skip the per-user config file (tests, sandboxed hosts)
    pub fn without_user_config(mut self) -> Self {
        self.include_user_config = false;
        self
    }

    /// Load configuration from the process environment
    pub fn load_from_env(&self) -> Config {
        let vars: HashMap<String, String> = std::env::vars().collect();
        self.load(&vars)
    }

    /// Load configuration from an explicit variable map.
    ///
    /// Layers, lowest first: defaults, user YAML, project YAML, variables.
    pub fn load(&self, vars: &HashMap<String, String>) -> Config {
        let project_dir =
            GuardPaths::resolve_project_dir(vars.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let paths = GuardPaths::for_project(&project_dir);

        let mut settings = FileSettings::default();

        if self.include_user_config {
            if let Ok(user_file) = GuardPaths::user_config_file() {
                if let Some(user) = read_settings_lenient(&user_file) {
                    settings = settings.merge(user);
                }
            }
        }

        let project_file = vars
            .get(CONFIG_PATH_VAR)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| paths.project_config_file());
        if let Some(project) = read_settings_lenient(&project_file) {
            settings = settings.merge(project);
        }

        resolve(project_dir, settings, vars)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a YAML settings file
pub fn read_settings(path: &Path) -> Result<FileSettings> {
    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(FileSettings::default());
    }
    Ok(serde_yaml_ng::from_str(&contents)?)
}

fn read_settings_lenient(path: &Path) -> Option<FileSettings> {
    if !path.exists() {
        return None;
    }

    match read_settings(path) {
        Ok(settings) => {
            debug!("Loaded guard settings from {}", path.display());
            Some(settings)
        }
        Err(e) => {
            warn!("Ignoring unreadable config file {}: {}", path.display(), e);
            None
        }
    }
}

/// Apply file settings and variables on top of the project defaults.
/// Unknown variables are ignored.
pub fn resolve(project_dir: PathBuf, file: FileSettings, vars: &HashMap<String, String>) -> Config {
    let mut config = Config::for_project(project_dir);
    let env = EnvView(vars);

    if let Some(dir) = file.state_dir {
        config.state_dir = if dir.is_absolute() {
            dir
        } else {
            config.project_dir.join(dir)
        };
    }

    config.session_id = env.text("CLAUDE_SESSION_ID");
    config.in_multiplexer = env.text("TMUX").is_some() || env.text("STY").is_some();

    let guard = &mut config.bash_guard;
    guard.disabled = env
        .flag("ECC_DISABLE_BASH_GUARD")
        .or(file.disable_bash_guard)
        .unwrap_or(false);
    guard.allow_curl_pipe_shell = env
        .flag("ECC_ALLOW_CURL_PIPE_SHELL")
        .or(file.allow_curl_pipe_shell)
        .unwrap_or(false);
    guard.allow_sudo = env.flag("ECC_ALLOW_SUDO").or(file.allow_sudo).unwrap_or(false);
    guard.allow_no_preserve_root = env
        .flag("ECC_ALLOW_NO_PRESERVE_ROOT")
        .or(file.allow_no_preserve_root)
        .unwrap_or(false);
    guard.allow_rm_rf_root = env
        .flag("ECC_ALLOW_RM_RF_ROOT")
        .or(file.allow_rm_rf_root)
        .unwrap_or(false);
    guard.allow_disk_tools = env
        .flag("ECC_ALLOW_DISK_TOOLS")
        .or(file.allow_disk_tools)
        .unwrap_or(false);
    guard.allow_power_commands = env
        .flag("ECC_ALLOW_POWER_COMMANDS")
        .or(file.allow_power_commands)
        .unwrap_or(false);

    config.block_force_push = env
        .flag("ECC_BLOCK_FORCE_PUSH")
        .or(file.block_force_push)
        .unwrap_or(false);
    config.require_multiplexer_for_dev_server = env
        .flag("ECC_REQUIRE_TMUX_FOR_DEV_SERVER")
        .or(file.require_multiplexer_for_dev_server)
        .unwrap_or(false);

    let doc = &mut config.doc_guard;
    if let Some(mode) = env
        .text("ECC_DOC_GUARD")
        .and_then(|raw| {
            let parsed = DocGuardMode::parse(&raw);
            if parsed.is_none() {
                debug!("Ignoring unknown ECC_DOC_GUARD value '{}'", raw);
            }
            parsed
        })
        .or(file.doc_guard_mode)
    {
        doc.mode = mode;
    }
    doc.allow_doc_writes = env
        .flag("ECC_ALLOW_DOC_WRITES")
        .or(file.allow_doc_writes)
        .unwrap_or(false);
    doc.strict = env
        .flag("ECC_STRICT_DOC_BLOCK")
        .or(file.strict_doc_block)
        .unwrap_or(false);
    doc.allowed_dirs = env
        .text("ECC_DOC_ALLOWED_DIRS")
        .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect())
        .or(file.doc_allowed_dirs);

    let disabled = &mut config.disabled;
    disabled.tmux_reminder = env
        .flag("ECC_DISABLE_TMUX_REMINDER")
        .or(file.disable_tmux_reminder)
        .unwrap_or(false);
    disabled.console_log_check = env
        .flag("ECC_DISABLE_CONSOLE_LOG_CHECK")
        .or(file.disable_console_log_check)
        .unwrap_or(false);
    disabled.dev_server_guard = env
        .flag("ECC_DISABLE_DEV_SERVER_GUARD")
        .or(file.disable_dev_server_guard)
        .unwrap_or(false);
    disabled.git_push_reminder = env
        .flag("ECC_DISABLE_GIT_PUSH_REMINDER")
        .or(file.disable_git_push_reminder)
        .unwrap_or(false);
    disabled.gh_pr_status = env
        .flag("ECC_DISABLE_GH_PR_STATUS")
        .or(file.disable_gh_pr_status)
        .unwrap_or(false);
    disabled.suggest_compact = env
        .flag("ECC_DISABLE_SUGGEST_COMPACT")
        .or(file.disable_suggest_compact)
        .unwrap_or(false);

    if let Some(ms) = env
        .number("ECC_TMUX_REMINDER_COOLDOWN_MS")
        .or(file.tmux_reminder_cooldown_ms)
    {
        config.tmux_reminder_cooldown_ms = ms;
    }
    if let Some(threshold) = env.number("COMPACT_THRESHOLD").or(file.compact_threshold) {
        config.compact_threshold = threshold;
    }
    if let Some(ms) = env.number("COMPACT_COOLDOWN_MS").or(file.compact_cooldown_ms) {
        config.compact_cooldown_ms = ms;
    }
    if let Some(limit) = env
        .number("ECC_CONSOLE_LOG_CHECK_LIMIT")
        .map(|n| n as usize)
        .or(file.console_log_check_limit)
    {
        config.console_log_check_limit = limit;
    }

    config.gh_pr_status = env
        .flag("ECC_GH_PR_STATUS")
        .or(file.gh_pr_status)
        .unwrap_or(false);

    config.py_runner_override = env
        .text("ECC_PY_RUNNER")
        .or(file.py_runner)
        .and_then(|raw| split_runner(&raw));

    let checks = &mut config.python_checks;
    checks.skip_ruff = env.flag("ECC_SKIP_RUFF").or(file.skip_ruff).unwrap_or(false);
    checks.skip_mypy = env.flag("ECC_SKIP_MYPY").or(file.skip_mypy).unwrap_or(false);
    checks.skip_pytest = env
        .flag("ECC_SKIP_PYTEST")
        .or(file.skip_pytest)
        .unwrap_or(false);
    if let Some(args) = env
        .text("ECC_PYTEST_ARGS")
        .or(file.pytest_args)
        .and_then(|raw| split_runner(&raw))
    {
        checks.pytest_args = args;
    }

    config
}

/// Split an argument string such as `"uv run"` into shell words
pub fn split_runner(raw: &str) -> Option<Vec<String>> {
    let words = shell_words::split(raw.trim())
        .unwrap_or_else(|_| raw.split_whitespace().map(str::to_string).collect());
    if words.is_empty() {
        None
    } else {
        Some(words)
    }
}

/// Typed lookups over the raw variable map
struct EnvView<'a>(&'a HashMap<String, String>);

impl EnvView<'_> {
    fn text(&self, key: &str) -> Option<String> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn flag(&self, key: &str) -> Option<bool> {
        self.text(key).map(|v| parse_bool(&v))
    }

    fn number(&self, key: &str) -> Option<u64> {
        let raw = self.text(key)?;
        match raw.parse::<u64>() {
            Ok(n) => Some(n),
            Err(_) => {
                debug!("Ignoring non-numeric {}='{}'", key, raw);
                None
            }
        }
    }
}

/// `1`, `true`, `yes` and `on` are truthy; everything else is false
pub fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::DEFAULT_COMPACT_THRESHOLD;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = resolve(PathBuf::from("/repo"), FileSettings::default(), &vars(&[]));

        assert!(!config.in_multiplexer);
        assert!(!config.bash_guard.disabled);
        assert_eq!(config.doc_guard.mode, DocGuardMode::Block);
        assert_eq!(config.compact_threshold, DEFAULT_COMPACT_THRESHOLD);
        assert_eq!(config.state_dir, PathBuf::from("/repo/.cursor/.hook_state"));
        assert_eq!(config.py_runner_override, None);
        assert_eq!(config.python_checks.pytest_args, vec!["-q", "--maxfail=1"]);
    }

    #[test]
    fn test_env_overrides() {
        let config = resolve(
            PathBuf::from("/repo"),
            FileSettings::default(),
            &vars(&[
                ("ECC_ALLOW_SUDO", "1"),
                ("ECC_ALLOW_DISK_TOOLS", "true"),
                ("ECC_ALLOW_POWER_COMMANDS", "0"),
                ("ECC_DOC_GUARD", "warn"),
                ("TMUX", "/tmp/tmux-1000/default,123,0"),
                ("COMPACT_THRESHOLD", "7"),
                ("ECC_PY_RUNNER", "poetry run"),
                ("ECC_SKIP_MYPY", "1"),
                ("ECC_PYTEST_ARGS", "-x  -k smoke"),
                ("SOME_UNRELATED_VAR", "1"),
            ]),
        );

        assert!(config.bash_guard.allow_sudo);
        assert!(config.bash_guard.allow_disk_tools);
        assert!(!config.bash_guard.allow_power_commands);
        assert_eq!(config.doc_guard.mode, DocGuardMode::Warn);
        assert!(config.in_multiplexer);
        assert_eq!(config.compact_threshold, 7);
        assert_eq!(
            config.py_runner_override,
            Some(vec!["poetry".to_string(), "run".to_string()])
        );
        assert!(config.python_checks.skip_mypy);
        assert!(!config.python_checks.skip_ruff);
        assert_eq!(config.python_checks.pytest_args, vec!["-x", "-k", "smoke"]);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = resolve(
            PathBuf::from("/repo"),
            FileSettings::default(),
            &vars(&[("COMPACT_THRESHOLD", "lots"), ("ECC_DOC_GUARD", "loud")]),
        );

        assert_eq!(config.compact_threshold, DEFAULT_COMPACT_THRESHOLD);
        assert_eq!(config.doc_guard.mode, DocGuardMode::Block);
    }

    #[test]
    fn test_env_beats_file() {
        let file = FileSettings {
            allow_sudo: Some(true),
            block_force_push: Some(true),
            ..Default::default()
        };
        let config = resolve(
            PathBuf::from("/repo"),
            file,
            &vars(&[("ECC_ALLOW_SUDO", "0")]),
        );

        assert!(!config.bash_guard.allow_sudo);
        assert!(config.block_force_push);
    }

    #[test]
    fn test_loader_reads_project_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let cursor_dir = temp_dir.path().join(".cursor");
        std::fs::create_dir_all(&cursor_dir).unwrap();
        std::fs::write(
            cursor_dir.join("ecc-guard.yaml"),
            "block_force_push: true\ndoc_guard_mode: warn\nstate_dir: .state\nnot_a_setting: 3\n",
        )
        .unwrap();

        let project = temp_dir.path().to_string_lossy().to_string();
        let config = ConfigLoader::new()
            .without_user_config()
            .load(&vars(&[("CLAUDE_PROJECT_DIR", project.as_str())]));

        assert!(config.block_force_push);
        assert_eq!(config.doc_guard.mode, DocGuardMode::Warn);
        assert_eq!(config.state_dir, temp_dir.path().join(".state"));
    }

    #[test]
    fn test_loader_skips_broken_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let cursor_dir = temp_dir.path().join(".cursor");
        std::fs::create_dir_all(&cursor_dir).unwrap();
        std::fs::write(cursor_dir.join("ecc-guard.yaml"), "block_force_push: [unclosed").unwrap();

        let project = temp_dir.path().to_string_lossy().to_string();
        let config = ConfigLoader::new()
            .without_user_config()
            .load(&vars(&[("CLAUDE_PROJECT_DIR", project.as_str())]));

        assert!(!config.block_force_push);
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("1"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool(" yes "));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("nope"));
    }
}
