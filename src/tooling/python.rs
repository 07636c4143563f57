use crate::tooling::probe::BinaryProbe;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Source label used when the runner prefix came from configuration
pub const RUNNER_OVERRIDE_SOURCE: &str = "ECC_PY_RUNNER";

/// Python dependency manager conventions, in detection priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PythonManager {
    Uv,
    Poetry,
    Pdm,
    Pipenv,
    /// Generic `pyproject.toml` without a tool-specific section
    Pyproject,
    /// Bare requirements files
    Pip,
    Unknown,
}

impl PythonManager {
    /// Infer a manager from the first word of a runner prefix
    pub fn from_binary(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "uv" => PythonManager::Uv,
            "poetry" => PythonManager::Poetry,
            "pdm" => PythonManager::Pdm,
            "pipenv" => PythonManager::Pipenv,
            _ => PythonManager::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PythonManager::Uv => "uv",
            PythonManager::Poetry => "poetry",
            PythonManager::Pdm => "pdm",
            PythonManager::Pipenv => "pipenv",
            PythonManager::Pyproject => "pyproject",
            PythonManager::Pip => "pip",
            PythonManager::Unknown => "unknown",
        }
    }

    /// Runner prefix implied by the manager
    fn runner_prefix(&self) -> Vec<String> {
        match self {
            PythonManager::Uv
            | PythonManager::Poetry
            | PythonManager::Pdm
            | PythonManager::Pipenv => vec![self.as_str().to_string(), "run".to_string()],
            _ => Vec::new(),
        }
    }
}

/// Resolved Python tooling for a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PythonProfile {
    pub manager: PythonManager,
    pub source: String,
    pub runner_prefix: Vec<String>,
    /// Whether the manager binary (or a Python interpreter) answered a version probe
    pub installed: bool,
}

/// Canonical commands suggested to the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PythonCommands {
    pub install: String,
    pub format: String,
    pub lint: String,
    pub types: String,
    pub tests: String,
    pub tests_coverage: String,
    pub sanity: String,
}

impl PythonProfile {
    /// Prefix `parts` with the runner, e.g. `["ruff", "check"]` -> `uv run ruff check`
    pub fn with_runner(&self, parts: &[&str]) -> String {
        self.runner_prefix
            .iter()
            .map(String::as_str)
            .chain(parts.iter().copied())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn commands(&self) -> PythonCommands {
        let install = match self.manager {
            PythonManager::Uv => "uv sync".to_string(),
            PythonManager::Poetry => "poetry install".to_string(),
            PythonManager::Pdm => "pdm install".to_string(),
            PythonManager::Pipenv => "pipenv install --dev".to_string(),
            PythonManager::Pip => "python -m pip install -r requirements.txt".to_string(),
            PythonManager::Pyproject | PythonManager::Unknown => {
                "python -m pip install -e .".to_string()
            }
        };

        PythonCommands {
            install,
            format: self.with_runner(&["ruff", "format", "."]),
            lint: self.with_runner(&["ruff", "check", "."]),
            types: self.with_runner(&["mypy", "."]),
            tests: self.with_runner(&["pytest", "-q"]),
            tests_coverage: self.with_runner(&[
                "pytest",
                "-q",
                "--cov=.",
                "--cov-report=term-missing",
            ]),
            sanity: self.with_runner(&["python", "-m", "compileall", "-q", "."]),
        }
    }
}

/// Pick the Python manager for `project_dir`.
///
/// Selection looks only at repository files (or the explicit override); the
/// probe only fills in `installed`.
pub fn resolve_python(
    project_dir: &Path,
    runner_override: Option<&[String]>,
    probe: &dyn BinaryProbe,
) -> PythonProfile {
    if let Some(prefix) = runner_override.filter(|p| !p.is_empty()) {
        let manager = PythonManager::from_binary(&prefix[0]);
        return PythonProfile {
            manager,
            source: RUNNER_OVERRIDE_SOURCE.to_string(),
            runner_prefix: prefix.to_vec(),
            installed: probe.is_installed(&prefix[0]),
        };
    }

    let (manager, source) = detect_manager(project_dir);
    debug!("Python tooling: {} (from {})", manager.as_str(), source);

    let installed = match manager {
        PythonManager::Pyproject | PythonManager::Pip | PythonManager::Unknown => {
            probe.is_installed("python") || probe.is_installed("python3")
        }
        _ => probe.is_installed(manager.as_str()),
    };

    PythonProfile {
        manager,
        source,
        runner_prefix: manager.runner_prefix(),
        installed,
    }
}

fn detect_manager(project_dir: &Path) -> (PythonManager, String) {
    let pyproject_path = project_dir.join("pyproject.toml");
    let has_pyproject = pyproject_path.is_file();
    let pyproject = if has_pyproject {
        fs::read_to_string(&pyproject_path).unwrap_or_default()
    } else {
        String::new()
    };

    let lock_or_section = |lock: &str, section: &str| -> Option<String> {
        if project_dir.join(lock).is_file() {
            Some(lock.to_string())
        } else if has_tool_section(&pyproject, section) {
            Some("pyproject.toml".to_string())
        } else {
            None
        }
    };

    if let Some(source) = lock_or_section("uv.lock", "uv") {
        return (PythonManager::Uv, source);
    }
    if let Some(source) = lock_or_section("poetry.lock", "poetry") {
        return (PythonManager::Poetry, source);
    }
    if let Some(source) = lock_or_section("pdm.lock", "pdm") {
        return (PythonManager::Pdm, source);
    }
    if project_dir.join("Pipfile").is_file() {
        return (PythonManager::Pipenv, "Pipfile".to_string());
    }
    if has_pyproject {
        return (PythonManager::Pyproject, "pyproject.toml".to_string());
    }
    if has_requirements(project_dir) {
        return (PythonManager::Pip, "requirements*.txt".to_string());
    }

    (PythonManager::Unknown, "none".to_string())
}

/// `[tool.<name>]` or any `[tool.<name>.sub]` table header
fn has_tool_section(pyproject: &str, name: &str) -> bool {
    let exact = format!("[tool.{name}]");
    let nested = format!("[tool.{name}.");
    pyproject
        .lines()
        .map(str::trim)
        .any(|line| line.starts_with(&exact) || line.starts_with(&nested))
}

/// Whether the project configures mypy (`mypy.ini`, `.mypy.ini`, a
/// `[mypy]` section in `setup.cfg` or `[tool.mypy]` in `pyproject.toml`)
pub fn has_mypy_config(project_dir: &Path) -> bool {
    project_dir.join("mypy.ini").is_file()
        || project_dir.join(".mypy.ini").is_file()
        || has_ini_section(&read_or_empty(&project_dir.join("setup.cfg")), "mypy")
        || has_tool_section(&read_or_empty(&project_dir.join("pyproject.toml")), "mypy")
}

/// Whether the project has pytest configuration or a test directory
pub fn has_pytest_config(project_dir: &Path) -> bool {
    project_dir.join("pytest.ini").is_file()
        || has_ini_section(&read_or_empty(&project_dir.join("setup.cfg")), "tool:pytest")
        || read_or_empty(&project_dir.join("pyproject.toml"))
            .lines()
            .any(|line| line.trim().starts_with("[tool.pytest.ini_options]"))
        || project_dir.join("tests").exists()
        || project_dir.join("test").exists()
}

fn read_or_empty(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

/// `[name]` table header, tolerating inner whitespace
fn has_ini_section(text: &str, name: &str) -> bool {
    text.lines().any(|line| {
        line.trim()
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .is_some_and(|inner| inner.trim() == name)
    })
}

fn has_requirements(project_dir: &Path) -> bool {
    let escaped = glob::Pattern::escape(&project_dir.to_string_lossy());
    ["requirements*.txt", "requirements*.in"].iter().any(|pattern| {
        let full = Path::new(&escaped).join(pattern);
        glob::glob(&full.to_string_lossy())
            .map(|mut paths| paths.any(|p| p.is_ok()))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tooling::probe::ProbeOutput;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Installed(&'static [&'static str]);

    impl BinaryProbe for Installed {
        fn run(
            &self,
            program: &str,
            _: &[&str],
            _: Option<&Path>,
            _: Duration,
        ) -> Option<ProbeOutput> {
            self.0.iter().any(|p| *p == program).then(|| ProbeOutput {
                success: true,
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    fn project(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn test_uv_lock_wins_over_poetry() {
        let dir = project(&[("uv.lock", ""), ("poetry.lock", ""), ("pyproject.toml", "")]);
        let profile = resolve_python(dir.path(), None, &Installed(&["uv"]));

        assert_eq!(profile.manager, PythonManager::Uv);
        assert_eq!(profile.source, "uv.lock");
        assert_eq!(profile.runner_prefix, vec!["uv", "run"]);
        assert!(profile.installed);
    }

    #[test]
    fn test_tool_section_selects_manager() {
        let dir = project(&[("pyproject.toml", "[project]\nname = \"x\"\n\n[tool.poetry]\n")]);
        let profile = resolve_python(dir.path(), None, &Installed(&[]));

        assert_eq!(profile.manager, PythonManager::Poetry);
        assert_eq!(profile.source, "pyproject.toml");
        assert!(!profile.installed);
    }

    #[test]
    fn test_selection_ignores_installed_binaries() {
        let dir = project(&[("Pipfile", "")]);
        let profile = resolve_python(dir.path(), None, &Installed(&["uv", "poetry"]));

        assert_eq!(profile.manager, PythonManager::Pipenv);
        assert!(!profile.installed);
    }

    #[test]
    fn test_generic_pyproject_and_requirements() {
        let dir = project(&[("pyproject.toml", "[tool.ruff]\n")]);
        let profile = resolve_python(dir.path(), None, &Installed(&["python3"]));
        assert_eq!(profile.manager, PythonManager::Pyproject);
        assert!(profile.runner_prefix.is_empty());
        assert!(profile.installed);

        let dir = project(&[("requirements-dev.txt", "pytest\n")]);
        let profile = resolve_python(dir.path(), None, &Installed(&[]));
        assert_eq!(profile.manager, PythonManager::Pip);
        assert_eq!(profile.commands().install, "python -m pip install -r requirements.txt");
    }

    #[test]
    fn test_requirements_found_under_glob_metacharacters() {
        let parent = TempDir::new().unwrap();
        let dir = parent.path().join("proj[1]");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("requirements.txt"), "requests\n").unwrap();

        let profile = resolve_python(&dir, None, &Installed(&[]));
        assert_eq!(profile.manager, PythonManager::Pip);
    }

    #[test]
    fn test_mypy_and_pytest_config_detection() {
        let dir = project(&[]);
        assert!(!has_mypy_config(dir.path()));
        assert!(!has_pytest_config(dir.path()));

        let dir = project(&[("setup.cfg", "[metadata]\n[ mypy ]\nstrict = True\n")]);
        assert!(has_mypy_config(dir.path()));
        assert!(!has_pytest_config(dir.path()));

        let dir = project(&[(
            "pyproject.toml",
            "[tool.mypy]\nstrict = true\n\n[tool.pytest.ini_options]\naddopts = \"-q\"\n",
        )]);
        assert!(has_mypy_config(dir.path()));
        assert!(has_pytest_config(dir.path()));

        let dir = project(&[("mypy.ini", "")]);
        fs::create_dir(dir.path().join("tests")).unwrap();
        assert!(has_mypy_config(dir.path()));
        assert!(has_pytest_config(dir.path()));
    }

    #[test]
    fn test_unknown_project() {
        let dir = project(&[]);
        let profile = resolve_python(dir.path(), None, &Installed(&[]));
        assert_eq!(profile.manager, PythonManager::Unknown);
        assert_eq!(profile.source, "none");
    }

    #[test]
    fn test_override_beats_files() {
        let dir = project(&[("uv.lock", "")]);
        let runner = vec!["poetry".to_string(), "run".to_string()];
        let profile = resolve_python(dir.path(), Some(&runner), &Installed(&["poetry"]));

        assert_eq!(profile.manager, PythonManager::Poetry);
        assert_eq!(profile.source, RUNNER_OVERRIDE_SOURCE);
        assert_eq!(profile.with_runner(&["pytest", "-q"]), "poetry run pytest -q");
    }

    #[test]
    fn test_commands_use_runner_prefix() {
        let profile = PythonProfile {
            manager: PythonManager::Uv,
            source: "uv.lock".to_string(),
            runner_prefix: vec!["uv".to_string(), "run".to_string()],
            installed: true,
        };
        let commands = profile.commands();
        assert_eq!(commands.install, "uv sync");
        assert_eq!(commands.lint, "uv run ruff check .");
        assert_eq!(commands.tests, "uv run pytest -q");
    }
}
