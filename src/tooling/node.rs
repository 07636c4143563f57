use crate::tooling::probe::BinaryProbe;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Node package managers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeManager {
    Npm,
    Pnpm,
    Yarn,
    Bun,
}

impl NodeManager {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "npm" => Some(NodeManager::Npm),
            "pnpm" => Some(NodeManager::Pnpm),
            "yarn" => Some(NodeManager::Yarn),
            "bun" => Some(NodeManager::Bun),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeManager::Npm => "npm",
            NodeManager::Pnpm => "pnpm",
            NodeManager::Yarn => "yarn",
            NodeManager::Bun => "bun",
        }
    }
}

/// What a detector found, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedManager {
    pub name: NodeManager,
    pub source: String,
}

/// Chooses the package manager for a project that has a `package.json`
pub trait PackageManagerDetector {
    fn detect(&self, project_dir: &Path) -> DetectedManager;
}

/// Default detector: `packageManager` field, then lockfiles, then npm
#[derive(Debug, Clone, Copy, Default)]
pub struct LockfileDetector;

const LOCKFILES: &[(&str, NodeManager)] = &[
    ("pnpm-lock.yaml", NodeManager::Pnpm),
    ("bun.lockb", NodeManager::Bun),
    ("bun.lock", NodeManager::Bun),
    ("yarn.lock", NodeManager::Yarn),
    ("package-lock.json", NodeManager::Npm),
];

impl PackageManagerDetector for LockfileDetector {
    fn detect(&self, project_dir: &Path) -> DetectedManager {
        if let Some(name) = declared_manager(project_dir) {
            return DetectedManager {
                name,
                source: "package.json".to_string(),
            };
        }

        for (lockfile, manager) in LOCKFILES {
            if project_dir.join(lockfile).is_file() {
                return DetectedManager {
                    name: *manager,
                    source: lockfile.to_string(),
                };
            }
        }

        DetectedManager {
            name: NodeManager::Npm,
            source: "default".to_string(),
        }
    }
}

/// `"packageManager": "pnpm@9.1.0"` in package.json
fn declared_manager(project_dir: &Path) -> Option<NodeManager> {
    let raw = fs::read_to_string(project_dir.join("package.json")).ok()?;
    let manifest: serde_json::Value = serde_json::from_str(&raw).ok()?;
    let field = manifest.get("packageManager")?.as_str()?;
    let name = field.split('@').next()?;
    NodeManager::parse(name)
}

/// Resolved Node tooling for a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProfile {
    /// Whether the project has a package.json at all
    pub present: bool,
    pub package_manager: Option<NodeManager>,
    pub source: Option<String>,
    pub installed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeCommands {
    pub install: String,
    pub test: String,
    pub build: String,
    pub lint: String,
    pub prettier: String,
    pub tsc: String,
}

impl NodeProfile {
    pub fn commands(&self) -> Option<NodeCommands> {
        if !self.present {
            return None;
        }

        let commands = match self.package_manager.unwrap_or(NodeManager::Npm) {
            NodeManager::Pnpm => NodeCommands {
                install: "pnpm install".into(),
                test: "pnpm test".into(),
                build: "pnpm build".into(),
                lint: "pnpm lint".into(),
                prettier: "pnpm exec prettier --write .".into(),
                tsc: "pnpm exec tsc --noEmit".into(),
            },
            NodeManager::Yarn => NodeCommands {
                install: "yarn install".into(),
                test: "yarn test".into(),
                build: "yarn build".into(),
                lint: "yarn lint".into(),
                prettier: "yarn prettier --write .".into(),
                tsc: "yarn tsc --noEmit".into(),
            },
            NodeManager::Bun => NodeCommands {
                install: "bun install".into(),
                test: "bun test".into(),
                build: "bun run build".into(),
                lint: "bun run lint".into(),
                prettier: "bunx prettier --write .".into(),
                tsc: "bunx tsc --noEmit".into(),
            },
            NodeManager::Npm => NodeCommands {
                install: "npm install".into(),
                test: "npm test".into(),
                build: "npm run build".into(),
                lint: "npm run lint".into(),
                prettier: "npx --no-install prettier --write .".into(),
                tsc: "npx --no-install tsc --noEmit".into(),
            },
        };
        Some(commands)
    }
}

pub fn resolve_node(
    project_dir: &Path,
    detector: &dyn PackageManagerDetector,
    probe: &dyn BinaryProbe,
) -> NodeProfile {
    if !project_dir.join("package.json").is_file() {
        return NodeProfile {
            present: false,
            package_manager: None,
            source: None,
            installed: false,
        };
    }

    let detected = detector.detect(project_dir);
    debug!(
        "Node tooling: {} (from {})",
        detected.name.as_str(),
        detected.source
    );

    NodeProfile {
        present: true,
        package_manager: Some(detected.name),
        installed: probe.is_installed(detected.name.as_str()),
        source: Some(detected.source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tooling::probe::ProbeOutput;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::TempDir;

    struct NothingInstalled;

    impl BinaryProbe for NothingInstalled {
        fn run(&self, _: &str, _: &[&str], _: Option<&Path>, _: Duration) -> Option<ProbeOutput> {
            None
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
    fn test_no_package_json() {
        let dir = project(&[("yarn.lock", "")]);
        let profile = resolve_node(dir.path(), &LockfileDetector, &NothingInstalled);
        assert!(!profile.present);
        assert_eq!(profile.commands(), None);
    }

    #[test]
    fn test_package_manager_field_wins() {
        let dir = project(&[
            ("package.json", r#"{"packageManager": "yarn@4.1.0"}"#),
            ("pnpm-lock.yaml", ""),
        ]);
        let detected = LockfileDetector.detect(dir.path());
        assert_eq!(detected.name, NodeManager::Yarn);
        assert_eq!(detected.source, "package.json");
    }

    #[test]
    fn test_lockfile_priority() {
        let dir = project(&[
            ("package.json", "{}"),
            ("yarn.lock", ""),
            ("bun.lockb", ""),
        ]);
        assert_eq!(LockfileDetector.detect(dir.path()).name, NodeManager::Bun);

        let dir = project(&[("package.json", "{}")]);
        let profile = resolve_node(dir.path(), &LockfileDetector, &NothingInstalled);
        assert_eq!(profile.package_manager, Some(NodeManager::Npm));
        assert_eq!(profile.source.as_deref(), Some("default"));
        assert!(!profile.installed);
    }

    #[test]
    fn test_custom_detector() {
        struct AlwaysPnpm;
        impl PackageManagerDetector for AlwaysPnpm {
            fn detect(&self, _: &Path) -> DetectedManager {
                DetectedManager {
                    name: NodeManager::Pnpm,
                    source: "workspace".to_string(),
                }
            }
        }

        let dir = project(&[("package.json", "{}"), ("package-lock.json", "{}")]);
        let profile = resolve_node(dir.path(), &AlwaysPnpm, &NothingInstalled);
        assert_eq!(profile.package_manager, Some(NodeManager::Pnpm));
        assert_eq!(profile.commands().unwrap().tsc, "pnpm exec tsc --noEmit");
    }
}
