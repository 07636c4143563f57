//! Project tooling resolution
//!
//! Works out which dependency manager and runner prefix a project uses so
//! that suggested commands match the repository's conventions. Detection
//! reads repository files; installed binaries are only probed to report
//! whether the chosen tool is likely available.

pub mod node;
pub mod probe;
pub mod python;

pub use node::{resolve_node, LockfileDetector, NodeManager, NodeProfile, PackageManagerDetector};
pub use probe::{BinaryProbe, ProbeOutput, SystemProbe};
pub use python::{
    has_mypy_config, has_pytest_config, resolve_python, PythonManager, PythonProfile,
};

use crate::config::Config;
use crate::io::GuardPaths;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use tracing::debug;

/// Snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct PythonSection {
    #[serde(flatten)]
    pub profile: PythonProfile,
    pub commands: python::PythonCommands,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSection {
    #[serde(flatten)]
    pub profile: NodeProfile,
    pub commands: Option<node::NodeCommands>,
}

/// Everything known about the project's tooling at one point in time
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolingSnapshot {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub python: PythonSection,
    pub node: NodeSection,
}

impl ToolingSnapshot {
    pub fn compute(config: &Config, probe: &dyn BinaryProbe) -> Self {
        let python = resolve_python(
            &config.project_dir,
            config.py_runner_override.as_deref(),
            probe,
        );
        let node = resolve_node(&config.project_dir, &LockfileDetector, probe);

        Self {
            version: SNAPSHOT_VERSION,
            generated_at: Utc::now(),
            python: PythonSection {
                commands: python.commands(),
                profile: python,
            },
            node: NodeSection {
                commands: node.commands(),
                profile: node,
            },
        }
    }

    /// Write the snapshot as `tooling.json` in the state directory
    pub fn write(&self, config: &Config) -> Result<std::path::PathBuf> {
        let paths = GuardPaths {
            project_dir: config.project_dir.clone(),
            state_dir: config.state_dir.clone(),
        };
        paths.ensure_directories()?;

        let path = paths.tooling_snapshot_file();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content + "\n")?;
        debug!("Wrote tooling snapshot to {}", path.display());
        Ok(path)
    }
}
