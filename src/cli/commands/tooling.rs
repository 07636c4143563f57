use super::CommandHandler;
use crate::config::ConfigLoader;
use crate::tooling::{SystemProbe, ToolingSnapshot};
use crate::Result;

/// Handler for the `tooling` command
pub struct ToolingCommand {
    pub write: bool,
}

impl ToolingCommand {
    pub fn new(write: bool) -> Self {
        Self { write }
    }
}

impl CommandHandler for ToolingCommand {
    fn execute(&self) -> Result<i32> {
        let config = ConfigLoader::new().load_from_env();
        let snapshot = ToolingSnapshot::compute(&config, &SystemProbe);

        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        if self.write {
            let path = snapshot.write(&config)?;
            eprintln!("Saved tooling snapshot to {}", path.display());
        }
        Ok(0)
    }

    fn name(&self) -> &'static str {
        "tooling"
    }
}
