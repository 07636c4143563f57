use super::CommandHandler;
use crate::cli::app::StateAction;
use crate::config::ConfigLoader;
use crate::state::StateStore;
use crate::Result;

/// Handler for the `state` subcommands
pub struct StateCommand {
    pub action: StateAction,
}

impl StateCommand {
    pub fn new(action: StateAction) -> Self {
        Self { action }
    }

    /// Run the action against `store`, returning the line to print
    pub fn run_on(&self, store: &StateStore) -> Result<String> {
        let report = match &self.action {
            StateAction::Clear => {
                let removed = store.clear_all()?;
                format!(
                    "Removed {} state entr{} from {}",
                    removed,
                    if removed == 1 { "y" } else { "ies" },
                    store.state_dir().display()
                )
            }
            StateAction::Sessions => {
                let sessions = store.list_sessions()?;
                if sessions.is_empty() {
                    "No sessions with persisted state".to_string()
                } else {
                    sessions.join("\n")
                }
            }
            StateAction::Prune { days } => {
                let removed = store.prune_sessions(*days)?;
                format!("Pruned {removed} session(s) older than {days} day(s)")
            }
        };
        Ok(report)
    }
}

impl CommandHandler for StateCommand {
    fn execute(&self) -> Result<i32> {
        let config = ConfigLoader::new().load_from_env();
        let store = StateStore::new(&config.state_dir);
        println!("{}", self.run_on(&store)?);
        Ok(0)
    }

    fn name(&self) -> &'static str {
        "state"
    }
}
