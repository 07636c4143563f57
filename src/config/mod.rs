pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{
    BashGuardOverrides, Config, DisabledRules, DocGuardMode, DocGuardSettings, FileSettings,
    PythonCheckSettings,
};
