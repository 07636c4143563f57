use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Path error: {0}")]
    Path(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Rule error: {0}")]
    Rule(String),
}

pub type Result<T> = std::result::Result<T, GuardError>;
