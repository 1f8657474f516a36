use thiserror::Error;

use crate::types::ManagerId;

#[derive(Error, Debug)]
pub enum SymregError {
    #[error("Evaluation error in dof {dof}: {reason}")]
    Evaluation { dof: usize, reason: String },

    #[error("No grammar registered for manager {manager_id}, dof {dof}")]
    MissingGrammarEntry { manager_id: ManagerId, dof: usize },

    #[error("Interrupted while waiting for termination")]
    InterruptedWait,

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config source error: {0}")]
    Config(#[from] ::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, SymregError>;
