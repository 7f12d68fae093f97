use crate::decompose::Mode;
use thiserror::Error;

/// Setup-time failures. A pipeline that fails to initialize never
/// processes a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{mode} takes at least {min} key(s), got {got}")]
    TooFewKeys { mode: Mode, min: usize, got: usize },

    #[error("{mode} takes {expected}, got {got} key(s)")]
    WrongKeyCount {
        mode: Mode,
        expected: &'static str,
        got: usize,
    },

    #[error("key at position {index} has to be a string, found {found}")]
    NonStringKey { index: usize, found: String },

    #[error("{mode} would emit column {name:?} twice")]
    DuplicateColumn { mode: Mode, name: String },

    #[error("invalid split pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
