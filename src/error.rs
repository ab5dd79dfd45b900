#![forbid(unsafe_code)]

use std::path::PathBuf;

use thiserror::Error;

use crate::task::model::TaskId;

#[derive(Debug, Error)]
pub enum DaybookError {
    #[error("task title must not be empty")]
    EmptyTitle,

    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("invalid priority '{0}': must be 1, 2, 3 or 4")]
    InvalidPriority(String),

    #[error("invalid date '{input}': {msg}")]
    InvalidDate { input: String, msg: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid config key '{0}'")]
    InvalidConfigKey(String),

    #[error("invalid config value for '{key}': {msg}")]
    InvalidConfigValue { key: String, msg: String },

    #[error("io error at {path}: {source}")]
    IoPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl DaybookError {
    /// True for errors caused by user input rather than by a broken caller.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyTitle | Self::InvalidPriority(_) | Self::InvalidDate { .. }
        )
    }
}
