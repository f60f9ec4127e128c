//! Error types for workflow orchestration.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("failed to read workflow file {}: {source}", .path.display())]
    WorkflowFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid workflow YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid workflow: {0}")]
    InvalidWorkflow(String),

    #[error("invalid path pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("workspace {} is not accessible: {source}", .path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("step {0} has an empty command")]
    EmptyCommand(String),

    #[error("failed to spawn step {step}: {source}")]
    Spawn {
        step: String,
        #[source]
        source: std::io::Error,
    },

    #[error("step {step} timed out after {secs} seconds")]
    Timeout { step: String, secs: u64 },

    #[error("git error: {0}")]
    Git(String),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_step() {
        let err = WorkflowError::Timeout {
            step: "sync".to_string(),
            secs: 5,
        };
        assert_eq!(err.to_string(), "step sync timed out after 5 seconds");
    }

    #[test]
    fn invalid_pattern_keeps_source() {
        let source = glob::Pattern::new("a/***").unwrap_err();
        let err = WorkflowError::InvalidPattern {
            pattern: "a/***".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("invalid path pattern `a/***`"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
