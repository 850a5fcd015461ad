// src/infra/errors.rs — Error types for codegate

use thiserror::Error;

use crate::core::state::WorkflowState;

#[derive(Error, Debug)]
pub enum WorkflowError {
    // Collaborator failures (recovered inside the loop)
    #[error("Candidate producer failed: {message}")]
    Producer { message: String, timed_out: bool },

    #[error("Issue detector failed: {message}")]
    Detector { message: String, timed_out: bool },

    // Fatal before the loop starts
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Run cancelled")]
    Cancelled,

    // Implementation errors
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: WorkflowState,
        to: WorkflowState,
    },

    // Infra
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkflowError {
    pub fn producer(message: impl Into<String>) -> Self {
        WorkflowError::Producer {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn detector(message: impl Into<String>) -> Self {
        WorkflowError::Detector {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            WorkflowError::Producer {
                timed_out: true,
                ..
            } | WorkflowError::Detector {
                timed_out: true,
                ..
            }
        )
    }
}
