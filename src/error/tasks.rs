use std::io;

/// Errors from the persistent task-graph store.
#[derive(Debug, thiserror::Error)]
pub enum TasksError {
    #[error("task not found: {id}")]
    NotFound { id: String },

    #[error("dependency task not found: {id}")]
    DependencyNotFound { id: String },

    #[error("dependency already exists")]
    DuplicateDependency,

    #[error("adding this dependency would create a cycle")]
    CycleDetected,

    #[error("failed to read or write task store: {0}")]
    Io(#[from] io::Error),

    #[error("failed to decode task store: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("path '{path}' escapes the task store directory")]
    PathEscape { path: String },

    #[error("invalid value '{value}' for field '{field}'")]
    InvalidField { field: String, value: String },
}
