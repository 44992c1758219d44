use std::io;

/// Errors from the read-only skills toolset.
#[derive(Debug, thiserror::Error)]
pub enum SkillsError {
    #[error("skill not found: {name}")]
    NotFound { name: String },

    #[error("invalid file path")]
    InvalidPath,

    #[error("path '{path}' escapes skill directory")]
    PathTraversal { path: String },

    #[error("failed to read skill file: {0}")]
    Io(#[from] io::Error),
}
