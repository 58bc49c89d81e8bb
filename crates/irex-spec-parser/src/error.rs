use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while decoding a specification file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// YAML syntax or shape error.
    #[error("parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
