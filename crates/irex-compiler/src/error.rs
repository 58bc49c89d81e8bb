use irex_diagnostics::Diagnostic;
use thiserror::Error;

/// Errors produced by the compiler API.
#[derive(Debug, Error)]
pub enum CompileError {
    /// One or more stages reported error diagnostics.
    #[error("{}", summarize(.0))]
    Diagnostics(Vec<Diagnostic>),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CompileError {
    /// All diagnostics carried by the error, if any.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CompileError::Diagnostics(diagnostics) => diagnostics,
            _ => &[],
        }
    }
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    let errors: Vec<String> = diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.to_string())
        .collect();
    format!("compilation failed with {} error(s):\n{}", errors.len(), errors.join("\n"))
}
