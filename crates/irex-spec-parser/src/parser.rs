use std::path::Path;

use irex_diagnostics::{from_foreign, Diagnostic};

use crate::error::ParseError;
use crate::model::{SpecDocument, SpecKind};

/// Outcome of decoding one specification file.
#[derive(Debug)]
pub struct Decoded<T> {
    /// The typed tree; `None` when decoding failed.
    pub tree: Option<T>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Decoded<T> {
    pub fn has_errors(&self) -> bool {
        irex_diagnostics::has_errors(&self.diagnostics)
    }
}

/// Decode a specification of kind `T` from a YAML string.
///
/// A document holding only whitespace and comments decodes to the empty tree.
pub fn decode_str<T: SpecDocument>(input: &str) -> Result<T, ParseError> {
    if is_blank(input) {
        return Ok(T::default());
    }
    Ok(serde_yaml::from_str(input)?)
}

/// Decode a specification from a file path.
pub fn decode_file<T: SpecDocument>(path: &Path) -> Result<T, ParseError> {
    if !path.is_file() {
        return Err(ParseError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    decode_str(&content)
}

/// Decode in-memory content, reporting failures as diagnostics against `source_file`.
pub fn decode_source<T: SpecDocument>(content: &str, source_file: &str) -> Decoded<T> {
    finish(decode_str(content), source_file)
}

/// Decode a file, reporting failures as diagnostics.
///
/// A missing file yields exactly one error with code `<kind>.not_found`.
pub fn decode<T: SpecDocument>(path: &Path) -> Decoded<T> {
    finish(decode_file(path), &path.display().to_string())
}

fn finish<T: SpecDocument>(result: Result<T, ParseError>, source_file: &str) -> Decoded<T> {
    match result {
        Ok(tree) => {
            tracing::debug!(kind = T::KIND.as_str(), file = source_file, "decoded specification");
            Decoded {
                tree: Some(tree),
                diagnostics: Vec::new(),
            }
        }
        Err(err) => Decoded {
            tree: None,
            diagnostics: error_diagnostics(&err, T::KIND, source_file),
        },
    }
}

fn error_diagnostics(err: &ParseError, kind: SpecKind, source_file: &str) -> Vec<Diagnostic> {
    match err {
        ParseError::NotFound(path) => vec![Diagnostic::error(
            kind.not_found_code(),
            format!("We couldn't find the file at {}", path.display()),
        )
        .with_source(source_file)],
        ParseError::Yaml(e) => from_foreign(e, source_file),
        ParseError::Io(e) => vec![Diagnostic::error(
            format!("{kind}.read_failed"),
            format!("Failed to read {kind} file: {e}"),
        )
        .with_source(source_file)],
    }
}

fn is_blank(input: &str) -> bool {
    input.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}
