use std::fmt;

use serde::{Deserialize, Serialize};

/// Diagnostic severity. The numeric values follow the editor protocol ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Severity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "information",
            Severity::Hint => "hint",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point in a source file. `line` and `column` are 1-based, `byte` is a 0-based offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub byte: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, byte: usize) -> Self {
        Self { line, column, byte }
    }
}

/// A span of source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Zero-width range at a single position.
    pub fn at(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }
}

/// One message produced by a compiler stage.
///
/// Built once with [`Diagnostic::new`] and the `with_*` methods, then
/// treated as immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// File the diagnostic belongs to; empty when not tied to a file.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_file: String,
    /// Dotted symbolic path into the specification, e.g. `services.services.posts`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub spec_path: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            source_file: String::new(),
            spec_path: String::new(),
            code: code.into(),
            range: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn information(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Information, code, message)
    }

    pub fn hint(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Hint, code, message)
    }

    pub fn with_source(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = source_file.into();
        self
    }

    pub fn with_spec_path(mut self, spec_path: impl Into<String>) -> Self {
        self.spec_path = spec_path.into();
        self
    }

    pub fn with_range(mut self, range: Option<Range>) -> Self {
        self.range = range;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

/// Renders as `[severity] source: message`, the CLI line format.
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = if self.source_file.is_empty() {
            self.code.as_str()
        } else {
            self.source_file.as_str()
        };
        write!(f, "[{}] {}: {}", self.severity, source, self.message)
    }
}
