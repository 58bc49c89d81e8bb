//! Adaptor from foreign parser errors to [`Diagnostic`]s.
//!
//! Known shapes keep their span. Anything else becomes a single error
//! without a range.

use std::error::Error as StdError;
use std::fmt;

use crate::diagnostic::{Diagnostic, Position, Range, Severity};

/// Code used for every diagnostic produced by the adaptor.
pub const SYNTAX_ERROR: &str = "syntax.error";

/// A foreign error or diagnostic that can be mapped onto [`Diagnostic`].
pub trait ForeignDiagnostic {
    /// Human-readable message, without any location suffix.
    fn summary(&self) -> String;

    /// Span in the source, if the foreign tool tracked one.
    fn span(&self) -> Option<Range>;

    /// Foreign severities collapse onto error and warning.
    fn is_warning(&self) -> bool {
        false
    }

    fn to_diagnostic(&self, source_file: &str) -> Diagnostic {
        let severity = if self.is_warning() {
            Severity::Warning
        } else {
            Severity::Error
        };
        Diagnostic::new(severity, SYNTAX_ERROR, self.summary())
            .with_source(source_file)
            .with_range(self.span())
    }
}

impl ForeignDiagnostic for serde_yaml::Error {
    fn summary(&self) -> String {
        strip_location(self.to_string())
    }

    fn span(&self) -> Option<Range> {
        self.location()
            .map(|loc| Range::at(Position::new(loc.line(), loc.column(), loc.index())))
    }
}

impl ForeignDiagnostic for serde_json::Error {
    fn summary(&self) -> String {
        strip_location(self.to_string())
    }

    fn span(&self) -> Option<Range> {
        // serde_json reports line 0 when it has no position
        if self.line() == 0 {
            return None;
        }
        Some(Range::at(Position::new(self.line(), self.column(), 0)))
    }
}

/// A collection of foreign errors reported together.
#[derive(Debug, Default)]
pub struct ForeignErrors(pub Vec<Box<dyn StdError + Send + Sync + 'static>>);

impl fmt::Display for ForeignErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        f.write_str(&messages.join("; "))
    }
}

impl StdError for ForeignErrors {}

/// Convert any error into diagnostics for `source_file`.
///
/// Recognizes `serde_yaml` and `serde_json` errors, [`ForeignErrors`]
/// collections, and the same wrapped one level deep as an error source.
pub fn from_foreign(error: &(dyn StdError + 'static), source_file: &str) -> Vec<Diagnostic> {
    if let Some(collection) = error.downcast_ref::<ForeignErrors>() {
        return collection
            .0
            .iter()
            .flat_map(|e| from_foreign(e.as_ref(), source_file))
            .collect();
    }
    if let Some(yaml) = error.downcast_ref::<serde_yaml::Error>() {
        return vec![yaml.to_diagnostic(source_file)];
    }
    if let Some(json) = error.downcast_ref::<serde_json::Error>() {
        return vec![json.to_diagnostic(source_file)];
    }
    if let Some(inner) = error.source() {
        if inner.is::<serde_yaml::Error>()
            || inner.is::<serde_json::Error>()
            || inner.is::<ForeignErrors>()
        {
            return from_foreign(inner, source_file);
        }
    }

    vec![Diagnostic::error(SYNTAX_ERROR, error.to_string()).with_source(source_file)]
}

fn strip_location(message: String) -> String {
    match message.find(" at line ") {
        Some(idx) => message[..idx].to_string(),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_error_keeps_span() {
        let err = serde_yaml::from_str::<serde_json::Value>("a: [1, 2\nb: 3").unwrap_err();
        let diags = from_foreign(&err, "bad.yaml");

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[0].code, SYNTAX_ERROR);
        assert_eq!(diags[0].source_file, "bad.yaml");
        assert!(diags[0].range.is_some());
        assert!(!diags[0].message.contains(" at line "));
    }

    #[test]
    fn json_error_keeps_line() {
        let err = serde_json::from_str::<serde_json::Value>("{\n  \"a\": }").unwrap_err();
        let diags = from_foreign(&err, "bad.json");

        assert_eq!(diags[0].range.map(|r| r.start.line), Some(2));
    }

    #[test]
    fn collection_yields_one_diagnostic_each() {
        let a = serde_yaml::from_str::<serde_json::Value>("[").unwrap_err();
        let b = serde_json::from_str::<serde_json::Value>("]").unwrap_err();
        let errors = ForeignErrors(vec![Box::new(a), Box::new(b)]);

        let diags = from_foreign(&errors, "x.yaml");
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn unknown_error_becomes_rangeless_error() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let diags = from_foreign(&err, "x.yaml");

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "disk on fire");
        assert!(diags[0].range.is_none());
    }
}
