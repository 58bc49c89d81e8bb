//! Diagnostic substrate for the IREX compiler.
//!
//! Every stage reports what it finds as [`Diagnostic`] records. A
//! [`Reporter`] accumulates them in insertion order and is safe to share
//! between threads. Errors from foreign parsers (YAML, JSON) are converted
//! with the [`foreign`] adaptor.

pub mod diagnostic;
pub mod foreign;
pub mod reporter;

pub use diagnostic::{Diagnostic, Position, Range, Severity};
pub use foreign::{from_foreign, ForeignDiagnostic, ForeignErrors, SYNTAX_ERROR};
pub use reporter::Reporter;

/// True if any diagnostic in the slice is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
