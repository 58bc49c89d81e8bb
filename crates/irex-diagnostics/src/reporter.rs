use parking_lot::Mutex;

use crate::diagnostic::{Diagnostic, Range, Severity};

/// Thread-safe, insertion-ordered diagnostic accumulator.
///
/// All mutators take `&self`, so one reporter can be shared by parallel
/// file-processing tasks.
#[derive(Debug, Default)]
pub struct Reporter {
    source_file: String,
    items: Mutex<Vec<Diagnostic>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A reporter that stamps `source_file` on diagnostics created through
    /// [`error`](Self::error), [`warn`](Self::warn), [`info`](Self::info) and
    /// [`hint`](Self::hint).
    pub fn for_source(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            items: Mutex::new(Vec::new()),
        }
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn add(&self, diagnostic: Diagnostic) {
        self.items.lock().push(diagnostic);
    }

    pub fn extend<I>(&self, diagnostics: I)
    where
        I: IntoIterator<Item = Diagnostic>,
    {
        self.items.lock().extend(diagnostics);
    }

    /// Extend, filling in `source_file` on diagnostics that have none.
    pub fn extend_with_source<I>(&self, diagnostics: I, source_file: &str)
    where
        I: IntoIterator<Item = Diagnostic>,
    {
        let mut items = self.items.lock();
        for mut d in diagnostics {
            if d.source_file.is_empty() {
                d.source_file = source_file.to_string();
            }
            items.push(d);
        }
    }

    /// Snapshot of everything reported so far.
    pub fn all(&self) -> Vec<Diagnostic> {
        self.items.lock().clone()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.items.into_inner()
    }

    pub fn has_errors(&self) -> bool {
        self.items.lock().iter().any(Diagnostic::is_error)
    }

    pub fn has_warnings(&self) -> bool {
        self.items.lock().iter().any(Diagnostic::is_warning)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.items
            .lock()
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn error(&self, message: impl Into<String>, range: Option<Range>, code: &str, spec_path: &str) {
        self.report(Severity::Error, message, range, code, spec_path);
    }

    pub fn warn(&self, message: impl Into<String>, range: Option<Range>, code: &str, spec_path: &str) {
        self.report(Severity::Warning, message, range, code, spec_path);
    }

    pub fn info(&self, message: impl Into<String>, range: Option<Range>, code: &str, spec_path: &str) {
        self.report(Severity::Information, message, range, code, spec_path);
    }

    pub fn hint(&self, message: impl Into<String>, range: Option<Range>, code: &str, spec_path: &str) {
        self.report(Severity::Hint, message, range, code, spec_path);
    }

    fn report(
        &self,
        severity: Severity,
        message: impl Into<String>,
        range: Option<Range>,
        code: &str,
        spec_path: &str,
    ) {
        let diagnostic = Diagnostic::new(severity, code, message)
            .with_source(self.source_file.clone())
            .with_spec_path(spec_path)
            .with_range(range);
        self.add(diagnostic);
    }
}
