//! Shared diagnostics model for generation results surfaced to CLI and test consumers.

use blake3::Hasher;
use serde::Serialize;
use std::fmt;

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        }
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(self, Severity::Error)
    }
}

/// Structured identifier for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiagnosticCode {
    pub code: String,
    pub category: Option<String>,
}

impl DiagnosticCode {
    #[must_use]
    pub fn new(code: impl Into<String>, category: Option<String>) -> Self {
        Self {
            code: code.into(),
            category,
        }
    }
}

/// Diagnostic entry attached to the declaration that produced it.
#[derive(Clone, Debug, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<DiagnosticCode>,
    pub message: String,
    /// Qualified name of the originating declaration, when known.
    pub origin: Option<String>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    #[must_use]
    pub fn note(message: impl Into<String>) -> Self {
        Self::new(Severity::Note, message)
    }

    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: DiagnosticCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    #[must_use]
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            origin: None,
            notes: Vec::new(),
        }
    }
}

/// Collection helper used to accumulate diagnostics while processing one declaration.
#[derive(Debug)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    namespace: String,
}

impl DiagnosticSink {
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            diagnostics: Vec::new(),
            namespace: namespace.into(),
        }
    }

    pub fn push(&mut self, mut diagnostic: Diagnostic) {
        if diagnostic.code.is_none() {
            diagnostic.code = Some(self.auto_code(&diagnostic));
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn push_error(&mut self, message: impl Into<String>, origin: impl Into<String>) {
        self.push(Diagnostic::error(message).with_origin(origin));
    }

    pub fn push_warning(&mut self, message: impl Into<String>, origin: impl Into<String>) {
        self.push(Diagnostic::warning(message).with_origin(origin));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity.is_error())
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn auto_code(&self, diagnostic: &Diagnostic) -> DiagnosticCode {
        let mut hasher = Hasher::new();
        hasher.update(self.namespace.as_bytes());
        hasher.update(diagnostic.message.as_bytes());
        if let Some(origin) = diagnostic.origin.as_ref() {
            hasher.update(origin.as_bytes());
        }
        let hash = hasher.finalize();
        let raw = u32::from_le_bytes(hash.as_bytes()[..4].try_into().unwrap_or([0; 4]));
        let suffix = raw % 100_000;
        let code = format!("{}{:05}", self.namespace.to_ascii_uppercase(), suffix);
        DiagnosticCode::new(code, Some(self.namespace.clone()))
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new("mock")
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self
            .code
            .as_ref()
            .map(|c| c.code.as_str())
            .unwrap_or("UNKNOWN");
        match self.origin.as_deref() {
            Some(origin) => write!(
                f,
                "{}[{code}]: {origin}: {}",
                self.severity.as_str(),
                self.message
            ),
            None => write!(f, "{}[{code}]: {}", self.severity.as_str(), self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_assigns_stable_codes() {
        let mut first = DiagnosticSink::new("mock");
        first.push_error("cycle detected", "App.Broken");
        let mut second = DiagnosticSink::new("mock");
        second.push_error("cycle detected", "App.Broken");

        let a = first.into_vec().remove(0);
        let b = second.into_vec().remove(0);
        assert_eq!(a.code, b.code, "codes are a pure function of the content");
        assert!(a.code.unwrap().code.starts_with("MOCK"));
    }

    #[test]
    fn display_includes_origin_and_code() {
        let mut sink = DiagnosticSink::new("mock");
        sink.push_warning("base type is unresolved", "App.Service");
        let rendered = sink.into_vec().remove(0).to_string();
        assert!(rendered.starts_with("warning[MOCK"));
        assert!(rendered.contains("App.Service: base type is unresolved"));
    }

    #[test]
    fn has_errors_distinguishes_severities() {
        let mut sink = DiagnosticSink::default();
        sink.push_warning("soft", "App.A");
        assert!(!sink.has_errors());
        sink.push_error("hard", "App.B");
        assert!(sink.has_errors());
    }
}
