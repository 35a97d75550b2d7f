//! Diagnostic types for the `OpenSCAD` parser.
//!
//! The parser never fails: every problem it finds becomes a [`Diagnostic`]
//! collected next to the tree. [`ParseErrors`] bundles them for callers that
//! prefer a `Result`.
use crate::span::Span;
use miette::SourceSpan;
use thiserror::Error;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    /// Reserved; the parser currently reports only errors.
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A problem found while tokenizing or parsing, anchored at a source range.
#[derive(Error, Debug, Clone, PartialEq, Eq, miette::Diagnostic)]
#[error("{message}")]
pub struct Diagnostic {
    pub message: String,
    #[label("here")]
    pub span: SourceSpan,
    pub severity: Severity,
}

impl Diagnostic {
    #[must_use]
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span: span.into(),
            severity: Severity::Error,
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span: span.into(),
            severity: Severity::Warning,
        }
    }

    /// Byte offset the diagnostic points at.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.span.offset()
    }

    #[must_use]
    pub fn range(&self) -> Span {
        Span::new(self.span.offset(), self.span.offset() + self.span.len())
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Every error diagnostic of one parse, for callers that want `Result`
/// semantics. Renders each one as a related report.
#[derive(Error, Debug, Clone, miette::Diagnostic)]
#[error("{} syntax error(s)", diagnostics.len())]
pub struct ParseErrors {
    #[related]
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseErrors {
    #[must_use]
    pub fn first(&self) -> Option<&Diagnostic> {
        self.diagnostics.first()
    }
}
